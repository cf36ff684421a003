use crate::config::CrawlOptions;
use crate::date::clock_now;
use crate::records::{AUTHOR_TABLE, COMMENT_TABLE, GILDING_TABLE};
use crate::sink::TableSink;
use crate::store::RecordStore;
use anyhow::{bail, Context, Result};

/// Verdict after a submission has been fully ingested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    /// More than `minimum` comments collected; process no further submissions.
    Stop,
}

/// Flush cadence and stop condition.
///
/// Flushes when the comment count reaches `threshold`, then moves the threshold
/// up by one `interval`. Stops once the count exceeds `minimum`.
pub struct Checkpointer<S> {
    sink: S,
    threshold: u64,
    interval: u64,
    minimum: u64,
    final_flush: bool,
    flushes: u64,
    last_flushed: Option<usize>,
}

impl<S: TableSink> Checkpointer<S> {
    pub fn new(sink: S, checkpoint: u64, minimum: u64) -> Result<Self> {
        if checkpoint == 0 {
            bail!("checkpoint must be at least 1");
        }
        if minimum < checkpoint {
            bail!(
                "the minimum number of records ({}) has to be at least the checkpoint ({})",
                minimum,
                checkpoint
            );
        }
        Ok(Self {
            sink,
            threshold: checkpoint,
            interval: checkpoint,
            minimum,
            final_flush: true,
            flushes: 0,
            last_flushed: None,
        })
    }

    pub fn from_options(sink: S, opts: &CrawlOptions) -> Result<Self> {
        Ok(Self::new(sink, opts.checkpoint, opts.minimum)?.with_final_flush(opts.final_flush))
    }

    /// Whether `finish` writes comments collected since the last checkpoint.
    pub fn with_final_flush(mut self, yes: bool) -> Self {
        self.final_flush = yes;
        self
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn minimum(&self) -> u64 {
        self.minimum
    }

    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn after_submission(&mut self, store: &RecordStore) -> Result<Checkpoint> {
        let count = store.comment_count() as u64;
        if count >= self.threshold {
            tracing::info!("Collected {} records so far; saving. Time now: {}", count, clock_now());
            self.flush(store)?;
            self.threshold += self.interval;
        }
        if count > self.minimum {
            return Ok(Checkpoint::Stop);
        }
        Ok(Checkpoint::Continue)
    }

    /// Final flush when the run ends, unless disabled or nothing changed since the last one.
    /// Returns whether a flush happened.
    pub fn finish(&mut self, store: &RecordStore) -> Result<bool> {
        if !self.final_flush || self.last_flushed == Some(store.comment_count()) {
            return Ok(false);
        }
        tracing::info!("Saving final {} records. Time now: {}", store.comment_count(), clock_now());
        self.flush(store)?;
        Ok(true)
    }

    /// Write all three tables in full.
    pub fn flush(&mut self, store: &RecordStore) -> Result<()> {
        self.sink
            .write_table(COMMENT_TABLE, store.comments())
            .context("flush comment table")?;
        self.sink
            .write_table(AUTHOR_TABLE, store.authors())
            .context("flush author table")?;
        self.sink
            .write_table(GILDING_TABLE, store.gildings())
            .context("flush gildings table")?;
        self.flushes += 1;
        self.last_flushed = Some(store.comment_count());
        tracing::debug!(
            "flush #{}: {} comments, {} authors, {} gildings",
            self.flushes,
            store.comment_count(),
            store.author_count(),
            store.gilding_count()
        );
        Ok(())
    }
}
