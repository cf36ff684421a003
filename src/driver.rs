use crate::checkpoint::{Checkpoint, Checkpointer};
use crate::config::CrawlOptions;
use crate::ingest::{CommentIngester, IngestStats};
use crate::progress::ProgressScope;
use crate::resolver::AuthorResolver;
use crate::sink::TableSink;
use crate::source::Submission;
use crate::store::RecordStore;
use anyhow::Result;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    MinimumReached,
    SourceExhausted,
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::MinimumReached => "minimum reached",
            StopReason::SourceExhausted => "no more submissions",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// The line printed when the binary exits, successful or not.
pub fn status_line(records: usize, outcome: &str, elapsed: Duration) -> String {
    format!(
        "Collected {} records; {}. Total execution time: {:.2} hours",
        records,
        outcome,
        crate::date::as_hours(elapsed)
    )
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub stop_reason: StopReason,
    pub submissions: usize,
    pub comments: usize,
    pub authors: usize,
    pub gildings: usize,
    pub flushes: u64,
    pub stats: IngestStats,
    pub elapsed: Duration,
}

/// Walks a ranked submission feed, ingests every flattened comment, and checkpoints
/// after each submission. Single-threaded; the store is only touched from here.
pub struct CollectionDriver<S> {
    store: RecordStore,
    ingester: CommentIngester,
    checkpointer: Checkpointer<S>,
    cancel: Arc<AtomicBool>,
    progress: Option<ProgressScope>,
    label: String,
}

impl RunSummary {
    pub fn status_line(&self) -> String {
        status_line(self.comments, &self.stop_reason.to_string(), self.elapsed)
    }
}

impl<S: TableSink> CollectionDriver<S> {
    /// Validates `opts` first; an invalid configuration never gets to collect anything.
    pub fn new(opts: &CrawlOptions, sink: S) -> Result<Self> {
        opts.validate()?;
        let checkpointer = Checkpointer::from_options(sink, opts)?;
        let label = format!("r/{}", opts.subreddit);
        let progress = opts.progress.then(|| ProgressScope::count(label.clone(), opts.minimum));
        Ok(Self {
            store: RecordStore::new(),
            ingester: CommentIngester::new(AuthorResolver::new()),
            checkpointer,
            cancel: Arc::new(AtomicBool::new(false)),
            progress,
            label,
        })
    }

    /// Setting the returned flag stops the run before the next submission.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn checkpointer(&self) -> &Checkpointer<S> {
        &self.checkpointer
    }

    pub fn into_parts(self) -> (RecordStore, S) {
        (self.store, self.checkpointer.into_sink())
    }

    /// Process one submission unless already seen. Returns the checkpoint verdict,
    /// or `None` for a repeat.
    pub fn process<T: Submission>(&mut self, submission: &mut T) -> Result<Option<Checkpoint>> {
        let id = submission.id().to_string();
        if self.store.has_submission(&id) {
            tracing::debug!("submission {} already processed; skipping", id);
            return Ok(None);
        }
        self.store.mark_submission_seen(&id);

        match submission.expand_comments() {
            Ok(comments) => {
                for comment in &comments {
                    self.ingester.ingest(&mut self.store, comment);
                }
                tracing::debug!("submission {}: {} comments in thread", id, comments.len());
            }
            Err(e) => tracing::warn!("submission {}: comment expansion failed, skipping: {:#}", id, e),
        }

        let flushes_before = self.checkpointer.flushes();
        let verdict = self.checkpointer.after_submission(&self.store)?;
        if self.checkpointer.flushes() > flushes_before {
            let st = self.ingester.stats();
            tracing::info!(
                "{}: {} submissions, {} of {} comments kept ({} missing body/author, {} deleted, {} suspended, {} unreadable)",
                self.label,
                self.store.submission_count(),
                st.recorded,
                st.seen,
                st.missing_field,
                st.deleted_author,
                st.suspended_author,
                st.unreadable_author
            );
        }
        if let Some(pb) = &self.progress {
            pb.set(self.store.comment_count() as u64);
        }
        Ok(Some(verdict))
    }

    /// Consume `feed` until the minimum is exceeded, the feed ends, or the run is cancelled,
    /// then flush whatever the last checkpoint did not cover.
    pub fn run<I, T>(&mut self, feed: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = T>,
        T: Submission,
    {
        let started = Instant::now();
        let mut stop_reason = StopReason::SourceExhausted;

        for mut submission in feed {
            if self.cancel.load(Ordering::Relaxed) {
                stop_reason = StopReason::Cancelled;
                break;
            }
            if self.process(&mut submission)? == Some(Checkpoint::Stop) {
                stop_reason = StopReason::MinimumReached;
                break;
            }
        }

        self.checkpointer.finish(&self.store)?;

        let stats = self.ingester.stats();
        let summary = RunSummary {
            stop_reason,
            submissions: self.store.submission_count(),
            comments: self.store.comment_count(),
            authors: self.store.author_count(),
            gildings: self.store.gilding_count(),
            flushes: self.checkpointer.flushes(),
            stats,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "{}: {} ({} submissions, {} comments kept, {} skipped, {} authors, {} gildings)",
            self.label,
            stop_reason,
            summary.submissions,
            summary.comments,
            stats.skipped(),
            summary.authors,
            summary.gildings
        );
        if let Some(pb) = &self.progress {
            pb.finish(format!("{} ({})", self.label, stop_reason));
        }
        Ok(summary)
    }
}
