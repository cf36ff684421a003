use anyhow::{bail, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CHECKPOINT: u64 = 10_000;
pub const DEFAULT_MINIMUM: u64 = 200_000;

/// On-disk encoding of the flushed tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    /// `<name>.csv` with a header row.
    Csv,
    /// `<name>.jsonl`, one JSON object per row.
    Jsonl,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Jsonl => "jsonl",
        }
    }
}

impl FromStr for TableFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            other => Err(format!("unknown table format '{other}' (expected csv or jsonl)")),
        }
    }
}

/// Order in which a source yields submissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ranking {
    /// Highest score first.
    Top,
    /// Newest first.
    New,
    /// Whatever order the source lists them in.
    Listed,
}

impl FromStr for Ranking {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "new" => Ok(Self::New),
            "listed" => Ok(Self::Listed),
            other => Err(format!("unknown ranking '{other}' (expected top, new or listed)")),
        }
    }
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ranking::Top => "top",
            Ranking::New => "new",
            Ranking::Listed => "listed",
        };
        f.write_str(s)
    }
}

/// User-facing crawl options with defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct CrawlOptions {
    pub subreddit: String,           // normalized lowercase, no "r/"
    pub checkpoint: u64,             // first flush threshold, also the flush interval
    pub minimum: u64,                // stop once more comments than this are collected
    pub out_dir: PathBuf,
    pub format: TableFormat,
    pub ranking: Ranking,
    pub final_flush: bool,           // flush leftovers when the run stops
    pub progress: bool,
    pub human_readable_timestamps: bool, // created_utc as RFC3339 in author_data
    pub write_buffer_bytes: usize,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            subreddit: String::new(),
            checkpoint: DEFAULT_CHECKPOINT,
            minimum: DEFAULT_MINIMUM,
            out_dir: PathBuf::from("./data"),
            format: TableFormat::Csv,
            ranking: Ranking::Top,
            final_flush: true,
            progress: true,
            human_readable_timestamps: false,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl CrawlOptions {
    pub fn new(subreddit: impl AsRef<str>) -> Self {
        Self::default().with_subreddit(subreddit)
    }
    pub fn with_subreddit(mut self, sub: impl AsRef<str>) -> Self {
        self.subreddit = normalize_subreddit(sub.as_ref());
        self
    }
    pub fn with_checkpoint(mut self, every: u64) -> Self {
        self.checkpoint = every;
        self
    }
    pub fn with_minimum(mut self, minimum: u64) -> Self {
        self.minimum = minimum;
        self
    }
    pub fn with_out_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.out_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_format(mut self, format: TableFormat) -> Self {
        self.format = format;
        self
    }
    pub fn with_ranking(mut self, ranking: Ranking) -> Self {
        self.ranking = ranking;
        self
    }
    pub fn with_final_flush(mut self, yes: bool) -> Self {
        self.final_flush = yes;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_human_timestamps(mut self, yes: bool) -> Self {
        self.human_readable_timestamps = yes;
        self
    }
    pub fn with_write_buffer(mut self, bytes: usize) -> Self {
        self.write_buffer_bytes = bytes.max(8 * 1024);
        self
    }

    /// Reject configurations that must never start a crawl.
    pub fn validate(&self) -> Result<()> {
        if self.subreddit.is_empty() {
            bail!("subreddit is required");
        }
        if self.checkpoint == 0 {
            bail!("checkpoint must be at least 1");
        }
        if self.minimum < self.checkpoint {
            bail!(
                "the minimum number of records ({}) has to be at least the checkpoint ({})",
                self.minimum,
                self.checkpoint
            );
        }
        Ok(())
    }
}

/// Lowercase, trim, and drop a leading "r/".
pub fn normalize_subreddit(s: &str) -> String {
    let s = s.trim().to_lowercase();
    match s.strip_prefix("r/") {
        Some(rest) => rest.to_string(),
        None => s,
    }
}
