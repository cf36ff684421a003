mod config;
mod date;
mod util;
mod zstd_jsonl;
mod progress;

mod records;
mod store;
mod resolver;
mod ingest;
mod checkpoint;
mod sink;
mod driver;

pub mod source;

pub use crate::config::{normalize_subreddit, CrawlOptions, Ranking, TableFormat, DEFAULT_CHECKPOINT, DEFAULT_MINIMUM};
pub use crate::records::{
    AuthorRow, CommentRow, GildingRow, RenderOptions, TableRow, AUTHOR_TABLE, COMMENT_TABLE, GILDING_TABLE,
};
pub use crate::store::RecordStore;
pub use crate::resolver::{AuthorResolver, Resolution, SkipReason};
pub use crate::ingest::{author_id_from_fullname, CommentIngester, IngestOutcome, IngestStats};
pub use crate::checkpoint::{Checkpoint, Checkpointer};
pub use crate::sink::{FileSink, TableSink};
pub use crate::driver::{status_line, CollectionDriver, RunSummary, StopReason};
pub use crate::source::{AuthorProfile, AuthorRef, RawComment, SnapshotSource, SnapshotSubmission, Submission};

// Logging and time helpers for the binary.
pub use crate::util::init_tracing_once;
pub use crate::date::as_hours;
