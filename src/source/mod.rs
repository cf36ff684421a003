//! Data-source boundary: what the crawler needs from a forum, independent of how it is fetched.
//!
//! Everything dynamic about a comment's author (deleted, suspended, unreadable) is decided
//! here, once, so the ingest path only ever branches on [`AuthorRef`].

mod snapshot;
mod thread;

pub use snapshot::{SnapshotSource, SnapshotSubmission};

use anyhow::Result;
use std::collections::BTreeMap;

/// Attributes read from a live account.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorProfile {
    pub name: String,
    pub comment_karma: i64,
    pub link_karma: i64,
    pub created_utc: f64,
    pub is_premium: bool,
}

/// A comment's author as seen by the source.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthorRef {
    Active(AuthorProfile),
    Suspended,
    /// Account removed; the comment shows `[deleted]`.
    Deleted,
    /// The account id looks valid but its attributes cannot be read.
    Unreadable { reason: String },
}

/// One comment out of a flattened thread.
#[derive(Clone, Debug, PartialEq)]
pub struct RawComment {
    pub id: String,
    pub body: Option<String>,
    pub score: i64,
    /// `t2_<id>` fullname of the author account.
    pub author_fullname: Option<String>,
    pub gilded: u32,
    pub gildings: BTreeMap<String, u64>,
    pub author: AuthorRef,
}

/// A top-level post whose comment tree can be expanded on demand.
pub trait Submission {
    fn id(&self) -> &str;

    /// Full breadth-first flattening of the comment tree, every "load more" placeholder resolved.
    fn expand_comments(&mut self) -> Result<Vec<RawComment>>;
}
