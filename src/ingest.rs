use crate::records::{CommentRow, GildingRow};
use crate::resolver::{AuthorResolver, Resolution, SkipReason};
use crate::source::RawComment;
use crate::store::RecordStore;
use regex::Regex;
use std::sync::OnceLock;

/// What happened to one raw comment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    Recorded { gilded: bool },
    /// No body, or no usable author fullname.
    MissingField,
    AuthorSkipped(SkipReason),
}

/// Running counters, logged at each checkpoint and returned with the run summary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub seen: u64,
    pub recorded: u64,
    pub gilded: u64,
    pub new_authors: u64,
    pub missing_field: u64,
    pub deleted_author: u64,
    pub suspended_author: u64,
    pub unreadable_author: u64,
}

impl IngestStats {
    pub fn skipped(&self) -> u64 {
        self.missing_field + self.deleted_author + self.suspended_author + self.unreadable_author
    }
}

/// Author key from a `t2_<base36>` fullname.
pub fn author_id_from_fullname(fullname: &str) -> Option<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^t2_([0-9a-z]+)$").unwrap());
    re.captures(fullname).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// Applies the skip policy to raw comments and appends the surviving rows.
#[derive(Debug, Default)]
pub struct CommentIngester {
    resolver: AuthorResolver,
    stats: IngestStats,
}

impl CommentIngester {
    pub fn new(resolver: AuthorResolver) -> Self {
        Self { resolver, stats: IngestStats::default() }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// A comment is recorded whole (comment row, author if new, gilding if any) or not at all.
    pub fn ingest(&mut self, store: &mut RecordStore, comment: &RawComment) -> IngestOutcome {
        self.stats.seen += 1;
        let outcome = self.ingest_inner(store, comment);
        match outcome {
            IngestOutcome::Recorded { gilded } => {
                self.stats.recorded += 1;
                if gilded {
                    self.stats.gilded += 1;
                }
            }
            IngestOutcome::MissingField => self.stats.missing_field += 1,
            IngestOutcome::AuthorSkipped(SkipReason::Deleted) => self.stats.deleted_author += 1,
            IngestOutcome::AuthorSkipped(SkipReason::Suspended) => self.stats.suspended_author += 1,
            IngestOutcome::AuthorSkipped(SkipReason::Unreadable) => self.stats.unreadable_author += 1,
        }
        outcome
    }

    fn ingest_inner(&mut self, store: &mut RecordStore, comment: &RawComment) -> IngestOutcome {
        let Some(body) = comment.body.as_deref() else {
            return IngestOutcome::MissingField;
        };
        let Some(author_id) = comment.author_fullname.as_deref().and_then(author_id_from_fullname) else {
            return IngestOutcome::MissingField;
        };

        let author_id = match self.resolver.resolve(store, author_id, &comment.author) {
            Resolution::Skip(reason) => {
                tracing::debug!("dropping comment {}: author {}", comment.id, reason);
                return IngestOutcome::AuthorSkipped(reason);
            }
            Resolution::Created(id) => {
                self.stats.new_authors += 1;
                id
            }
            Resolution::Known(id) => id,
        };

        store.append_comment(CommentRow {
            comment_id: comment.id.clone(),
            body: body.to_string(),
            score: comment.score,
            author_id,
        });

        let gilded = comment.gilded > 0;
        if gilded {
            store.append_gilding(GildingRow {
                comment_id: comment.id.clone(),
                gilds: comment.gildings.clone(),
                gild_count: comment.gilded,
            });
        }
        IngestOutcome::Recorded { gilded }
    }
}
