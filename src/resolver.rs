use crate::records::AuthorRow;
use crate::source::AuthorRef;
use crate::store::RecordStore;
use std::fmt;

/// Why an author (and therefore the comment) was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    Deleted,
    Suspended,
    Unreadable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::Deleted => "deleted",
            SkipReason::Suspended => "suspended",
            SkipReason::Unreadable => "unreadable",
        };
        f.write_str(s)
    }
}

/// Result of resolving a comment's author.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Already in the author table; attributes were not read again.
    Known(String),
    /// New author row appended.
    Created(String),
    Skip(SkipReason),
}

impl Resolution {
    pub fn author_id(&self) -> Option<&str> {
        match self {
            Resolution::Known(id) | Resolution::Created(id) => Some(id),
            Resolution::Skip(_) => None,
        }
    }
}

/// Turns author references into author-table keys, inserting each author at most once.
#[derive(Debug, Default)]
pub struct AuthorResolver;

impl AuthorResolver {
    pub fn new() -> Self {
        Self
    }

    /// `author_id` is the fullname-derived key the comment row will carry.
    pub fn resolve(&self, store: &mut RecordStore, author_id: &str, author: &AuthorRef) -> Resolution {
        match author {
            AuthorRef::Deleted => Resolution::Skip(SkipReason::Deleted),
            AuthorRef::Suspended => Resolution::Skip(SkipReason::Suspended),
            _ if store.has_author(author_id) => Resolution::Known(author_id.to_string()),
            AuthorRef::Unreadable { reason } => {
                tracing::warn!("skipping author {}: {}", author_id, reason);
                Resolution::Skip(SkipReason::Unreadable)
            }
            AuthorRef::Active(profile) => {
                store.append_author(AuthorRow {
                    author_id: author_id.to_string(),
                    comment_karma: profile.comment_karma,
                    link_karma: profile.link_karma,
                    created_utc: profile.created_utc,
                    is_premium: profile.is_premium,
                });
                Resolution::Created(author_id.to_string())
            }
        }
    }
}
