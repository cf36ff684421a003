use crate::records::{AuthorRow, CommentRow, GildingRow};
use ahash::AHashSet;

/// Append-only tables for one run, plus the seen-id sets that keep them duplicate-free.
///
/// Rows are never mutated or removed; membership checks are hash lookups.
#[derive(Debug, Default)]
pub struct RecordStore {
    comments: Vec<CommentRow>,
    authors: Vec<AuthorRow>,
    gildings: Vec<GildingRow>,
    author_ids: AHashSet<String>,
    submission_ids: AHashSet<String>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_comment(&mut self, row: CommentRow) {
        self.comments.push(row);
    }

    /// Appends the row and records its id. Callers check `has_author` first;
    /// a repeated id is ignored so the table keeps one row per author.
    pub fn append_author(&mut self, row: AuthorRow) {
        if self.author_ids.insert(row.author_id.clone()) {
            self.authors.push(row);
        } else {
            tracing::debug!("author {} already stored; row ignored", row.author_id);
        }
    }

    pub fn append_gilding(&mut self, row: GildingRow) {
        self.gildings.push(row);
    }

    #[inline]
    pub fn has_author(&self, author_id: &str) -> bool {
        self.author_ids.contains(author_id)
    }

    #[inline]
    pub fn has_submission(&self, submission_id: &str) -> bool {
        self.submission_ids.contains(submission_id)
    }

    pub fn mark_submission_seen(&mut self, submission_id: &str) {
        self.submission_ids.insert(submission_id.to_string());
    }

    #[inline]
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }

    pub fn author_count(&self) -> usize {
        self.authors.len()
    }

    pub fn gilding_count(&self) -> usize {
        self.gildings.len()
    }

    pub fn submission_count(&self) -> usize {
        self.submission_ids.len()
    }

    pub fn comments(&self) -> &[CommentRow] {
        &self.comments
    }

    pub fn authors(&self) -> &[AuthorRow] {
        &self.authors
    }

    pub fn gildings(&self) -> &[GildingRow] {
        &self.gildings
    }
}
