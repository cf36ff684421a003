//! Row types for the three output tables and the `TableRow` abstraction the sink writes.

use crate::date::{apply_human_timestamp_in_place, rfc3339_from_epoch};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const COMMENT_TABLE: &str = "comment_data";
pub const AUTHOR_TABLE: &str = "author_data";
pub const GILDING_TABLE: &str = "gildings_data";

/// Per-flush rendering switches.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderOptions {
    pub human_timestamps: bool,
}

/// A uniform row of a named table: fixed header plus one cell per column.
pub trait TableRow: Serialize {
    const HEADER: &'static [&'static str];

    /// Cells in `HEADER` order, unquoted.
    fn cells(&self, opts: RenderOptions) -> Vec<String>;

    /// JSON object form, used by the JSONL writer.
    fn to_json(&self, _opts: RenderOptions) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommentRow {
    pub comment_id: String,
    pub body: String,
    pub score: i64,
    pub author_id: String,
}

impl TableRow for CommentRow {
    const HEADER: &'static [&'static str] = &["comment_id", "body", "score", "author_id"];

    fn cells(&self, _opts: RenderOptions) -> Vec<String> {
        vec![
            self.comment_id.clone(),
            self.body.clone(),
            self.score.to_string(),
            self.author_id.clone(),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuthorRow {
    pub author_id: String,
    pub comment_karma: i64,
    pub link_karma: i64,
    pub created_utc: f64,
    pub is_premium: bool,
}

impl TableRow for AuthorRow {
    const HEADER: &'static [&'static str] =
        &["author_id", "comment_karma", "link_karma", "created_utc", "is_premium"];

    fn cells(&self, opts: RenderOptions) -> Vec<String> {
        let created = if opts.human_timestamps {
            rfc3339_from_epoch(self.created_utc).unwrap_or_else(|| self.created_utc.to_string())
        } else {
            self.created_utc.to_string()
        };
        vec![
            self.author_id.clone(),
            self.comment_karma.to_string(),
            self.link_karma.to_string(),
            created,
            self.is_premium.to_string(),
        ]
    }

    fn to_json(&self, opts: RenderOptions) -> serde_json::Result<Value> {
        let mut v = serde_json::to_value(self)?;
        if opts.human_timestamps {
            if let Some(obj) = v.as_object_mut() {
                apply_human_timestamp_in_place(obj, "created_utc");
            }
        }
        Ok(v)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GildingRow {
    pub comment_id: String,
    pub gilds: BTreeMap<String, u64>,
    pub gild_count: u32,
}

impl TableRow for GildingRow {
    const HEADER: &'static [&'static str] = &["comment_id", "gilds", "gild_count"];

    fn cells(&self, _opts: RenderOptions) -> Vec<String> {
        // BTreeMap<String, u64> always serializes.
        let gilds = serde_json::to_string(&self.gilds).unwrap_or_else(|_| "{}".to_string());
        vec![self.comment_id.clone(), gilds, self.gild_count.to_string()]
    }
}
