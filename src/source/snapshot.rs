//! Offline snapshot of API responses on disk, served as a ranked submission feed.
//!
//! Layout (each file optionally `.zst` compressed):
//!   submissions.jsonl        one submission per line
//!   threads/<id>.json        `/comments/<id>.json` response
//!   more/<id>.jsonl          things returned when expanding "load more" placeholders
//!   users.jsonl              one account per line

use super::thread::{expand_more, flatten, parse_thread, CommentData, MoreStore};
use super::{AuthorProfile, AuthorRef, RawComment, Submission};
use crate::config::{normalize_subreddit, Ranking};
use crate::zstd_jsonl::{for_each_line, read_to_string};
use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use walkdir::WalkDir;

const READ_BUF: usize = 256 * 1024;

#[derive(Clone, Debug, Deserialize)]
struct SubmissionRecord {
    id: String,
    #[serde(default)]
    subreddit: Option<String>,
    #[serde(default)]
    score: Option<i64>,
    #[serde(default)]
    created_utc: Option<f64>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct AccountRecord {
    name: String,
    #[serde(default)]
    comment_karma: Option<i64>,
    #[serde(default)]
    link_karma: Option<i64>,
    #[serde(default)]
    created_utc: Option<f64>,
    #[serde(default)]
    is_gold: Option<bool>,
    #[serde(default)]
    is_suspended: Option<bool>,
}

/// Lookups shared by every submission of one snapshot.
struct SnapshotIndex {
    threads: BTreeMap<String, PathBuf>,
    more: BTreeMap<String, PathBuf>,
    accounts: AHashMap<String, AccountRecord>, // keyed by lowercase name
}

impl SnapshotIndex {
    fn author_ref(&self, author: Option<&str>) -> AuthorRef {
        let name = match author.map(str::trim) {
            None | Some("") | Some("[deleted]") => return AuthorRef::Deleted,
            Some(n) => n,
        };
        let Some(acct) = self.accounts.get(&name.to_lowercase()) else {
            return AuthorRef::Unreadable { reason: format!("account '{name}' not found") };
        };
        if acct.is_suspended == Some(true) {
            return AuthorRef::Suspended;
        }
        match (acct.comment_karma, acct.link_karma, acct.created_utc) {
            (Some(comment_karma), Some(link_karma), Some(created_utc)) => AuthorRef::Active(AuthorProfile {
                name: acct.name.clone(),
                comment_karma,
                link_karma,
                created_utc,
                is_premium: acct.is_gold.unwrap_or(false),
            }),
            _ => AuthorRef::Unreadable { reason: format!("attributes of account '{name}' unavailable") },
        }
    }

    fn raw_comment(&self, c: CommentData) -> RawComment {
        let author = self.author_ref(c.author.as_deref());
        RawComment {
            id: c.id,
            body: c.body,
            score: c.score.unwrap_or(0),
            author_fullname: c.author_fullname,
            gilded: c.gilded.unwrap_or(0),
            gildings: c.gildings.unwrap_or_default(),
            author,
        }
    }
}

/// Map `<id><suffix>[.zst]` files directly under `dir` to their id.
fn discover_by_id(dir: &Path, suffix: &str) -> BTreeMap<String, PathBuf> {
    let re = Regex::new(&format!(r"^([0-9a-z]+){}(\.zst)?$", regex::escape(suffix)))
        .expect("static pattern");
    let mut map = BTreeMap::new();
    if !dir.exists() {
        return map;
    }
    for ent in WalkDir::new(dir).min_depth(1).max_depth(1).into_iter().flatten() {
        if let Some(name) = ent.file_name().to_str() {
            if let Some(caps) = re.captures(name) {
                map.insert(caps[1].to_string(), ent.path().to_path_buf());
            }
        }
    }
    map
}

/// `root/name` or `root/name.zst`, whichever exists (plain wins).
fn find_variant(root: &Path, name: &str) -> Option<PathBuf> {
    let plain = root.join(name);
    if plain.exists() {
        return Some(plain);
    }
    let zst = root.join(format!("{name}.zst"));
    zst.exists().then_some(zst)
}

/// Ranked feed of one subreddit's submissions from a snapshot directory.
pub struct SnapshotSource {
    index: Rc<SnapshotIndex>,
    queue: std::vec::IntoIter<SubmissionRecord>,
}

impl SnapshotSource {
    pub fn open(root: &Path, subreddit: &str, ranking: Ranking) -> Result<Self> {
        let subreddit = normalize_subreddit(subreddit);
        let subs_path = find_variant(root, "submissions.jsonl")
            .ok_or_else(|| anyhow!("no submissions.jsonl[.zst] under {}", root.display()))?;

        let mut records = Vec::new();
        let mut bad_lines = 0usize;
        for_each_line(&subs_path, READ_BUF, |line| {
            match serde_json::from_str::<SubmissionRecord>(line) {
                Ok(rec) => {
                    let matches = rec.subreddit.as_deref().map(normalize_subreddit).as_deref() == Some(subreddit.as_str());
                    if matches {
                        records.push(rec);
                    }
                }
                Err(_) => bad_lines += 1,
            }
            Ok(())
        })?;
        if bad_lines > 0 {
            tracing::warn!("skipped {} unparseable lines in {}", bad_lines, subs_path.display());
        }

        // sort_by is stable: ties keep file order
        match ranking {
            Ranking::Top => records.sort_by(|a, b| b.score.unwrap_or(0).cmp(&a.score.unwrap_or(0))),
            Ranking::New => records.sort_by(|a, b| {
                b.created_utc
                    .unwrap_or(0.0)
                    .total_cmp(&a.created_utc.unwrap_or(0.0))
            }),
            Ranking::Listed => {}
        }

        let mut accounts = AHashMap::new();
        if let Some(users_path) = find_variant(root, "users.jsonl") {
            for_each_line(&users_path, READ_BUF, |line| {
                match serde_json::from_str::<AccountRecord>(line) {
                    Ok(acct) => {
                        accounts.insert(acct.name.to_lowercase(), acct);
                    }
                    Err(e) => tracing::warn!("skipping account line in {}: {}", users_path.display(), e),
                }
                Ok(())
            })?;
        } else {
            tracing::warn!("no users.jsonl under {}; every author will be unreadable", root.display());
        }

        let index = SnapshotIndex {
            threads: discover_by_id(&root.join("threads"), ".json"),
            more: discover_by_id(&root.join("more"), ".jsonl"),
            accounts,
        };
        tracing::info!(
            "snapshot r/{}: {} submissions ranked by {}, {} threads, {} accounts",
            subreddit,
            records.len(),
            ranking,
            index.threads.len(),
            index.accounts.len()
        );

        Ok(Self { index: Rc::new(index), queue: records.into_iter() })
    }
}

impl Iterator for SnapshotSource {
    type Item = SnapshotSubmission;

    fn next(&mut self) -> Option<Self::Item> {
        let rec = self.queue.next()?;
        Some(SnapshotSubmission { id: rec.id, title: rec.title, index: Rc::clone(&self.index) })
    }
}

pub struct SnapshotSubmission {
    id: String,
    title: Option<String>,
    index: Rc<SnapshotIndex>,
}

impl SnapshotSubmission {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

impl Submission for SnapshotSubmission {
    fn id(&self) -> &str {
        &self.id
    }

    fn expand_comments(&mut self) -> Result<Vec<RawComment>> {
        let path = self
            .index
            .threads
            .get(&self.id)
            .ok_or_else(|| anyhow!("no thread file for submission {}", self.id))?;
        let text = read_to_string(path, READ_BUF)?;
        let doc: Value = serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
        let tree = parse_thread(doc).with_context(|| format!("thread {}", path.display()))?;

        let mut more = MoreStore::default();
        if let Some(more_path) = self.index.more.get(&self.id) {
            for_each_line(more_path, READ_BUF, |line| {
                if let Err(e) = more.add_line(line) {
                    tracing::warn!("skipping 'load more' line in {}: {}", more_path.display(), e);
                }
                Ok(())
            })?;
        }
        let (tree, stats) = expand_more(tree, &more);
        if stats.missing > 0 {
            tracing::warn!(
                "submission {}: {} 'load more' children missing ({} of {} expanded)",
                self.id,
                stats.missing,
                stats.expanded,
                more.len()
            );
        }

        let index = &self.index;
        Ok(flatten(tree).into_iter().map(|c| index.raw_comment(c)).collect())
    }
}
