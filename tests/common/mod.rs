#![allow(dead_code)]

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use subcrawl::{AuthorProfile, AuthorRef, RawComment, RenderOptions, Submission, TableRow, TableSink};

// ----------------------------- In-memory source ------------------------------------

/// Active author `name` whose fullname is `t2_<name>`.
pub fn active(name: &str) -> AuthorRef {
    AuthorRef::Active(AuthorProfile {
        name: name.to_string(),
        comment_karma: 100,
        link_karma: 10,
        created_utc: 1_136_073_600.0,
        is_premium: false,
    })
}

/// A plain, ungilded comment by `author` (fullname `t2_<author>`).
pub fn comment(id: &str, body: &str, author: &str) -> RawComment {
    RawComment {
        id: id.to_string(),
        body: Some(body.to_string()),
        score: 1,
        author_fullname: Some(format!("t2_{author}")),
        gilded: 0,
        gildings: BTreeMap::new(),
        author: active(author),
    }
}

pub fn gilded(mut c: RawComment, gilds: &[(&str, u64)]) -> RawComment {
    c.gildings = gilds.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    c.gilded = gilds.iter().map(|(_, v)| *v as u32).sum();
    c
}

/// Submission backed by a fixed comment list. Counts expansions in a shared cell.
pub struct MemSubmission {
    pub id: String,
    pub comments: Option<Vec<RawComment>>, // None = expansion fails
    pub expansions: Rc<Cell<usize>>,
}

impl Submission for MemSubmission {
    fn id(&self) -> &str {
        &self.id
    }
    fn expand_comments(&mut self) -> Result<Vec<RawComment>> {
        self.expansions.set(self.expansions.get() + 1);
        self.comments.clone().ok_or_else(|| anyhow!("thread {} unavailable", self.id))
    }
}

pub fn submission(id: &str, comments: Vec<RawComment>, expansions: &Rc<Cell<usize>>) -> MemSubmission {
    MemSubmission { id: id.to_string(), comments: Some(comments), expansions: Rc::clone(expansions) }
}

pub fn failing_submission(id: &str, expansions: &Rc<Cell<usize>>) -> MemSubmission {
    MemSubmission { id: id.to_string(), comments: None, expansions: Rc::clone(expansions) }
}

/// `n` submissions `s0..` with `per` comments each, every comment by its own author.
pub fn uniform_feed(n: usize, per: usize, expansions: &Rc<Cell<usize>>) -> Vec<MemSubmission> {
    (0..n)
        .map(|s| {
            let comments = (0..per)
                .map(|c| comment(&format!("c{s}x{c}"), "text", &format!("u{s}x{c}")))
                .collect();
            submission(&format!("s{s}"), comments, expansions)
        })
        .collect()
}

// ----------------------------- Recording sink ------------------------------------

/// One table write: name plus rows as JSON.
#[derive(Clone, Debug)]
pub struct TableWrite {
    pub name: String,
    pub rows: Vec<Value>,
}

#[derive(Default, Debug)]
pub struct RecordingSink {
    pub writes: Vec<TableWrite>,
}

impl RecordingSink {
    /// Row counts of the comment table at each flush, in order.
    pub fn comment_flush_sizes(&self) -> Vec<usize> {
        self.writes
            .iter()
            .filter(|w| w.name == subcrawl::COMMENT_TABLE)
            .map(|w| w.rows.len())
            .collect()
    }

    pub fn last(&self, name: &str) -> Option<&TableWrite> {
        self.writes.iter().rev().find(|w| w.name == name)
    }
}

impl TableSink for RecordingSink {
    fn write_table<R: TableRow>(&mut self, name: &str, rows: &[R]) -> Result<()> {
        let rows = rows
            .iter()
            .map(|r| r.to_json(RenderOptions::default()))
            .collect::<serde_json::Result<Vec<_>>>()?;
        self.writes.push(TableWrite { name: name.to_string(), rows });
        Ok(())
    }
}

// ----------------------------- Snapshot fixtures ------------------------------------

pub fn write_text(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

pub fn write_lines(path: &Path, lines: &[Value]) {
    let text: String = lines.iter().map(|l| format!("{l}\n")).collect();
    write_text(path, &text);
}

/// Same as `write_text` but zstd-compressed.
pub fn write_zst(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let mut enc = zstd::stream::write::Encoder::new(f, 3).unwrap();
    enc.write_all(text.as_bytes()).unwrap();
    enc.finish().unwrap();
}

/// A `t1` thing. `replies` is a list of things (empty list renders as "").
pub fn t1(id: &str, parent: &str, author: &str, body: &str, gilded: u32, replies: Vec<Value>) -> Value {
    let replies = if replies.is_empty() {
        json!("")
    } else {
        json!({"kind": "Listing", "data": {"children": replies}})
    };
    let gildings = if gilded > 0 { json!({"gid_2": gilded}) } else { json!({}) };
    json!({
        "kind": "t1",
        "data": {
            "id": id, "parent_id": parent, "author": author,
            "author_fullname": format!("t2_{}", author.to_lowercase()),
            "body": body, "score": 3, "gilded": gilded, "gildings": gildings,
            "replies": replies
        }
    })
}

pub fn more(parent: &str, children: &[&str]) -> Value {
    json!({"kind": "more", "data": {"id": "_", "parent_id": parent, "children": children}})
}

/// `/comments/<id>.json` shape: `[post_listing, comment_listing]`.
pub fn thread_doc(submission: &str, children: Vec<Value>) -> Value {
    json!([
        {"kind": "Listing", "data": {"children": [{"kind": "t3", "data": {"id": submission}}]}},
        {"kind": "Listing", "data": {"children": children}}
    ])
}

pub fn account(name: &str, comment_karma: i64) -> Value {
    json!({
        "name": name, "id": name.to_lowercase(),
        "comment_karma": comment_karma, "link_karma": 5,
        "created_utc": 1_136_073_600.0, "is_gold": false
    })
}

/// Snapshot for r/rust with:
/// - s1 (score 50): alice's c1 with reply c2 (bob, suspended) and a "more" placeholder [c5, c6];
///   carol's c3 (ghost account); a top-level "more" [c4, c7]. Expansion file supplies c4..c7.
/// - s2 (score 90): dave's gilded d1 and a `[deleted]` d2; thread stored zstd-compressed.
/// - s3 (score 10): no thread file.
/// - o1 in r/other, never yielded.
pub fn make_snapshot_basic() -> PathBuf {
    let base = tempfile::tempdir().unwrap().into_path();

    write_lines(
        &base.join("submissions.jsonl"),
        &[
            json!({"id": "s1", "subreddit": "rust", "score": 50, "created_utc": 1_136_073_700.0, "title": "one"}),
            json!({"id": "o1", "subreddit": "other", "score": 999, "created_utc": 1_136_073_900.0, "title": "other"}),
            json!({"id": "s2", "subreddit": "Rust", "score": 90, "created_utc": 1_136_073_600.0, "title": "two"}),
            json!({"id": "s3", "subreddit": "rust", "score": 10, "created_utc": 1_136_073_800.0, "title": "three"}),
        ],
    );

    write_lines(
        &base.join("users.jsonl"),
        &[
            account("alice", 120),
            json!({"name": "bob", "is_suspended": true}),
            json!({"name": "carol"}),
            account("dave", 7),
            account("erin", 33),
        ],
    );

    let s1 = thread_doc(
        "s1",
        vec![
            t1("c1", "t3_s1", "alice", "first", 0, vec![
                t1("c2", "t1_c1", "bob", "reply", 0, vec![]),
                more("t1_c1", &["c5", "c6"]),
            ]),
            t1("c3", "t3_s1", "carol", "ghost", 0, vec![]),
            more("t3_s1", &["c4", "c7"]),
        ],
    );
    write_text(&base.join("threads").join("s1.json"), &s1.to_string());
    write_lines(
        &base.join("more").join("s1.jsonl"),
        &[
            t1("c4", "t3_s1", "erin", "late top-level", 0, vec![]),
            t1("c5", "t1_c1", "alice", "late reply", 0, vec![]),
            t1("c6", "t1_c5", "erin", "nested late reply", 0, vec![]),
            t1("c7", "t1_c4", "alice", "reply to late", 0, vec![]),
        ],
    );

    let s2 = thread_doc(
        "s2",
        vec![
            t1("d1", "t3_s2", "dave", "say \"hi\", ok", 2, vec![]),
            t1("d2", "t3_s2", "[deleted]", "[deleted]", 0, vec![]),
        ],
    );
    write_zst(&base.join("threads").join("s2.json.zst"), &s2.to_string());

    base
}

/// Read a CSV produced by the file sink into header + rows of raw lines (no embedded newlines).
pub fn read_csv_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}

pub fn read_jsonl(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}
