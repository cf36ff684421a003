//! Comment-tree parsing, "load more" expansion and breadth-first flattening for
//! `/comments/<id>.json`-shaped thread documents.

use ahash::{AHashMap, AHashSet};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// The `data` payload of a `t1` thing, minus its nested replies.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CommentData {
    pub id: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_fullname: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub gilded: Option<u32>,
    #[serde(default)]
    pub gildings: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    replies: Value,
}

/// The `data` payload of a `more` placeholder.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct MoreData {
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct CommentNode {
    pub data: CommentData,
    pub replies: Vec<Node>,
}

#[derive(Debug)]
pub(crate) enum Node {
    Comment(CommentNode),
    More(MoreData),
}

#[derive(Deserialize)]
struct RawThing {
    kind: String,
    #[serde(default)]
    data: Value,
}

fn parse_thing(v: Value) -> Result<Option<Node>> {
    let thing: RawThing = serde_json::from_value(v)?;
    match thing.kind.as_str() {
        "t1" => {
            let mut data: CommentData = serde_json::from_value(thing.data)?;
            let replies = match std::mem::take(&mut data.replies) {
                v @ Value::Object(_) => parse_listing(v)?,
                _ => Vec::new(), // "" when there are no replies
            };
            Ok(Some(Node::Comment(CommentNode { data, replies })))
        }
        "more" => Ok(Some(Node::More(serde_json::from_value(thing.data)?))),
        other => {
            tracing::debug!("ignoring '{}' thing inside comment listing", other);
            Ok(None)
        }
    }
}

/// A malformed child is logged and skipped; only a listing without `data.children` is an error.
fn parse_listing(mut v: Value) -> Result<Vec<Node>> {
    let children = match v.pointer_mut("/data/children").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => return Err(anyhow!("comment listing has no data.children array")),
    };
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        let id = child.pointer("/data/id").and_then(Value::as_str).unwrap_or("?").to_string();
        match parse_thing(child) {
            Ok(Some(node)) => out.push(node),
            Ok(None) => {}
            Err(e) => tracing::warn!("skipping malformed comment {}: {:#}", id, e),
        }
    }
    Ok(out)
}

/// Parse a thread document: either `[post_listing, comment_listing]` or a bare comment listing.
pub(crate) fn parse_thread(doc: Value) -> Result<Vec<Node>> {
    match doc {
        Value::Array(mut parts) => {
            let comments = parts.pop().ok_or_else(|| anyhow!("empty thread document"))?;
            parse_listing(comments)
        }
        v @ Value::Object(_) => parse_listing(v),
        _ => Err(anyhow!("thread document is neither an array nor a listing")),
    }
}

enum Entry {
    Comment(String),
    More(MoreData),
}

/// Things fetched for "load more" placeholders, indexed by id and by parent fullname.
#[derive(Default)]
pub(crate) struct MoreStore {
    comments: AHashMap<String, CommentData>,
    children_of: AHashMap<String, Vec<Entry>>,
}

impl MoreStore {
    /// Index one JSONL line (a `t1` or `more` thing). Unknown kinds are ignored.
    pub fn add_line(&mut self, line: &str) -> Result<()> {
        let v: Value = serde_json::from_str(line)?;
        match parse_thing(v)? {
            Some(Node::Comment(node)) => {
                let data = node.data;
                if let Some(parent) = data.parent_id.clone() {
                    self.children_of.entry(parent).or_default().push(Entry::Comment(data.id.clone()));
                }
                self.comments.insert(data.id.clone(), data);
            }
            Some(Node::More(more)) => {
                if let Some(parent) = more.parent_id.clone() {
                    self.children_of.entry(parent).or_default().push(Entry::More(more));
                }
            }
            None => {}
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }
}

/// Counters for one expansion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExpandStats {
    pub expanded: usize,
    pub missing: usize,
}

struct Expander<'a> {
    store: &'a MoreStore,
    seen: AHashSet<String>,
    // placeholders from the store already followed, by (parent fullname, position)
    followed: AHashSet<(String, usize)>,
    stats: ExpandStats,
}

impl<'a> Expander<'a> {
    fn expand(&mut self, nodes: Vec<Node>) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Comment(mut c) => {
                    let replies = std::mem::take(&mut c.replies);
                    c.replies = self.expand(replies);
                    let fullname = format!("t1_{}", c.data.id);
                    self.attach_pending(&fullname, &mut c.replies);
                    out.push(Node::Comment(c));
                }
                Node::More(more) => self.expand_more(more, &mut out),
            }
        }
        out
    }

    /// Replace a placeholder by its direct children (each with descendants attached),
    /// then by any listed id whose parent never came up, then by whatever else the
    /// store holds under the same parent (follow-up placeholders included).
    fn expand_more(&mut self, more: MoreData, out: &mut Vec<Node>) {
        let store = self.store;
        let is_direct = |c: &CommentData| more.parent_id.is_none() || c.parent_id == more.parent_id;
        for pass_direct in [true, false] {
            for id in &more.children {
                if self.seen.contains(id) {
                    continue;
                }
                match store.comments.get(id) {
                    Some(c) if is_direct(c) == pass_direct => {
                        if let Some(node) = self.build(id) {
                            out.push(node);
                        }
                    }
                    Some(_) => {}
                    None if pass_direct => {
                        tracing::debug!("'load more' child {} not found in snapshot", id);
                        self.stats.missing += 1;
                    }
                    None => {}
                }
            }
        }
        if let Some(parent) = &more.parent_id {
            self.attach_pending(parent, out);
        }
    }

    /// Append every unseen comment and unfollowed placeholder the store holds under `parent`.
    fn attach_pending(&mut self, parent: &str, out: &mut Vec<Node>) {
        let store = self.store;
        let Some(entries) = store.children_of.get(parent) else {
            return;
        };
        for (pos, entry) in entries.iter().enumerate() {
            match entry {
                Entry::Comment(id) => {
                    if let Some(node) = self.build(id) {
                        out.push(node);
                    }
                }
                Entry::More(more) => {
                    if self.followed.insert((parent.to_string(), pos)) {
                        self.expand_more(more.clone(), out);
                    }
                }
            }
        }
    }

    fn build(&mut self, id: &str) -> Option<Node> {
        if !self.seen.insert(id.to_string()) {
            return None;
        }
        let data = self.store.comments.get(id)?.clone();
        self.stats.expanded += 1;
        let mut replies = Vec::new();
        self.attach_pending(&format!("t1_{id}"), &mut replies);
        Some(Node::Comment(CommentNode { data, replies }))
    }
}

fn collect_ids(nodes: &[Node], into: &mut AHashSet<String>) {
    for node in nodes {
        if let Node::Comment(c) = node {
            into.insert(c.data.id.clone());
            collect_ids(&c.replies, into);
        }
    }
}

/// Resolve every `more` placeholder against `store`. A comment id never appears twice.
pub(crate) fn expand_more(nodes: Vec<Node>, store: &MoreStore) -> (Vec<Node>, ExpandStats) {
    let mut seen = AHashSet::new();
    collect_ids(&nodes, &mut seen);
    let mut ex = Expander { store, seen, followed: AHashSet::new(), stats: ExpandStats::default() };
    let out = ex.expand(nodes);
    (out, ex.stats)
}

/// Breadth-first flattening: all top-level comments, then their replies level by level.
/// Unexpanded placeholders are dropped.
pub(crate) fn flatten(nodes: Vec<Node>) -> Vec<CommentData> {
    let mut queue: VecDeque<Node> = nodes.into();
    let mut out = Vec::new();
    while let Some(node) = queue.pop_front() {
        if let Node::Comment(c) = node {
            out.push(c.data);
            queue.extend(c.replies);
        }
    }
    out
}
