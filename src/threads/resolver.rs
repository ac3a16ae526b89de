//! Canonical thread resolution.
//!
//! A message belongs to one of three kinds of thread:
//! - a forum topic, when it or any ancestor in the batch carries a topic id
//! - a reply chain, keyed by the topmost ancestor reachable inside the batch
//! - its own root thread, when it is not a reply
//!
//! A reply chain whose top ancestor is a plain (non-reply) message in the batch
//! is keyed as that message's root thread, so the root and its replies are counted
//! together.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::warn;

use super::record::{MessageIndex, MessageRecord};

/// Kind of thread a message was grouped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadKind {
    Topic,
    Reply,
    Root,
}

impl fmt::Display for ThreadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadKind::Topic => write!(f, "topic"),
            ThreadKind::Reply => write!(f, "reply"),
            ThreadKind::Root => write!(f, "root"),
        }
    }
}

/// Identity of a thread. Two messages share a thread iff their keys are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ThreadKey {
    pub kind: ThreadKind,
    pub id: i32,
}

impl ThreadKey {
    pub fn new(kind: ThreadKind, id: i32) -> Self {
        Self { kind, id }
    }

    pub fn topic(id: i32) -> Self {
        Self::new(ThreadKind::Topic, id)
    }

    pub fn reply(id: i32) -> Self {
        Self::new(ThreadKind::Reply, id)
    }

    pub fn root(id: i32) -> Self {
        Self::new(ThreadKind::Root, id)
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Result of resolving one message.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub key: ThreadKey,
    /// The message the thread hangs off, when it is part of the batch.
    pub root: Option<&'a MessageRecord>,
}

impl<'a> Resolution<'a> {
    fn new(key: ThreadKey, root: Option<&'a MessageRecord>) -> Self {
        Self { key, root }
    }
}

/// Resolves the canonical thread of `msg` using the records in `index`.
///
/// Climbing never leaves the batch: it stops at the first ancestor that was not
/// fetched. Each ancestor is visited at most once; malformed cyclic reply links
/// are keyed by the smallest id on the cycle, so every message on or hanging off
/// a cycle lands in the same thread.
pub fn resolve<'a>(msg: &'a MessageRecord, index: &MessageIndex<'a>) -> Resolution<'a> {
    if let Some(topic) = msg.topic_id {
        return Resolution::new(ThreadKey::topic(topic), index.get(topic));
    }

    let Some(parent_id) = msg.reply_to else {
        return Resolution::new(ThreadKey::root(msg.id), Some(msg));
    };

    let mut current = parent_id;
    let mut path = Vec::new();
    let mut visited = HashSet::new();

    while let Some(parent) = index.get(current) {
        if let Some(topic) = parent.topic_id {
            return Resolution::new(ThreadKey::topic(topic), Some(parent));
        }

        match parent.reply_to {
            None => return Resolution::new(ThreadKey::root(current), Some(parent)),
            Some(next) if index.contains(next) => {
                path.push(current);
                visited.insert(current);

                if visited.contains(&next) {
                    let start = path.iter().position(|&id| id == next).unwrap_or(0);
                    let anchor = path[start..].iter().copied().min().unwrap_or(next);
                    warn!(message_id = msg.id, anchor, "Reply chain cycle, stopping climb");
                    return Resolution::new(ThreadKey::reply(anchor), index.get(anchor));
                }
                current = next;
            }
            // Next ancestor was never fetched (older than the window).
            Some(_) => break,
        }
    }

    Resolution::new(ThreadKey::reply(current), index.get(current))
}
