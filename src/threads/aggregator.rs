//! Per-day, per-thread aggregation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use tracing::debug;

use super::record::{MessageIndex, MessageRecord};
use super::resolver::{resolve, Resolution, ThreadKey, ThreadKind};

/// Sender id string that stands for "no sender".
pub const NO_SENDER: &str = "None";

/// Label-selection policy, picked once per run from the group type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupPolicy {
    /// Basic group: threads are reply chains.
    #[default]
    Plain,
    /// Supergroup: forum topics first, then reply chains.
    Forum,
}

impl GroupPolicy {
    pub fn for_group(is_supergroup: bool) -> Self {
        if is_supergroup {
            GroupPolicy::Forum
        } else {
            GroupPolicy::Plain
        }
    }

    /// Topic label offered by `msg` for a thread of the given kind.
    ///
    /// Both policies currently share the same preference order.
    fn label_candidate<'a>(
        self,
        kind: ThreadKind,
        msg: &'a MessageRecord,
        root: Option<&'a MessageRecord>,
    ) -> Option<&'a str> {
        match (self, kind) {
            // first non-empty text seen anywhere in the topic
            (GroupPolicy::Plain | GroupPolicy::Forum, ThreadKind::Topic) => msg.trimmed_text(),
            // text of the message the thread hangs off
            (GroupPolicy::Plain | GroupPolicy::Forum, ThreadKind::Reply | ThreadKind::Root) => {
                root.and_then(MessageRecord::trimmed_text)
            }
        }
    }
}

impl fmt::Display for GroupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupPolicy::Plain => write!(f, "plain group"),
            GroupPolicy::Forum => write!(f, "supergroup"),
        }
    }
}

/// Running statistics of one thread on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadStats {
    pub messages: usize,
    pub participants: BTreeSet<String>,
    pub topic_candidate: Option<String>,
}

impl ThreadStats {
    fn add(&mut self, msg: &MessageRecord, candidate: Option<&str>) {
        self.messages += 1;

        if let Some(sender) = msg.sender_id.as_deref() {
            if !sender.is_empty() && sender != NO_SENDER {
                self.participants.insert(sender.to_string());
            }
        }

        if self.topic_candidate.is_none() {
            self.topic_candidate = candidate.map(str::to_string);
        }
    }

    /// Distinct participants.
    pub fn users(&self) -> usize {
        self.participants.len()
    }
}

/// Threads of a single day, ordered by key.
pub type DayThreads = BTreeMap<ThreadKey, ThreadStats>;

/// Folded statistics for a whole batch, ordered by day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub days: BTreeMap<NaiveDate, DayThreads>,
}

impl Aggregation {
    pub fn thread_count(&self) -> usize {
        self.days.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Folds every record into per-day thread statistics.
///
/// Input order only matters for which text becomes a topic thread's label.
pub fn aggregate(records: &[MessageRecord], index: &MessageIndex<'_>, policy: GroupPolicy) -> Aggregation {
    let mut aggregation = Aggregation::default();

    for msg in records {
        let Resolution { key, root } = resolve(msg, index);
        let candidate = policy.label_candidate(key.kind, msg, root);

        aggregation
            .days
            .entry(msg.day())
            .or_default()
            .entry(key)
            .or_default()
            .add(msg, candidate);
    }

    debug!(
        days = aggregation.days.len(),
        threads = aggregation.thread_count(),
        %policy,
        "Aggregated messages"
    );

    aggregation
}
