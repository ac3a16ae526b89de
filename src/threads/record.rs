//! Normalized message records and the in-batch id index.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One fetched message, reduced to what thread resolution needs.
///
/// Records are built once at the fetch boundary and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message id, unique within a fetched batch.
    pub id: i32,
    /// Send time, always UTC.
    pub timestamp: DateTime<Utc>,
    /// Sender id as text; `None` when the platform gives no resolvable sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    /// Message text, possibly empty.
    #[serde(default)]
    pub text: String,
    /// Id of the message this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<i32>,
    /// Forum topic id, when the platform tags the message with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<i32>,
}

impl MessageRecord {
    /// Creates a record with no sender, empty text and no reply/topic links.
    pub fn new(id: i32, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            timestamp,
            sender_id: None,
            text: String::new(),
            reply_to: None,
            topic_id: None,
        }
    }

    #[must_use]
    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_reply_to(mut self, parent_id: i32) -> Self {
        self.reply_to = Some(parent_id);
        self
    }

    #[must_use]
    pub fn with_topic(mut self, topic_id: i32) -> Self {
        self.topic_id = Some(topic_id);
        self
    }

    /// UTC calendar day the message belongs to.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Trimmed text, or `None` when nothing but whitespace is left.
    pub fn trimmed_text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }
}

/// Lookup of records by message id within one fetched batch.
///
/// When ids repeat, the record seen last wins.
#[derive(Debug, Default)]
pub struct MessageIndex<'a> {
    by_id: HashMap<i32, &'a MessageRecord>,
}

impl<'a> MessageIndex<'a> {
    pub fn build(records: &'a [MessageRecord]) -> Self {
        let by_id = records.iter().map(|record| (record.id, record)).collect();
        Self { by_id }
    }

    pub fn get(&self, id: i32) -> Option<&'a MessageRecord> {
        self.by_id.get(&id).copied()
    }

    pub fn contains(&self, id: i32) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
