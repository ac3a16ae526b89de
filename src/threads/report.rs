//! Thread summaries, discussion filter and the final JSON document.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::aggregator::{Aggregation, ThreadStats};
use super::record::{MessageIndex, MessageRecord};
use super::resolver::{ThreadKey, ThreadKind};
use crate::error::{Error, Result};

/// Label used when a thread has no usable text.
pub const NO_TEXT_PLACEHOLDER: &str = "[No text]";

/// Maximum topic label length, in characters.
pub const MAX_TOPIC_CHARS: usize = 200;

/// Threads with this many messages or fewer are not discussions.
pub const DISCUSSION_THRESHOLD: usize = 1;

/// Display label written into the document. It does not shift day boundaries:
/// messages are always bucketed by UTC calendar day.
pub const DEFAULT_TIMEZONE: &str = "Asia/Tashkent";

/// One thread line in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub topic: String,
    pub messages: usize,
    pub users: usize,
}

/// Thread summaries per UTC day, each day sorted by message count, descending.
pub type DailySummaries = BTreeMap<NaiveDate, Vec<ThreadSummary>>;

/// Replaces line breaks with spaces and cuts the label to [`MAX_TOPIC_CHARS`].
pub fn sanitize_topic(text: &str) -> String {
    text.chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(MAX_TOPIC_CHARS)
        .collect()
}

fn thread_label(key: &ThreadKey, stats: &ThreadStats, index: &MessageIndex<'_>) -> String {
    let label = stats
        .topic_candidate
        .as_deref()
        .filter(|text| !text.is_empty())
        .or_else(|| match key.kind {
            ThreadKind::Reply => index.get(key.id).and_then(MessageRecord::trimmed_text),
            ThreadKind::Topic | ThreadKind::Root => None,
        })
        .unwrap_or(NO_TEXT_PLACEHOLDER);

    sanitize_topic(label)
}

/// Turns aggregated statistics into labelled summaries.
///
/// Ties on message count keep thread key order (topics, then replies, then roots,
/// each by id), so equal inputs always give equal output.
pub fn summarize(aggregation: &Aggregation, index: &MessageIndex<'_>) -> DailySummaries {
    aggregation
        .days
        .iter()
        .map(|(day, threads)| {
            let mut summaries: Vec<ThreadSummary> = threads
                .iter()
                .map(|(key, stats)| ThreadSummary {
                    topic: thread_label(key, stats, index),
                    messages: stats.messages,
                    users: stats.users(),
                })
                .collect();
            // stable: ties stay in key order
            summaries.sort_by(|a, b| b.messages.cmp(&a.messages));
            (*day, summaries)
        })
        .collect()
}

/// Keeps only threads with more than [`DISCUSSION_THRESHOLD`] messages and drops
/// days left empty.
pub fn filter_discussed(days: DailySummaries) -> DailySummaries {
    days.into_iter()
        .filter_map(|(day, threads)| {
            let before = threads.len();
            let kept: Vec<ThreadSummary> = threads
                .into_iter()
                .filter(|thread| thread.messages > DISCUSSION_THRESHOLD)
                .collect();
            debug!(%day, before, after = kept.len(), "Filtered threads");
            (!kept.is_empty()).then_some((day, kept))
        })
        .collect()
}

/// Threads of one day in the final document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub threads: Vec<ThreadSummary>,
}

/// The document written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadReport {
    /// Display label only, see [`DEFAULT_TIMEZONE`].
    pub timezone: String,
    pub days: Vec<DayReport>,
}

impl ThreadReport {
    /// Shapes filtered summaries into the document, days ascending.
    ///
    /// Topics are taken as they are; [`summarize`] has already sanitized them.
    pub fn new(days: DailySummaries, timezone: impl Into<String>) -> Self {
        let days = days
            .into_iter()
            .map(|(date, threads)| DayReport { date, threads })
            .collect();

        Self {
            timezone: timezone.into(),
            days,
        }
    }

    pub fn thread_count(&self) -> usize {
        self.days.iter().map(|day| day.threads.len()).sum()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the document as pretty-printed UTF-8 JSON.
    ///
    /// The report stays usable after a failed write, so callers may retry.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        fs::write(path, json).map_err(|source| Error::OutputWrite {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), days = self.days.len(), "Saved thread report");
        Ok(())
    }
}
