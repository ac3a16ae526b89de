//! Thread resolution and the weekly digest pipeline.
//!
//! Everything here is pure and synchronous: a batch of [`MessageRecord`]s and a
//! [`GroupPolicy`] go in, a [`ThreadReport`] comes out. Fetching and writing are
//! done by the caller.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use telegram_threads::threads::{build_report, GroupPolicy, MessageRecord};
//!
//! let t = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
//! let records = vec![
//!     MessageRecord::new(1, t).with_sender("10").with_text("hi"),
//!     MessageRecord::new(2, t).with_sender("20").with_reply_to(1),
//! ];
//!
//! let report = build_report(&records, GroupPolicy::Plain, "UTC");
//! assert_eq!(report.days[0].threads[0].topic, "hi");
//! assert_eq!(report.days[0].threads[0].users, 2);
//! ```

pub mod aggregator;
pub mod record;
pub mod report;
pub mod resolver;

pub use aggregator::{aggregate, Aggregation, GroupPolicy, ThreadStats};
pub use record::{MessageIndex, MessageRecord};
pub use report::{
    filter_discussed, sanitize_topic, summarize, DailySummaries, DayReport, ThreadReport,
    ThreadSummary, DEFAULT_TIMEZONE, MAX_TOPIC_CHARS,
};
pub use resolver::{resolve, Resolution, ThreadKey, ThreadKind};

/// Runs aggregation, filtering and shaping over one batch.
pub fn build_report(
    records: &[MessageRecord],
    policy: GroupPolicy,
    timezone: &str,
) -> ThreadReport {
    let index = MessageIndex::build(records);
    let aggregation = aggregate(records, &index, policy);
    let discussed = filter_discussed(summarize(&aggregation, &index));
    ThreadReport::new(discussed, timezone)
}
