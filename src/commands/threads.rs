//! Weekly thread digest for one group
//!
//! Fetches the last N days of a group's history, groups messages into threads,
//! keeps the threads that got a discussion and writes them as JSON.

use std::path::PathBuf;

use chrono::Utc;
use grammers_client::Client;
use tracing::info;

use crate::chat::{ensure_group, find_group, peer_name};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{collect_recent_messages, cutoff_for};
use crate::metrics;
use crate::session::{get_client, SessionLock};
use crate::threads::{aggregate, filter_discussed, summarize, GroupPolicy, MessageIndex, ThreadReport};

/// Command-line overrides; anything left `None` comes from [`Config`].
#[derive(Debug, Clone, Default)]
pub struct ThreadsOptions {
    /// Username, `@username`, t.me link or config alias
    pub group: Option<String>,
    pub output: Option<PathBuf>,
    pub days: Option<i64>,
    pub timezone: Option<String>,
}

/// Fully resolved parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadsPlan {
    pub group: String,
    pub output: PathBuf,
    pub days: i64,
    pub timezone: String,
}

/// Result of a finished run.
#[derive(Debug)]
pub struct ThreadsOutcome {
    pub group_name: String,
    pub policy: GroupPolicy,
    pub report: ThreadReport,
    pub output: PathBuf,
}

impl ThreadsOutcome {
    /// One-line description printed after a successful run.
    pub fn summary_line(&self) -> String {
        format!(
            "{}: {} day(s), {} thread(s) saved to {}",
            self.group_name,
            self.report.days.len(),
            self.report.thread_count(),
            self.output.display()
        )
    }
}

/// Pick the group from the argument, falling back to the configured default.
pub fn resolve_group_argument(arg: Option<&str>, config: &Config) -> Result<String> {
    arg.map(str::trim)
        .filter(|g| !g.is_empty())
        .or_else(|| config.default_group.as_deref().map(str::trim))
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Error::InvalidArgument(
                "No group given and report.default_group is not configured".to_string(),
            )
        })
}

impl ThreadsOptions {
    /// Merge with config and validate.
    pub fn resolve(self, config: &Config) -> Result<ThreadsPlan> {
        let group = resolve_group_argument(self.group.as_deref(), config)?;

        let days = self.days.unwrap_or(config.days);
        if days < 1 {
            return Err(Error::InvalidArgument(format!(
                "--days must be at least 1, got {}",
                days
            )));
        }
        cutoff_for(Utc::now(), days)?;

        Ok(ThreadsPlan {
            group,
            output: self
                .output
                .unwrap_or_else(|| PathBuf::from(&config.output)),
            days,
            timezone: self
                .timezone
                .filter(|tz| !tz.trim().is_empty())
                .unwrap_or_else(|| config.timezone.clone()),
        })
    }
}

/// Run the digest end to end.
pub async fn run(config: &Config, options: ThreadsOptions) -> Result<ThreadsOutcome> {
    let plan = options.resolve(config)?;

    let _lock = SessionLock::for_config(config)?;
    let client = get_client(config).await?;

    let result = build_digest(&client, config, &plan).await;
    client.disconnect();
    let outcome = result?;

    outcome.report.write_to(&outcome.output)?;
    Ok(outcome)
}

async fn build_digest(client: &Client, config: &Config, plan: &ThreadsPlan) -> Result<ThreadsOutcome> {
    let peer = find_group(client, config, &plan.group).await?;
    let group_name = peer_name(&peer);

    let kind = ensure_group(&peer, &plan.group)?;
    let policy = GroupPolicy::for_group(kind.is_supergroup());
    info!(group = %group_name, ?kind, %policy, "Group checked");

    let cutoff = cutoff_for(Utc::now(), plan.days)?;
    let batch = collect_recent_messages(client, &peer, cutoff).await?;
    metrics::record_messages(batch.records.len(), batch.skipped);

    let index = MessageIndex::build(&batch.records);
    let aggregation = aggregate(&batch.records, &index, policy);
    let discussed = filter_discussed(summarize(&aggregation, &index));

    let report = ThreadReport::new(discussed, plan.timezone.as_str());
    metrics::record_threads(aggregation.thread_count(), report.thread_count());

    info!(
        days = report.days.len(),
        threads = report.thread_count(),
        "Built thread report"
    );

    Ok(ThreadsOutcome {
        group_name,
        policy,
        report,
        output: plan.output.clone(),
    })
}
