//! Telegram Threads CLI - main entry point
//!
//! Builds a day-by-day digest of discussed threads for one group.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use telegram_threads::commands::{self, ThreadsOptions};
use telegram_threads::{metrics, Config};
use tracing::warn;

const COMMAND_NAME: &str = "threads";

#[derive(Parser)]
#[command(name = "telegram_threads")]
#[command(about = "Weekly thread digest for a Telegram group", long_about = None)]
#[command(version)]
struct Cli {
    /// Group username, @username, t.me link or alias from config
    /// (defaults to report.default_group)
    group: Option<String>,

    /// Output JSON file (defaults to report.output, then result.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Days to look back (defaults to report.days, then 7)
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..))]
    days: Option<i64>,

    /// Timezone label written into the report
    #[arg(long)]
    timezone: Option<String>,

    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,
}

impl Cli {
    fn options(&self) -> ThreadsOptions {
        ThreadsOptions {
            group: self.group.clone(),
            output: self.output.clone(),
            days: self.days,
            timezone: self.timezone.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("telegram_threads=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    metrics::record_command_start(COMMAND_NAME);
    let start = Instant::now();

    let config = Config::new();
    let result = commands::threads_run(&config, cli.options()).await;

    metrics::record_command_result(COMMAND_NAME, start.elapsed(), result.is_ok());

    let outcome = result?;
    println!("{}", outcome.summary_line());
    Ok(())
}
