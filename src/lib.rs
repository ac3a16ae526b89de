//! Telegram Group Thread Digest Library
//!
//! This library provides tools to:
//! - Resolve a group by username, t.me link or config alias
//! - Fetch the last days of its history through an existing session
//! - Group messages into reply chains and forum topics per day
//! - Write the threads that got a discussion as a JSON report

pub mod chat;
pub mod config;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod session;
pub mod threads;

// Re-export common types
pub use config::{ChatEntity, Config};
pub use error::{Error, Result};
pub use session::{check_session_exists, get_client, SessionLock};
pub use threads::{build_report, GroupPolicy, MessageRecord, ThreadReport};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
