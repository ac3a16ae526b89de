//! Command implementations
//!
//! Each module corresponds to one CLI entry point.

pub mod threads;

pub use threads::{run as threads_run, ThreadsOptions, ThreadsOutcome, ThreadsPlan};
