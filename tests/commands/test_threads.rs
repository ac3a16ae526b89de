//! Tests for threads command

use std::path::PathBuf;

use telegram_threads::commands::{threads, ThreadsOptions};
use telegram_threads::{Config, Error, SessionLock};

fn isolated_config(dir: &tempfile::TempDir) -> Config {
    let mut config = Config::defaults();
    config.session_name = dir.path().join("absent").to_string_lossy().to_string();
    config.lock_file = dir.path().join("threads.lock").to_string_lossy().to_string();
    config
}

#[tokio::test]
async fn test_threads_without_group_is_invalid_argument() {
    let dir = tempfile::tempdir().unwrap();
    let config = isolated_config(&dir);

    let result = threads::run(&config, ThreadsOptions::default()).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[tokio::test]
async fn test_threads_rejects_zero_days_before_locking() {
    let dir = tempfile::tempdir().unwrap();
    let config = isolated_config(&dir);
    let options = ThreadsOptions {
        group: Some("python_uz".to_string()),
        days: Some(0),
        ..Default::default()
    };

    let result = threads::run(&config, options).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert!(!PathBuf::from(&config.lock_file).exists());
}

#[tokio::test]
async fn test_threads_rejects_out_of_range_days_before_locking() {
    let dir = tempfile::tempdir().unwrap();
    let config = isolated_config(&dir);
    let options = ThreadsOptions {
        group: Some("python_uz".to_string()),
        days: Some(i64::MAX),
        ..Default::default()
    };

    let result = threads::run(&config, options).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert!(!PathBuf::from(&config.lock_file).exists());
}

#[tokio::test]
async fn test_threads_without_session_fails_and_releases_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = isolated_config(&dir);
    let options = ThreadsOptions {
        group: Some("https://t.me/Python".to_string()),
        ..Default::default()
    };

    let result = threads::run(&config, options).await;
    assert!(matches!(result, Err(Error::SessionNotFound(_))));
    assert!(!PathBuf::from(&config.lock_file).exists());
}

#[tokio::test]
async fn test_threads_refuses_locked_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = isolated_config(&dir);
    let _held = SessionLock::for_config(&config).unwrap();

    let options = ThreadsOptions {
        group: Some("python_uz".to_string()),
        ..Default::default()
    };
    let result = threads::run(&config, options).await;
    assert!(matches!(result, Err(Error::SessionLocked)));
}

#[tokio::test]
#[ignore] // Requires an authorized Telegram session and config.yml
async fn test_threads_live_run_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("result.json");
    let config = Config::new();

    let options = ThreadsOptions {
        group: std::env::var("TELEGRAM_TEST_GROUP").ok(),
        output: Some(output.clone()),
        days: Some(1),
        timezone: None,
    };

    let outcome = threads::run(&config, options).await.unwrap();
    assert!(output.exists());
    assert!(outcome.report.days.iter().all(|day| !day.threads.is_empty()));
}
