//! Session management for Telegram client
//!
//! Provides:
//! - File-based session locking to prevent parallel execution
//! - Session file validation
//! - Client creation with proper configuration
//!
//! Logging in is not handled here: the session file must already be authorized.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use grammers_client::client::updates::UpdatesLike;
use grammers_client::Client;
use grammers_mtsender::{SenderPool, SenderPoolHandle};
use grammers_session::storages::SqliteSession;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{Error, Result};

/// Session lock guard that ensures exclusive access to the Telegram session.
pub struct SessionLock {
    path: PathBuf,
    lock_file: Option<File>,
}

impl SessionLock {
    /// Acquire an exclusive lock on the session.
    pub fn acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                lock_file: Some(lock_file),
            }),
            Err(_) => {
                error!(
                    lock = %path.display(),
                    "Telegram session is already used by another process; wait for it to finish"
                );
                Err(Error::SessionLocked)
            }
        }
    }

    /// Acquire the lock configured in `config`.
    pub fn for_config(config: &Config) -> Result<Self> {
        Self::acquire(&config.lock_file)
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            let _ = file.unlock();
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Check if the session file exists.
pub fn check_session_exists(session_file: &str) -> Result<()> {
    if !Path::new(session_file).exists() {
        error!(
            session = session_file,
            "Session file not found; authorize a session with any grammers login flow first"
        );
        return Err(Error::SessionNotFound(session_file.to_string()));
    }

    Ok(())
}

/// Load an existing session from file.
pub fn load_session(session_file: &str) -> Result<Arc<SqliteSession>> {
    let session = SqliteSession::open(session_file)
        .map_err(|e| Error::SessionNotFound(format!("Failed to load session: {}", e)))?;
    Ok(Arc::new(session))
}

/// Holder for SenderPool components and Client
pub struct TelegramClient {
    pub client: Client,
    pub handle: SenderPoolHandle,
    _updates: mpsc::UnboundedReceiver<UpdatesLike>,
    runner: tokio::task::JoinHandle<()>,
}

impl TelegramClient {
    /// Create a new TelegramClient from session
    pub async fn connect(session: Arc<SqliteSession>, api_id: i32) -> Result<Self> {
        if api_id == 0 {
            return Err(Error::Config(
                "TELEGRAM_API_ID is not set (config.yml or environment)".to_string(),
            ));
        }

        let pool = SenderPool::new(session, api_id);
        let client = Client::new(&pool);

        let SenderPool {
            runner,
            updates,
            handle,
        } = pool;

        let runner = tokio::spawn(async move {
            runner.run().await;
        });

        Ok(Self {
            client,
            handle,
            _updates: updates,
            runner,
        })
    }

    /// Stop the network runner.
    pub fn disconnect(self) {
        self.runner.abort();
        debug!("Telegram client disconnected");
    }
}

impl std::ops::Deref for TelegramClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

/// Create and connect a Telegram client with an existing session.
pub async fn get_client(config: &Config) -> Result<TelegramClient> {
    let session_file = config.session_file();
    check_session_exists(&session_file)?;
    let session = load_session(&session_file)?;
    TelegramClient::connect(session, config.api_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_file_is_created_on_acquire() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("test.lock");

        assert!(!path.exists());
        let mut lock = SessionLock::acquire(&path).expect("lock");
        assert!(path.exists());
        lock.release();
    }

    #[test]
    fn release_removes_lock_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("test.lock");

        let mut lock = SessionLock::acquire(&path).expect("lock");
        lock.release();
        assert!(!path.exists());
    }

    #[test]
    fn lock_dropped_releases_automatically() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("test.lock");

        {
            let _lock = SessionLock::acquire(&path).expect("lock");
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn double_release_is_safe() {
        let temp = tempdir().expect("tempdir");
        let mut lock = SessionLock::acquire(temp.path().join("test.lock")).expect("lock");
        lock.release();
        lock.release();
    }

    #[test]
    fn lock_can_be_reacquired_after_release() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("test.lock");

        let mut first = SessionLock::acquire(&path).expect("first lock");
        first.release();

        let second = SessionLock::acquire(&path);
        assert!(second.is_ok());
    }

    #[test]
    fn acquire_in_missing_directory_is_lock_error() {
        let temp = tempdir().expect("tempdir");
        let result = SessionLock::acquire(temp.path().join("missing").join("test.lock"));
        assert!(matches!(result, Err(Error::LockError(_))));
    }

    #[test]
    fn check_session_exists_reports_missing_and_success() {
        let temp = tempdir().expect("tempdir");
        let session_file = temp.path().join("telegram_session.session");
        let session_str = session_file.to_string_lossy().to_string();

        let err = check_session_exists(&session_str).unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(ref path) if path.contains(".session")));

        File::create(&session_file).expect("create session file");
        check_session_exists(&session_str).expect("session should exist");
    }

    #[tokio::test]
    async fn get_client_without_session_fails_fast() {
        let temp = tempdir().expect("tempdir");
        let mut config = Config::defaults();
        config.session_name = temp.path().join("absent").to_string_lossy().to_string();

        let result = get_client(&config).await;
        assert!(matches!(result, Err(Error::SessionNotFound(_))));
    }
}
