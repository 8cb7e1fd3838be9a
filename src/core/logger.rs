//! Diagnostic logging of duration oracle calls
//!
//! Each oracle call becomes one pretty-printed JSON file in the log directory,
//! named after the local time with microsecond resolution. Two calls finishing
//! within the same microsecond write to the same file and the last one wins.
//!
//! Writes run on tracked tasks so that shutdown paths can `flush` them instead
//! of losing records with the runtime.

use chrono::Local;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::task::TaskTracker;

use crate::core::error::{Error, Result};

/// Default directory for call records
pub const DEFAULT_LOG_DIR: &str = "valhalla_logs";

/// Requested state from the logging control entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingState {
    Enable,
    Disable,
}

impl FromStr for LoggingState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "enable" => Ok(LoggingState::Enable),
            "disable" => Ok(LoggingState::Disable),
            _ => Err(Error::InvalidLoggingState(s.to_string())),
        }
    }
}

/// Process-wide call logger, shared by `Arc` between the oracle client and
/// the logging control endpoint
#[derive(Debug)]
pub struct CallLogger {
    enabled: AtomicBool,
    log_dir: PathBuf,
    pending: TaskTracker,
}

impl Default for CallLogger {
    fn default() -> Self {
        Self::disabled(DEFAULT_LOG_DIR)
    }
}

impl CallLogger {
    /// Create a logger, creating the directory up front when enabled
    pub fn new(log_dir: impl Into<PathBuf>, enabled: bool) -> Result<Self> {
        let logger = Self::disabled(log_dir);
        if enabled {
            logger.enable()?;
        }
        Ok(logger)
    }

    pub fn disabled(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            log_dir: log_dir.into(),
            pending: TaskTracker::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn enable(&self) -> Result<()> {
        std::fs::create_dir_all(&self.log_dir)?;
        self.enabled.store(true, Ordering::Relaxed);
        log::info!("Oracle call logging enabled in {}", self.log_dir.display());
        Ok(())
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
        log::info!("Oracle call logging disabled");
    }

    pub fn apply(&self, state: LoggingState) -> Result<()> {
        match state {
            LoggingState::Enable => self.enable(),
            LoggingState::Disable => {
                self.disable();
                Ok(())
            }
        }
    }

    /// Record one oracle call off the caller's path. Never fails the caller.
    pub fn record(self: &Arc<Self>, request: Value, response: Value) {
        if !self.is_enabled() {
            return;
        }

        let logger = Arc::clone(self);
        self.pending.spawn(async move {
            if let Err(e) = logger.write_record(&request, &response).await {
                log::warn!("Failed to write oracle call record: {e}");
            }
        });
    }

    /// Wait until every record spawned so far is on disk.
    ///
    /// Call before the runtime shuts down. Not meant to race with another
    /// `flush`.
    pub async fn flush(&self) {
        self.pending.close();
        self.pending.wait().await;
        self.pending.reopen();
    }

    /// Write one record and return its path, or `None` when disabled
    pub async fn write_record(&self, request: &Value, response: &Value) -> Result<Option<PathBuf>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let now = Local::now();
        let filename = format!("valhalla_request_{}.json", now.format("%Y%m%d_%H%M%S_%6f"));
        let path = self.log_dir.join(filename);

        let record = json!({
            "timestamp": now.naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            "request": request,
            "response": response,
        });
        let body = serde_json::to_vec_pretty(&record)
            .map_err(|e| Error::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        tokio::fs::write(&path, body).await?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_logging_state_is_case_insensitive() {
        assert_eq!("enable".parse::<LoggingState>().unwrap(), LoggingState::Enable);
        assert_eq!("ENABLE".parse::<LoggingState>().unwrap(), LoggingState::Enable);
        assert_eq!("Disable".parse::<LoggingState>().unwrap(), LoggingState::Disable);
        assert!(matches!(
            "on".parse::<LoggingState>(),
            Err(Error::InvalidLoggingState(v)) if v == "on"
        ));
    }

    #[test]
    fn test_enable_creates_directory() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("nested").join("logs");
        let logger = CallLogger::disabled(&log_dir);
        assert!(!log_dir.exists());

        logger.apply(LoggingState::Enable).unwrap();
        assert!(logger.is_enabled());
        assert!(log_dir.is_dir());

        logger.apply(LoggingState::Disable).unwrap();
        assert!(!logger.is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_logger_writes_nothing() {
        let dir = tempdir().unwrap();
        let logger = CallLogger::disabled(dir.path());

        let written = logger
            .write_record(&json!({"costing": "auto"}), &json!({"trip": {}}))
            .await
            .unwrap();

        assert!(written.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_record_contains_request_and_response() {
        let dir = tempdir().unwrap();
        let logger = CallLogger::new(dir.path(), true).unwrap();

        let request = json!({"costing": "auto", "locations": [{"lat": 1.0, "lon": 2.0}]});
        let response = json!({"trip": {"summary": {"time": 42}}});
        let path = logger
            .write_record(&request, &response)
            .await
            .unwrap()
            .expect("record path");

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("valhalla_request_"));
        assert!(name.ends_with(".json"));

        let record: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(record["request"], request);
        assert_eq!(record["response"], response);
        assert!(record["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_flush_waits_for_pending_records() {
        let dir = tempdir().unwrap();
        let logger = Arc::new(CallLogger::new(dir.path(), true).unwrap());

        logger.record(json!({"costing": "auto"}), json!({"trip": {"summary": {"time": 1}}}));
        logger.flush().await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        // Still usable after a flush
        logger.record(json!({"costing": "auto"}), json!({"error": "No path"}));
        logger.flush().await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_flush_without_records_returns() {
        let logger = CallLogger::default();
        logger.flush().await;
        assert!(!logger.is_enabled());
    }

    #[test]
    fn test_new_fails_when_directory_cannot_be_created() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let result = CallLogger::new(blocker.join("logs"), true);
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
