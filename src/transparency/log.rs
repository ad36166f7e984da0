//! Cumulative record of what has been collected.
//!
//! Participants can inspect these counters at any time with
//! `wearlog status`; nothing in here identifies a participant.

use crate::core::FlushSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Collection counters for this process, optionally seeded from disk.
#[derive(Debug)]
pub struct TransparencyLog {
    /// Number of sessions started
    sessions_started: AtomicU64,
    /// Number of sessions flushed to file
    sessions_flushed: AtomicU64,
    /// Number of sensor records written to channel logs
    records_written: AtomicU64,
    /// Number of channel flushes that failed
    flush_failures: AtomicU64,
    /// Number of survey answers written
    surveys_written: AtomicU64,
    /// When this process started collecting
    run_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            sessions_started: AtomicU64::new(0),
            sessions_flushed: AtomicU64::new(0),
            records_written: AtomicU64::new(0),
            flush_failures: AtomicU64::new(0),
            surveys_written: AtomicU64::new(0),
            run_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that loads previous totals from `path` and saves back to it.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!(error = %e, "could not load previous transparency stats");
        }

        log
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Account for a completed flush.
    pub fn record_flush(&self, summary: &FlushSummary) {
        self.sessions_flushed.fetch_add(1, Ordering::Relaxed);
        self.records_written
            .fetch_add(summary.total_records() as u64, Ordering::Relaxed);
    }

    pub fn record_flush_failures(&self, count: u64) {
        self.flush_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_survey(&self) {
        self.surveys_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_flushed: self.sessions_flushed.load(Ordering::Relaxed),
            records_written: self.records_written.load(Ordering::Relaxed),
            flush_failures: self.flush_failures.load(Ordering::Relaxed),
            surveys_written: self.surveys_written.load(Ordering::Relaxed),
            run_start: self.run_start,
            run_duration_secs: (Utc::now() - self.run_start).num_seconds().max(0) as u64,
        }
    }

    /// Summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Collection Statistics:\n\
             - Sessions started: {}\n\
             - Sessions flushed: {}\n\
             - Sensor records written: {}\n\
             - Failed channel flushes: {}\n\
             - Survey answers written: {}\n\
             - Run duration: {} seconds",
            stats.sessions_started,
            stats.sessions_flushed,
            stats.records_written,
            stats.flush_failures,
            stats.surveys_written,
            stats.run_duration_secs
        )
    }

    /// Save totals to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                sessions_started: stats.sessions_started,
                sessions_flushed: stats.sessions_flushed,
                records_written: stats.records_written,
                flush_failures: stats.flush_failures,
                surveys_written: stats.surveys_written,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.sessions_started
                    .store(persisted.sessions_started, Ordering::Relaxed);
                self.sessions_flushed
                    .store(persisted.sessions_flushed, Ordering::Relaxed);
                self.records_written
                    .store(persisted.records_written, Ordering::Relaxed);
                self.flush_failures
                    .store(persisted.flush_failures, Ordering::Relaxed);
                self.surveys_written
                    .store(persisted.surveys_written, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub sessions_started: u64,
    pub sessions_flushed: u64,
    pub records_written: u64,
    pub flush_failures: u64,
    pub surveys_written: u64,
    pub run_start: DateTime<Utc>,
    pub run_duration_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    sessions_started: u64,
    sessions_flushed: u64,
    records_written: u64,
    flush_failures: u64,
    #[serde(default)]
    surveys_written: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

/// Create a new shared transparency log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}
