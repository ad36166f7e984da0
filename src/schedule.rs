//! Session scheduling.
//!
//! The runner waits, listens for a fixed window, stops, flushes and moves on
//! to the next record id. It blocks the calling thread and polls a shared
//! `running` flag, so an interrupt ends the loop within one poll step. An
//! interrupted session is still stopped and flushed.

use crate::config::Config;
use crate::core::{FlushSummary, SessionController};
use crate::error::SessionError;
use crate::transparency::SharedTransparencyLog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const POLL_STEP: Duration = Duration::from_millis(100);

/// Timing of consecutive sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSchedule {
    pub first_delay: Duration,
    pub subsequent_delay: Duration,
    pub session_duration: Duration,
}

impl SessionSchedule {
    pub fn from_config(config: &Config) -> Self {
        Self {
            first_delay: config.first_session_delay,
            subsequent_delay: config.subsequent_session_delay,
            session_duration: config.session_duration,
        }
    }

    /// Back-to-back sessions with no waiting in between.
    pub fn immediate(session_duration: Duration) -> Self {
        Self {
            first_delay: Duration::ZERO,
            subsequent_delay: Duration::ZERO,
            session_duration,
        }
    }

    /// Wait before the session with the given zero-based index.
    pub fn delay_before(&self, index: u32) -> Duration {
        if index == 0 {
            self.first_delay
        } else {
            self.subsequent_delay
        }
    }
}

/// Progress notifications emitted by the runner.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Waiting { record_id: u32, delay: Duration },
    Started { record_id: u32 },
    /// The listening window ran out while sensors were still active
    WindowElapsed { record_id: u32 },
    Flushed(FlushSummary),
    FlushFailed { record_id: u32, message: String },
    Interrupted { record_id: u32 },
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sessions: u32,
    pub last_record_id: Option<u32>,
    pub records_written: usize,
}

/// Drives a [`SessionController`] through consecutive sessions.
pub struct SessionRunner {
    controller: SessionController,
    schedule: SessionSchedule,
    user_id: u32,
    next_record_id: u32,
    stats: SharedTransparencyLog,
}

impl SessionRunner {
    pub fn new(
        controller: SessionController,
        schedule: SessionSchedule,
        user_id: u32,
        first_record_id: u32,
        stats: SharedTransparencyLog,
    ) -> Self {
        Self {
            controller,
            schedule,
            user_id,
            next_record_id: first_record_id,
            stats,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn next_record_id(&self) -> u32 {
        self.next_record_id
    }

    /// Run sessions until `max_sessions` completed or `running` is cleared.
    ///
    /// Only a failure to start listening aborts the run; stop and flush
    /// failures are reported through `on_event` and the run continues.
    pub fn run(
        &mut self,
        running: &AtomicBool,
        max_sessions: Option<u32>,
        mut on_event: impl FnMut(&SessionEvent),
    ) -> Result<RunSummary, SessionError> {
        let mut summary = RunSummary::default();

        while max_sessions.map_or(true, |max| summary.sessions < max) {
            let record_id = self.next_record_id;
            let delay = self.schedule.delay_before(summary.sessions);

            on_event(&SessionEvent::Waiting { record_id, delay });
            if !wait_while_running(running, delay) {
                break;
            }

            self.controller.start_listening()?;
            self.next_record_id += 1;
            self.stats.record_session_started();
            tracing::info!(user_id = self.user_id, record_id, "session started");
            on_event(&SessionEvent::Started { record_id });

            let completed = wait_while_running(running, self.schedule.session_duration);
            if completed && self.controller.is_listening() {
                tracing::info!(record_id, "session window elapsed");
                on_event(&SessionEvent::WindowElapsed { record_id });
            }

            self.finish_session(record_id, &mut summary, &mut on_event);

            if !completed {
                tracing::info!(record_id, "session interrupted, partial data flushed");
                on_event(&SessionEvent::Interrupted { record_id });
                break;
            }
        }

        Ok(summary)
    }

    fn finish_session(
        &mut self,
        record_id: u32,
        summary: &mut RunSummary,
        on_event: &mut impl FnMut(&SessionEvent),
    ) {
        if let Err(e) = self.controller.stop_listening() {
            tracing::warn!(record_id, error = %e, "not all sensors stopped cleanly");
        }

        match self.controller.flush_to_file(self.user_id, record_id) {
            Ok(flushed) => {
                self.stats.record_flush(&flushed);
                summary.records_written += flushed.total_records();
                on_event(&SessionEvent::Flushed(flushed));
            }
            Err(e) => {
                let failed = match &e {
                    SessionError::Incomplete { failures, .. } => failures.len() as u64,
                    _ => 1,
                };
                self.stats.record_flush_failures(failed);
                tracing::error!(record_id, error = %e, "session flush incomplete");
                on_event(&SessionEvent::FlushFailed {
                    record_id,
                    message: e.to_string(),
                });
            }
        }

        summary.sessions += 1;
        summary.last_record_id = Some(record_id);

        if let Err(e) = self.stats.save() {
            tracing::warn!(error = %e, "could not save transparency stats");
        }
    }
}

/// Sleep for `duration` in small steps. Returns `false` as soon as
/// `running` is cleared.
pub fn wait_while_running(running: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(POLL_STEP));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::core::roster::ChannelSpec;
    use crate::provider::{ManualProvider, SensorKind};
    use crate::sink::DirectorySink;
    use crate::transparency::TransparencyLog;
    use std::sync::Arc;
    use tempfile::tempdir;

    const ROSTER: [ChannelSpec; 2] = [
        ChannelSpec::continuous(SensorKind::LIGHT, "light", false),
        ChannelSpec::trigger(SensorKind::SIGNIFICANT_MOTION, "sigMotion", true),
    ];

    fn runner(dir: &std::path::Path, first_record_id: u32) -> SessionRunner {
        runner_with(dir, first_record_id, Arc::new(ManualProvider::new()))
    }

    fn runner_with(
        dir: &std::path::Path,
        first_record_id: u32,
        provider: Arc<ManualProvider>,
    ) -> SessionRunner {
        let controller = SessionController::new(
            &ROSTER,
            provider,
            Arc::new(ManualClock::default()),
            Arc::new(DirectorySink::new(dir)),
        )
        .unwrap();
        SessionRunner::new(
            controller,
            SessionSchedule::immediate(Duration::ZERO),
            3,
            first_record_id,
            Arc::new(TransparencyLog::new()),
        )
    }

    #[test]
    fn test_schedule_delays() {
        let schedule = SessionSchedule::from_config(&Config::default());
        assert_eq!(schedule.delay_before(0), Duration::from_secs(120));
        assert_eq!(schedule.delay_before(1), Duration::from_secs(1200));
        assert_eq!(schedule.delay_before(7), Duration::from_secs(1200));
    }

    #[test]
    fn test_runs_requested_sessions_with_increasing_record_ids() {
        let dir = tempdir().unwrap();
        let mut runner = runner(dir.path(), 1);
        let running = AtomicBool::new(true);
        let mut flushed = Vec::new();

        let summary = runner
            .run(&running, Some(3), |event| {
                if let SessionEvent::Flushed(s) = event {
                    flushed.push(s.record_id);
                }
            })
            .unwrap();

        assert_eq!(summary.sessions, 3);
        assert_eq!(summary.last_record_id, Some(3));
        assert_eq!(flushed, vec![1, 2, 3]);
        assert_eq!(runner.next_record_id(), 4);
        assert!(!runner.controller().is_listening());

        let meta = std::fs::read_to_string(dir.path().join("sensorInformation.csv")).unwrap();
        assert_eq!(meta.lines().count(), 6);
    }

    #[test]
    fn test_cleared_flag_skips_waiting_session() {
        let dir = tempdir().unwrap();
        let mut runner = runner(dir.path(), 10);
        let running = AtomicBool::new(false);

        let summary = runner.run(&running, None, |_| {}).unwrap();
        assert_eq!(summary, RunSummary::default());
        assert_eq!(runner.next_record_id(), 10);
    }

    #[test]
    fn test_wait_while_running() {
        let running = AtomicBool::new(true);
        assert!(wait_while_running(&running, Duration::from_millis(5)));
        running.store(false, Ordering::SeqCst);
        assert!(!wait_while_running(&running, Duration::from_secs(60)));
    }

    #[test]
    fn test_failed_start_keeps_record_id() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(ManualProvider::new());
        provider.reject_registration(SensorKind::SIGNIFICANT_MOTION);
        let mut runner = runner_with(dir.path(), 5, provider);
        let running = AtomicBool::new(true);

        let err = runner.run(&running, Some(1), |_| {}).unwrap_err();
        assert!(matches!(err, SessionError::RegistrationFailure { .. }));
        assert_eq!(runner.next_record_id(), 5);
        assert_eq!(runner.stats.stats().sessions_started, 0);
    }
}
