//! Coordinates start, stop and flush across the whole roster.

use crate::clock::Clock;
use crate::core::channel::SensorChannel;
use crate::core::roster::ChannelSpec;
use crate::error::SessionError;
use crate::provider::SensorProvider;
use crate::sink::LogSink;
use std::sync::Arc;

/// Records written per channel by one flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub user_id: u32,
    pub record_id: u32,
    /// `(label, records written)` in roster order, failed channels omitted
    pub channels: Vec<(&'static str, usize)>,
}

impl FlushSummary {
    pub fn total_records(&self) -> usize {
        self.channels.iter().map(|(_, n)| n).sum()
    }
}

/// Owns the channel roster for the lifetime of the process.
///
/// Constructed by the composition root and handed to whatever drives the
/// session lifecycle; at most one session is active at a time.
pub struct SessionController {
    channels: Vec<SensorChannel>,
    listening: bool,
}

impl SessionController {
    /// Build one channel per roster entry, in roster order.
    pub fn new(
        roster: &[ChannelSpec],
        provider: Arc<dyn SensorProvider>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, SessionError> {
        let channels = roster
            .iter()
            .map(|spec| SensorChannel::new(spec, provider.clone(), clock.clone(), sink.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(channels = channels.len(), "session controller initialised");
        Ok(Self {
            channels,
            listening: false,
        })
    }

    pub fn channels(&self) -> &[SensorChannel] {
        &self.channels
    }

    pub fn channel(&self, label: &str) -> Option<&SensorChannel> {
        self.channels.iter().find(|c| c.label() == label)
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Arm every channel in roster order.
    ///
    /// All or nothing: if a channel cannot be registered, the channels armed
    /// before it are stopped again and the error is returned.
    pub fn start_listening(&mut self) -> Result<(), SessionError> {
        self.listening = true;

        for (index, channel) in self.channels.iter().enumerate() {
            if let Err(e) = channel.start_listening() {
                tracing::warn!(channel = channel.label(), error = %e, "rolling back session start");
                for started in &self.channels[..index] {
                    if let Err(stop_err) = started.stop_listening() {
                        tracing::warn!(channel = started.label(), error = %stop_err, "rollback stop failed");
                    }
                }
                self.listening = false;
                return Err(e);
            }
        }

        tracing::info!("all sensors listening");
        Ok(())
    }

    /// Stop every channel in roster order, continuing past failures.
    pub fn stop_listening(&mut self) -> Result<(), SessionError> {
        self.listening = false;

        let failures: Vec<SessionError> = self
            .channels
            .iter()
            .filter_map(|channel| {
                channel.stop_listening().err().map(|e| {
                    tracing::warn!(channel = channel.label(), error = %e, "failed to stop channel");
                    e
                })
            })
            .collect();

        tracing::info!("sensors stopped");
        Self::check("stop", failures)
    }

    /// Flush every channel with the same user and record id, continuing past
    /// failures. Afterwards every buffer is empty.
    pub fn flush_to_file(&self, user_id: u32, record_id: u32) -> Result<FlushSummary, SessionError> {
        let mut summary = FlushSummary {
            user_id,
            record_id,
            channels: Vec::with_capacity(self.channels.len()),
        };
        let mut failures = Vec::new();

        for channel in &self.channels {
            match channel.flush_to_file(user_id, record_id) {
                Ok(written) => summary.channels.push((channel.label(), written)),
                Err(e) => {
                    tracing::warn!(channel = channel.label(), error = %e, "failed to flush channel");
                    failures.push(e);
                }
            }
        }

        tracing::info!(
            user_id,
            record_id,
            records = summary.total_records(),
            "session flushed to file"
        );
        Self::check("flush", failures).map(|_| summary)
    }

    fn check(operation: &'static str, failures: Vec<SessionError>) -> Result<(), SessionError> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(SessionError::Incomplete {
                operation,
                failures,
            })
        }
    }
}
