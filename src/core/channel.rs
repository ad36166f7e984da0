//! One sensor's activation, buffering and flush.
//!
//! A channel registers itself with the provider as listener. Provider threads
//! append to the buffer while the owner thread starts, stops and flushes the
//! channel, so the buffer and the session timestamps sit behind one mutex.
//! Flushing drains the buffer under that lock and writes outside it.

use crate::clock::Clock;
use crate::core::format::{encode_reading, SessionLine, SESSION_LOG};
use crate::core::record::SensorRecord;
use crate::core::roster::ChannelSpec;
use crate::error::SessionError;
use crate::provider::{
    ProviderError, SensorHandle, SensorKind, SensorListener, SensorProvider, SensorReading,
    TriggerEvent,
};
use crate::sink::LogSink;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// How a channel is registered with the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// Every new reading is delivered while registered
    Continuous,
    /// One notification per request; re-armed after each firing
    Trigger,
}

impl ChannelMode {
    fn from_spec(spec: &ChannelSpec) -> Self {
        if spec.trigger {
            ChannelMode::Trigger
        } else {
            ChannelMode::Continuous
        }
    }
}

#[derive(Debug, Default)]
struct ChannelState {
    buffer: Vec<SensorRecord>,
    session_start: Option<i64>,
    session_end: Option<i64>,
    /// Gate for buffering and trigger re-arming
    armed: bool,
    /// The provider holds our listener. Cleared only by a successful unregister.
    registered: bool,
}

struct ChannelInner {
    kind: SensorKind,
    label: &'static str,
    mode: ChannelMode,
    handle: SensorHandle,
    provider: Arc<dyn SensorProvider>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn LogSink>,
    state: Mutex<ChannelState>,
    this: Weak<ChannelInner>,
}

impl ChannelInner {
    fn state(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listener(&self) -> Option<Arc<dyn SensorListener>> {
        self.this
            .upgrade()
            .map(|inner| inner as Arc<dyn SensorListener>)
    }

    fn register(&self, listener: Arc<dyn SensorListener>) -> Result<(), ProviderError> {
        match self.mode {
            ChannelMode::Continuous => self.provider.register_continuous(&self.handle, listener),
            ChannelMode::Trigger => self.provider.request_trigger(&self.handle, listener),
        }
    }

    fn unregister(&self) -> Result<(), ProviderError> {
        match self.mode {
            ChannelMode::Continuous => self.provider.unregister_continuous(&self.handle),
            ChannelMode::Trigger => self.provider.cancel_trigger(&self.handle),
        }
    }
}

impl SensorListener for ChannelInner {
    fn on_reading(&self, reading: &SensorReading) {
        // Providers may hand readings of other sensors to the same callback
        if reading.kind != self.kind {
            return;
        }
        let mut state = self.state();
        if !state.armed {
            return;
        }
        let timestamp = self.clock.monotonic_nanos();
        state
            .buffer
            .push(SensorRecord::new(timestamp, reading.values.clone()));
    }

    fn on_trigger(&self, _event: &TriggerEvent) {
        // Re-arm under the lock so a concurrent stop either sees the new
        // request and cancels it, or disarms before we get here.
        let mut state = self.state();
        if !state.armed {
            return;
        }
        if let Some(listener) = self.listener() {
            if let Err(e) = self.provider.request_trigger(&self.handle, listener) {
                tracing::warn!(channel = self.label, error = %e, "failed to re-arm trigger sensor");
            }
        }
        let timestamp = self.clock.monotonic_nanos();
        state.buffer.push(SensorRecord::trigger(timestamp));
    }
}

/// A managed sensor. Created once per roster entry.
pub struct SensorChannel {
    inner: Arc<ChannelInner>,
}

impl SensorChannel {
    /// Look up the sensor for `spec`. Fails fast when the device lacks it.
    pub fn new(
        spec: &ChannelSpec,
        provider: Arc<dyn SensorProvider>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn LogSink>,
    ) -> Result<Self, SessionError> {
        let handle = provider
            .default_sensor(spec.kind, spec.wake_up)
            .ok_or_else(|| SessionError::SensorUnavailable {
                kind: spec.kind,
                label: spec.label.to_string(),
            })?;

        let inner = Arc::new_cyclic(|this| ChannelInner {
            kind: spec.kind,
            label: spec.label,
            mode: ChannelMode::from_spec(spec),
            handle,
            provider,
            clock,
            sink,
            state: Mutex::new(ChannelState::default()),
            this: this.clone(),
        });

        Ok(Self { inner })
    }

    pub fn kind(&self) -> SensorKind {
        self.inner.kind
    }

    pub fn label(&self) -> &'static str {
        self.inner.label
    }

    pub fn mode(&self) -> ChannelMode {
        self.inner.mode
    }

    pub fn is_armed(&self) -> bool {
        self.inner.state().armed
    }

    /// Whether the provider may still hold this channel's listener.
    pub fn is_registered(&self) -> bool {
        self.inner.state().registered
    }

    /// Number of records waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.inner.state().buffer.len()
    }

    /// Copy of the buffered records, in arrival order.
    pub fn records(&self) -> Vec<SensorRecord> {
        self.inner.state().buffer.clone()
    }

    pub fn session_start(&self) -> Option<i64> {
        self.inner.state().session_start
    }

    pub fn session_end(&self) -> Option<i64> {
        self.inner.state().session_end
    }

    /// Clear the buffer, stamp the session start and register with the provider.
    pub fn start_listening(&self) -> Result<(), SessionError> {
        {
            let mut state = self.inner.state();
            state.buffer.clear();
            state.session_start = Some(self.inner.clock.monotonic_nanos());
            state.session_end = None;
            state.armed = true;
        }

        let outcome = match self.inner.listener() {
            Some(listener) => self.inner.register(listener),
            None => Err(ProviderError::UnknownSensor(self.inner.kind)),
        };

        if let Err(source) = outcome {
            self.inner.state().armed = false;
            return Err(SessionError::RegistrationFailure {
                label: self.inner.label.to_string(),
                source,
            });
        }
        self.inner.state().registered = true;

        tracing::debug!(channel = self.inner.label, mode = ?self.inner.mode, "channel armed");
        Ok(())
    }

    /// Unregister from the provider and stamp the session end.
    /// The buffer is kept for the next flush.
    ///
    /// If the provider refuses, the channel stays disarmed (late deliveries
    /// are dropped) but counts as registered, so a later stop or drop retries.
    pub fn stop_listening(&self) -> Result<(), SessionError> {
        // Disarm before unregistering; the provider may wait for in-flight
        // callbacks, which need the lock.
        self.inner.state().armed = false;

        let result = self.inner.unregister();
        {
            let mut state = self.inner.state();
            state.session_end = Some(self.inner.clock.monotonic_nanos());
            if result.is_ok() {
                state.registered = false;
            }
        }

        result.map_err(|source| SessionError::UnregisterFailure {
            label: self.inner.label.to_string(),
            source,
        })
    }

    /// Append the buffered records to the channel log and one metadata line
    /// to the session log. Returns the number of records written.
    ///
    /// The buffer is always empty afterwards. On failure the drained records
    /// are lost.
    pub fn flush_to_file(&self, user_id: u32, record_id: u32) -> Result<usize, SessionError> {
        let (records, session_start, session_end) = {
            let mut state = self.inner.state();
            (
                std::mem::take(&mut state.buffer),
                state.session_start,
                state.session_end,
            )
        };
        let label = self.inner.label;

        let lines: Vec<String> = records
            .iter()
            .map(|record| encode_reading(record, user_id, record_id))
            .collect();

        if let Err(source) = self.inner.sink.append(label, &lines) {
            tracing::warn!(
                channel = label,
                lost = records.len(),
                "dropping buffered records after failed write"
            );
            return Err(SessionError::Io {
                log: label.to_string(),
                source,
            });
        }

        if session_end.is_none() {
            tracing::warn!(channel = label, "flushing a channel that was not stopped");
        }

        let metadata = SessionLine {
            kind: self.inner.kind,
            user_id,
            record_id,
            session_start: session_start.unwrap_or(0),
            session_end: session_end.unwrap_or(0),
            flush_timestamp: self.inner.clock.monotonic_nanos(),
            wall_clock_millis: self.inner.clock.wall_clock_millis(),
        };

        self.inner
            .sink
            .append(SESSION_LOG, &[metadata.encode()])
            .map_err(|source| SessionError::Io {
                log: SESSION_LOG.to_string(),
                source,
            })?;

        tracing::debug!(channel = label, records = records.len(), "sensor data flushed to file");
        Ok(records.len())
    }
}

impl Drop for SensorChannel {
    fn drop(&mut self) {
        if self.is_registered() {
            if let Err(e) = self.stop_listening() {
                tracing::warn!(channel = self.inner.label, error = %e, "sensor left registered on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::provider::ManualProvider;
    use crate::sink::DirectorySink;
    use tempfile::tempdir;

    const LIGHT: ChannelSpec = ChannelSpec::continuous(SensorKind::LIGHT, "light", false);
    const SIG_MOTION: ChannelSpec =
        ChannelSpec::trigger(SensorKind::SIGNIFICANT_MOTION, "sigMotion", true);

    fn channel(
        spec: &ChannelSpec,
        provider: &Arc<ManualProvider>,
        clock: &Arc<ManualClock>,
        sink: Arc<dyn LogSink>,
    ) -> SensorChannel {
        SensorChannel::new(spec, provider.clone(), clock.clone(), sink).unwrap()
    }

    #[test]
    fn test_unavailable_sensor_fails_fast() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(ManualProvider::new());
        provider.mark_unavailable(SensorKind::LIGHT);

        let result = SensorChannel::new(
            &LIGHT,
            provider,
            Arc::new(ManualClock::default()),
            Arc::new(DirectorySink::new(dir.path())),
        );
        assert!(matches!(result, Err(SessionError::SensorUnavailable { .. })));
    }

    #[test]
    fn test_continuous_channel_buffers_matching_readings() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(ManualProvider::new());
        let clock = Arc::new(ManualClock::new(10, 0));
        let light = channel(&LIGHT, &provider, &clock, Arc::new(DirectorySink::new(dir.path())));

        light.start_listening().unwrap();
        assert_eq!(light.mode(), ChannelMode::Continuous);
        assert!(provider.is_armed(SensorKind::LIGHT));

        clock.set(20);
        provider.deliver(SensorReading::new(SensorKind::LIGHT, vec![10.0]));
        // Reading of another sensor on the same callback is ignored
        provider.deliver_to(
            SensorKind::LIGHT,
            SensorReading::new(SensorKind::GRAVITY, vec![1.0, 2.0, 3.0]),
        );

        let records = light.records();
        assert_eq!(records, vec![SensorRecord::new(20, vec![10.0])]);
        assert_eq!(light.session_start(), Some(10));
    }

    #[test]
    fn test_trigger_channel_rearms_after_each_firing() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(ManualProvider::new());
        let clock = Arc::new(ManualClock::default());
        let sig = channel(
            &SIG_MOTION,
            &provider,
            &clock,
            Arc::new(DirectorySink::new(dir.path())),
        );

        sig.start_listening().unwrap();
        for _ in 0..5 {
            assert!(provider.fire_trigger(SensorKind::SIGNIFICANT_MOTION));
        }

        assert_eq!(sig.buffered(), 5);
        assert!(sig.records().iter().all(SensorRecord::is_trigger));
        assert_eq!(provider.trigger_requests(SensorKind::SIGNIFICANT_MOTION), 6);

        sig.stop_listening().unwrap();
        assert!(!provider.is_armed(SensorKind::SIGNIFICANT_MOTION));
        assert!(!provider.fire_trigger(SensorKind::SIGNIFICANT_MOTION));
    }

    #[test]
    fn test_stop_keeps_buffer_and_stamps_end() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(ManualProvider::new());
        let clock = Arc::new(ManualClock::new(100, 0));
        let light = channel(&LIGHT, &provider, &clock, Arc::new(DirectorySink::new(dir.path())));

        light.start_listening().unwrap();
        provider.deliver(SensorReading::new(SensorKind::LIGHT, vec![1.0]));
        clock.set(500);
        light.stop_listening().unwrap();
        light.stop_listening().unwrap();

        assert_eq!(light.buffered(), 1);
        assert_eq!(light.session_end(), Some(500));
        assert!(!light.is_armed());
    }

    #[test]
    fn test_flush_with_empty_buffer_writes_only_metadata() {
        let dir = tempdir().unwrap();
        let sink = Arc::new(DirectorySink::new(dir.path()));
        let provider = Arc::new(ManualProvider::new());
        let clock = Arc::new(ManualClock::new(5, 1_000));
        let light = channel(&LIGHT, &provider, &clock, sink.clone());

        light.start_listening().unwrap();
        light.stop_listening().unwrap();
        assert_eq!(light.flush_to_file(1, 2).unwrap(), 0);
        assert_eq!(light.buffered(), 0);

        let data = std::fs::read_to_string(sink.log_path("light")).unwrap();
        assert!(data.is_empty());
        let meta = std::fs::read_to_string(sink.log_path(SESSION_LOG)).unwrap();
        assert_eq!(meta, "5, 1, 2, 5, 5, 5, 1000\n");
    }

    #[test]
    fn test_restart_clears_previous_buffer() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(ManualProvider::new());
        let clock = Arc::new(ManualClock::default());
        let light = channel(&LIGHT, &provider, &clock, Arc::new(DirectorySink::new(dir.path())));

        light.start_listening().unwrap();
        provider.deliver(SensorReading::new(SensorKind::LIGHT, vec![1.0]));
        light.stop_listening().unwrap();
        light.start_listening().unwrap();

        assert_eq!(light.buffered(), 0);
        assert_eq!(light.session_end(), None);
    }

    #[test]
    fn test_drop_unregisters_armed_channel() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(ManualProvider::new());
        let clock = Arc::new(ManualClock::default());
        {
            let light =
                channel(&LIGHT, &provider, &clock, Arc::new(DirectorySink::new(dir.path())));
            light.start_listening().unwrap();
            assert!(provider.is_armed(SensorKind::LIGHT));
        }
        assert!(!provider.is_armed(SensorKind::LIGHT));
    }

    #[test]
    fn test_refused_unregister_drops_late_readings_and_retries_on_drop() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(ManualProvider::new());
        let clock = Arc::new(ManualClock::default());
        provider.reject_unregister(SensorKind::LIGHT);
        {
            let light =
                channel(&LIGHT, &provider, &clock, Arc::new(DirectorySink::new(dir.path())));
            light.start_listening().unwrap();

            let err = light.stop_listening().unwrap_err();
            assert!(matches!(err, SessionError::UnregisterFailure { .. }));
            assert!(!light.is_armed());
            assert!(light.is_registered());
            assert!(light.session_end().is_some());

            // The provider still calls us, but nothing is buffered after stop
            assert!(provider.deliver(SensorReading::new(SensorKind::LIGHT, vec![1.0])));
            assert_eq!(light.buffered(), 0);

            provider.allow_unregister(SensorKind::LIGHT);
        }
        assert!(!provider.is_armed(SensorKind::LIGHT));
    }

    #[test]
    fn test_refused_trigger_cancel_is_not_rearmed() {
        let dir = tempdir().unwrap();
        let provider = Arc::new(ManualProvider::new());
        let clock = Arc::new(ManualClock::default());
        let sig = channel(
            &SIG_MOTION,
            &provider,
            &clock,
            Arc::new(DirectorySink::new(dir.path())),
        );

        sig.start_listening().unwrap();
        provider.reject_unregister(SensorKind::SIGNIFICANT_MOTION);
        assert!(sig.stop_listening().is_err());

        // Pending request fires once more but is neither recorded nor renewed
        assert!(provider.fire_trigger(SensorKind::SIGNIFICANT_MOTION));
        assert_eq!(sig.buffered(), 0);
        assert!(!provider.is_armed(SensorKind::SIGNIFICANT_MOTION));
        assert_eq!(provider.trigger_requests(SensorKind::SIGNIFICANT_MOTION), 1);
    }
}
