//! Synthetic sensor provider for desktop runs.
//!
//! Each registration gets its own worker thread. Continuous workers emit a
//! reading every `sample_interval`; trigger workers fire once after
//! `trigger_interval` and are then consumed, like a real significant-motion
//! sensor.

use crate::provider::types::{
    ProviderError, SensorHandle, SensorKind, SensorReading, TriggerEvent,
};
use crate::provider::{SensorListener, SensorProvider};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Timing of the synthetic sensors.
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    pub sample_interval: Duration,
    pub trigger_interval: Duration,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            // Roughly SENSOR_DELAY_NORMAL
            sample_interval: Duration::from_millis(200),
            trigger_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Registration {
    Continuous,
    Trigger,
}

struct Worker {
    id: u64,
    stop: Sender<()>,
    handle: thread::JoinHandle<()>,
}

type WorkerMap = Arc<Mutex<HashMap<(SensorKind, Registration), Worker>>>;

fn lock(workers: &WorkerMap) -> MutexGuard<'_, HashMap<(SensorKind, Registration), Worker>> {
    workers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Provider that fabricates plausible readings for every known sensor kind.
pub struct SimulatedProvider {
    config: SimulatedConfig,
    workers: WorkerMap,
    next_id: AtomicU64,
}

impl SimulatedProvider {
    pub fn new(config: SimulatedConfig) -> Self {
        Self {
            config,
            workers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Number of values a reading of this kind carries.
    pub fn dimensions(kind: SensorKind) -> Option<usize> {
        match kind {
            SensorKind::LIGHT | SensorKind::HEART_RATE | SensorKind::HEART_BEAT => Some(1),
            SensorKind::GYROSCOPE | SensorKind::GRAVITY | SensorKind::LINEAR_ACCELERATION => {
                Some(3)
            }
            SensorKind::GAME_ROTATION_VECTOR => Some(4),
            SensorKind::PPG | SensorKind::PPG_GAIN | SensorKind::PP => Some(16),
            SensorKind::SIGNIFICANT_MOTION => Some(0),
            _ => None,
        }
    }

    /// Number of live worker threads.
    pub fn active_workers(&self) -> usize {
        lock(&self.workers).len()
    }

    fn synthesize(kind: SensorKind, dims: usize, elapsed: f32) -> Vec<f32> {
        let base = match kind {
            SensorKind::LIGHT => 120.0,
            SensorKind::HEART_RATE => 70.0,
            SensorKind::GRAVITY => 3.2,
            _ => 0.0,
        };
        (0..dims)
            .map(|i| base + (elapsed * (i as f32 + 1.0)).sin())
            .collect()
    }

    fn spawn(
        &self,
        handle: &SensorHandle,
        registration: Registration,
        listener: Arc<dyn SensorListener>,
    ) -> Result<(), ProviderError> {
        let kind = handle.kind;
        let dims = Self::dimensions(kind).ok_or(ProviderError::UnknownSensor(kind))?;

        // Replace any previous registration of the same style
        self.stop_worker(kind, registration);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let workers = self.workers.clone();
        let sample_interval = self.config.sample_interval;
        let trigger_interval = self.config.trigger_interval;

        let handle = thread::spawn(move || {
            let started = Instant::now();
            match registration {
                Registration::Continuous => loop {
                    match stop_rx.recv_timeout(sample_interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let elapsed = started.elapsed().as_secs_f32();
                            let reading =
                                SensorReading::new(kind, Self::synthesize(kind, dims, elapsed));
                            listener.on_reading(&reading);
                        }
                        _ => break,
                    }
                },
                Registration::Trigger => {
                    if let Err(RecvTimeoutError::Timeout) = stop_rx.recv_timeout(trigger_interval) {
                        // Consume the request before notifying so the listener can re-arm
                        {
                            let mut map = lock(&workers);
                            if map.get(&(kind, registration)).map(|w| w.id) == Some(id) {
                                map.remove(&(kind, registration));
                            }
                        }
                        listener.on_trigger(&TriggerEvent { kind });
                    }
                }
            }
        });

        lock(&self.workers).insert(
            (kind, registration),
            Worker {
                id,
                stop: stop_tx,
                handle,
            },
        );
        tracing::debug!(sensor = %kind, ?registration, "simulated sensor registered");
        Ok(())
    }

    fn stop_worker(&self, kind: SensorKind, registration: Registration) {
        let worker = lock(&self.workers).remove(&(kind, registration));
        if let Some(worker) = worker {
            let _ = worker.stop.send(());
            // A trigger listener re-arming from its own worker must not join itself
            if worker.handle.thread().id() != thread::current().id() {
                let _ = worker.handle.join();
            }
        }
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new(SimulatedConfig::default())
    }
}

impl SensorProvider for SimulatedProvider {
    fn default_sensor(&self, kind: SensorKind, wake_up: bool) -> Option<SensorHandle> {
        Self::dimensions(kind).map(|_| SensorHandle { kind, wake_up })
    }

    fn register_continuous(
        &self,
        handle: &SensorHandle,
        listener: Arc<dyn SensorListener>,
    ) -> Result<(), ProviderError> {
        self.spawn(handle, Registration::Continuous, listener)
    }

    fn unregister_continuous(&self, handle: &SensorHandle) -> Result<(), ProviderError> {
        self.stop_worker(handle.kind, Registration::Continuous);
        Ok(())
    }

    fn request_trigger(
        &self,
        handle: &SensorHandle,
        listener: Arc<dyn SensorListener>,
    ) -> Result<(), ProviderError> {
        self.spawn(handle, Registration::Trigger, listener)
    }

    fn cancel_trigger(&self, handle: &SensorHandle) -> Result<(), ProviderError> {
        self.stop_worker(handle.kind, Registration::Trigger);
        Ok(())
    }
}

impl Drop for SimulatedProvider {
    fn drop(&mut self) {
        let workers: Vec<Worker> = lock(&self.workers).drain().map(|(_, w)| w).collect();
        for worker in workers {
            let _ = worker.stop.send(());
            let _ = worker.handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counting {
        readings: AtomicUsize,
        triggers: AtomicUsize,
        last_len: AtomicUsize,
    }

    impl SensorListener for Counting {
        fn on_reading(&self, reading: &SensorReading) {
            self.last_len.store(reading.values.len(), Ordering::SeqCst);
            self.readings.fetch_add(1, Ordering::SeqCst);
        }

        fn on_trigger(&self, _event: &TriggerEvent) {
            self.triggers.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast() -> SimulatedProvider {
        SimulatedProvider::new(SimulatedConfig {
            sample_interval: Duration::from_millis(5),
            trigger_interval: Duration::from_millis(5),
        })
    }

    #[test]
    fn test_unknown_kind_unavailable() {
        let provider = fast();
        assert!(provider.default_sensor(SensorKind(9999), false).is_none());
        assert!(provider.default_sensor(SensorKind::LIGHT, false).is_some());
    }

    #[test]
    fn test_continuous_worker_emits_until_unregistered() {
        let provider = fast();
        let listener = Arc::new(Counting::default());
        let handle = provider.default_sensor(SensorKind::GYROSCOPE, false).unwrap();

        provider.register_continuous(&handle, listener.clone()).unwrap();
        thread::sleep(Duration::from_millis(60));
        provider.unregister_continuous(&handle).unwrap();

        let count = listener.readings.load(Ordering::SeqCst);
        assert!(count > 0);
        assert_eq!(listener.last_len.load(Ordering::SeqCst), 3);
        assert_eq!(provider.active_workers(), 0);

        thread::sleep(Duration::from_millis(30));
        assert_eq!(listener.readings.load(Ordering::SeqCst), count);
    }

    #[test]
    fn test_trigger_fires_once() {
        let provider = fast();
        let listener = Arc::new(Counting::default());
        let handle = provider
            .default_sensor(SensorKind::SIGNIFICANT_MOTION, true)
            .unwrap();

        provider.request_trigger(&handle, listener.clone()).unwrap();
        thread::sleep(Duration::from_millis(60));

        assert_eq!(listener.triggers.load(Ordering::SeqCst), 1);
        assert_eq!(provider.active_workers(), 0);
    }
}
