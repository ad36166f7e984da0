//! Sensor provider seam.
//!
//! A provider owns the physical (or simulated) sensors and delivers readings
//! to registered listeners from its own threads. Two registration styles
//! exist: continuous listeners receive every new reading until they are
//! unregistered, trigger requests fire once per occurrence and are consumed
//! by the firing.

pub mod manual;
pub mod simulated;
pub mod types;

use std::sync::Arc;

// Re-export commonly used types
pub use manual::ManualProvider;
pub use simulated::SimulatedProvider;
pub use types::{ProviderError, SensorHandle, SensorKind, SensorReading, TriggerEvent};

/// Callback target for sensor deliveries.
///
/// Implementations are invoked from provider threads and must not assume
/// they run on the thread that registered them.
pub trait SensorListener: Send + Sync {
    /// A continuous sensor produced a new reading.
    fn on_reading(&self, reading: &SensorReading);

    /// A trigger-style sensor fired. The registration that caused this call
    /// has already been consumed.
    fn on_trigger(&self, event: &TriggerEvent);
}

/// The platform sensor subsystem.
///
/// Providers must not hold internal locks while invoking listeners, so a
/// listener can call back into the provider (trigger re-arming does this).
pub trait SensorProvider: Send + Sync {
    /// Look up the default sensor of a kind. `None` when the device lacks it.
    fn default_sensor(&self, kind: SensorKind, wake_up: bool) -> Option<SensorHandle>;

    fn register_continuous(
        &self,
        handle: &SensorHandle,
        listener: Arc<dyn SensorListener>,
    ) -> Result<(), ProviderError>;

    fn unregister_continuous(&self, handle: &SensorHandle) -> Result<(), ProviderError>;

    /// Request a single trigger notification.
    fn request_trigger(
        &self,
        handle: &SensorHandle,
        listener: Arc<dyn SensorListener>,
    ) -> Result<(), ProviderError>;

    fn cancel_trigger(&self, handle: &SensorHandle) -> Result<(), ProviderError>;
}
