//! Value types exchanged with a sensor provider.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric sensor type identifier as reported by the platform.
///
/// Vendor-specific sensors use ids above 65536 (e.g. the PPG sensors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SensorKind(pub i32);

impl SensorKind {
    pub const GYROSCOPE: SensorKind = SensorKind(4);
    pub const LIGHT: SensorKind = SensorKind(5);
    pub const GRAVITY: SensorKind = SensorKind(9);
    pub const LINEAR_ACCELERATION: SensorKind = SensorKind(10);
    pub const GAME_ROTATION_VECTOR: SensorKind = SensorKind(15);
    pub const SIGNIFICANT_MOTION: SensorKind = SensorKind(17);
    pub const HEART_RATE: SensorKind = SensorKind(21);
    pub const HEART_BEAT: SensorKind = SensorKind(31);
    pub const PPG: SensorKind = SensorKind(65541);
    pub const PPG_GAIN: SensorKind = SensorKind(65544);
    pub const PP: SensorKind = SensorKind(65547);

    pub fn id(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Handle to a concrete sensor, as returned by
/// [`SensorProvider::default_sensor`](super::SensorProvider::default_sensor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorHandle {
    pub kind: SensorKind,
    pub wake_up: bool,
}

/// A reading delivered to a continuous listener.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Kind of the sensor that produced the reading
    pub kind: SensorKind,
    /// Raw values, dimensionality depends on the sensor kind
    pub values: Vec<f32>,
}

impl SensorReading {
    pub fn new(kind: SensorKind, values: Vec<f32>) -> Self {
        Self { kind, values }
    }
}

/// Occurrence of a trigger-style sensor. Carries no magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub kind: SensorKind,
}

/// Errors reported by a sensor provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider refused the registration
    Rejected { kind: SensorKind, reason: String },
    /// The handle is not known to this provider
    UnknownSensor(SensorKind),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Rejected { kind, reason } => {
                write!(f, "Sensor {kind} request rejected: {reason}")
            }
            ProviderError::UnknownSensor(kind) => write!(f, "Unknown sensor {kind}"),
        }
    }
}

impl std::error::Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_kind_display() {
        assert_eq!(SensorKind::LIGHT.to_string(), "5");
        assert_eq!(SensorKind::PP.to_string(), "65547");
    }

    #[test]
    fn test_reading_copies_values() {
        let values = vec![1.0, 2.0];
        let reading = SensorReading::new(SensorKind::GRAVITY, values.clone());
        assert_eq!(reading.values, values);
    }
}
