//! A single buffered measurement.

/// One timestamped reading, or one trigger occurrence when `values` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecord {
    /// Monotonic nanoseconds at which the reading arrived
    pub timestamp: i64,
    pub values: Vec<f32>,
}

impl SensorRecord {
    pub fn new(timestamp: i64, values: Vec<f32>) -> Self {
        Self { timestamp, values }
    }

    /// A trigger occurrence carries no magnitude.
    pub fn trigger(timestamp: i64) -> Self {
        Self {
            timestamp,
            values: Vec::new(),
        }
    }

    pub fn is_trigger(&self) -> bool {
        self.values.is_empty()
    }
}
