//! Sensor session lifecycle.
//!
//! This module contains:
//! - The buffered record type and the delimited log formats
//! - Sensor channels (one per roster entry)
//! - The session controller coordinating all channels
//! - The fixed sensor roster

pub mod channel;
pub mod controller;
pub mod format;
pub mod record;
pub mod roster;

// Re-export commonly used types
pub use channel::{ChannelMode, SensorChannel};
pub use controller::{FlushSummary, SessionController};
pub use format::{
    encode_reading, parse_reading_line, parse_session_line, FormatError, ReadingRow, SessionLine,
    SESSION_LOG, SURVEY_LOG,
};
pub use record::SensorRecord;
pub use roster::{ChannelSpec, DEFAULT_ROSTER};
