//! Wearlog - scheduled wearable sensor sessions for research.
//!
//! This library activates a fixed roster of device sensors for a bounded
//! session, buffers their readings in memory and appends them to delimited
//! log files tagged with a participant id and a session (record) id.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            Wearlog                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐    │
//! │  │  Provider   │──▶│  Channels   │──▶│    Log sink      │    │
//! │  │ (sensors)   │   │ (buffers)   │   │ <label>.csv      │    │
//! │  └─────────────┘   └─────────────┘   │ sensorInformation│    │
//! │                           ▲          └──────────────────┘    │
//! │                           │                                  │
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐    │
//! │  │  Schedule   │──▶│ Controller  │   │  Transparency    │    │
//! │  │  (runner)   │   │ start/stop/ │   │     log          │    │
//! │  └─────────────┘   │   flush     │   └──────────────────┘    │
//! │                    └─────────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wearlog::{
//!     clock::SystemClock, core::DEFAULT_ROSTER, provider::SimulatedProvider,
//!     sink::DirectorySink, SessionController,
//! };
//!
//! let mut controller = SessionController::new(
//!     &DEFAULT_ROSTER,
//!     Arc::new(SimulatedProvider::default()),
//!     Arc::new(SystemClock::new()),
//!     Arc::new(DirectorySink::new("logs")),
//! )
//! .expect("all sensors available");
//!
//! controller.start_listening().expect("sensors armed");
//! std::thread::sleep(std::time::Duration::from_secs(2));
//! controller.stop_listening().expect("sensors stopped");
//! controller.flush_to_file(1, 1).expect("logs written");
//! ```

pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod provider;
pub mod schedule;
pub mod sink;
pub mod survey;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError};
pub use crate::core::{
    ChannelSpec, FlushSummary, SensorChannel, SensorRecord, SessionController, DEFAULT_ROSTER,
};
pub use error::SessionError;
pub use provider::{SensorKind, SensorListener, SensorProvider, SensorReading};
pub use schedule::{RunSummary, SessionEvent, SessionRunner, SessionSchedule};
pub use sink::{DirectorySink, LogSink};
pub use survey::{SurveyAnswers, SurveyError};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Data declaration shown before collection starts.
pub const DATA_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                 WEARLOG - DATA COLLECTION NOTICE                 ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  During each session this logger records:                        ║
║    • Heart rate, heart beat and PPG signals                      ║
║    • Ambient light                                               ║
║    • Motion (gyroscope, gravity, linear acceleration, rotation)  ║
║    • Significant-motion occurrences                              ║
║                                                                  ║
║  Every row carries only your participant number and the          ║
║  session number. No names, locations or screen content.          ║
║                                                                  ║
║  View collection totals anytime with:                            ║
║    wearlog status                                                ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;
