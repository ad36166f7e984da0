//! Transparency module.
//!
//! Tracks and exposes how much data the logger has collected, so
//! participants can see what a study is recording about them.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
