//! Errors raised by the session lifecycle.

use crate::provider::{ProviderError, SensorKind};
use std::fmt;
use std::io;

/// Errors that can occur while arming, stopping or flushing sensor channels.
#[derive(Debug)]
pub enum SessionError {
    /// The provider has no sensor of the requested kind
    SensorUnavailable { kind: SensorKind, label: String },
    /// The provider refused to register a listener or request a trigger
    RegistrationFailure { label: String, source: ProviderError },
    /// The provider refused to unregister a listener or cancel a trigger
    UnregisterFailure { label: String, source: ProviderError },
    /// A log file could not be opened or written
    Io { log: String, source: io::Error },
    /// A best-effort operation finished but some channels failed
    Incomplete {
        operation: &'static str,
        failures: Vec<SessionError>,
    },
}

impl SessionError {
    /// Label of the channel that failed, if the error belongs to one.
    pub fn label(&self) -> Option<&str> {
        match self {
            SessionError::SensorUnavailable { label, .. } => Some(label),
            SessionError::RegistrationFailure { label, .. } => Some(label),
            SessionError::UnregisterFailure { label, .. } => Some(label),
            SessionError::Io { log, .. } => Some(log),
            SessionError::Incomplete { .. } => None,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::SensorUnavailable { kind, label } => {
                write!(f, "Sensor {label} (type {kind}) is not available on this device")
            }
            SessionError::RegistrationFailure { label, source } => {
                write!(f, "Failed to register sensor {label}: {source}")
            }
            SessionError::UnregisterFailure { label, source } => {
                write!(f, "Failed to unregister sensor {label}: {source}")
            }
            SessionError::Io { log, source } => {
                write!(f, "Failed to write log {log}: {source}")
            }
            SessionError::Incomplete {
                operation,
                failures,
            } => {
                write!(f, "{operation} failed for {} channel(s)", failures.len())?;
                for failure in failures {
                    write!(f, "; {failure}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::RegistrationFailure { source, .. } => Some(source),
            SessionError::UnregisterFailure { source, .. } => Some(source),
            SessionError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
