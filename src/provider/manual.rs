//! A provider that only delivers what its owner tells it to.
//!
//! Used for deterministic sessions: tests, replays and dry runs push
//! readings and fire triggers explicitly.

use crate::provider::types::{
    ProviderError, SensorHandle, SensorKind, SensorReading, TriggerEvent,
};
use crate::provider::{SensorListener, SensorProvider};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct ManualState {
    unavailable: HashSet<SensorKind>,
    rejected: HashSet<SensorKind>,
    stuck: HashSet<SensorKind>,
    continuous: HashMap<SensorKind, Arc<dyn SensorListener>>,
    triggers: HashMap<SensorKind, Arc<dyn SensorListener>>,
    trigger_requests: HashMap<SensorKind, u64>,
}

/// Explicitly driven sensor provider. Every kind is available unless
/// marked otherwise.
#[derive(Default)]
pub struct ManualProvider {
    state: Mutex<ManualState>,
}

impl ManualProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `default_sensor` return `None` for this kind.
    pub fn mark_unavailable(&self, kind: SensorKind) {
        self.state().unavailable.insert(kind);
    }

    /// Make every future registration for this kind fail.
    pub fn reject_registration(&self, kind: SensorKind) {
        self.state().rejected.insert(kind);
    }

    /// Make unregister and cancel fail for this kind. The listener stays
    /// registered until [`allow_unregister`](Self::allow_unregister).
    pub fn reject_unregister(&self, kind: SensorKind) {
        self.state().stuck.insert(kind);
    }

    pub fn allow_unregister(&self, kind: SensorKind) {
        self.state().stuck.remove(&kind);
    }

    /// Deliver a reading to the continuous listener registered for the
    /// reading's own kind. Returns whether a listener received it.
    pub fn deliver(&self, reading: SensorReading) -> bool {
        self.deliver_to(reading.kind, reading)
    }

    /// Deliver a reading to the listener registered for `target`, whatever
    /// kind the reading carries.
    pub fn deliver_to(&self, target: SensorKind, reading: SensorReading) -> bool {
        let listener = self.state().continuous.get(&target).cloned();
        match listener {
            Some(listener) => {
                listener.on_reading(&reading);
                true
            }
            None => false,
        }
    }

    /// Fire the pending trigger request for `kind`, consuming it.
    /// Returns `false` when nothing was armed.
    pub fn fire_trigger(&self, kind: SensorKind) -> bool {
        let listener = self.state().triggers.remove(&kind);
        match listener {
            Some(listener) => {
                listener.on_trigger(&TriggerEvent { kind });
                true
            }
            None => false,
        }
    }

    /// Whether a continuous listener or a trigger request is active for `kind`.
    pub fn is_armed(&self, kind: SensorKind) -> bool {
        let state = self.state();
        state.continuous.contains_key(&kind) || state.triggers.contains_key(&kind)
    }

    /// Total number of trigger requests made for `kind`, re-arms included.
    pub fn trigger_requests(&self, kind: SensorKind) -> u64 {
        self.state().trigger_requests.get(&kind).copied().unwrap_or(0)
    }

    fn check_rejected(state: &ManualState, kind: SensorKind) -> Result<(), ProviderError> {
        if state.rejected.contains(&kind) {
            return Err(ProviderError::Rejected {
                kind,
                reason: "rejected by manual provider".to_string(),
            });
        }
        Ok(())
    }

    fn check_stuck(state: &ManualState, kind: SensorKind) -> Result<(), ProviderError> {
        if state.stuck.contains(&kind) {
            return Err(ProviderError::Rejected {
                kind,
                reason: "listener cannot be removed".to_string(),
            });
        }
        Ok(())
    }
}

impl SensorProvider for ManualProvider {
    fn default_sensor(&self, kind: SensorKind, wake_up: bool) -> Option<SensorHandle> {
        if self.state().unavailable.contains(&kind) {
            None
        } else {
            Some(SensorHandle { kind, wake_up })
        }
    }

    fn register_continuous(
        &self,
        handle: &SensorHandle,
        listener: Arc<dyn SensorListener>,
    ) -> Result<(), ProviderError> {
        let mut state = self.state();
        Self::check_rejected(&state, handle.kind)?;
        state.continuous.insert(handle.kind, listener);
        Ok(())
    }

    fn unregister_continuous(&self, handle: &SensorHandle) -> Result<(), ProviderError> {
        let mut state = self.state();
        Self::check_stuck(&state, handle.kind)?;
        state.continuous.remove(&handle.kind);
        Ok(())
    }

    fn request_trigger(
        &self,
        handle: &SensorHandle,
        listener: Arc<dyn SensorListener>,
    ) -> Result<(), ProviderError> {
        let mut state = self.state();
        Self::check_rejected(&state, handle.kind)?;
        state.triggers.insert(handle.kind, listener);
        *state.trigger_requests.entry(handle.kind).or_insert(0) += 1;
        Ok(())
    }

    fn cancel_trigger(&self, handle: &SensorHandle) -> Result<(), ProviderError> {
        let mut state = self.state();
        Self::check_stuck(&state, handle.kind)?;
        state.triggers.remove(&handle.kind);
        Ok(())
    }
}
