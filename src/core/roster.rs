//! The fixed set of sensors recorded by every session.

use crate::provider::SensorKind;
use serde::Serialize;

/// Static configuration of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSpec {
    pub kind: SensorKind,
    /// File-name stem of the channel log and tag in log output
    pub label: &'static str,
    pub wake_up: bool,
    /// Trigger-style sensors fire once per occurrence and carry no values
    pub trigger: bool,
}

impl ChannelSpec {
    pub const fn continuous(kind: SensorKind, label: &'static str, wake_up: bool) -> Self {
        Self {
            kind,
            label,
            wake_up,
            trigger: false,
        }
    }

    pub const fn trigger(kind: SensorKind, label: &'static str, wake_up: bool) -> Self {
        Self {
            kind,
            label,
            wake_up,
            trigger: true,
        }
    }
}

/// Roster of the wearable, in recording order.
pub const DEFAULT_ROSTER: [ChannelSpec; 11] = [
    ChannelSpec::continuous(SensorKind::PP, "ppSensor", true),
    ChannelSpec::continuous(SensorKind::HEART_BEAT, "heartBeatSensor", false),
    ChannelSpec::continuous(SensorKind::HEART_RATE, "heartRateSensor", false),
    ChannelSpec::continuous(SensorKind::LIGHT, "lightSensor", false),
    ChannelSpec::continuous(SensorKind::PPG_GAIN, "ppgGainSensor", true),
    ChannelSpec::continuous(SensorKind::PPG, "ppgSensor", true),
    ChannelSpec::trigger(SensorKind::SIGNIFICANT_MOTION, "sigMotionSensor", true),
    ChannelSpec::continuous(SensorKind::GYROSCOPE, "gyroscopeSensor", false),
    ChannelSpec::continuous(SensorKind::GRAVITY, "gravitySensor", false),
    ChannelSpec::continuous(SensorKind::LINEAR_ACCELERATION, "linAccelerationSensor", false),
    ChannelSpec::continuous(SensorKind::GAME_ROTATION_VECTOR, "gameRotationSensor", false),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_roster_labels_are_unique() {
        let labels: HashSet<_> = DEFAULT_ROSTER.iter().map(|c| c.label).collect();
        assert_eq!(labels.len(), DEFAULT_ROSTER.len());
    }

    #[test]
    fn test_only_significant_motion_is_trigger_style() {
        let triggers: Vec<_> = DEFAULT_ROSTER.iter().filter(|c| c.trigger).collect();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].kind, SensorKind::SIGNIFICANT_MOTION);
    }
}
