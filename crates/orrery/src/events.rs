//! Physical events raised during integration
//!
//! Events are checked after every accepted step in the order of
//! [`EventKind::ORDER`]. Each trigger produces an [`AffairRecord`].

use crate::physics::body::BodyId;
use crate::physics::math::{STATE_STRIDE, Scalar};
use orrery_macros::ConfigDefaults;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Ejection,
    HitCentrum,
    Collision,
    CloseEncounter,
    WeakCapture,
}

impl EventKind {
    pub const ORDER: [EventKind; 5] = [
        EventKind::Ejection,
        EventKind::HitCentrum,
        EventKind::Collision,
        EventKind::CloseEncounter,
        EventKind::WeakCapture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Ejection => "ejection",
            EventKind::HitCentrum => "hit_centrum",
            EventKind::Collision => "collision",
            EventKind::CloseEncounter => "close_encounter",
            EventKind::WeakCapture => "weak_capture",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold of one event kind. A zero factor disables the check; `stop`
/// ends the run on the first trigger instead of removing bodies.
#[derive(ConfigDefaults, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct EventCondition {
    #[default(0.0)]
    #[range(0.0..)]
    pub factor: Scalar,

    #[default(false)]
    pub stop: bool,
}

impl EventCondition {
    pub fn new(factor: Scalar, stop: bool) -> Self {
        Self { factor, stop }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.factor > 0.0
    }
}

/// Resolved thresholds for every event kind. Ejection and hit-centrum
/// factors are distances in AU, collision a multiple of the summed radii,
/// close encounter and weak capture multiples of Hill radii.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EventConditions {
    pub ejection: EventCondition,
    pub hit_centrum: EventCondition,
    pub collision: EventCondition,
    pub close_encounter: EventCondition,
    pub weak_capture: EventCondition,
}

impl EventConditions {
    pub fn get(&self, kind: EventKind) -> &EventCondition {
        match kind {
            EventKind::Ejection => &self.ejection,
            EventKind::HitCentrum => &self.hit_centrum,
            EventKind::Collision => &self.collision,
            EventKind::CloseEncounter => &self.close_encounter,
            EventKind::WeakCapture => &self.weak_capture,
        }
    }
}

/// Two-body affair: the participants and their states at the trigger.
/// Single-body events name the central body as `body2`.
#[derive(Debug, Clone, PartialEq)]
pub struct AffairRecord {
    pub id: u64,
    pub kind: EventKind,
    pub body1_id: BodyId,
    pub body2_id: BodyId,
    pub body1_phase: [Scalar; STATE_STRIDE],
    pub body2_phase: [Scalar; STATE_STRIDE],
    pub time: Scalar,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let condition = EventCondition::default();
        assert!(!condition.is_enabled());
        assert!(!condition.stop);
        assert!(EventCondition::new(0.5, true).is_enabled());
    }

    #[test]
    fn test_negative_factor_rejected() {
        assert!(EventCondition::new(-1.0, false).validate_ranges().is_err());
    }

    #[test]
    fn test_lookup_by_kind() {
        let conditions = EventConditions {
            collision: EventCondition::new(1.0, true),
            ..Default::default()
        };
        assert!(conditions.get(EventKind::Collision).stop);
        assert!(!conditions.get(EventKind::Ejection).is_enabled());
        assert_eq!(EventKind::ORDER[2].to_string(), "collision");
    }
}
