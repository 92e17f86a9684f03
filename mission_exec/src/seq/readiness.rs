//! # Readiness Predicates
//!
//! Pure functions of a single [`VehicleStatus`] snapshot which gate the progression of the
//! mission.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::fcs::{VehicleStatus, NULL_TRACKER};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The condition a readiness wait is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadinessKind {
    /// The vehicle is flying normally and has no active goal, so can accept a new command
    ReadyToCommand,

    /// The vehicle is on the ground with no tracker engaged
    Landed,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ReadinessKind {
    /// Evaluate the predicate against the latest status. No status means not ready.
    pub fn is_met(&self, status: Option<&VehicleStatus>) -> bool {
        match status {
            Some(s) => match self {
                ReadinessKind::ReadyToCommand => ready_to_command(s),
                ReadinessKind::Landed => landed(s),
            },
            None => false,
        }
    }
}

impl std::fmt::Display for ReadinessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadinessKind::ReadyToCommand => write!(f, "ReadyToCommand"),
            ReadinessKind::Landed => write!(f, "Landed"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

pub fn ready_to_command(status: &VehicleStatus) -> bool {
    status.flying_normally && !status.has_active_goal
}

pub fn landed(status: &VehicleStatus) -> bool {
    status.active_tracker == NULL_TRACKER
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn status(flying_normally: bool, has_active_goal: bool, tracker: &str) -> VehicleStatus {
        VehicleStatus {
            flying_normally,
            has_active_goal,
            active_tracker: tracker.into(),
        }
    }

    #[test]
    fn test_ready_to_command() {
        assert!(ready_to_command(&status(true, false, "MpcTracker")));
        assert!(!ready_to_command(&status(true, true, "MpcTracker")));
        assert!(!ready_to_command(&status(false, false, "MpcTracker")));
        assert!(!ready_to_command(&status(false, true, "MpcTracker")));
    }

    #[test]
    fn test_landed() {
        assert!(landed(&status(false, false, "NullTracker")));
        assert!(!landed(&status(false, false, "MpcTracker")));
        assert!(!landed(&status(false, false, "")));
    }

    #[test]
    fn test_no_status_is_not_ready() {
        assert!(!ReadinessKind::ReadyToCommand.is_met(None));
        assert!(!ReadinessKind::Landed.is_met(None));

        let s = status(true, false, "NullTracker");
        assert!(ReadinessKind::ReadyToCommand.is_met(Some(&s)));
        assert!(ReadinessKind::Landed.is_met(Some(&s)));
    }
}
