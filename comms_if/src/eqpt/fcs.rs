//! # Flight Control Subsystem Interface
//!
//! Commands sent by the mission executable to the flight control subsystem (FCS), the responses
//! to them, and the status snapshots the FCS publishes.
//!
//! A successful [`FcsCmdResponse`] only means the FCS accepted the command. Whether the vehicle has
//! actually done what was asked is only visible through later [`VehicleStatus`] snapshots.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Tracker name reported by the FCS when no tracker is engaged, i.e. the vehicle is disarmed and
/// on the ground.
pub const NULL_TRACKER: &str = "NullTracker";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A single position and heading reference.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reference {
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
    pub heading_rad: f64,
}

/// A sampled trajectory to be loaded into the FCS trajectory tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRef {
    /// Frame the points are expressed in
    pub frame_id: String,

    /// Time between consecutive points
    pub dt_s: f64,

    /// If true the FCS starts tracking immediately, otherwise it waits for `StartTracking`
    pub fly_now: bool,

    /// If false the FCS ignores the headings of the points
    pub use_heading: bool,

    pub points: Vec<Reference>,
}

/// A path of waypoints for the FCS to fly through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathRef {
    /// Frame the points are expressed in
    pub frame_id: String,

    /// Time the path was issued
    pub stamp: DateTime<Utc>,

    pub fly_now: bool,

    pub use_heading: bool,

    pub points: Vec<Reference>,
}

/// Response from the FCS to a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcsCmdResponse {
    pub success: bool,
    pub message: String,
}

/// Status snapshot published by the FCS.
///
/// Each snapshot replaces the previous one entirely.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleStatus {
    /// The vehicle is airborne and under nominal control
    pub flying_normally: bool,

    /// The active tracker is still working towards a goal
    pub has_active_goal: bool,

    /// Name of the tracker currently engaged, [`NULL_TRACKER`] when on the ground
    pub active_tracker: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command to the FCS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FcsCmd {
    Land,
    TakeOff,
    GotoTrajectoryStart,
    StartTracking,
    SetTrajectory(TrajectoryRef),
    SetPath(PathRef),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FcsCmdResponse {
    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl FcsCmd {
    /// Short name of the command for logging.
    pub fn name(&self) -> &'static str {
        match self {
            FcsCmd::Land => "land",
            FcsCmd::TakeOff => "takeoff",
            FcsCmd::GotoTrajectoryStart => "goto_trajectory_start",
            FcsCmd::StartTracking => "start_tracking",
            FcsCmd::SetTrajectory(_) => "set_trajectory",
            FcsCmd::SetPath(_) => "set_path",
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_json() {
        let json = r#"{
            "flying_normally": true,
            "has_active_goal": false,
            "active_tracker": "MpcTracker"
        }"#;

        let status: VehicleStatus = serde_json::from_str(json).unwrap();
        assert!(status.flying_normally);
        assert!(!status.has_active_goal);
        assert_eq!(status.active_tracker, "MpcTracker");
    }

    #[test]
    fn test_unit_cmd_json() {
        assert_eq!(serde_json::to_string(&FcsCmd::Land).unwrap(), "\"Land\"");

        let cmd: FcsCmd = serde_json::from_str("\"TakeOff\"").unwrap();
        assert_eq!(cmd, FcsCmd::TakeOff);
    }

    #[test]
    fn test_trajectory_cmd_json() {
        let cmd = FcsCmd::SetTrajectory(TrajectoryRef {
            frame_id: "gps_origin".into(),
            dt_s: 0.2,
            fly_now: false,
            use_heading: true,
            points: vec![Reference {
                x_m: 1.0,
                y_m: 2.0,
                z_m: 3.0,
                heading_rad: 0.5,
            }],
        });

        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["SetTrajectory"]["frame_id"], "gps_origin");
        assert_eq!(json["SetTrajectory"]["points"][0]["z_m"], 3.0);
        assert_eq!(cmd.name(), "set_trajectory");
    }
}
