//! # Mission Plan
//!
//! A mission plan is the ordered, immutable list of steps the [`crate::seq::MissionSequencer`]
//! executes. Plans are validated on construction, so a sequencer can only ever be built from a
//! plan which is non-empty and whose trajectories are usable.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Builds plans from the mission parameters
pub mod layout;

/// Trajectory file ingestion
pub mod traj_file;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use comms_if::eqpt::fcs::Reference;
use serde::{Deserialize, Serialize};

pub use layout::{build_plan, MissionLayout, MissionParams, StepSpec};
pub use traj_file::TrajectoryParseError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A sampled trajectory to be uploaded to the flight control subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub points: Vec<Reference>,

    /// Time between consecutive points
    pub sample_period_s: f64,

    /// Frame the points are expressed in
    pub frame_id: String,
}

/// An ordered, non-empty sequence of mission steps.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionPlan {
    steps: Vec<MissionStep>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A single mission action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MissionStep {
    /// Load a trajectory into the tracker without flying it.
    UploadTrajectory(Trajectory),

    /// Fly to the first point of the uploaded trajectory.
    GotoTrajectoryStart,

    /// Start tracking the uploaded trajectory.
    StartTracking,

    /// Fly to a single point.
    GotoPoint { target: Reference, frame_id: String },

    Land,

    TakeOff,

    /// Do nothing for the given duration, e.g. while refuelling.
    Wait { duration_s: f64 },
}

/// Reasons a plan is invalid.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("The mission plan contains no steps")]
    Empty,

    #[error("Step {0} uploads a trajectory with no points")]
    EmptyTrajectory(usize),

    #[error("Step {0} uploads a trajectory with an invalid sample period ({1} s)")]
    InvalidSamplePeriod(usize, f64),

    #[error("Step {0} waits for an invalid duration ({1} s)")]
    InvalidWait(usize, f64),

    #[error("The mission requires the {0} parameter but it is not set")]
    MissingParam(&'static str),

    #[error("The trajectory delimiter must be a single ASCII character, found {0:?}")]
    InvalidDelimiter(char),

    #[error("Could not load the trajectory: {0}")]
    TrajectoryParseError(TrajectoryParseError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MissionPlan {
    /// Create a new plan from the given steps, validating them.
    pub fn new(steps: Vec<MissionStep>) -> Result<Self, PlanError> {
        if steps.is_empty() {
            return Err(PlanError::Empty);
        }

        for (i, step) in steps.iter().enumerate() {
            match step {
                MissionStep::UploadTrajectory(t) => {
                    if t.points.is_empty() {
                        return Err(PlanError::EmptyTrajectory(i));
                    }
                    if !(t.sample_period_s.is_finite() && t.sample_period_s > 0.0) {
                        return Err(PlanError::InvalidSamplePeriod(i, t.sample_period_s));
                    }
                }
                MissionStep::Wait { duration_s } => {
                    if !(duration_s.is_finite() && *duration_s >= 0.0) {
                        return Err(PlanError::InvalidWait(i, *duration_s));
                    }
                }
                _ => (),
            }
        }

        Ok(Self { steps })
    }

    /// Get the step at the given index, `None` if past the end of the plan.
    pub fn step_at(&self, index: usize) -> Option<&MissionStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false, plans can't be built empty.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MissionStep> {
        self.steps.iter()
    }
}

impl MissionStep {
    /// True if the vehicle must be flying with no active goal before this step's command is
    /// issued.
    ///
    /// A take off always follows a landing, when the vehicle is on the ground and so can never be
    /// "flying normally", and a wait issues no command at all.
    pub fn requires_ready(&self) -> bool {
        !matches!(self, MissionStep::TakeOff | MissionStep::Wait { .. })
    }

    /// True if executing this step calls the flight control subsystem.
    pub fn is_command(&self) -> bool {
        !matches!(self, MissionStep::Wait { .. })
    }
}

impl Display for MissionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionStep::UploadTrajectory(t) => write!(
                f,
                "UploadTrajectory({} points, dt = {} s, frame {})",
                t.points.len(),
                t.sample_period_s,
                t.frame_id
            ),
            MissionStep::GotoTrajectoryStart => write!(f, "GotoTrajectoryStart"),
            MissionStep::StartTracking => write!(f, "StartTracking"),
            MissionStep::GotoPoint { target, frame_id } => write!(
                f,
                "GotoPoint({}, {}, {}, heading {}, frame {})",
                target.x_m, target.y_m, target.z_m, target.heading_rad, frame_id
            ),
            MissionStep::Land => write!(f, "Land"),
            MissionStep::TakeOff => write!(f, "TakeOff"),
            MissionStep::Wait { duration_s } => write!(f, "Wait({} s)", duration_s),
        }
    }
}

impl From<TrajectoryParseError> for PlanError {
    fn from(e: TrajectoryParseError) -> Self {
        PlanError::TrajectoryParseError(e)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn traj(num_points: usize, sample_period_s: f64) -> Trajectory {
        Trajectory {
            points: vec![Reference::default(); num_points],
            sample_period_s,
            frame_id: "gps_origin".into(),
        }
    }

    #[test]
    fn test_empty_plan() {
        assert!(matches!(MissionPlan::new(vec![]), Err(PlanError::Empty)));
    }

    #[test]
    fn test_invalid_trajectories() {
        let res = MissionPlan::new(vec![
            MissionStep::Land,
            MissionStep::UploadTrajectory(traj(0, 0.2)),
        ]);
        assert!(matches!(res, Err(PlanError::EmptyTrajectory(1))));

        for &dt in &[0.0, -0.1, std::f64::INFINITY, std::f64::NAN] {
            let res = MissionPlan::new(vec![MissionStep::UploadTrajectory(traj(3, dt))]);
            assert!(matches!(res, Err(PlanError::InvalidSamplePeriod(0, _))));
        }
    }

    #[test]
    fn test_invalid_wait() {
        let res = MissionPlan::new(vec![MissionStep::Wait { duration_s: -1.0 }]);
        assert!(matches!(res, Err(PlanError::InvalidWait(0, _))));
    }

    #[test]
    fn test_step_access() {
        let plan = MissionPlan::new(vec![
            MissionStep::UploadTrajectory(traj(3, 0.2)),
            MissionStep::Land,
            MissionStep::Wait { duration_s: 5.0 },
        ])
        .unwrap();

        assert_eq!(plan.len(), 3);
        assert!(!plan.is_empty());
        assert_eq!(plan.step_at(1), Some(&MissionStep::Land));
        assert_eq!(plan.step_at(3), None);
        assert_eq!(plan.iter().filter(|s| s.is_command()).count(), 2);
    }

    #[test]
    fn test_readiness_requirements() {
        assert!(MissionStep::Land.requires_ready());
        assert!(MissionStep::StartTracking.requires_ready());
        assert!(!MissionStep::TakeOff.requires_ready());
        assert!(!MissionStep::Wait { duration_s: 1.0 }.requires_ready());
    }
}
