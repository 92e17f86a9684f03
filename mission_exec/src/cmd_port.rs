//! # Command Port
//!
//! The [`CommandPort`] trait is the sequencer's only way of commanding the vehicle. The real
//! implementation is [`crate::fcs_client::FcsClient`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::fcs::Reference;

use crate::plan::Trajectory;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Commands that can be sent to the flight control subsystem.
///
/// Each call returns once the FCS has accepted or rejected the command, not when the vehicle has
/// finished acting on it.
pub trait CommandPort {
    fn land(&mut self) -> Result<(), CommandError>;

    fn takeoff(&mut self) -> Result<(), CommandError>;

    fn goto_trajectory_start(&mut self) -> Result<(), CommandError>;

    fn start_tracking(&mut self) -> Result<(), CommandError>;

    /// Load a trajectory into the tracker without starting it.
    fn upload_trajectory(&mut self, trajectory: &Trajectory) -> Result<(), CommandError>;

    /// Fly directly to the target.
    fn goto_point(&mut self, target: &Reference, frame_id: &str) -> Result<(), CommandError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// The FCS answered but refused the command
    #[error("Command rejected by the FCS: {0}")]
    Rejected(String),

    /// The FCS could not be reached
    #[error("FCS unreachable: {0}")]
    Unreachable(String),
}

// ------------------------------------------------------------------------------------------------
// MOCKS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// Records every call made to it. Results are popped from `results` in order, `Ok` once it's
    /// empty.
    #[derive(Debug, Default)]
    pub struct RecordingPort {
        pub calls: Vec<String>,
        pub results: VecDeque<Result<(), CommandError>>,
    }

    impl RecordingPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_results(results: Vec<Result<(), CommandError>>) -> Self {
            Self {
                calls: vec![],
                results: results.into(),
            }
        }

        fn record(&mut self, call: String) -> Result<(), CommandError> {
            self.calls.push(call);
            self.results.pop_front().unwrap_or(Ok(()))
        }
    }

    impl CommandPort for RecordingPort {
        fn land(&mut self) -> Result<(), CommandError> {
            self.record("land".into())
        }

        fn takeoff(&mut self) -> Result<(), CommandError> {
            self.record("takeoff".into())
        }

        fn goto_trajectory_start(&mut self) -> Result<(), CommandError> {
            self.record("goto_trajectory_start".into())
        }

        fn start_tracking(&mut self) -> Result<(), CommandError> {
            self.record("start_tracking".into())
        }

        fn upload_trajectory(&mut self, trajectory: &Trajectory) -> Result<(), CommandError> {
            self.record(format!("upload_trajectory({})", trajectory.points.len()))
        }

        fn goto_point(&mut self, target: &Reference, frame_id: &str) -> Result<(), CommandError> {
            self.record(format!(
                "goto_point({}, {}, {}, {}, {})",
                target.x_m, target.y_m, target.z_m, target.heading_rad, frame_id
            ))
        }
    }
}
