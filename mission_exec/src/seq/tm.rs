//! # Mission Telemetry

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Snapshot of the sequencer, published and archived once per cycle.
///
/// Kept flat so it can be written directly as a CSV row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionTm {
    pub time_s: f64,

    pub phase: String,

    /// Index of the step being executed
    pub cursor: usize,

    pub num_steps: usize,

    /// Description of the step at the cursor, empty once the mission is over
    pub current_step: String,

    pub activated: bool,

    pub commands_issued: u64,

    pub last_error: Option<String>,

    pub time_in_phase_s: f64,
}
