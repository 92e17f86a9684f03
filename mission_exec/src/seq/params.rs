//! # Sequencer Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::policy::FailureParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeqParams {
    /// Pause after issuing a command before the vehicle's readiness is checked, giving the FCS
    /// time to report the new goal
    #[serde(default = "default_command_settle_s")]
    pub command_settle_s: f64,

    /// Pause after issuing a land command before checking whether the vehicle has landed
    pub land_duration_s: f64,

    /// Maximum time spent in a single readiness wait before the mission is stalled. Unbounded if
    /// not set.
    #[serde(default)]
    pub stall_timeout_s: Option<f64>,

    #[serde(default)]
    pub failure: FailureParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SeqParams {
    fn default() -> Self {
        Self {
            command_settle_s: default_command_settle_s(),
            land_duration_s: 5.0,
            stall_timeout_s: None,
            failure: FailureParams::default(),
        }
    }
}

fn default_command_settle_s() -> f64 {
    1.0
}
