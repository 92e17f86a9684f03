//! # Mission Executable Parameters
//!
//! This module provide parameters for the mission executable, loaded from `mission_exec.toml`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{plan::MissionParams, seq::SeqParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionExecParams {
    /// Target period of one cycle of the main loop
    #[serde(default = "default_cycle_period_s")]
    pub cycle_period_s: f64,

    /// Maximum time to wait for the FCS to respond to a command
    #[serde(default = "default_fcs_response_timeout_ms")]
    pub fcs_response_timeout_ms: i32,

    pub mission: MissionParams,

    pub sequencer: SeqParams,
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_cycle_period_s() -> f64 {
    0.1
}

fn default_fcs_response_timeout_ms() -> i32 {
    2000
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{plan::MissionLayout, seq::FailurePolicy};

    #[test]
    fn test_load() {
        let params: MissionExecParams = toml::from_str(
            r#"
            [mission]
            layout = "relay"
            trajectory_file = "trajectories/example.txt"
            trajectory_delimiter = ","
            trajectory_sampling_rate_hz = 5.0
            reference_frame = "gps_origin"
            refilling_time_s = 20.0

            [sequencer]
            land_duration_s = 8.0
            stall_timeout_s = 120.0

            [sequencer.failure]
            on_unreachable = "abort"
            "#,
        )
        .unwrap();

        assert_eq!(params.cycle_period_s, 0.1);
        assert_eq!(params.fcs_response_timeout_ms, 2000);
        assert_eq!(params.mission.layout, MissionLayout::Relay);
        assert_eq!(params.mission.trajectory_delimiter, ',');
        assert_eq!(params.mission.refilling_time_s, Some(20.0));
        assert_eq!(params.mission.delay_s, None);
        assert_eq!(params.sequencer.command_settle_s, 1.0);
        assert_eq!(params.sequencer.stall_timeout_s, Some(120.0));
        assert_eq!(params.sequencer.failure.on_unreachable, FailurePolicy::Abort);
        assert_eq!(params.sequencer.failure.on_rejected, FailurePolicy::Abort);
    }

    #[test]
    fn test_shipped_params() {
        let params: MissionExecParams = util::params::load_path(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../params/mission_exec.toml"
        ))
        .unwrap();

        assert_eq!(params.mission.layout, MissionLayout::Standard);
        assert!(params.mission.goto_destination.is_some());
    }
}
