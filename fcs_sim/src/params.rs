//! # Flight Control Simulator Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FcsSimParams {
    /// Period between status publications
    pub cycle_period_s: f64,

    /// If true the vehicle starts hovering, otherwise it starts on the ground
    pub start_airborne: bool,

    /// Duration of a goto or path motion
    pub motion_duration_s: f64,

    pub landing_duration_s: f64,

    pub takeoff_duration_s: f64,
}

impl Default for FcsSimParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.05,
            start_airborne: true,
            motion_duration_s: 3.0,
            landing_duration_s: 4.0,
            takeoff_duration_s: 3.0,
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
    fn test_shipped_params() {
        let params: FcsSimParams = util::params::load_path(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../params/fcs_sim.toml"
        ))
        .unwrap();

        assert!(params.start_airborne);
        assert!(params.cycle_period_s > 0.0);
    }
}
