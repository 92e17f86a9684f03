//! # Simulated Vehicle
//!
//! Deliberately trivial flight model. Motions take a fixed time regardless of distance, tracking a
//! trajectory takes as long as the trajectory itself, and landing and taking off take fixed times.
//! Commands which make no sense in the current state are rejected, which is what a real flight
//! controller would do.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::fcs::{FcsCmd, FcsCmdResponse, TrajectoryRef, VehicleStatus, NULL_TRACKER};
use log::info;

use crate::params::FcsSimParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Tracker engaged while airborne
const FLIGHT_TRACKER: &str = "MpcTracker";

/// Tracker engaged while landing or taking off
const LANDOFF_TRACKER: &str = "LandoffTracker";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimVehicle {
    params: FcsSimParams,

    state: FlightState,

    /// Time at which the current motion completes
    goal_until_s: Option<f64>,

    trajectory: Option<TrajectoryRef>,

    time_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightState {
    Grounded,
    TakingOff { until_s: f64 },
    Flying,
    Landing { until_s: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimVehicle {
    pub fn new(params: FcsSimParams) -> Self {
        let state = if params.start_airborne {
            FlightState::Flying
        } else {
            FlightState::Grounded
        };

        Self {
            params,
            state,
            goal_until_s: None,
            trajectory: None,
            time_s: 0.0,
        }
    }

    pub fn state(&self) -> FlightState {
        self.state
    }

    /// Advance the simulation to the given time.
    pub fn update(&mut self, time_s: f64) {
        self.time_s = time_s;

        match self.state {
            FlightState::TakingOff { until_s } if time_s >= until_s => {
                info!("Take off complete");
                self.state = FlightState::Flying;
            }
            FlightState::Landing { until_s } if time_s >= until_s => {
                info!("Landed");
                self.state = FlightState::Grounded;
            }
            _ => (),
        }

        if let Some(until_s) = self.goal_until_s {
            if time_s >= until_s {
                self.goal_until_s = None;
            }
        }
    }

    pub fn status(&self) -> VehicleStatus {
        let (flying_normally, tracker) = match self.state {
            FlightState::Grounded => (false, NULL_TRACKER),
            FlightState::TakingOff { .. } | FlightState::Landing { .. } => (false, LANDOFF_TRACKER),
            FlightState::Flying => (true, FLIGHT_TRACKER),
        };

        VehicleStatus {
            flying_normally,
            has_active_goal: self.goal_until_s.is_some(),
            active_tracker: tracker.into(),
        }
    }

    /// Handle a command at the current simulation time.
    pub fn handle_cmd(&mut self, cmd: &FcsCmd) -> FcsCmdResponse {
        let t = self.time_s;

        match cmd {
            FcsCmd::Land => match self.state {
                FlightState::Flying => {
                    self.goal_until_s = None;
                    self.state = FlightState::Landing {
                        until_s: t + self.params.landing_duration_s,
                    };
                    FcsCmdResponse::ok("landing")
                }
                _ => self.reject(cmd, "not flying"),
            },
            FcsCmd::TakeOff => match self.state {
                FlightState::Grounded => {
                    self.state = FlightState::TakingOff {
                        until_s: t + self.params.takeoff_duration_s,
                    };
                    FcsCmdResponse::ok("taking off")
                }
                _ => self.reject(cmd, "not landed"),
            },
            FcsCmd::SetTrajectory(traj) => {
                if traj.points.is_empty() {
                    return self.reject(cmd, "trajectory is empty");
                }
                if !(traj.dt_s.is_finite() && traj.dt_s > 0.0) {
                    return self.reject(cmd, "invalid sampling period");
                }
                if traj.fly_now && self.state != FlightState::Flying {
                    return self.reject(cmd, "not flying");
                }

                if traj.fly_now {
                    self.goal_until_s = Some(t + tracking_duration_s(traj));
                }
                self.trajectory = Some(traj.clone());

                FcsCmdResponse::ok(format!("trajectory of {} points loaded", traj.points.len()))
            }
            FcsCmd::GotoTrajectoryStart => {
                if self.trajectory.is_none() {
                    return self.reject(cmd, "no trajectory loaded");
                }
                if self.state != FlightState::Flying {
                    return self.reject(cmd, "not flying");
                }

                self.goal_until_s = Some(t + self.params.motion_duration_s);
                FcsCmdResponse::ok("flying to the trajectory start")
            }
            FcsCmd::StartTracking => {
                let duration_s = match &self.trajectory {
                    Some(traj) => tracking_duration_s(traj),
                    None => return self.reject(cmd, "no trajectory loaded"),
                };
                if self.state != FlightState::Flying {
                    return self.reject(cmd, "not flying");
                }

                self.goal_until_s = Some(t + duration_s);
                FcsCmdResponse::ok("tracking started")
            }
            FcsCmd::SetPath(path) => {
                if path.points.is_empty() {
                    return self.reject(cmd, "path is empty");
                }
                if self.state != FlightState::Flying {
                    return self.reject(cmd, "not flying");
                }

                if path.fly_now {
                    self.goal_until_s = Some(t + self.params.motion_duration_s);
                }
                FcsCmdResponse::ok("path set")
            }
        }
    }

    fn reject(&self, cmd: &FcsCmd, reason: &str) -> FcsCmdResponse {
        info!("Rejecting {} command: {}", cmd.name(), reason);
        FcsCmdResponse::rejected(reason)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn tracking_duration_s(traj: &TrajectoryRef) -> f64 {
    traj.points.len() as f64 * traj.dt_s
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
