//! # Mission Sequencer
//!
//! This module implements the [`MissionSequencer`] state machine, which executes a
//! [`MissionPlan`] one step at a time. The sequencer is stepped once per executive cycle and never
//! blocks, all waiting is done in observable phases:
//!
//! - `Idle` - The sequencer has not been activated.
//! - `Armed` - Activated, the mission starts on the next step.
//! - `Running` - Starting the step at the cursor.
//! - `WaitingIdle` - Waiting for the vehicle to be ready for a new command, either before issuing
//!   the step's command or as the completion gate of a motion command.
//! - `Settling` - Fixed pause after a command before readiness is checked.
//! - `Sleeping` - Executing a `Wait` step.
//! - `WaitingLanded` - Waiting for the vehicle to report it has landed.
//! - `Backoff` - Waiting to re-issue a failed command.
//!
//! `Finished`, `Stalled`, `Failed`, and `Cancelled` are terminal, once entered the sequencer never
//! commands the vehicle again.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
pub mod policy;
pub mod readiness;
pub mod tm;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Display;

use comms_if::{eqpt::fcs::VehicleStatus, tc::TcResponse};
use log::{debug, error, info, warn};

use crate::{
    cmd_port::{CommandError, CommandPort},
    plan::{MissionPlan, MissionStep},
};
pub use self::{
    params::SeqParams,
    policy::{FailureAction, FailureParams, FailurePolicy, RetryParams},
    readiness::ReadinessKind,
    tm::MissionTm,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Upper bound on the number of phase changes in one call to [`MissionSequencer::step`], so a
/// long run of zero length steps can't hog a cycle.
const MAX_TRANSITIONS_PER_STEP: usize = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Mission Sequencer
///
/// Owns the plan and all mission state. There is no way to reset a sequencer, a new mission
/// requires a new instance.
pub struct MissionSequencer {
    plan: MissionPlan,

    params: SeqParams,

    /// Index of the step being executed, equal to the length of the plan once finished
    cursor: usize,

    phase: Phase,

    activated: bool,

    /// Number of times the current step's command has been issued
    attempts: u32,

    /// Set when a command for the current step may have reached the FCS without its response
    /// reaching us, so the FCS may already be acting on it
    maybe_delivered: bool,

    /// Total number of commands issued over the mission
    commands_issued: u64,

    last_error: Option<String>,

    /// Time at which the current phase was entered
    phase_entered_s: f64,

    /// Time passed to the most recent call to `step`
    last_time_s: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Armed,
    Running,
    WaitingIdle { since_s: f64, then: AfterWait },
    Settling { until_s: f64, then: ReadinessKind },
    Sleeping { until_s: f64 },
    WaitingLanded { since_s: f64 },
    Backoff { until_s: f64 },
    Finished,
    Stalled { kind: ReadinessKind, waited_s: f64 },
    Failed { step: usize, reason: String },
    Cancelled,
}

/// What to do once a `WaitingIdle` phase is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterWait {
    /// Issue the current step's command
    Issue,

    /// The current step is complete, move to the next one
    Advance,
}

#[derive(Debug, thiserror::Error)]
pub enum SeqError {
    #[error("Waited {waited_s:.1} s for the vehicle to be {kind}, exceeding the stall timeout")]
    StallTimeout { kind: ReadinessKind, waited_s: f64 },
}

/// Result of evaluating the current phase.
enum Transition {
    /// Remain in the current phase
    Stay,

    /// Change phase and evaluate the new one immediately
    Next(Phase),

    /// Change phase and wait for the next step before evaluating it
    Yield(Phase),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MissionSequencer {
    pub fn new(plan: MissionPlan, params: SeqParams) -> Self {
        Self {
            plan,
            params,
            cursor: 0,
            phase: Phase::Idle,
            activated: false,
            attempts: 0,
            maybe_delivered: false,
            commands_issued: 0,
            last_error: None,
            phase_entered_s: 0.0,
            last_time_s: 0.0,
        }
    }

    /// Activate the mission.
    ///
    /// Only the first activation has any effect, all activations get the same response.
    pub fn activate(&mut self) -> TcResponse {
        if self.phase == Phase::Idle {
            self.activated = true;
            self.set_phase(Phase::Armed, self.last_time_s);
        } else {
            info!("Mission already activated, ignoring activation");
        }

        TcResponse::ok("started")
    }

    /// Cancel the mission. Fails if the mission is already over.
    pub fn cancel(&mut self) -> TcResponse {
        if self.phase.is_terminal() {
            return TcResponse::failed(format!("Mission is already over ({})", self.phase));
        }

        warn!("Mission cancelled at step {}", self.cursor);
        self.set_phase(Phase::Cancelled, self.last_time_s);

        TcResponse::ok("cancelled")
    }

    /// Summary of the sequencer's state for the status telecommand.
    pub fn status(&self) -> TcResponse {
        let mut message = format!("{} at step {}/{}", self.phase, self.cursor, self.plan.len());

        if let Some(e) = &self.last_error {
            message.push_str(&format!(", last error: {}", e));
        }

        TcResponse::ok(message)
    }

    /// Step the sequencer.
    ///
    /// `status` is the latest vehicle status snapshot, `None` if none has been received yet.
    pub fn step(&mut self, time_s: f64, status: Option<&VehicleStatus>, port: &mut dyn CommandPort) {
        self.last_time_s = time_s;

        for _ in 0..MAX_TRANSITIONS_PER_STEP {
            match self.transition(time_s, status, port) {
                Transition::Stay => return,
                Transition::Next(p) => self.set_phase(p, time_s),
                Transition::Yield(p) => {
                    self.set_phase(p, time_s);
                    return;
                }
            }
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn get_tm(&self, time_s: f64) -> MissionTm {
        MissionTm {
            time_s,
            phase: self.phase.to_string(),
            cursor: self.cursor,
            num_steps: self.plan.len(),
            current_step: match self.plan.step_at(self.cursor) {
                Some(s) if !self.phase.is_terminal() => s.to_string(),
                _ => String::new(),
            },
            activated: self.activated,
            commands_issued: self.commands_issued,
            last_error: self.last_error.clone(),
            time_in_phase_s: time_s - self.phase_entered_s,
        }
    }

    fn set_phase(&mut self, phase: Phase, time_s: f64) {
        info!("MissionSequencer phase change to: {}", phase);
        self.phase = phase;
        self.phase_entered_s = time_s;
    }

    fn transition(
        &mut self,
        time_s: f64,
        status: Option<&VehicleStatus>,
        port: &mut dyn CommandPort,
    ) -> Transition {
        match self.phase {
            Phase::Idle
            | Phase::Finished
            | Phase::Stalled { .. }
            | Phase::Failed { .. }
            | Phase::Cancelled => Transition::Stay,
            Phase::Armed => Transition::Next(Phase::Running),
            Phase::Running => self.begin_step(time_s, port),
            Phase::WaitingIdle { since_s, then } => {
                if ReadinessKind::ReadyToCommand.is_met(status) {
                    match then {
                        AfterWait::Issue => self.issue(time_s, port),
                        AfterWait::Advance => self.advance(),
                    }
                } else {
                    self.unmet(ReadinessKind::ReadyToCommand, since_s, time_s)
                }
            }
            Phase::Settling { until_s, then } => {
                if time_s < until_s {
                    Transition::Stay
                } else {
                    match then {
                        ReadinessKind::ReadyToCommand => Transition::Next(Phase::WaitingIdle {
                            since_s: time_s,
                            then: AfterWait::Advance,
                        }),
                        ReadinessKind::Landed => {
                            Transition::Next(Phase::WaitingLanded { since_s: time_s })
                        }
                    }
                }
            }
            Phase::Sleeping { until_s } => {
                if time_s < until_s {
                    Transition::Stay
                } else {
                    self.advance()
                }
            }
            Phase::WaitingLanded { since_s } => {
                if ReadinessKind::Landed.is_met(status) {
                    self.advance()
                } else {
                    self.unmet(ReadinessKind::Landed, since_s, time_s)
                }
            }
            Phase::Backoff { until_s } => {
                if time_s < until_s {
                    Transition::Stay
                } else {
                    self.issue(time_s, port)
                }
            }
        }
    }

    /// Start executing the step at the cursor.
    fn begin_step(&mut self, time_s: f64, port: &mut dyn CommandPort) -> Transition {
        let step = match self.plan.step_at(self.cursor) {
            Some(s) => s,
            None => return Transition::Next(Phase::Finished),
        };

        info!("Starting step {}/{}: {}", self.cursor + 1, self.plan.len(), step);

        if let MissionStep::Wait { duration_s } = step {
            return Transition::Next(Phase::Sleeping {
                until_s: time_s + duration_s,
            });
        }

        if step.requires_ready() {
            Transition::Next(Phase::WaitingIdle {
                since_s: time_s,
                then: AfterWait::Issue,
            })
        } else {
            self.issue(time_s, port)
        }
    }

    /// Issue the command for the step at the cursor.
    fn issue(&mut self, time_s: f64, port: &mut dyn CommandPort) -> Transition {
        let (result, post) = match self.plan.step_at(self.cursor) {
            Some(step) => {
                let result = match step {
                    MissionStep::UploadTrajectory(t) => port.upload_trajectory(t),
                    MissionStep::GotoTrajectoryStart => port.goto_trajectory_start(),
                    MissionStep::StartTracking => port.start_tracking(),
                    MissionStep::GotoPoint { target, frame_id } => port.goto_point(target, frame_id),
                    MissionStep::Land => port.land(),
                    MissionStep::TakeOff => port.takeoff(),
                    MissionStep::Wait { duration_s } => {
                        return Transition::Next(Phase::Sleeping {
                            until_s: time_s + duration_s,
                        })
                    }
                };

                (result, self.post_command_phase(step, time_s))
            }
            None => return Transition::Next(Phase::Finished),
        };

        self.attempts += 1;
        self.commands_issued += 1;

        match result {
            Ok(()) => {
                debug!("Step {} command accepted", self.cursor + 1);
                Transition::Yield(post)
            }
            Err(e) => self.handle_failure(e, time_s, post),
        }
    }

    /// The phase entered once a step's command has been accepted.
    fn post_command_phase(&self, step: &MissionStep, time_s: f64) -> Phase {
        match step {
            MissionStep::Land => Phase::Settling {
                until_s: time_s + self.params.land_duration_s,
                then: ReadinessKind::Landed,
            },
            MissionStep::Wait { duration_s } => Phase::Sleeping {
                until_s: time_s + duration_s,
            },
            _ => Phase::Settling {
                until_s: time_s + self.params.command_settle_s,
                then: ReadinessKind::ReadyToCommand,
            },
        }
    }

    fn handle_failure(&mut self, err: CommandError, time_s: f64, post: Phase) -> Transition {
        let step = self.cursor + 1;
        self.last_error = Some(err.to_string());

        match &err {
            // A re-sent command refused after an unanswered one was most likely refused because
            // the first one took effect (e.g. taking off while already taking off)
            CommandError::Rejected(_) if self.maybe_delivered => {
                warn!(
                    "Step {} rejected after an unanswered attempt, assuming the earlier command \
                     was applied: {}",
                    step, err
                );
                return Transition::Yield(post);
            }
            CommandError::Unreachable(_) => self.maybe_delivered = true,
            CommandError::Rejected(_) => (),
        }

        match self.params.failure.decide(&err, self.attempts) {
            FailureAction::Abort => {
                error!(
                    "Step {} failed after {} attempt(s), aborting mission: {}",
                    step, self.attempts, err
                );
                Transition::Next(Phase::Failed {
                    step: self.cursor,
                    reason: err.to_string(),
                })
            }
            FailureAction::Skip => {
                warn!("Step {} failed, skipping it: {}", step, err);

                // The next step's command waits for the next cycle
                match self.advance() {
                    Transition::Next(p) => Transition::Yield(p),
                    t => t,
                }
            }
            FailureAction::Retry { backoff_s } => {
                warn!(
                    "Step {} failed (attempt {} of {}), retrying in {} s: {}",
                    step, self.attempts, self.params.failure.retry.max_attempts, backoff_s, err
                );
                Transition::Yield(Phase::Backoff {
                    until_s: time_s + backoff_s,
                })
            }
            FailureAction::Continue => {
                warn!("Step {} failed, continuing regardless: {}", step, err);
                Transition::Yield(post)
            }
        }
    }

    /// Move the cursor on to the next step.
    fn advance(&mut self) -> Transition {
        self.cursor += 1;
        self.attempts = 0;
        self.maybe_delivered = false;

        if self.cursor >= self.plan.len() {
            info!("All {} mission steps complete", self.plan.len());
            Transition::Next(Phase::Finished)
        } else {
            Transition::Next(Phase::Running)
        }
    }

    /// A readiness wait's predicate isn't met, check if the wait has stalled.
    fn unmet(&mut self, kind: ReadinessKind, since_s: f64, time_s: f64) -> Transition {
        let waited_s = time_s - since_s;

        if let Some(timeout_s) = self.params.stall_timeout_s {
            if waited_s > timeout_s {
                let err = SeqError::StallTimeout { kind, waited_s };
                error!("Mission stalled at step {}: {}", self.cursor + 1, err);
                self.last_error = Some(err.to_string());

                return Transition::Next(Phase::Stalled { kind, waited_s });
            }
        }

        debug!(
            "Step {} waiting for {} ({:.1} s)",
            self.cursor + 1,
            kind,
            waited_s
        );

        Transition::Stay
    }
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Finished | Phase::Stalled { .. } | Phase::Failed { .. } | Phase::Cancelled
        )
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Armed => write!(f, "Armed"),
            Phase::Running => write!(f, "Running"),
            Phase::WaitingIdle { .. } => write!(f, "WaitingIdle({})", ReadinessKind::ReadyToCommand),
            Phase::Settling { .. } => write!(f, "Settling"),
            Phase::Sleeping { .. } => write!(f, "Sleeping"),
            Phase::WaitingLanded { .. } => write!(f, "WaitingLanded"),
            Phase::Backoff { .. } => write!(f, "Backoff"),
            Phase::Finished => write!(f, "Finished"),
            Phase::Stalled { kind, .. } => write!(f, "Stalled({})", kind),
            Phase::Failed { .. } => write!(f, "Failed"),
            Phase::Cancelled => write!(f, "Cancelled"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{cmd_port::mock::RecordingPort, plan::Trajectory};
    use comms_if::eqpt::fcs::Reference;

    const CYCLE_S: f64 = 0.1;

    struct Harness {
        seq: MissionSequencer,
        port: RecordingPort,
        cycle: usize,
    }

    impl Harness {
        fn new(steps: Vec<MissionStep>, params: SeqParams) -> Self {
            Self {
                seq: MissionSequencer::new(MissionPlan::new(steps).unwrap(), params),
                port: RecordingPort::new(),
                cycle: 0,
            }
        }

        fn time_s(&self) -> f64 {
            self.cycle as f64 * CYCLE_S
        }

        /// Step for the given duration, building each cycle's status from the calls made so far.
        fn run<F>(&mut self, duration_s: f64, feed: F)
        where
            F: Fn(&[String]) -> Option<VehicleStatus>,
        {
            let end = self.cycle + (duration_s / CYCLE_S).round() as usize;

            while self.cycle < end {
                let prev_cursor = self.seq.cursor();
                let status = feed(&self.port.calls);
                let time_s = self.time_s();

                self.seq.step(time_s, status.as_ref(), &mut self.port);

                assert!(self.seq.cursor() >= prev_cursor);
                assert!(self.seq.cursor() <= self.seq.plan.len());
                self.cycle += 1;
            }
        }
    }

    fn status(flying_normally: bool, has_active_goal: bool, tracker: &str) -> VehicleStatus {
        VehicleStatus {
            flying_normally,
            has_active_goal,
            active_tracker: tracker.into(),
        }
    }

    /// Always ready, reporting the null tracker once a land command has been issued.
    fn ready_feed(calls: &[String]) -> Option<VehicleStatus> {
        let tracker = if calls.iter().any(|c| c == "land") {
            "NullTracker"
        } else {
            "MpcTracker"
        };
        Some(status(true, false, tracker))
    }

    fn never_ready_feed(_: &[String]) -> Option<VehicleStatus> {
        Some(status(false, false, "MpcTracker"))
    }

    fn scenario_steps() -> Vec<MissionStep> {
        vec![
            MissionStep::UploadTrajectory(Trajectory {
                points: vec![Reference::default(); 3],
                sample_period_s: 0.2,
                frame_id: "gps_origin".into(),
            }),
            MissionStep::GotoTrajectoryStart,
            MissionStep::StartTracking,
            MissionStep::GotoPoint {
                target: Reference {
                    x_m: 1.0,
                    y_m: 2.0,
                    z_m: 3.0,
                    heading_rad: 0.0,
                },
                frame_id: "gps_origin".into(),
            },
            MissionStep::Land,
            MissionStep::Wait { duration_s: 5.0 },
            MissionStep::TakeOff,
        ]
    }

    #[test]
    fn test_full_mission() {
        let mut h = Harness::new(scenario_steps(), SeqParams::default());
        h.seq.activate();

        let mut land_time_s = None;
        let mut takeoff_time_s = None;

        for _ in 0..300 {
            let num_calls = h.port.calls.len();
            let time_s = h.time_s();
            h.run(CYCLE_S, ready_feed);

            if h.port.calls.len() > num_calls {
                match h.port.calls.last().map(|s| s.as_str()) {
                    Some("land") => land_time_s = Some(time_s),
                    Some("takeoff") => takeoff_time_s = Some(time_s),
                    _ => (),
                }
            }
        }

        assert_eq!(
            h.port.calls,
            vec![
                "upload_trajectory(3)",
                "goto_trajectory_start",
                "start_tracking",
                "goto_point(1, 2, 3, 0, gps_origin)",
                "land",
                "takeoff",
            ]
        );
        assert_eq!(h.seq.phase(), &Phase::Finished);
        assert_eq!(h.seq.cursor(), 7);

        // Land settle then the wait must both elapse before taking off
        let land_time_s = land_time_s.unwrap();
        let takeoff_time_s = takeoff_time_s.unwrap();
        assert!(takeoff_time_s - land_time_s >= 10.0 - 1e-6);

        let tm = h.seq.get_tm(h.time_s());
        assert_eq!(tm.phase, "Finished");
        assert_eq!(tm.commands_issued, 6);
        assert_eq!(tm.num_steps, 7);
        assert_eq!(tm.current_step, "");
        assert!(tm.last_error.is_none());
    }

    #[test]
    fn test_not_activated() {
        let mut h = Harness::new(scenario_steps(), SeqParams::default());
        h.run(5.0, ready_feed);

        assert!(h.port.calls.is_empty());
        assert_eq!(h.seq.phase(), &Phase::Idle);
        assert!(!h.seq.is_activated());
    }

    #[test]
    fn test_never_ready() {
        let mut h = Harness::new(scenario_steps(), SeqParams::default());
        h.seq.activate();
        h.run(60.0, never_ready_feed);

        assert!(h.port.calls.is_empty());
        assert!(matches!(
            h.seq.phase(),
            Phase::WaitingIdle {
                then: AfterWait::Issue,
                ..
            }
        ));
        assert!(h.seq.get_tm(h.time_s()).time_in_phase_s > 59.0);

        // No status at all is also never ready
        let mut h = Harness::new(scenario_steps(), SeqParams::default());
        h.seq.activate();
        h.run(10.0, |_| None);
        assert!(h.port.calls.is_empty());
        assert!(matches!(h.seq.phase(), Phase::WaitingIdle { .. }));
    }

    #[test]
    fn test_stall_timeout() {
        let params = SeqParams {
            stall_timeout_s: Some(2.0),
            ..Default::default()
        };
        let mut h = Harness::new(scenario_steps(), params);
        h.seq.activate();

        h.run(1.5, never_ready_feed);
        assert!(matches!(h.seq.phase(), Phase::WaitingIdle { .. }));

        h.run(1.5, never_ready_feed);
        assert!(matches!(
            h.seq.phase(),
            Phase::Stalled {
                kind: ReadinessKind::ReadyToCommand,
                ..
            }
        ));
        assert!(h.port.calls.is_empty());
        assert!(h.seq.get_tm(h.time_s()).last_error.is_some());

        // Terminal, becoming ready changes nothing
        h.run(5.0, ready_feed);
        assert!(h.port.calls.is_empty());
        assert!(h.seq.is_terminal());
    }

    #[test]
    fn test_landed_stall() {
        let params = SeqParams {
            land_duration_s: 1.0,
            stall_timeout_s: Some(3.0),
            ..Default::default()
        };
        let mut h = Harness::new(vec![MissionStep::Land, MissionStep::TakeOff], params);
        h.seq.activate();

        // Ready to command but never lands
        h.run(10.0, |_| Some(status(true, false, "MpcTracker")));

        assert_eq!(h.port.calls, vec!["land"]);
        assert!(matches!(
            h.seq.phase(),
            Phase::Stalled {
                kind: ReadinessKind::Landed,
                ..
            }
        ));
    }

    #[test]
    fn test_activate_idempotent() {
        let mut h = Harness::new(scenario_steps(), SeqParams::default());

        let first = h.seq.activate();
        assert!(first.success);
        assert_eq!(h.seq.phase(), &Phase::Armed);

        assert_eq!(h.seq.activate(), first);
        assert_eq!(h.seq.phase(), &Phase::Armed);

        h.run(3.0, ready_feed);
        let cursor = h.seq.cursor();
        let num_calls = h.port.calls.len();
        assert!(cursor > 0);

        assert_eq!(h.seq.activate(), first);
        assert_eq!(h.seq.cursor(), cursor);
        assert_eq!(h.port.calls.len(), num_calls);
    }

    #[test]
    fn test_cancel() {
        let mut h = Harness::new(scenario_steps(), SeqParams::default());
        h.seq.activate();
        h.run(1.5, ready_feed);

        let num_calls = h.port.calls.len();
        assert!(num_calls > 0);

        assert!(h.seq.cancel().success);
        assert_eq!(h.seq.phase(), &Phase::Cancelled);

        h.run(30.0, ready_feed);
        assert_eq!(h.port.calls.len(), num_calls);

        // Already over
        assert!(!h.seq.cancel().success);
        assert!(h.seq.activate().success);
        assert_eq!(h.seq.phase(), &Phase::Cancelled);
    }

    #[test]
    fn test_cancel_before_activation() {
        let mut h = Harness::new(scenario_steps(), SeqParams::default());
        assert!(h.seq.cancel().success);

        h.seq.activate();
        h.run(5.0, ready_feed);

        assert!(h.port.calls.is_empty());
        assert_eq!(h.seq.phase(), &Phase::Cancelled);
    }

    #[test]
    fn test_rejected_aborts() {
        let mut h = Harness::new(scenario_steps(), SeqParams::default());
        h.port = RecordingPort::with_results(vec![
            Ok(()),
            Err(CommandError::Rejected("no trajectory".into())),
        ]);
        h.seq.activate();
        h.run(30.0, ready_feed);

        assert_eq!(
            h.port.calls,
            vec!["upload_trajectory(3)", "goto_trajectory_start"]
        );
        assert!(matches!(h.seq.phase(), Phase::Failed { step: 1, .. }));
        assert_eq!(h.seq.cursor(), 1);
    }

    #[test]
    fn test_unreachable_retries() {
        let mut h = Harness::new(vec![MissionStep::StartTracking], SeqParams::default());
        h.port = RecordingPort::with_results(vec![
            Err(CommandError::Unreachable("timeout".into())),
            Err(CommandError::Unreachable("timeout".into())),
            Err(CommandError::Unreachable("timeout".into())),
        ]);
        h.seq.activate();

        h.run(0.3, ready_feed);
        assert_eq!(h.port.calls.len(), 1);
        assert!(matches!(h.seq.phase(), Phase::Backoff { .. }));

        h.run(0.5, ready_feed);
        assert_eq!(h.port.calls.len(), 2);

        h.run(5.0, ready_feed);
        assert_eq!(h.port.calls.len(), 3);
        assert!(matches!(h.seq.phase(), Phase::Failed { step: 0, .. }));
    }

    #[test]
    fn test_unreachable_then_recovers() {
        let mut h = Harness::new(vec![MissionStep::StartTracking], SeqParams::default());
        h.port =
            RecordingPort::with_results(vec![Err(CommandError::Unreachable("timeout".into()))]);
        h.seq.activate();
        h.run(10.0, ready_feed);

        assert_eq!(h.port.calls, vec!["start_tracking", "start_tracking"]);
        assert_eq!(h.seq.phase(), &Phase::Finished);
        assert!(h.seq.get_tm(h.time_s()).last_error.is_some());
    }

    #[test]
    fn test_rejected_after_unanswered_command() {
        let mut h = Harness::new(vec![MissionStep::TakeOff], SeqParams::default());
        h.port = RecordingPort::with_results(vec![
            Err(CommandError::Unreachable("timeout".into())),
            Err(CommandError::Rejected("not landed".into())),
        ]);
        h.seq.activate();

        h.run(0.3, |_| Some(status(false, false, "LandoffTracker")));
        assert_eq!(h.port.calls, vec!["takeoff"]);
        assert!(matches!(h.seq.phase(), Phase::Backoff { .. }));

        // The first take off went through, the re-sent one is refused
        h.run(0.5, |_| Some(status(false, false, "LandoffTracker")));
        assert_eq!(h.port.calls, vec!["takeoff", "takeoff"]);
        assert!(matches!(
            h.seq.phase(),
            Phase::Settling {
                then: ReadinessKind::ReadyToCommand,
                ..
            }
        ));

        h.run(5.0, |_| Some(status(true, false, "MpcTracker")));
        assert_eq!(h.port.calls.len(), 2);
        assert_eq!(h.seq.phase(), &Phase::Finished);
        assert!(h.seq.get_tm(h.time_s()).last_error.is_some());
    }

    #[test]
    fn test_rejected_after_unanswered_is_per_step() {
        let mut h = Harness::new(
            vec![MissionStep::StartTracking, MissionStep::TakeOff],
            SeqParams::default(),
        );
        h.port = RecordingPort::with_results(vec![
            Err(CommandError::Unreachable("timeout".into())),
            Ok(()),
            Err(CommandError::Rejected("not landed".into())),
        ]);
        h.seq.activate();
        h.run(20.0, ready_feed);

        // The take off's own rejection still aborts
        assert_eq!(
            h.port.calls,
            vec!["start_tracking", "start_tracking", "takeoff"]
        );
        assert!(matches!(h.seq.phase(), Phase::Failed { step: 1, .. }));
    }

    #[test]
    fn test_skip_policy() {
        let mut params = SeqParams::default();
        params.failure.on_rejected = FailurePolicy::Skip;

        let mut h = Harness::new(vec![MissionStep::StartTracking, MissionStep::Land], params);
        h.port = RecordingPort::with_results(vec![Err(CommandError::Rejected("busy".into()))]);
        h.seq.activate();

        // One command per cycle, the land follows on the next cycle without the start tracking
        // completion wait
        h.run(0.1, ready_feed);
        assert_eq!(h.port.calls, vec!["start_tracking"]);
        assert_eq!(h.seq.phase(), &Phase::Running);
        assert_eq!(h.seq.cursor(), 1);

        h.run(0.1, ready_feed);
        assert_eq!(h.port.calls, vec!["start_tracking", "land"]);

        h.run(20.0, ready_feed);
        assert_eq!(h.seq.phase(), &Phase::Finished);
    }

    #[test]
    fn test_continue_policy() {
        let mut params = SeqParams::default();
        params.failure.on_rejected = FailurePolicy::Continue;

        let mut h = Harness::new(vec![MissionStep::StartTracking, MissionStep::TakeOff], params);
        h.port = RecordingPort::with_results(vec![Err(CommandError::Rejected("busy".into()))]);
        h.seq.activate();

        h.run(0.5, ready_feed);
        assert_eq!(h.port.calls, vec!["start_tracking"]);
        assert!(matches!(h.seq.phase(), Phase::Settling { .. }));

        h.run(10.0, ready_feed);
        assert_eq!(h.port.calls, vec!["start_tracking", "takeoff"]);
        assert_eq!(h.seq.phase(), &Phase::Finished);
    }

    #[test]
    fn test_takeoff_not_gated() {
        let mut h = Harness::new(vec![MissionStep::TakeOff], SeqParams::default());
        h.seq.activate();

        // Grounded vehicle, never "flying normally" until the take off
        h.run(0.1, |_| Some(status(false, false, "NullTracker")));
        assert_eq!(h.port.calls, vec!["takeoff"]);

        // Completion still waits for the vehicle to be ready
        h.run(5.0, |_| Some(status(false, false, "NullTracker")));
        assert!(matches!(
            h.seq.phase(),
            Phase::WaitingIdle {
                then: AfterWait::Advance,
                ..
            }
        ));

        h.run(0.1, |_| Some(status(true, false, "MpcTracker")));
        assert_eq!(h.seq.phase(), &Phase::Finished);
    }

    #[test]
    fn test_status_message() {
        let mut h = Harness::new(scenario_steps(), SeqParams::default());
        let status = h.seq.status();
        assert!(status.success);
        assert_eq!(status.message, "Idle at step 0/7");

        h.seq.activate();
        h.run(0.1, never_ready_feed);
        assert_eq!(
            h.seq.status().message,
            "WaitingIdle(ReadyToCommand) at step 0/7"
        );
    }
}
