//! # Flight Control Subsystem Client
//!
//! Sends [`FcsCmd`]s to the FCS command server and waits for its response. Implements
//! [`CommandPort`] so it can drive the mission sequencer.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use comms_if::{
    eqpt::fcs::{FcsCmd, FcsCmdResponse, PathRef, Reference, TrajectoryRef},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetError, NetParams, SocketOptions},
};
use log::{debug, warn};

use crate::{
    cmd_port::{CommandError, CommandPort},
    plan::Trajectory,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct FcsClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum FcsClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("The client is not connected to the FCS")]
    NotConnected,

    #[error("Network error: {0}")]
    NetError(NetError),

    #[error("The FCS did not respond to the {0} command in time")]
    NoResponse(&'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FcsClient {
    /// Create a new instance of the FCS client.
    ///
    /// `response_timeout_ms` bounds how long a single command waits for the FCS to answer.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        response_timeout_ms: i32,
    ) -> Result<Self, FcsClientError> {
        let socket_options = SocketOptions {
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: response_timeout_ms,
            send_timeout: 10,
            // Allows a new request to be sent after a lost response
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::REQ,
            socket_options,
            &params.fcs_cmd_endpoint,
        )
        .map_err(FcsClientError::SocketError)?;

        Ok(Self { socket })
    }

    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Send a command to the FCS and wait for its response.
    pub fn send_cmd(&mut self, cmd: &FcsCmd) -> Result<FcsCmdResponse, FcsClientError> {
        if !self.socket.connected() {
            return Err(FcsClientError::NotConnected);
        }

        debug!("Sending {} command to the FCS", cmd.name());

        self.socket.send_json(cmd).map_err(FcsClientError::NetError)?;

        match self.socket.recv_json() {
            Ok(Some(r)) => Ok(r),
            Ok(None) => Err(FcsClientError::NoResponse(cmd.name())),
            Err(e) => Err(FcsClientError::NetError(e)),
        }
    }

    fn command(&mut self, cmd: FcsCmd) -> Result<(), CommandError> {
        let result = classify(self.send_cmd(&cmd));

        match &result {
            Err(CommandError::Rejected(m)) => warn!("FCS rejected the {} command: {}", cmd.name(), m),
            Err(CommandError::Unreachable(m)) => warn!("{} command not answered: {}", cmd.name(), m),
            Ok(()) => (),
        }

        result
    }
}

impl CommandPort for FcsClient {
    fn land(&mut self) -> Result<(), CommandError> {
        self.command(FcsCmd::Land)
    }

    fn takeoff(&mut self) -> Result<(), CommandError> {
        self.command(FcsCmd::TakeOff)
    }

    fn goto_trajectory_start(&mut self) -> Result<(), CommandError> {
        self.command(FcsCmd::GotoTrajectoryStart)
    }

    fn start_tracking(&mut self) -> Result<(), CommandError> {
        self.command(FcsCmd::StartTracking)
    }

    fn upload_trajectory(&mut self, trajectory: &Trajectory) -> Result<(), CommandError> {
        self.command(trajectory_cmd(trajectory))
    }

    fn goto_point(&mut self, target: &Reference, frame_id: &str) -> Result<(), CommandError> {
        self.command(goto_cmd(target, frame_id, Utc::now()))
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Map the outcome of a command exchange onto the sequencer's errors.
///
/// Only an answer from the FCS refusing the command is a rejection, anything that prevented an
/// answer arriving leaves the command's fate unknown and is reported as unreachable.
pub fn classify(result: Result<FcsCmdResponse, FcsClientError>) -> Result<(), CommandError> {
    match result {
        Ok(r) if r.success => Ok(()),
        Ok(r) => Err(CommandError::Rejected(r.message)),
        Err(e) => Err(CommandError::Unreachable(e.to_string())),
    }
}

/// Build the command loading a trajectory into the tracker, without starting it.
pub fn trajectory_cmd(trajectory: &Trajectory) -> FcsCmd {
    FcsCmd::SetTrajectory(TrajectoryRef {
        frame_id: trajectory.frame_id.clone(),
        dt_s: trajectory.sample_period_s,
        fly_now: false,
        use_heading: true,
        points: trajectory.points.clone(),
    })
}

/// Build the command flying straight to a single point.
pub fn goto_cmd(target: &Reference, frame_id: &str, stamp: DateTime<Utc>) -> FcsCmd {
    FcsCmd::SetPath(PathRef {
        frame_id: frame_id.into(),
        stamp,
        fly_now: true,
        use_heading: true,
        points: vec![*target],
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        thread,
        time::{Duration, Instant},
    };

    #[test]
    fn test_classify() {
        assert_eq!(classify(Ok(FcsCmdResponse::ok("landing"))), Ok(()));

        assert_eq!(
            classify(Ok(FcsCmdResponse::rejected("not flying"))),
            Err(CommandError::Rejected("not flying".into()))
        );

        assert!(matches!(
            classify(Err(FcsClientError::NoResponse("land"))),
            Err(CommandError::Unreachable(_))
        ));
        assert!(matches!(
            classify(Err(FcsClientError::NotConnected)),
            Err(CommandError::Unreachable(_))
        ));
        assert!(matches!(
            classify(Err(FcsClientError::NetError(NetError::NonUtf8Message))),
            Err(CommandError::Unreachable(_))
        ));
    }

    #[test]
    fn test_request_after_lost_response() {
        let endpoint = "tcp://127.0.0.1:5947";
        let ctx = zmq::Context::new();

        // ROUTER so the server can leave a request unanswered
        let server = ctx.socket(zmq::ROUTER).unwrap();
        server.set_rcvtimeo(5000).unwrap();
        server.set_linger(0).unwrap();
        server.bind(endpoint).unwrap();

        let server_thread = thread::spawn(move || {
            let mut names = Vec::new();

            for i in 0..2 {
                let mut frames = server.recv_multipart(0).unwrap();
                let body = frames.pop().unwrap();
                let cmd: FcsCmd = serde_json::from_slice(&body).unwrap();
                names.push(cmd.name());

                // Drop the first response
                if i == 0 {
                    continue;
                }

                let response = serde_json::to_vec(&FcsCmdResponse::ok("taking off")).unwrap();
                frames.push(response);
                server.send_multipart(frames, 0).unwrap();
            }

            names
        });

        let params = NetParams {
            tc_endpoint: String::new(),
            tm_endpoint: String::new(),
            fcs_cmd_endpoint: endpoint.into(),
            fcs_status_endpoint: String::new(),
        };
        let mut client = FcsClient::new(&ctx, &params, 300).unwrap();

        let start = Instant::now();
        while !client.is_connected() {
            assert!(start.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(10));
        }

        assert!(matches!(
            client.send_cmd(&FcsCmd::TakeOff),
            Err(FcsClientError::NoResponse("takeoff"))
        ));

        // The socket is not wedged waiting for the lost response
        assert_eq!(client.takeoff(), Ok(()));

        assert_eq!(server_thread.join().unwrap(), vec!["takeoff", "takeoff"]);
    }

    #[test]
    fn test_trajectory_cmd() {
        let traj = Trajectory {
            points: vec![Reference::default(); 4],
            sample_period_s: 0.2,
            frame_id: "gps_origin".into(),
        };

        match trajectory_cmd(&traj) {
            FcsCmd::SetTrajectory(t) => {
                assert_eq!(t.points.len(), 4);
                assert_eq!(t.dt_s, 0.2);
                assert_eq!(t.frame_id, "gps_origin");
                assert!(!t.fly_now);
                assert!(t.use_heading);
            }
            c => panic!("Expected SetTrajectory, got {:?}", c),
        }
    }

    #[test]
    fn test_goto_cmd() {
        let target = Reference {
            x_m: 1.0,
            y_m: 2.0,
            z_m: 3.0,
            heading_rad: 0.5,
        };
        let stamp = Utc::now();

        match goto_cmd(&target, "local", stamp) {
            FcsCmd::SetPath(p) => {
                assert_eq!(p.points, vec![target]);
                assert_eq!(p.frame_id, "local");
                assert_eq!(p.stamp, stamp);
                assert!(p.fly_now);
                assert!(p.use_heading);
            }
            c => panic!("Expected SetPath, got {:?}", c),
        }
    }
}
