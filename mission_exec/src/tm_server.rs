//! # TM Server

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::{zmq, MonitoredSocket, MonitoredSocketError, NetError, NetParams, SocketOptions};

use crate::seq::MissionTm;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send telemetry: {0}")]
    SendError(NetError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TmServerError> {
        let socket_options = SocketOptions {
            bind: true,
            heartbeat_ivl: 500,
            heartbeat_timeout: 1000,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.tm_endpoint)
            .map_err(TmServerError::SocketError)?;

        Ok(Self { socket })
    }

    pub fn send(&mut self, tm: &MissionTm) -> Result<(), TmServerError> {
        self.socket.send_json(tm).map_err(TmServerError::SendError)
    }
}
