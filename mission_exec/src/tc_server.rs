//! # Telecommand Server
//!
//! Serves operator telecommands (see `mission_ctl`). Every request gets exactly one
//! [`TcResponse`], including malformed ones.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetError, NetParams, SocketOptions},
    tc::{Tc, TcResponse},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telecommand server
pub struct TcServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TcServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not parse the recieved telecommand: {0}")]
    TcParseError(NetError),

    #[error("Network error: {0}")]
    NetError(NetError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TcServer {
    /// Create a new instance of the TC server, bound to the telecommand endpoint.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TcServerError> {
        let socket_options = SocketOptions {
            bind: true,
            heartbeat_ivl: 500,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REP, socket_options, &params.tc_endpoint)
            .map_err(TcServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Recieve a single TC.
    ///
    /// Call in a loop until `Ok(None)` is returned, meaning there are no more pending TCs right
    /// now. After recieving a valid TC a response must be sent with `.send_response()` before
    /// attempting to recieve another. If the TC can't be parsed the failure response is sent by
    /// this function.
    pub fn recieve_tc(&self) -> Result<Option<Tc>, TcServerError> {
        match self.socket.recv_json::<Tc>() {
            Ok(tc) => Ok(tc),
            Err(e @ NetError::RecvError(_)) => Err(TcServerError::NetError(e)),
            Err(e) => {
                self.send_response(&TcResponse::failed("Invalid telecommand"))?;
                Err(TcServerError::TcParseError(e))
            }
        }
    }

    /// Send the response to the last recieved TC.
    pub fn send_response(&self, response: &TcResponse) -> Result<(), TcServerError> {
        self.socket
            .send_json(response)
            .map_err(TcServerError::NetError)
    }
}
