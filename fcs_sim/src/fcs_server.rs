//! # FCS Server Module
//!
//! This module abstracts over the networking side of the simulator. Commands are recieved from the
//! mission executable on a REP socket and vehicle status snapshots are published on a PUB socket.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::fcs::{FcsCmd, FcsCmdResponse, VehicleStatus},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetError, NetParams, SocketOptions},
};
use log::warn;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct FcsServer {
    /// REP socket which accepts commands from the client
    cmd_socket: MonitoredSocket,

    /// PUB socket which sends vehicle status to the client
    status_socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors which can occur in the [`FcsServer`]
#[derive(thiserror::Error, Debug)]
pub enum FcsServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send data to the client: {0}")]
    SendError(NetError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FcsServer {
    /// Create a new instance of the FCS server.
    ///
    /// This function will not wait for a connection from the client before returning.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, FcsServerError> {
        let cmd_socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };
        let status_socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let cmd_socket = MonitoredSocket::new(
            ctx,
            zmq::REP,
            cmd_socket_options,
            &params.fcs_cmd_endpoint,
        )?;
        let status_socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            status_socket_options,
            &params.fcs_status_endpoint,
        )?;

        Ok(Self {
            cmd_socket,
            status_socket,
        })
    }

    /// Retrieve a command from the client.
    ///
    /// The user MUST call [`FcsServer::send_response`] after a command is returned. If a message
    /// is recieved which is not a valid command it is rejected by this function and `None` is
    /// returned.
    pub fn get_cmd(&mut self) -> Result<Option<FcsCmd>, FcsServerError> {
        match self.cmd_socket.recv_json() {
            Ok(c) => Ok(c),
            Err(NetError::RecvError(e)) => {
                warn!("Could not read from the command socket: {}", e);
                Ok(None)
            }
            Err(e) => {
                warn!("Recieved an invalid command: {}", e);
                self.send_response(&FcsCmdResponse::rejected("invalid command"))?;
                Ok(None)
            }
        }
    }

    /// Send the response to the last recieved command.
    pub fn send_response(&mut self, response: &FcsCmdResponse) -> Result<(), FcsServerError> {
        self.cmd_socket
            .send_json(response)
            .map_err(FcsServerError::SendError)
    }

    pub fn publish_status(&mut self, status: &VehicleStatus) -> Result<(), FcsServerError> {
        self.status_socket
            .send_json(status)
            .map_err(FcsServerError::SendError)
    }
}

impl From<MonitoredSocketError> for FcsServerError {
    fn from(e: MonitoredSocketError) -> Self {
        FcsServerError::SocketError(e)
    }
}
