//! # Telecommand module
//!
//! Telecommands are sent by the operator (see `mission_ctl`) to the mission executable's
//! telecommand server, which answers every one with a [`TcResponse`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use structopt::StructOpt;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Response to a telecommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcResponse {
    /// True if the telecommand was accepted
    pub success: bool,

    /// Human readable message
    pub message: String,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the mission executable by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, StructOpt)]
pub enum Tc {
    /// Start the mission. Has no effect if the mission has already been started.
    #[structopt(name = "activate")]
    Activate,

    /// Cancel the mission. No further commands will be sent to the vehicle.
    #[structopt(name = "cancel")]
    Cancel,

    /// Report the current state of the mission.
    #[structopt(name = "status")]
    Status,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TcResponse {
    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
