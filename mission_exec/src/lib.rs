//! # Mission library.
//!
//! This library allows other crates in the workspace to access items defined inside the mission
//! executable crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command port - the sequencer's interface to the flight control subsystem
pub mod cmd_port;

/// FCS client - sends commands to the flight control subsystem
pub mod fcs_client;

/// Parameters of the mission executable
pub mod params;

/// Mission plans and their construction from parameters
pub mod plan;

/// Mission sequencer - steps through the plan
pub mod seq;

/// Vehicle status feed - recieves status snapshots from the flight control subsystem
pub mod status_feed;

/// Telecommand processor - applies operator telecommands to the sequencer
pub mod tc_processor;

/// Telecommand server - recieves telecommands from the operator
pub mod tc_server;

/// Telemetry server - publishes the mission telemetry
pub mod tm_server;
