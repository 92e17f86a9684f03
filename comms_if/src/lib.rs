//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the mission software: the messages exchanged
//! with the flight control subsystem, the operator telecommands, and the network layer they travel
//! over.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Telecommands sent by the operator to the mission executable
pub mod tc;

/// Command and status definitions for equipment (the flight control subsystem)
pub mod eqpt;

/// Network module
pub mod net;
