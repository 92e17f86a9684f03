//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with equipment servers.

/// Flight control subsystem commands and status
pub mod fcs;
