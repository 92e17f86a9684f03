//! Host environment utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Environment variable pointing at the root of the software installation.
///
/// The root contains the `params` and `sessions` directories.
pub const SW_ROOT_ENV_VAR: &str = "DRONE_MGR_ROOT";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
#[error("The software root environment variable ({}) is not set", SW_ROOT_ENV_VAR)]
pub struct SwRootNotSet;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the root directory of the software.
pub fn get_sw_root() -> Result<PathBuf, SwRootNotSet> {
    match env::var_os(SW_ROOT_ENV_VAR) {
        Some(r) if !r.is_empty() => Ok(PathBuf::from(r)),
        _ => Err(SwRootNotSet),
    }
}

/// Get the parameters directory, `<root>/params`.
pub fn get_params_dir() -> Result<PathBuf, SwRootNotSet> {
    let mut path = get_sw_root()?;
    path.push("params");
    Ok(path)
}
