//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::host;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable ({}) is not set", host::SW_ROOT_ENV_VAR)]
    SwRootNotSet,

    #[error("Cannot load the parameter file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Cannot read the parameter file {0:?}: {1}")]
    DeserialiseError(PathBuf, toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the `$DRONE_MGR_ROOT/params` directory.
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let mut path = host::get_params_dir().map_err(|_| LoadError::SwRootNotSet)?;
    path.push(param_file_path);

    load_path(path)
}

/// Load a parameter file from an explicit path.
pub fn load_path<P, Q>(path: Q) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    Q: AsRef<Path>,
{
    let path = path.as_ref().to_path_buf();

    let params_str = match read_to_string(&path) {
        Ok(s) => s,
        Err(e) => return Err(LoadError::FileLoadError(path, e)),
    };

    toml::from_str(params_str.as_str()).map_err(|e| LoadError::DeserialiseError(path, e))
}

/// Resolve a path found inside a parameter file.
///
/// Absolute paths are returned unchanged, relative ones are taken relative to the params
/// directory (or the current directory if the software root is not set).
pub fn resolve<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();

    if path.is_absolute() {
        return path.to_path_buf();
    }

    match host::get_params_dir() {
        Ok(dir) => dir.join(path),
        Err(_) => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
