//! Session management
//!
//! A session is a single run of one of the executables. Each session gets its own directory under
//! `$DRONE_MGR_ROOT/sessions`, holding the log file and any archives written during the run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<Epoch> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
#[derive(Clone, Debug)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

/// Start of the session, as a wall clock time for naming and a monotonic instant for measuring.
///
/// Mission deadlines are computed from elapsed time, so it must not jump when the system clock is
/// stepped.
#[derive(Debug)]
struct Epoch {
    utc: DateTime<Utc>,
    start: Instant,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable ({}) is not set", crate::host::SW_ROOT_ENV_VAR)]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised the \
         session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}`
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        SESSION_EPOCH
            .try_init_once(Epoch::now)
            .map_err(SessionError::CannotInitEpoch)?;

        let timestamp = match SESSION_EPOCH.get() {
            Some(e) => e.utc.format(TIMESTAMP_FORMAT),
            None => return Err(SessionError::CannotGetEpoch),
        };

        let mut path = crate::host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;
        path.push(sessions_dir);
        path.push(format!("{}_{}", exec_name, timestamp));

        fs::create_dir_all(&path).map_err(SessionError::CannotCreateDir)?;

        let arch_root = path.join("arch");
        fs::create_dir_all(&arch_root).map_err(SessionError::CannotCreateDir)?;

        let log_file_path = path.join(format!("{}.log", exec_name));

        Ok(Session {
            session_root: path,
            arch_root,
            log_file_path,
        })
    }
}

impl Epoch {
    fn now() -> Self {
        Self {
            utc: Utc::now(),
            start: Instant::now(),
        }
    }

    fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// Returns `0.0` if the session has not been started yet, so that code shared with tests (which
/// never create a session) can still timestamp things.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => e.elapsed_seconds(),
        None => 0.0,
    }
}

/// Return a reference to the session's epoch, or `None` if no session has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get().map(|e| &e.utc)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
