//! Archiving of cyclic data to CSV files in the session directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
///
/// Records must be flat (no nested structs, maps or flattened fields), the `csv` crate can't
/// serialise anything else into a row. Records should carry their own `time_s` field.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not create the archive file: {0}")]
    CreateError(std::io::Error),

    #[error("Could not write the record: {0}")]
    WriteError(csv::Error),

    #[error("Could not flush the archive: {0}")]
    FlushError(std::io::Error),

    #[error("The archiver has not been initialised")]
    NotInitialised,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver at a path relative to the session's archive root.
    ///
    /// Any parent directories are created, and an existing file is truncated.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        let full_path = session.arch_root.join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(ArchiveError::CreateError)?;
        }

        let file = File::create(&full_path).map_err(ArchiveError::CreateError)?;

        Ok(Self {
            writer: Some(WriterBuilder::new().has_headers(true).from_writer(file)),
        })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: &T) -> Result<(), ArchiveError> {
        let w = self.writer.as_mut().ok_or(ArchiveError::NotInitialised)?;

        w.serialize(record).map_err(ArchiveError::WriteError)?;

        w.flush().map_err(ArchiveError::FlushError)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
