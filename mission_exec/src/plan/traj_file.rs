//! # Trajectory Files
//!
//! Trajectory files are plain text, one point per row, four numeric columns (x, y, z, heading)
//! separated by a single delimiter character. There is no header row. Blank lines are ignored.
//!
//! A malformed row fails the whole file, it is never skipped.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use comms_if::eqpt::fcs::Reference;
use csv::{ReaderBuilder, StringRecord, Trim};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of columns in a trajectory row.
pub const NUM_COLUMNS: usize = 4;

const COLUMN_NAMES: [&str; NUM_COLUMNS] = ["x", "y", "z", "heading"];

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors from parsing a trajectory. Row indices are zero based line numbers in the file, blank
/// lines included.
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryParseError {
    #[error("Could not open the trajectory file {0:?}: {1}")]
    FileLoadError(PathBuf, std::io::Error),

    #[error("Could not read the trajectory: {0}")]
    InputError(std::io::Error),

    #[error("Row {row} could not be read: {source}")]
    ReadError { row: usize, source: csv::Error },

    #[error("Row {row} has {found} columns, expected {} (x, y, z, heading)", NUM_COLUMNS)]
    WrongColumnCount { row: usize, found: usize },

    #[error("Row {row}: the {column} column ({value:?}) is not a finite number")]
    NotNumeric {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("The trajectory contains no points")]
    Empty,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Load the trajectory file at the given path.
pub fn load<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Vec<Reference>, TrajectoryParseError> {
    let file = File::open(path.as_ref())
        .map_err(|e| TrajectoryParseError::FileLoadError(path.as_ref().to_path_buf(), e))?;

    parse(file, delimiter)
}

/// Parse trajectory rows from a reader.
pub fn parse<R: Read>(mut reader: R, delimiter: u8) -> Result<Vec<Reference>, TrajectoryParseError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(TrajectoryParseError::InputError)?;

    let mut points = Vec::new();

    // Rows are split here rather than by the csv reader, which skips blank lines without counting
    // them
    for (row, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record =
            read_row(line, delimiter).map_err(|source| TrajectoryParseError::ReadError { row, source })?;

        if record.len() != NUM_COLUMNS {
            return Err(TrajectoryParseError::WrongColumnCount {
                row,
                found: record.len(),
            });
        }

        let mut values = [0f64; NUM_COLUMNS];
        for (i, field) in record.iter().enumerate() {
            values[i] = match field.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    return Err(TrajectoryParseError::NotNumeric {
                        row,
                        column: COLUMN_NAMES[i],
                        value: field.to_string(),
                    })
                }
            };
        }

        points.push(Reference {
            x_m: values[0],
            y_m: values[1],
            z_m: values[2],
            heading_rad: values[3],
        });
    }

    if points.is_empty() {
        return Err(TrajectoryParseError::Empty);
    }

    Ok(points)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Split a single non-blank line into its fields.
fn read_row(line: &str, delimiter: u8) -> Result<StringRecord, csv::Error> {
    let mut record = StringRecord::new();

    ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        // Column counts are checked by the caller so the error can name the row
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes())
        .read_record(&mut record)?;

    Ok(record)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
