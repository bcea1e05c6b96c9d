// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all calpatch-related errors. This should be the *only* error
//! enum that is publicly visible from the binary's point of view.

use thiserror::Error;

use crate::{
    cli::CliArgsError,
    interp::InterpTypeError,
    patch::PatchError,
    table::{TableReadError, TableWriteError},
};

/// The top-level error. Each variant carries the display string of a lower-level
/// error, plus a hint about what kind of problem it is.
#[derive(Error, Debug)]
pub enum CalpatchError {
    /// An error related to reading or writing calibration tables.
    #[error("{0}\n\nCalibration tables may be 'json' (serialised tables) or 'bin' (André Offringa) files.")]
    Table(String),

    /// A calibration table that can't be patched.
    #[error("{0}\n\nThe calibration table cannot be patched.")]
    Patch(String),

    /// An error when querying a patched table.
    #[error("{0}")]
    Query(String),

    /// An error related to interpolation types.
    #[error("{0}")]
    Interp(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files may be toml or json; any command-line arguments override those in the file.")]
    ArgFile(String),

    /// An error related to command-line arguments.
    #[error("{0}")]
    Args(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<TableReadError> for CalpatchError {
    fn from(e: TableReadError) -> Self {
        match e {
            TableReadError::IO(_) => Self::Generic(e.to_string()),
            TableReadError::UnsupportedExt { .. }
            | TableReadError::AndreBinaryStr { .. }
            | TableReadError::AndreBinaryVal { .. }
            | TableReadError::Json(_) => Self::Table(e.to_string()),
        }
    }
}

impl From<TableWriteError> for CalpatchError {
    fn from(e: TableWriteError) -> Self {
        match e {
            TableWriteError::IO(_) => Self::Generic(e.to_string()),
            TableWriteError::UnsupportedExt { .. }
            | TableWriteError::AndreNotJones { .. }
            | TableWriteError::AndreMultipleSpws { .. }
            | TableWriteError::AndreRowShape { .. }
            | TableWriteError::Empty
            | TableWriteError::Json(_) => Self::Table(e.to_string()),
        }
    }
}

impl From<PatchError> for CalpatchError {
    fn from(e: PatchError) -> Self {
        match e {
            PatchError::EmptyTable
            | PatchError::UnknownCalType { .. }
            | PatchError::ParamCountMismatch { .. }
            | PatchError::InconsistentShape { .. }
            | PatchError::NonIncreasingTime { .. }
            | PatchError::MissingSpw { .. }
            | PatchError::ChannelFreqCount { .. }
            | PatchError::PhaseDelayOnRealTable { .. } => Self::Patch(e.to_string()),
            PatchError::NoCalibrationArranged { .. } | PatchError::NoChannelFrequencies { .. } => {
                Self::Query(e.to_string())
            }
        }
    }
}

impl From<InterpTypeError> for CalpatchError {
    fn from(e: InterpTypeError) -> Self {
        Self::Interp(e.to_string())
    }
}

impl From<CliArgsError> for CalpatchError {
    fn from(e: CliArgsError) -> Self {
        match e {
            CliArgsError::NoSolutions | CliArgsError::NoTimes | CliArgsError::ZeroOutputs { .. } => {
                Self::Args(e.to_string())
            }
        }
    }
}

impl From<std::io::Error> for CalpatchError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
