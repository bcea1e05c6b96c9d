// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading or writing calibration tables.

use thiserror::Error;

use super::CAL_TABLE_EXTENSIONS;

#[derive(Error, Debug)]
pub(crate) enum TableReadError {
    #[error("Tried to read a calibration table with an unsupported extension '{ext}'! Supported extensions: {}", *CAL_TABLE_EXTENSIONS)]
    UnsupportedExt { ext: String },

    #[error(
        "When reading {file}, expected MWAOCAL as the first 7 characters, got '{got}' instead!"
    )]
    AndreBinaryStr { file: String, got: String },

    #[error(
        "When reading {file}, expected a value {expected} in the header, but got '{got}' instead!"
    )]
    AndreBinaryVal {
        file: String,
        expected: &'static str,
        got: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub(crate) enum TableWriteError {
    #[error("Tried to write a calibration table with an unsupported extension '{ext}'! Supported extensions: {}", *CAL_TABLE_EXTENSIONS)]
    UnsupportedExt { ext: String },

    #[error("Only 'Jones' tables can be written in the André Offringa format, but this table is '{got}'")]
    AndreNotJones { got: String },

    #[error("The André Offringa format only holds one spectral window, but this table has {num}")]
    AndreMultipleSpws { num: usize },

    #[error("Row {row} has {got} parameters and {got_chans} channels, but expected 8 parameters and {expected_chans} channels")]
    AndreRowShape {
        row: usize,
        got: usize,
        got_chans: usize,
        expected_chans: usize,
    },

    #[error("Cannot write an empty table")]
    Empty,

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
