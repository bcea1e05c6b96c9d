// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from user-supplied arguments.

use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum CliArgsError {
    #[error("No calibration table was supplied")]
    NoSolutions,

    #[error("No times were supplied to interpolate at")]
    NoTimes,

    #[error("The number of output {what} cannot be 0")]
    ZeroOutputs { what: &'static str },
}
