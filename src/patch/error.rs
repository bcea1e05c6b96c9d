// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with patching calibration tables.

use thiserror::Error;

use crate::table::CAL_TYPES;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("The calibration table has no rows")]
    EmptyTable,

    #[error("Unrecognised calibration type '{tag}'; supported types: {}", *CAL_TYPES)]
    UnknownCalType { tag: String },

    #[error("A '{cal_type}' table should have {expected} parameters per channel, but the table says it has {got}")]
    ParamCountMismatch {
        cal_type: String,
        expected: usize,
        got: usize,
    },

    #[error("Row {row} (antenna {antenna}, spw {spw}) has parameter/flag shapes {got_params:?}/{got_flags:?}, but expected ({expected_params}, {expected_chans})")]
    InconsistentShape {
        row: usize,
        antenna: usize,
        spw: usize,
        got_params: (usize, usize),
        got_flags: (usize, usize),
        expected_params: usize,
        expected_chans: usize,
    },

    #[error("Solution times for antenna {antenna}, spw {spw} are not strictly increasing (time {time} is repeated or out of order)")]
    NonIncreasingTime { antenna: usize, spw: usize, time: f64 },

    #[error("Output spw {output} maps to table spw {input}, but the table has no solutions for it")]
    MissingSpw { output: usize, input: usize },

    #[error("Table spw {spw} has {num_freqs} channel frequencies, but its solutions have {num_chans} channels")]
    ChannelFreqCount {
        spw: usize,
        num_freqs: usize,
        num_chans: usize,
    },

    #[error("Time interpolation 'linearPD' tracks phases, but '{cal_type}' solutions have no phases")]
    PhaseDelayOnRealTable { cal_type: String },

    #[error("No calibration was arranged for output spw {spw}")]
    NoCalibrationArranged { spw: usize },

    #[error("Channel frequencies are needed to resample table spw {spw} in frequency, but none are available")]
    NoChannelFrequencies { spw: usize },
}
