// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interpolation types. These are given by users as strings (e.g. "linear"),
//! but are resolved into enums once, before any interpolation happens.


use std::str::FromStr;

use itertools::Itertools;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

lazy_static::lazy_static! {
    pub(crate) static ref TIME_INTERP_TYPES: String = TimeInterp::iter().join(", ");

    pub(crate) static ref FREQ_INTERP_TYPES: String = FreqInterp::iter().join(", ");
}

/// How solutions are interpolated in time.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter, EnumString)]
pub enum TimeInterp {
    /// Use the solution closest in time. Ties go to the earlier solution.
    #[strum(serialize = "nearest")]
    Nearest,

    /// Linearly interpolate between the two solutions bracketing a time.
    #[strum(serialize = "linear")]
    Linear,

    /// Like [`TimeInterp::Linear`], but the phases of complex solutions are
    /// treated as phase delays; after resampling in frequency, phases are
    /// scaled relative to the solutions' fiducial frequency.
    #[strum(serialize = "linearPD")]
    LinearPhaseDelay,
}

impl TimeInterp {
    /// Does this type blend two solutions together?
    pub fn is_linear(self) -> bool {
        matches!(self, TimeInterp::Linear | TimeInterp::LinearPhaseDelay)
    }

    /// Does this type need phase tracking after frequency resampling?
    pub fn tracks_phase(self) -> bool {
        matches!(self, TimeInterp::LinearPhaseDelay)
    }
}

/// How solutions are resampled in frequency.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter, EnumString)]
pub enum FreqInterp {
    /// Use the closest unflagged channel. All output flags are cleared.
    #[strum(serialize = "nearest")]
    Nearest,

    /// Linearly interpolate over unflagged channels. All output flags are
    /// cleared.
    #[strum(serialize = "linear")]
    Linear,

    /// As [`FreqInterp::Nearest`], but output flags are taken from the channel
    /// used.
    #[strum(serialize = "nearestflag")]
    NearestFlag,

    /// As [`FreqInterp::Linear`], but an output channel is flagged if either
    /// of the input channels bracketing it is flagged.
    #[strum(serialize = "linearflag")]
    LinearFlag,
}

impl FreqInterp {
    pub fn is_nearest(self) -> bool {
        matches!(self, FreqInterp::Nearest | FreqInterp::NearestFlag)
    }

    /// Are output flags derived from the input flags? If not, all output flags
    /// are cleared.
    pub fn propagates_flags(self) -> bool {
        matches!(self, FreqInterp::NearestFlag | FreqInterp::LinearFlag)
    }
}

impl Default for FreqInterp {
    fn default() -> Self {
        FreqInterp::Linear
    }
}

#[derive(Error, Debug)]
pub enum InterpTypeError {
    #[error("Unrecognised time interpolation type '{0}'; supported types: {}", *TIME_INTERP_TYPES)]
    Time(String),

    #[error("Unrecognised frequency interpolation type '{0}'; supported types: {}", *FREQ_INTERP_TYPES)]
    Freq(String),
}

/// Parse a user-supplied time interpolation string. Surrounding whitespace is
/// ignored.
pub fn parse_time_interp(s: &str) -> Result<TimeInterp, InterpTypeError> {
    TimeInterp::from_str(s.trim()).map_err(|_| InterpTypeError::Time(s.to_string()))
}

/// Parse a user-supplied frequency interpolation string. Surrounding whitespace
/// is ignored.
pub fn parse_freq_interp(s: &str) -> Result<FreqInterp, InterpTypeError> {
    FreqInterp::from_str(s.trim()).map_err(|_| InterpTypeError::Freq(s.to_string()))
}
