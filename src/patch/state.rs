// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A read-only snapshot of a [`super::CalPatch`], for diagnostics and testing.
//! The `Display` form is for humans; it is not a stable format.

use std::fmt;

use itertools::Itertools;

use crate::{
    interp::{FreqInterp, TimeInterp},
    table::CalType,
};

/// The bracket state of the time interpolator of one output (antenna, spectral
/// window, field).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TripleState {
    /// The table has no solutions for this triple.
    Unusable,

    /// Never queried.
    Unqueried,

    /// The last query used the sample at `index` without blending.
    Exact { time: f64, index: usize },

    /// The last query blended the samples at `index` and `index + 1`.
    Fitted { time: f64, index: usize },
}

impl fmt::Display for TripleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripleState::Unusable => write!(f, "unusable"),
            TripleState::Unqueried => write!(f, "unqueried"),
            TripleState::Exact { time, index } => write!(f, "exact at t={time} (sample {index})"),
            TripleState::Fitted { time, index } => write!(
                f,
                "fitted at t={time} (samples {index}-{})",
                index + 1
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripleSummary {
    pub antenna: usize,
    pub spw: usize,
    pub field: usize,

    /// The table antenna and spectral window used.
    pub input_antenna: usize,
    pub input_spw: usize,

    pub state: TripleState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchState {
    pub cal_type: CalType,
    pub time_interp: TimeInterp,
    pub freq_interp: FreqInterp,

    pub num_input_antennas: usize,
    pub num_output_antennas: usize,
    pub num_input_spws: usize,
    pub num_output_spws: usize,
    pub num_output_fields: usize,

    /// The table antenna for each output antenna.
    pub antenna_map: Vec<usize>,

    /// The table spectral window for each output spectral window.
    pub spw_map: Vec<usize>,

    pub triples: Vec<TripleSummary>,
}

impl PatchState {
    pub fn num_unusable(&self) -> usize {
        self.triples
            .iter()
            .filter(|t| t.state == TripleState::Unusable)
            .count()
    }
}

impl fmt::Display for PatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-state--------")?;
        writeln!(
            f,
            "  cal type: {}; time interp: {}; freq interp: {}",
            self.cal_type, self.time_interp, self.freq_interp
        )?;
        writeln!(
            f,
            "  antennas in/out: {}/{}; spws in/out: {}/{}; fields out: {}",
            self.num_input_antennas,
            self.num_output_antennas,
            self.num_input_spws,
            self.num_output_spws,
            self.num_output_fields
        )?;
        writeln!(f, "  antenna map: [{}]", self.antenna_map.iter().join(", "))?;
        writeln!(f, "  spw map: [{}]", self.spw_map.iter().join(", "))?;
        for t in &self.triples {
            writeln!(
                f,
                "  (ant {}, spw {}, field {}) <- (ant {}, spw {}): {}",
                t.antenna, t.spw, t.field, t.input_antenna, t.input_spw, t.state
            )?;
        }
        write!(f, "--------------")
    }
}
