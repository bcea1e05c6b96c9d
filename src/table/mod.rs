// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Calibration solution tables.
//!
//! A table is a closed, static collection of [`SolutionRow`]s. Anything that
//! can provide ordered row access, channel frequencies and a calibration-type
//! tag can be patched; see [`SolutionTable`]. [`MemCalTable`] is the in-memory
//! implementation that can be read from and written to disk.

pub(crate) mod ao;
mod error;

pub(crate) use error::*;

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
    str::FromStr,
};

use itertools::Itertools;
use log::debug;
use ndarray::prelude::*;
use num_complex::Complex32;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{interp::TimeInterp, CalpatchError};

lazy_static::lazy_static! {
    pub(crate) static ref CAL_TABLE_EXTENSIONS: String = CalTableFileType::iter().join(", ");

    pub(crate) static ref CAL_TYPES: String = CalType::iter().map(|t| format!("'{t}'")).join(", ");
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(crate) enum CalTableFileType {
    /// A serialised [`MemCalTable`].
    #[strum(serialize = "json")]
    Json,

    /// The "André Offringa" format used by mwa-reduce.
    #[strum(serialize = "bin")]
    Bin,
}

/// The kinds of calibration that may be stored in a table. A table declares
/// its kind with a tag (e.g. "G Jones").
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, EnumIter, EnumString)]
pub enum CalType {
    /// Time-variable complex gains, one per polarisation.
    #[strum(serialize = "G Jones")]
    G,

    /// Time-variable complex gains, polarisation independent.
    #[strum(serialize = "T Jones")]
    T,

    /// Complex bandpass, one per polarisation.
    #[strum(serialize = "B Jones")]
    B,

    /// Frequency-dependent complex polarisation leakage.
    #[strum(serialize = "Df Jones")]
    Df,

    /// Real-valued antenna delays \[nanoseconds\].
    #[strum(serialize = "K Jones")]
    K,

    /// Full complex Jones matrices per channel, e.g. solutions from
    /// direction-independent calibration.
    #[strum(serialize = "Jones")]
    Jones,
}

impl CalType {
    /// Are the solutions complex? If so, they are stored in tables as
    /// (amplitude, phase) pairs, so there are two parameters per nominal
    /// parameter.
    pub fn is_complex(self) -> bool {
        !matches!(self, CalType::K)
    }

    /// The number of nominal parameters of the solution, e.g. one complex gain
    /// per polarisation is 2.
    pub fn num_nominal_params(self) -> usize {
        match self {
            CalType::T => 1,
            CalType::G | CalType::B | CalType::Df | CalType::K => 2,
            CalType::Jones => 4,
        }
    }

    /// The number of parameters that each table row stores per channel.
    pub fn num_params(self) -> usize {
        if self.is_complex() {
            2 * self.num_nominal_params()
        } else {
            self.num_nominal_params()
        }
    }

    /// Do the solutions have more than one channel?
    pub fn is_freq_dependent(self) -> bool {
        matches!(self, CalType::B | CalType::Df | CalType::Jones)
    }

    /// The time interpolation used when none is specified.
    pub fn default_time_interp(self) -> TimeInterp {
        match self {
            CalType::B | CalType::K => TimeInterp::Nearest,
            CalType::G | CalType::T | CalType::Df | CalType::Jones => TimeInterp::Linear,
        }
    }
}

/// Convert a complex value into an (amplitude, phase) pair. Phases are in the
/// range (-π, π].
pub fn to_amp_phase(c: Complex32) -> (f32, f32) {
    c.to_polar()
}

/// Convert an (amplitude, phase) pair into a complex value.
pub fn from_amp_phase(amp: f32, phase: f32) -> Complex32 {
    Complex32::from_polar(amp, phase)
}

/// A single calibration measurement for one antenna, spectral window and field
/// at one time. Immutable once it has been put in a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRow {
    /// The centroid time of the solution \[seconds\].
    pub time: f64,

    pub antenna: usize,

    /// The spectral window index.
    pub spw: usize,

    pub field: usize,

    /// The solution parameters. The first dimension is parameter, the second
    /// is channel. For complex calibration types, parameters alternate
    /// between amplitude and phase \[radians\].
    pub params: Array2<f32>,

    /// Flags corresponding to `params`; `true` is bad.
    pub flags: Array2<bool>,
}

impl SolutionRow {
    pub fn new(
        time: f64,
        antenna: usize,
        spw: usize,
        field: usize,
        params: Array2<f32>,
        flags: Array2<bool>,
    ) -> SolutionRow {
        SolutionRow {
            time,
            antenna,
            spw,
            field,
            params,
            flags,
        }
    }

    /// Make a row from complex solutions. `gains` and `flags` have dimensions
    /// (num_nominal_params, num_chans); the row's parameters are (amplitude,
    /// phase) pairs, and each flag applies to both members of its pair.
    pub fn from_complex(
        time: f64,
        antenna: usize,
        spw: usize,
        field: usize,
        gains: ArrayView2<Complex32>,
        flags: ArrayView2<bool>,
    ) -> SolutionRow {
        let (num_nominal, num_chans) = gains.dim();
        let mut params = Array2::zeros((2 * num_nominal, num_chans));
        let mut row_flags = Array2::from_elem((2 * num_nominal, num_chans), false);
        for ((i_par, i_chan), &g) in gains.indexed_iter() {
            let (amp, phase) = to_amp_phase(g);
            params[(2 * i_par, i_chan)] = amp;
            params[(2 * i_par + 1, i_chan)] = phase;
            let f = flags[(i_par, i_chan)];
            row_flags[(2 * i_par, i_chan)] = f;
            row_flags[(2 * i_par + 1, i_chan)] = f;
        }

        SolutionRow {
            time,
            antenna,
            spw,
            field,
            params,
            flags: row_flags,
        }
    }

    pub fn num_params(&self) -> usize {
        self.params.len_of(Axis(0))
    }

    pub fn num_chans(&self) -> usize {
        self.params.len_of(Axis(1))
    }
}

/// Read access to a calibration solution table. Implementors must not change
/// their contents while being patched.
pub trait SolutionTable {
    /// The calibration-type tag, e.g. "G Jones". This is parsed into a
    /// [`CalType`] when the table is patched.
    fn cal_type_tag(&self) -> &str;

    /// The number of parameters per channel in every row (including both
    /// members of amplitude/phase pairs).
    fn num_params(&self) -> usize;

    /// All rows, in storage order.
    fn rows(&self) -> &[SolutionRow];

    /// The channel frequencies of a spectral window \[Hz\], if known.
    fn chan_freqs(&self, spw: usize) -> Option<&[f64]>;

    /// The indices of all rows, sorted by spectral window, then antenna, then
    /// time.
    fn sorted_row_indices(&self) -> Vec<usize> {
        let rows = self.rows();
        let mut indices = (0..rows.len()).collect::<Vec<_>>();
        indices.sort_by(|&a, &b| {
            let (a, b) = (&rows[a], &rows[b]);
            a.spw
                .cmp(&b.spw)
                .then(a.antenna.cmp(&b.antenna))
                .then(a.time.total_cmp(&b.time))
        });
        indices
    }

    /// The distinct antenna indices present, ascendingly sorted.
    fn antennas(&self) -> Vec<usize> {
        self.rows().iter().map(|r| r.antenna).sorted().dedup().collect()
    }

    /// The distinct spectral window indices present, ascendingly sorted.
    fn spws(&self) -> Vec<usize> {
        self.rows().iter().map(|r| r.spw).sorted().dedup().collect()
    }
}

impl<T: SolutionTable + ?Sized> SolutionTable for &T {
    fn cal_type_tag(&self) -> &str {
        (**self).cal_type_tag()
    }

    fn num_params(&self) -> usize {
        (**self).num_params()
    }

    fn rows(&self) -> &[SolutionRow] {
        (**self).rows()
    }

    fn chan_freqs(&self, spw: usize) -> Option<&[f64]> {
        (**self).chan_freqs(spw)
    }
}

/// A calibration solution table held in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemCalTable {
    /// The calibration-type tag, e.g. "G Jones".
    pub cal_type: String,

    /// The number of parameters per channel of every row.
    pub num_params: usize,

    pub rows: Vec<SolutionRow>,

    /// The channel frequencies of each spectral window \[Hz\], indexed by
    /// spectral window. An empty vector means the frequencies are unknown.
    #[serde(default)]
    pub spw_chan_freqs: Vec<Vec<f64>>,
}

impl MemCalTable {
    /// Make an empty table for the calibration type.
    pub fn new(cal_type: CalType) -> MemCalTable {
        MemCalTable {
            cal_type: cal_type.to_string(),
            num_params: cal_type.num_params(),
            rows: vec![],
            spw_chan_freqs: vec![],
        }
    }

    pub fn push_row(&mut self, row: SolutionRow) {
        self.rows.push(row);
    }

    /// Set the channel frequencies of a spectral window \[Hz\].
    pub fn set_chan_freqs(&mut self, spw: usize, freqs: Vec<f64>) {
        if self.spw_chan_freqs.len() <= spw {
            self.spw_chan_freqs.resize(spw + 1, vec![]);
        }
        self.spw_chan_freqs[spw] = freqs;
    }

    /// Read a table from a file. The format of the file is determined by the
    /// file's extension.
    pub fn read_from_ext<P: AsRef<Path>>(file: P) -> Result<MemCalTable, CalpatchError> {
        Self::read_from_ext_inner(file.as_ref()).map_err(CalpatchError::from)
    }

    pub(crate) fn read_from_ext_inner(file: &Path) -> Result<MemCalTable, TableReadError> {
        let ext = file.extension().and_then(|e| e.to_str());
        match ext.and_then(|s| CalTableFileType::from_str(&s.to_lowercase()).ok()) {
            Some(CalTableFileType::Json) => {
                debug!("Reading json calibration table {}", file.display());
                let table = serde_json::from_reader(BufReader::new(File::open(file)?))?;
                Ok(table)
            }
            Some(CalTableFileType::Bin) => ao::read(file),
            None => Err(TableReadError::UnsupportedExt {
                ext: ext.unwrap_or("<no extension>").to_string(),
            }),
        }
    }

    /// From the target file extension, write out the appropriately-formatted
    /// table.
    pub fn write_to_ext<P: AsRef<Path>>(&self, file: P) -> Result<(), CalpatchError> {
        self.write_to_ext_inner(file.as_ref())
            .map_err(CalpatchError::from)
    }

    pub(crate) fn write_to_ext_inner(&self, file: &Path) -> Result<(), TableWriteError> {
        let ext = file.extension().and_then(|e| e.to_str());
        match ext.and_then(|s| CalTableFileType::from_str(&s.to_lowercase()).ok()) {
            Some(CalTableFileType::Json) => {
                let mut f = BufWriter::new(File::create(file)?);
                serde_json::to_writer(&mut f, self)?;
                f.flush()?;
                Ok(())
            }
            Some(CalTableFileType::Bin) => ao::write(self, file),
            None => Err(TableWriteError::UnsupportedExt {
                ext: ext.unwrap_or("<no extension>").to_string(),
            }),
        }
    }
}

impl SolutionTable for MemCalTable {
    fn cal_type_tag(&self) -> &str {
        &self.cal_type
    }

    fn num_params(&self) -> usize {
        self.num_params
    }

    fn rows(&self) -> &[SolutionRow] {
        &self.rows
    }

    fn chan_freqs(&self, spw: usize) -> Option<&[f64]> {
        self.spw_chan_freqs
            .get(spw)
            .filter(|f| !f.is_empty())
            .map(|f| f.as_slice())
    }
}
