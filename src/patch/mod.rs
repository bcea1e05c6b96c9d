// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Patching of calibration tables: turning a table of solutions sampled at
//! irregular times into something that can be queried at any time (and
//! optionally at any frequencies).
//!
//! A [`CalPatch`] is made once per table. Each query only recomputes the
//! (antenna, spectral window, field) triples whose result depends on the
//! queried time; repeated queries at the same time do no work. Results are
//! written into buffers per output spectral window with dimensions (parameter,
//! channel, antenna), which are reused between queries.

mod error;
mod freq;
mod map;
mod slice;
mod state;
mod time;

pub use error::PatchError;
pub use freq::resample;
pub use map::CalMap;
pub use state::{PatchState, TripleState, TripleSummary};

use std::{borrow::Cow, str::FromStr};

use log::{debug, trace, warn};
use ndarray::prelude::*;
use num_complex::Complex32;

use self::{
    freq::{resample_in_freq, PhaseDelay},
    slice::SliceIndex,
    time::TimeInterpolator,
};
use crate::{
    constants::NUM_OUTPUT_FIELDS,
    interp::{FreqInterp, TimeInterp},
    params::PatchParams,
    table::{from_amp_phase, CalType, SolutionTable},
    CalpatchError,
};

/// The time interpolator of a usable triple, and the position of its slice in
/// the [`SliceIndex`].
#[derive(Debug)]
struct Triple {
    slice: usize,
    interp: TimeInterpolator,
}

#[derive(Debug)]
struct FreqBuffers {
    freqs: Vec<f64>,
    result: Array3<f32>,
    flags: Array3<bool>,
}

/// The buffers of one output (spectral window, field).
#[derive(Debug)]
struct SpwBuffers {
    input_spw: usize,
    result: Array3<f32>,
    flags: Array3<bool>,

    /// Antennas whose time result changed since they were last resampled in
    /// frequency.
    stale: Vec<bool>,

    freq: Option<FreqBuffers>,
}

/// A patched calibration table.
#[derive(Debug)]
pub struct CalPatch<T: SolutionTable> {
    table: T,
    cal_type: CalType,
    time_interp: TimeInterp,
    freq_interp: FreqInterp,
    slices: SliceIndex,

    /// The table antenna of each output antenna.
    antenna_map: Vec<usize>,

    /// The table spectral window of each output spectral window.
    spw_map: Vec<usize>,

    /// Indexed by [`CalPatch::triple_index`]. `None` if unusable.
    triples: Vec<Option<Triple>>,

    /// Indexed by output spectral window and field.
    buffers: Vec<SpwBuffers>,
}

impl<T: SolutionTable> CalPatch<T> {
    /// Arrange the calibration of `table`. Fails if the table can't be used at
    /// all; (antenna, spectral window) combinations without solutions are
    /// reported and flagged in all results.
    pub fn new(table: T, params: &PatchParams) -> Result<CalPatch<T>, CalpatchError> {
        Self::new_inner(table, params).map_err(CalpatchError::from)
    }

    pub(crate) fn new_inner(table: T, params: &PatchParams) -> Result<CalPatch<T>, PatchError> {
        if table.rows().is_empty() {
            return Err(PatchError::EmptyTable);
        }
        let cal_type =
            CalType::from_str(table.cal_type_tag()).map_err(|_| PatchError::UnknownCalType {
                tag: table.cal_type_tag().to_string(),
            })?;
        let num_params = cal_type.num_params();
        if table.num_params() != num_params {
            return Err(PatchError::ParamCountMismatch {
                cal_type: cal_type.to_string(),
                expected: num_params,
                got: table.num_params(),
            });
        }
        let time_interp = params
            .time_interp
            .unwrap_or_else(|| cal_type.default_time_interp());
        if time_interp.tracks_phase() && !cal_type.is_complex() {
            return Err(PatchError::PhaseDelayOnRealTable {
                cal_type: cal_type.to_string(),
            });
        }

        let slices = SliceIndex::build(&table, num_params)?;
        for spw in table.spws() {
            if let (Some(freqs), Some(num_chans)) = (table.chan_freqs(spw), slices.num_chans(spw)) {
                if freqs.len() != num_chans {
                    return Err(PatchError::ChannelFreqCount {
                        spw,
                        num_freqs: freqs.len(),
                        num_chans,
                    });
                }
            }
        }

        let num_output_antennas = params.num_output_antennas.unwrap_or_else(|| {
            if params.antenna_map.is_identity() {
                table.antennas().last().map(|a| a + 1).unwrap_or(0)
            } else {
                params.antenna_map.num_entries()
            }
        });
        let num_output_spws = params.num_output_spws.unwrap_or_else(|| {
            if params.spw_map.is_identity() {
                table.spws().last().map(|s| s + 1).unwrap_or(0)
            } else {
                params.spw_map.num_entries()
            }
        });
        let antenna_map = params.antenna_map.resolve(num_output_antennas);
        let spw_map = params.spw_map.resolve(num_output_spws);

        let phase_pairs = cal_type.is_complex();
        let mut triples =
            Vec::with_capacity(num_output_spws * NUM_OUTPUT_FIELDS * num_output_antennas);
        let mut buffers = Vec::with_capacity(num_output_spws * NUM_OUTPUT_FIELDS);
        for (spw, &input_spw) in spw_map.iter().enumerate() {
            let num_chans = slices.num_chans(input_spw).ok_or(PatchError::MissingSpw {
                output: spw,
                input: input_spw,
            })?;
            // Every table field feeds the single output field.
            for field in 0..NUM_OUTPUT_FIELDS {
                for (antenna, &input_antenna) in antenna_map.iter().enumerate() {
                    match slices.position(input_antenna, input_spw) {
                        Some(slice) => triples.push(Some(Triple {
                            slice,
                            interp: TimeInterpolator::new(
                                time_interp,
                                phase_pairs,
                                num_params,
                                num_chans,
                            ),
                        })),
                        None => {
                            warn!("No solutions for table antenna {input_antenna} in table spw {input_spw}; (antenna {antenna}, spw {spw}, field {field}) will be flagged");
                            triples.push(None);
                        }
                    }
                }

                let shape = (num_params, num_chans, num_output_antennas);
                buffers.push(SpwBuffers {
                    input_spw,
                    result: Array3::zeros(shape),
                    flags: Array3::from_elem(shape, true),
                    stale: vec![true; num_output_antennas],
                    freq: None,
                });
            }
        }

        debug!(
            "Patching '{cal_type}' table: {} slices; {num_output_antennas} output antennas, {num_output_spws} output spws; time interp '{time_interp}', freq interp '{}'",
            slices.len(),
            params.freq_interp
        );
        debug!("Antenna map: {antenna_map:?}");
        debug!("Spw map: {spw_map:?}");

        Ok(CalPatch {
            table,
            cal_type,
            time_interp,
            freq_interp: params.freq_interp,
            slices,
            antenna_map,
            spw_map,
            triples,
            buffers,
        })
    }

    fn triple_index(&self, spw: usize, field: usize, antenna: usize) -> usize {
        (spw * NUM_OUTPUT_FIELDS + field) * self.antenna_map.len() + antenna
    }

    fn buffer_index(&self, spw: usize) -> Result<usize, PatchError> {
        if spw < self.spw_map.len() {
            Ok(spw * NUM_OUTPUT_FIELDS)
        } else {
            Err(PatchError::NoCalibrationArranged { spw })
        }
    }

    /// Interpolate the solutions of every output antenna of output spectral
    /// window `spw` at `time`. Returns `true` if any result changed. Times
    /// outside the range of a slice use the closest solution.
    pub fn interpolate(&mut self, spw: usize, time: f64) -> Result<bool, CalpatchError> {
        self.interpolate_inner(spw, time)
            .map_err(CalpatchError::from)
    }

    pub(crate) fn interpolate_inner(&mut self, spw: usize, time: f64) -> Result<bool, PatchError> {
        let i_buf = self.buffer_index(spw)?;
        let first_triple = self.triple_index(spw, 0, 0);
        let rows = self.table.rows();
        let buffers = &mut self.buffers[i_buf];

        let mut changed = false;
        for (antenna, triple) in self.triples
            [first_triple..first_triple + self.antenna_map.len()]
            .iter_mut()
            .enumerate()
        {
            if let Some(Triple { slice, interp }) = triple {
                if interp.evaluate(rows, self.slices.slice(*slice), time) {
                    buffers
                        .result
                        .slice_mut(s![.., .., antenna])
                        .assign(&interp.result());
                    buffers
                        .flags
                        .slice_mut(s![.., .., antenna])
                        .assign(&interp.flags());
                    buffers.stale[antenna] = true;
                    changed = true;
                }
            }
        }
        if changed {
            trace!("spw {spw}: new results at t={time}");
        }
        Ok(changed)
    }

    /// Interpolate as in [`CalPatch::interpolate`], then resample the results
    /// onto `freqs` \[Hz\]. Returns `true` if anything was resampled. The
    /// table's channel frequencies must be known, unless the calibration type
    /// isn't frequency dependent and has a single channel; those solutions
    /// apply at every frequency.
    pub fn interpolate_freqs(
        &mut self,
        spw: usize,
        time: f64,
        freqs: &[f64],
    ) -> Result<bool, CalpatchError> {
        self.interpolate_freqs_inner(spw, time, freqs)
            .map_err(CalpatchError::from)
    }

    pub(crate) fn interpolate_freqs_inner(
        &mut self,
        spw: usize,
        time: f64,
        freqs: &[f64],
    ) -> Result<bool, PatchError> {
        self.interpolate_inner(spw, time)?;
        let i_buf = self.buffer_index(spw)?;
        let first_triple = self.triple_index(spw, 0, 0);
        let input_spw = self.buffers[i_buf].input_spw;
        let num_chans = self.buffers[i_buf].result.len_of(Axis(1));
        let in_freqs: Cow<[f64]> = match self.table.chan_freqs(input_spw) {
            Some(f) => Cow::Borrowed(f),
            None if !self.cal_type.is_freq_dependent()
                && num_chans == 1
                && !self.time_interp.tracks_phase() =>
            {
                Cow::Owned(vec![freqs.first().copied().unwrap_or_default()])
            }
            None => return Err(PatchError::NoChannelFrequencies { spw: input_spw }),
        };
        let num_antennas = self.antenna_map.len();
        let buffers = &mut self.buffers[i_buf];
        let num_params = buffers.result.len_of(Axis(0));

        // A new grid means everything needs resampling.
        let shape = (num_params, freqs.len(), num_antennas);
        let freq_buffers = match buffers.freq.take() {
            Some(f) if f.freqs.as_slice() == freqs => f,
            Some(mut f) if f.result.dim() == shape => {
                trace!("spw {spw}: new frequencies");
                f.freqs.clear();
                f.freqs.extend_from_slice(freqs);
                buffers.stale.fill(true);
                f
            }
            _ => {
                trace!("spw {spw}: allocating for {} frequencies", freqs.len());
                buffers.stale.fill(true);
                FreqBuffers {
                    freqs: freqs.to_vec(),
                    result: Array3::zeros(shape),
                    flags: Array3::from_elem(shape, true),
                }
            }
        };
        let FreqBuffers {
            result: freq_result,
            flags: freq_flags,
            ..
        } = buffers.freq.insert(freq_buffers);

        // Phase-delay turns apply at the centre channel.
        let ref_freq = in_freqs[in_freqs.len() / 2];
        let phase_pairs = self.cal_type.is_complex();
        let mut changed = false;
        for (antenna, (triple, stale)) in self.triples[first_triple..first_triple + num_antennas]
            .iter()
            .zip(buffers.stale.iter_mut())
            .enumerate()
        {
            if !*stale {
                continue;
            }
            let mut out_values = freq_result.slice_mut(s![.., .., antenna]);
            let mut out_flags = freq_flags.slice_mut(s![.., .., antenna]);
            match triple {
                Some(Triple { interp, .. }) => resample_in_freq(
                    out_values,
                    out_flags,
                    freqs,
                    interp.result(),
                    interp.flags(),
                    &in_freqs,
                    self.freq_interp,
                    phase_pairs,
                    self.time_interp.tracks_phase().then(|| PhaseDelay {
                        ref_freq,
                        turns: interp.turns(),
                    }),
                ),
                None => {
                    out_values.fill(0.0);
                    out_flags.fill(true);
                }
            }
            *stale = false;
            changed = true;
        }
        Ok(changed)
    }

    fn spw_buffers(&self, spw: usize) -> Option<&SpwBuffers> {
        self.buffer_index(spw)
            .ok()
            .and_then(|i| self.buffers.get(i))
    }

    /// The latest time-interpolated solutions of output spectral window `spw`,
    /// with dimensions (parameter, channel, antenna).
    pub fn result(&self, spw: usize) -> Option<ArrayView3<f32>> {
        self.spw_buffers(spw).map(|b| b.result.view())
    }

    /// The flags corresponding to [`CalPatch::result`]; `true` is bad.
    pub fn flags(&self, spw: usize) -> Option<ArrayView3<bool>> {
        self.spw_buffers(spw).map(|b| b.flags.view())
    }

    /// The latest frequency-resampled solutions of output spectral window
    /// `spw`, with dimensions (parameter, frequency, antenna).
    pub fn freq_result(&self, spw: usize) -> Option<ArrayView3<f32>> {
        self.spw_buffers(spw)
            .and_then(|b| b.freq.as_ref())
            .map(|f| f.result.view())
    }

    /// The flags corresponding to [`CalPatch::freq_result`]; `true` is bad.
    pub fn freq_flags(&self, spw: usize) -> Option<ArrayView3<bool>> {
        self.spw_buffers(spw)
            .and_then(|b| b.freq.as_ref())
            .map(|f| f.flags.view())
    }

    /// [`CalPatch::result`] as complex values with dimensions (nominal
    /// parameter, channel, antenna). `None` if the calibration type isn't
    /// complex.
    pub fn result_complex(&self, spw: usize) -> Option<Array3<Complex32>> {
        if !self.cal_type.is_complex() {
            return None;
        }
        self.result(spw).map(pairs_to_complex)
    }

    /// [`CalPatch::freq_result`] as complex values.
    pub fn freq_result_complex(&self, spw: usize) -> Option<Array3<Complex32>> {
        if !self.cal_type.is_complex() {
            return None;
        }
        self.freq_result(spw).map(pairs_to_complex)
    }

    pub fn cal_type(&self) -> CalType {
        self.cal_type
    }

    pub fn time_interp(&self) -> TimeInterp {
        self.time_interp
    }

    pub fn freq_interp(&self) -> FreqInterp {
        self.freq_interp
    }

    pub fn num_output_antennas(&self) -> usize {
        self.antenna_map.len()
    }

    pub fn num_output_spws(&self) -> usize {
        self.spw_map.len()
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    /// A snapshot of the configuration and of every triple's state.
    pub fn state(&self) -> PatchState {
        let mut triples = Vec::with_capacity(self.triples.len());
        for (spw, &input_spw) in self.spw_map.iter().enumerate() {
            for field in 0..NUM_OUTPUT_FIELDS {
                for (antenna, &input_antenna) in self.antenna_map.iter().enumerate() {
                    let state = match &self.triples[self.triple_index(spw, field, antenna)] {
                        Some(t) => t.interp.state(),
                        None => TripleState::Unusable,
                    };
                    triples.push(TripleSummary {
                        antenna,
                        spw,
                        field,
                        input_antenna,
                        input_spw,
                        state,
                    });
                }
            }
        }

        PatchState {
            cal_type: self.cal_type,
            time_interp: self.time_interp,
            freq_interp: self.freq_interp,
            num_input_antennas: self.slices.num_antennas(),
            num_output_antennas: self.antenna_map.len(),
            num_input_spws: self.slices.num_spws(),
            num_output_spws: self.spw_map.len(),
            num_output_fields: NUM_OUTPUT_FIELDS,
            antenna_map: self.antenna_map.clone(),
            spw_map: self.spw_map.clone(),
            triples,
        }
    }
}

/// Convert (amplitude, phase) pairs along the first axis into complex values.
fn pairs_to_complex(pairs: ArrayView3<f32>) -> Array3<Complex32> {
    let (num_params, num_chans, num_antennas) = pairs.dim();
    Array3::from_shape_fn(
        (num_params / 2, num_chans, num_antennas),
        |(i_par, i_chan, i_ant)| {
            from_amp_phase(
                pairs[(2 * i_par, i_chan, i_ant)],
                pairs[(2 * i_par + 1, i_chan, i_ant)],
            )
        },
    )
}
