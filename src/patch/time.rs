// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interpolation of a single (antenna, spectral window, field) in time.

use log::trace;
use ndarray::{prelude::*, Zip};

use super::{
    slice::{Bracket, Slice},
    state::TripleState,
};
use crate::{
    constants::{TAU, UNQUERIED_TIME},
    interp::TimeInterp,
    table::SolutionRow,
};

/// Wrap a phase into the range (-π, π].
pub(crate) fn wrap_phase(phase: f32) -> f32 {
    let pi = std::f32::consts::PI;
    let tau = std::f32::consts::TAU;
    let mut p = phase % tau;
    if p <= -pi {
        p += tau;
    } else if p > pi {
        p -= tau;
    }
    p
}

/// Is the parameter at this index a phase?
pub(crate) fn is_phase(phase_pairs: bool, i_param: usize) -> bool {
    phase_pairs && i_param % 2 == 1
}

/// A two-point linear model over adjacent samples of a slice.
#[derive(Debug)]
struct LinearFit {
    t0: f64,
    dt: f64,
    origin: Array2<f32>,

    /// The change in each parameter from the earlier sample to the later one.
    /// For phases, this is the shortest angular path.
    delta: Array2<f32>,

    /// The OR of both samples' flags.
    flags: Array2<bool>,
}

impl LinearFit {
    fn new(earlier: &SolutionRow, later: &SolutionRow, phase_pairs: bool) -> LinearFit {
        let mut delta = &later.params - &earlier.params;
        if phase_pairs {
            delta
                .outer_iter_mut()
                .skip(1)
                .step_by(2)
                .for_each(|mut d| d.mapv_inplace(wrap_phase));
        }
        LinearFit {
            t0: earlier.time,
            dt: later.time - earlier.time,
            origin: earlier.params.clone(),
            delta,
            flags: &earlier.flags | &later.flags,
        }
    }

    fn frac(&self, time: f64) -> f32 {
        ((time - self.t0) / self.dt) as f32
    }
}

/// The time interpolator of one output (antenna, spectral window, field). It
/// refers to the rows of a [`Slice`], but does not own them.
#[derive(Debug)]
pub(crate) struct TimeInterpolator {
    mode: TimeInterp,

    /// Are parameters (amplitude, phase) pairs?
    phase_pairs: bool,

    current_time: f64,

    /// The bracket of the current time, or `None` if never queried. Nearest
    /// interpolation always stores the chosen sample as exact.
    bracket: Option<Bracket>,

    last_was_exact: bool,

    /// Only valid when the current bracket is not exact.
    fit: Option<LinearFit>,

    result: Array2<f32>,
    flags: Array2<bool>,

    /// Phase-delay turns accrued since the earlier sample of the bracket, at
    /// the solutions' fiducial frequency. Zero unless fitting with
    /// [`TimeInterp::LinearPhaseDelay`].
    turns: Array2<f32>,
}

impl TimeInterpolator {
    pub(crate) fn new(
        mode: TimeInterp,
        phase_pairs: bool,
        num_params: usize,
        num_chans: usize,
    ) -> TimeInterpolator {
        let shape = (num_params, num_chans);
        TimeInterpolator {
            mode,
            phase_pairs,
            current_time: UNQUERIED_TIME,
            bracket: None,
            last_was_exact: false,
            fit: None,
            result: Array2::zeros(shape),
            flags: Array2::from_elem(shape, true),
            turns: Array2::zeros(shape),
        }
    }

    /// Evaluate the interpolator at `time`. Returns `true` if anything was
    /// recomputed, or `false` if `time` is the same as the last time.
    pub(crate) fn evaluate(&mut self, rows: &[SolutionRow], slice: &Slice, time: f64) -> bool {
        // NaN times all clamp to the first sample, so they are the same time.
        let same_time =
            time == self.current_time || (time.is_nan() && self.current_time.is_nan());
        if self.bracket.is_some() && same_time {
            return false;
        }

        let bracket = match (slice.bracket(time), self.mode) {
            (Bracket::Between(i), mode) if !mode.is_linear() => {
                let (t0, t1) = (slice.times[i], slice.times[i + 1]);
                if time - t0 <= t1 - time {
                    Bracket::Exact(i)
                } else {
                    Bracket::Exact(i + 1)
                }
            }
            (b, _) => b,
        };

        match bracket {
            Bracket::Exact(i) => {
                let row = &rows[slice.rows[i]];
                self.result.assign(&row.params);
                self.flags.assign(&row.flags);
                self.turns.fill(0.0);
                self.fit = None;
                self.last_was_exact = true;
            }

            Bracket::Between(i) => {
                if self.last_was_exact || self.bracket != Some(bracket) || self.fit.is_none() {
                    trace!(
                        "Fitting between samples {i} and {} (t = {}, {})",
                        i + 1,
                        slice.times[i],
                        slice.times[i + 1]
                    );
                    self.fit = Some(LinearFit::new(
                        &rows[slice.rows[i]],
                        &rows[slice.rows[i + 1]],
                        self.phase_pairs,
                    ));
                }
                if let Some(fit) = self.fit.as_ref() {
                    let frac = fit.frac(time);
                    Zip::from(&mut self.result)
                        .and(&fit.origin)
                        .and(&fit.delta)
                        .for_each(|r, &o, &d| *r = o + d * frac);
                    self.flags.assign(&fit.flags);

                    if self.phase_pairs {
                        for i_param in (1..self.result.len_of(Axis(0))).step_by(2) {
                            self.result.row_mut(i_param).mapv_inplace(wrap_phase);
                        }
                    }

                    if self.mode.tracks_phase() {
                        let tau = TAU as f32;
                        for (i_param, (mut turns, delta)) in self
                            .turns
                            .outer_iter_mut()
                            .zip(fit.delta.outer_iter())
                            .enumerate()
                        {
                            if is_phase(self.phase_pairs, i_param) {
                                Zip::from(&mut turns)
                                    .and(&delta)
                                    .for_each(|t, &d| *t = frac * d / tau);
                            } else {
                                turns.fill(0.0);
                            }
                        }
                    }
                }
                self.last_was_exact = false;
            }
        }

        self.current_time = time;
        self.bracket = Some(bracket);
        true
    }

    pub(crate) fn result(&self) -> ArrayView2<f32> {
        self.result.view()
    }

    pub(crate) fn flags(&self) -> ArrayView2<bool> {
        self.flags.view()
    }

    pub(crate) fn turns(&self) -> ArrayView2<f32> {
        self.turns.view()
    }

    pub(crate) fn state(&self) -> TripleState {
        match self.bracket {
            None => TripleState::Unqueried,
            Some(Bracket::Exact(index)) => TripleState::Exact {
                time: self.current_time,
                index,
            },
            Some(Bracket::Between(index)) => TripleState::Fitted {
                time: self.current_time,
                index,
            },
        }
    }
}
