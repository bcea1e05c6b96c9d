// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Resampling of per-channel solutions onto other channel frequencies.
//!
//! Frequencies outside the range of the (unflagged) source frequencies take the
//! value of the nearest end; nothing is extrapolated. Either grid may be
//! ascending or descending.

use std::cmp::Ordering;

use ndarray::prelude::*;

use super::time::{is_phase, wrap_phase};
use crate::{
    constants::{FREQ_MATCH_TOLERANCE, TAU},
    interp::FreqInterp,
};

/// Phase-delay corrections applied to phases after resampling.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PhaseDelay<'a> {
    /// The frequency at which `turns` apply \[Hz\].
    pub(crate) ref_freq: f64,

    /// Phase-delay turns per parameter and source channel.
    pub(crate) turns: ArrayView2<'a, f32>,
}

/// A source sample.
#[derive(Debug, Clone, Copy)]
struct Sample {
    freq: f64,
    value: f64,
}

/// Do the frequencies match within [`FREQ_MATCH_TOLERANCE`]?
fn freqs_match(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(&x, &y)| (x - y).abs() <= FREQ_MATCH_TOLERANCE * x.abs().max(y.abs()))
}

/// Remove 2π jumps between consecutive phases.
fn unwrap_phases(phases: &mut [f64]) {
    let mut offset = 0.0;
    let mut prev = match phases.first() {
        Some(&p) => p,
        None => return,
    };
    for p in phases.iter_mut().skip(1) {
        let raw = *p;
        let d = raw - prev;
        if d > TAU / 2.0 {
            offset -= TAU * ((d + TAU / 2.0) / TAU).floor();
        } else if d < -TAU / 2.0 {
            offset += TAU * ((-d + TAU / 2.0) / TAU).floor();
        }
        prev = raw;
        *p = raw + offset;
    }
}

/// Interpolate ascending `samples` at `freq`, clamping to the ends.
fn interp_onto(samples: &[Sample], freq: f64, nearest: bool) -> f64 {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return 0.0,
    };
    if !(freq > first.freq) {
        return first.value;
    }
    if freq >= last.freq {
        return last.value;
    }
    // first.freq < freq < last.freq, so there are samples on both sides.
    let i = samples.partition_point(|s| s.freq <= freq) - 1;
    let (s0, s1) = (samples[i], samples[i + 1]);
    let frac = (freq - s0.freq) / (s1.freq - s0.freq);
    if nearest {
        if frac <= 0.5 {
            s0.value
        } else {
            s1.value
        }
    } else {
        s0.value + (s1.value - s0.value) * frac
    }
}

/// The flag at `freq` from ascending source channel flags. Each output is
/// registered on the source channel just left of it (an exact match on
/// channel k > 0 registers on k - 1). With `nearest`, the registration moves to
/// the next channel if that is strictly closer, and that channel's flag is
/// used. Otherwise the registered channel is bad if it or its right neighbour
/// is bad; the last channel shares the registration of the one before it.
fn resample_flag(flags: &[(f64, bool)], freq: f64, nearest: bool) -> bool {
    let n = flags.len();
    match n {
        0 => return true,
        1 => return flags[0].1,
        _ => (),
    }
    let mut i = flags
        .partition_point(|&(f, _)| f < freq)
        .saturating_sub(1)
        .min(n - 1);
    if nearest {
        if i < n - 1 && (freq - flags[i].0).abs() > (flags[i + 1].0 - freq).abs() {
            i += 1;
        }
        flags[i].1
    } else {
        let i = i.min(n - 2);
        flags[i].1 || flags[i + 1].1
    }
}

fn ascending(a: &f64, b: &f64) -> Ordering {
    a.total_cmp(b)
}

/// Resample the solutions of every parameter in `in_values` (parameter,
/// channel) onto `out_freqs`, writing into `out_values` and `out_flags`
/// (parameter, output channel).
///
/// A parameter whose every channel is flagged is flagged (and zeroed) at every
/// output frequency. If the unflagged source frequencies are the same as the
/// output frequencies, values are copied. Unless `mode` propagates flags, all
/// other output flags are cleared.
#[allow(clippy::too_many_arguments)]
pub(crate) fn resample_in_freq(
    mut out_values: ArrayViewMut2<f32>,
    mut out_flags: ArrayViewMut2<bool>,
    out_freqs: &[f64],
    in_values: ArrayView2<f32>,
    in_flags: ArrayView2<bool>,
    in_freqs: &[f64],
    mode: FreqInterp,
    phase_pairs: bool,
    phase_delay: Option<PhaseDelay>,
) {
    let nearest = mode.is_nearest();
    for (i_param, ((((mut out_values, mut out_flags), values), flags), turns)) in out_values
        .outer_iter_mut()
        .zip(out_flags.outer_iter_mut())
        .zip(in_values.outer_iter())
        .zip(in_flags.outer_iter())
        .zip((0..in_values.len_of(Axis(0))).map(|i| {
            phase_delay.map(|pd| (pd.ref_freq, pd.turns.index_axis_move(Axis(0), i)))
        }))
        .enumerate()
    {
        let phase = is_phase(phase_pairs, i_param);

        let mut samples = in_freqs
            .iter()
            .zip(values.iter())
            .zip(flags.iter())
            .filter_map(|((&freq, &value), &flagged)| {
                (!flagged).then_some(Sample {
                    freq,
                    value: value as f64,
                })
            })
            .collect::<Vec<_>>();
        if samples.is_empty() {
            out_values.fill(0.0);
            out_flags.fill(true);
            continue;
        }

        let good_freqs = samples.iter().map(|s| s.freq).collect::<Vec<_>>();
        if freqs_match(&good_freqs, out_freqs) {
            out_values
                .iter_mut()
                .zip(samples.iter())
                .for_each(|(o, s)| *o = s.value as f32);
            out_flags.fill(false);
        } else {
            if phase {
                let mut phases = samples.iter().map(|s| s.value).collect::<Vec<_>>();
                unwrap_phases(&mut phases);
                samples
                    .iter_mut()
                    .zip(phases)
                    .for_each(|(s, p)| s.value = p);
            }
            samples.sort_by(|a, b| ascending(&a.freq, &b.freq));

            for (o, &freq) in out_values.iter_mut().zip(out_freqs.iter()) {
                let v = interp_onto(&samples, freq, nearest) as f32;
                *o = if phase { wrap_phase(v) } else { v };
            }

            if mode.propagates_flags() {
                let mut all_flags = flags
                    .iter()
                    .zip(in_freqs.iter())
                    .map(|(&f, &freq)| (freq, f))
                    .collect::<Vec<_>>();
                all_flags.sort_by(|a, b| ascending(&a.0, &b.0));
                for (o, &freq) in out_flags.iter_mut().zip(out_freqs.iter()) {
                    *o = resample_flag(&all_flags, freq, nearest);
                }
            } else {
                out_flags.fill(false);
            }
        }

        if let (true, Some((ref_freq, turns))) = (phase, turns) {
            let mut turn_samples = turns
                .iter()
                .zip(in_freqs.iter())
                .map(|(&t, &freq)| Sample {
                    freq,
                    value: t as f64,
                })
                .collect::<Vec<_>>();
            turn_samples.sort_by(|a, b| ascending(&a.freq, &b.freq));
            for (o, &freq) in out_values.iter_mut().zip(out_freqs.iter()) {
                let t = interp_onto(&turn_samples, freq, false);
                let correction = TAU * t * (freq / ref_freq - 1.0);
                *o = wrap_phase(*o + correction as f32);
            }
        }
    }
}

/// Resample solutions (parameter, channel) with linear interpolation from
/// `source_freqs` onto `target_freqs`, returning the values and flags
/// (parameter, target channel).
pub fn resample(
    source_freqs: &[f64],
    source_values: ArrayView2<f32>,
    source_flags: ArrayView2<bool>,
    target_freqs: &[f64],
) -> (Array2<f32>, Array2<bool>) {
    let num_params = source_values.len_of(Axis(0));
    let mut values = Array2::zeros((num_params, target_freqs.len()));
    let mut flags = Array2::from_elem((num_params, target_freqs.len()), false);
    resample_in_freq(
        values.view_mut(),
        flags.view_mut(),
        target_freqs,
        source_values,
        source_flags,
        source_freqs,
        FreqInterp::Linear,
        false,
        None,
    );
    (values, flags)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_single_channel_clamps() {
        let (values, flags) = resample(
            &[1.4e9],
            array![[5.0]].view(),
            array![[false]].view(),
            &[1.3e9, 1.4e9, 1.5e9],
        );
        assert_eq!(values, array![[5.0f32, 5.0, 5.0]]);
        assert_eq!(flags, array![[false, false, false]]);
    }

    #[test]
    fn test_passthrough_clears_flags() {
        let freqs = [100e6, 110e6, 120e6];
        // The flagged channel is masked, so the good frequencies are the
        // target frequencies.
        let (values, flags) = resample(
            &[100e6, 105e6, 110e6, 120e6],
            array![[1.0, 99.0, 2.0, 4.0]].view(),
            array![[false, true, false, false]].view(),
            &freqs,
        );
        assert_eq!(values, array![[1.0f32, 2.0, 4.0]]);
        assert_eq!(flags, array![[false, false, false]]);

        // Tiny differences still count as a match.
        let (values, _) = resample(
            &freqs,
            array![[1.0, 2.0, 4.0]].view(),
            array![[false, false, false]].view(),
            &[100e6 * (1.0 + 1e-12), 110e6, 120e6],
        );
        assert_eq!(values, array![[1.0f32, 2.0, 4.0]]);
    }

    #[test]
    fn test_linear_and_edge_clamp() {
        let (values, flags) = resample(
            &[100.0, 200.0, 300.0],
            array![[1.0, 3.0, 99.0], [0.0, 10.0, 20.0]].view(),
            array![[false, false, true], [false, false, false]].view(),
            &[50.0, 150.0, 250.0, 350.0],
        );
        // The first parameter's last channel is flagged; 250 and 350 clamp to
        // the channel at 200.
        assert_abs_diff_eq!(values, array![[1.0f32, 2.0, 3.0, 3.0], [0.0, 5.0, 15.0, 20.0]]);
        // Resampled output is never flagged because of the frequency grids.
        assert!(flags.iter().all(|&f| !f));
    }

    #[test]
    fn test_all_flagged() {
        let (values, flags) = resample(
            &[100.0, 200.0],
            array![[1.0, 2.0], [3.0, 4.0]].view(),
            array![[true, true], [false, true]].view(),
            &[150.0, 175.0],
        );
        assert_eq!(values.row(0), array![0.0f32, 0.0]);
        assert_eq!(flags.row(0), array![true, true]);
        assert_eq!(values.row(1), array![3.0f32, 3.0]);
        assert_eq!(flags.row(1), array![false, false]);
    }

    #[test]
    fn test_descending_grids() {
        // Lower-sideband source onto an upper-sideband target and vice versa.
        let (values, _) = resample(
            &[300.0, 200.0, 100.0],
            array![[30.0, 20.0, 10.0]].view(),
            array![[false, false, false]].view(),
            &[50.0, 150.0, 350.0],
        );
        assert_abs_diff_eq!(values, array![[10.0f32, 15.0, 30.0]]);

        let (values, _) = resample(
            &[100.0, 200.0, 300.0],
            array![[10.0, 20.0, 30.0]].view(),
            array![[false, false, false]].view(),
            &[350.0, 250.0, 50.0],
        );
        assert_abs_diff_eq!(values, array![[30.0f32, 25.0, 10.0]]);
    }

    #[test]
    fn test_nearest_and_flag_propagation() {
        let in_freqs = [100.0, 200.0, 300.0];
        let in_values = array![[1.0f32, 2.0, 3.0]];
        let in_flags = array![[false, true, false]];
        let out_freqs = [140.0, 160.0, 260.0, 300.0];
        let mut values = Array2::zeros((1, 4));
        let mut flags = Array2::from_elem((1, 4), false);

        resample_in_freq(
            values.view_mut(),
            flags.view_mut(),
            &out_freqs,
            in_values.view(),
            in_flags.view(),
            &in_freqs,
            FreqInterp::NearestFlag,
            false,
            None,
        );
        // The flagged channel is masked, so values come from 100 and 300.
        assert_eq!(values, array![[1.0f32, 1.0, 3.0, 3.0]]);
        assert_eq!(flags, array![[false, true, false, false]]);

        resample_in_freq(
            values.view_mut(),
            flags.view_mut(),
            &out_freqs,
            in_values.view(),
            in_flags.view(),
            &in_freqs,
            FreqInterp::LinearFlag,
            false,
            None,
        );
        assert_abs_diff_eq!(values, array![[1.4f32, 1.6, 2.6, 3.0]], epsilon = 1e-6);
        // Every registration touches the bad channel.
        assert_eq!(flags, array![[true, true, true, true]]);

        resample_in_freq(
            values.view_mut(),
            flags.view_mut(),
            &out_freqs,
            in_values.view(),
            in_flags.view(),
            &in_freqs,
            FreqInterp::Nearest,
            false,
            None,
        );
        assert_eq!(values, array![[1.0f32, 1.0, 3.0, 3.0]]);
        assert!(flags.iter().all(|&f| !f));
    }

    #[test]
    fn test_linear_flag_registration() {
        let in_freqs = [100.0, 200.0, 300.0];
        let in_values = array![[1.0f32, 2.0, 3.0]];
        let in_flags = array![[false, true, false]];
        let out_freqs = [50.0, 100.0, 300.0, 350.0];
        let mut values = Array2::zeros((1, 4));
        let mut flags = Array2::from_elem((1, 4), false);
        resample_in_freq(
            values.view_mut(),
            flags.view_mut(),
            &out_freqs,
            in_values.view(),
            in_flags.view(),
            &in_freqs,
            FreqInterp::LinearFlag,
            false,
            None,
        );
        assert_eq!(values, array![[1.0f32, 1.0, 3.0, 3.0]]);
        assert_eq!(flags, array![[true, true, true, true]]);

        // Only the last channel is bad; registrations that don't touch it stay
        // good, and everything from the channel before it onwards is flagged.
        let in_freqs = [100.0, 200.0, 300.0, 400.0];
        let in_values = array![[1.0f32, 2.0, 3.0, 4.0]];
        let in_flags = array![[false, false, false, true]];
        let out_freqs = [50.0, 100.0, 150.0, 250.0, 300.0, 350.0, 450.0];
        let mut values = Array2::zeros((1, 7));
        let mut flags = Array2::from_elem((1, 7), false);
        resample_in_freq(
            values.view_mut(),
            flags.view_mut(),
            &out_freqs,
            in_values.view(),
            in_flags.view(),
            &in_freqs,
            FreqInterp::LinearFlag,
            false,
            None,
        );
        assert_eq!(
            flags,
            array![[false, false, false, false, false, true, true]]
        );
        assert_abs_diff_eq!(
            values,
            array![[1.0f32, 1.0, 1.5, 2.5, 3.0, 3.0, 3.0]],
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_resample_flag_single_channel() {
        let flags = [(100.0, true)];
        assert!(resample_flag(&flags, 50.0, false));
        assert!(resample_flag(&flags, 150.0, true));
        assert!(resample_flag(&[], 150.0, true));
    }

    #[test]
    fn test_phase_unwrapping() {
        // Amplitude and phase; the phase wraps between the two channels.
        let in_values = array![[1.0f32, 1.0], [3.0, -3.0]];
        let in_flags = array![[false, false], [false, false]];
        let mut values = Array2::zeros((2, 1));
        let mut flags = Array2::from_elem((2, 1), false);
        resample_in_freq(
            values.view_mut(),
            flags.view_mut(),
            &[150.0],
            in_values.view(),
            in_flags.view(),
            &[100.0, 200.0],
            FreqInterp::Linear,
            true,
            None,
        );
        assert_abs_diff_eq!(values[(0, 0)], 1.0);
        assert_abs_diff_eq!(values[(1, 0)].abs(), std::f32::consts::PI, epsilon = 1e-5);
    }

    #[test]
    fn test_phase_delay() {
        let in_values = array![[1.0f32, 1.0], [0.5, 0.5]];
        let in_flags = array![[false, false], [false, false]];
        let turns = array![[0.0f32, 0.0], [0.1, 0.1]];
        let mut values = Array2::zeros((2, 2));
        let mut flags = Array2::from_elem((2, 2), false);
        resample_in_freq(
            values.view_mut(),
            flags.view_mut(),
            &[100.0, 110.0],
            in_values.view(),
            in_flags.view(),
            &[100.0, 200.0],
            FreqInterp::Linear,
            true,
            Some(PhaseDelay {
                ref_freq: 100.0,
                turns: turns.view(),
            }),
        );
        // No correction at the reference frequency.
        assert_abs_diff_eq!(values[(1, 0)], 0.5, epsilon = 1e-6);
        // 2π × 0.1 × (110 / 100 - 1)
        let expected = 0.5 + std::f32::consts::TAU * 0.1 * 0.1;
        assert_abs_diff_eq!(values[(1, 1)], expected, epsilon = 1e-5);
        // Amplitudes are untouched.
        assert_abs_diff_eq!(values.row(0), array![1.0f32, 1.0]);
    }

    #[test]
    fn test_unwrap_phases() {
        let mut phases = [3.0, -3.0, 3.0, 0.0];
        unwrap_phases(&mut phases);
        assert_abs_diff_eq!(phases[0], 3.0);
        assert_abs_diff_eq!(phases[1], -3.0 + TAU, epsilon = 1e-12);
        assert_abs_diff_eq!(phases[2], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(phases[3], 0.0, epsilon = 1e-12);
    }
}
