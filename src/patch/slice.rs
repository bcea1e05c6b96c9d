// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Indexing of a table's rows by (antenna, spectral window).

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, trace};
use vec1::Vec1;

use super::PatchError;
use crate::table::SolutionTable;

/// All of the rows of a table for one (antenna, spectral window), in time
/// order. Rows are referred to by their index into the table.
#[derive(Debug)]
pub(crate) struct Slice {
    pub(crate) rows: Vec1<usize>,

    /// The times of `rows`. These are strictly increasing.
    pub(crate) times: Vec1<f64>,
}

/// Where a time falls amongst a [`Slice`]'s times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Bracket {
    /// The time is exactly that of this sample, or it was clamped to this
    /// sample because it was outside the slice's time range.
    Exact(usize),

    /// The time is strictly between this sample and the next one.
    Between(usize),
}

impl Slice {
    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    /// Find the samples bracketing `time`. Times outside the range of the
    /// slice are clamped to the nearest end; a NaN time is clamped to the first
    /// sample.
    pub(crate) fn bracket(&self, time: f64) -> Bracket {
        let first = *self.times.first();
        let last = *self.times.last();
        if !(time > first) {
            return Bracket::Exact(0);
        }
        if time >= last {
            return Bracket::Exact(self.len() - 1);
        }

        // `time` is now strictly greater than the first time and strictly
        // less than the last, so the index is in 1..len.
        let i = self.times.partition_point(|&t| t < time);
        if self.times[i] == time {
            Bracket::Exact(i)
        } else {
            Bracket::Between(i - 1)
        }
    }
}

/// Every (antenna, spectral window) of a table and its [`Slice`].
#[derive(Debug)]
pub(crate) struct SliceIndex {
    slices: IndexMap<(usize, usize), Slice>,

    /// The number of channels of each spectral window.
    spw_num_chans: IndexMap<usize, usize>,
}

impl SliceIndex {
    /// Build the index in a single pass over the table's rows (sorted by
    /// spectral window, then antenna, then time). Every row must have
    /// `num_params` parameters and the same number of channels as the other
    /// rows of its spectral window.
    pub(crate) fn build<T: SolutionTable>(
        table: &T,
        num_params: usize,
    ) -> Result<SliceIndex, PatchError> {
        let rows = table.rows();
        let mut slices = IndexMap::new();
        let mut spw_num_chans: IndexMap<usize, usize> = IndexMap::new();

        for ((spw, antenna), group) in &table
            .sorted_row_indices()
            .into_iter()
            .group_by(|&i| (rows[i].spw, rows[i].antenna))
        {
            let mut indices = vec![];
            let mut times: Vec<f64> = vec![];
            for i_row in group {
                let row = &rows[i_row];
                let num_chans = *spw_num_chans.entry(spw).or_insert_with(|| row.num_chans());
                if row.params.dim() != (num_params, num_chans)
                    || row.flags.dim() != (num_params, num_chans)
                {
                    return Err(PatchError::InconsistentShape {
                        row: i_row,
                        antenna,
                        spw,
                        got_params: row.params.dim(),
                        got_flags: row.flags.dim(),
                        expected_params: num_params,
                        expected_chans: num_chans,
                    });
                }
                if times.last().map(|&t| row.time <= t).unwrap_or(false) || row.time.is_nan() {
                    return Err(PatchError::NonIncreasingTime {
                        antenna,
                        spw,
                        time: row.time,
                    });
                }
                indices.push(i_row);
                times.push(row.time);
            }

            // Groups are never empty.
            if let (Ok(rows), Ok(times)) = (Vec1::try_from_vec(indices), Vec1::try_from_vec(times))
            {
                trace!(
                    "Slice for antenna {antenna}, spw {spw}: {} rows over [{}, {}]",
                    rows.len(),
                    times.first(),
                    times.last()
                );
                slices.insert((antenna, spw), Slice { rows, times });
            }
        }

        debug!(
            "Indexed {} rows into {} (antenna, spw) slices over {} spws",
            rows.len(),
            slices.len(),
            spw_num_chans.len()
        );
        Ok(SliceIndex {
            slices,
            spw_num_chans,
        })
    }

    /// The position of the (antenna, spectral window) slice, if there is one.
    pub(crate) fn position(&self, antenna: usize, spw: usize) -> Option<usize> {
        self.slices.get_index_of(&(antenna, spw))
    }

    /// Get a slice by its position. Panics if the position didn't come from
    /// [`SliceIndex::position`].
    pub(crate) fn slice(&self, position: usize) -> &Slice {
        &self.slices[position]
    }

    pub(crate) fn num_chans(&self, spw: usize) -> Option<usize> {
        self.spw_num_chans.get(&spw).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.slices.len()
    }

    pub(crate) fn num_antennas(&self) -> usize {
        self.slices.keys().map(|&(a, _)| a).unique().count()
    }

    pub(crate) fn num_spws(&self) -> usize {
        self.spw_num_chans.len()
    }
}

#[cfg(test)]
mod tests {
    use ndarray::prelude::*;
    use vec1::vec1;

    use super::*;
    use crate::table::{CalType, MemCalTable, SolutionRow};

    fn slice(times: Vec1<f64>) -> Slice {
        Slice {
            rows: times.mapped_ref(|_| 0),
            times,
        }
    }

    fn row(time: f64, antenna: usize, spw: usize, num_chans: usize) -> SolutionRow {
        SolutionRow::new(
            time,
            antenna,
            spw,
            0,
            Array2::zeros((2, num_chans)),
            Array2::from_elem((2, num_chans), false),
        )
    }

    #[test]
    fn test_bracket() {
        let s = slice(vec1![100.0, 200.0, 300.0]);
        assert_eq!(s.bracket(50.0), Bracket::Exact(0));
        assert_eq!(s.bracket(100.0), Bracket::Exact(0));
        assert_eq!(s.bracket(150.0), Bracket::Between(0));
        assert_eq!(s.bracket(200.0), Bracket::Exact(1));
        assert_eq!(s.bracket(200.5), Bracket::Between(1));
        assert_eq!(s.bracket(300.0), Bracket::Exact(2));
        assert_eq!(s.bracket(1e9), Bracket::Exact(2));
        assert_eq!(s.bracket(f64::NEG_INFINITY), Bracket::Exact(0));
        assert_eq!(s.bracket(f64::INFINITY), Bracket::Exact(2));
        assert_eq!(s.bracket(f64::NAN), Bracket::Exact(0));
    }

    #[test]
    fn test_bracket_single_sample() {
        let s = slice(vec1![100.0]);
        assert_eq!(s.bracket(99.0), Bracket::Exact(0));
        assert_eq!(s.bracket(100.0), Bracket::Exact(0));
        assert_eq!(s.bracket(101.0), Bracket::Exact(0));
    }

    #[test]
    fn test_build() {
        let mut table = MemCalTable::new(CalType::K);
        table.push_row(row(300.0, 1, 0, 1));
        table.push_row(row(100.0, 1, 0, 1));
        table.push_row(row(100.0, 0, 0, 1));
        table.push_row(row(200.0, 0, 2, 4));
        table.push_row(row(200.0, 1, 0, 1));

        let index = SliceIndex::build(&table, 2).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.num_antennas(), 2);
        assert_eq!(index.num_spws(), 2);
        assert_eq!(index.num_chans(0), Some(1));
        assert_eq!(index.num_chans(1), None);
        assert_eq!(index.num_chans(2), Some(4));

        let s = index.slice(index.position(1, 0).unwrap());
        assert_eq!(s.rows.as_slice(), &[1, 4, 0]);
        assert_eq!(s.times.as_slice(), &[100.0, 200.0, 300.0]);
        assert!(index.position(1, 2).is_none());
    }

    #[test]
    fn test_build_rejects_repeated_times() {
        let mut table = MemCalTable::new(CalType::K);
        table.push_row(row(100.0, 0, 0, 1));
        table.push_row(row(100.0, 0, 0, 1));
        let result = SliceIndex::build(&table, 2);
        assert!(matches!(
            result,
            Err(PatchError::NonIncreasingTime {
                antenna: 0,
                spw: 0,
                ..
            })
        ));
    }

    #[test]
    fn test_build_rejects_bad_shapes() {
        let mut table = MemCalTable::new(CalType::K);
        table.push_row(row(100.0, 0, 0, 2));
        table.push_row(row(200.0, 1, 0, 3));
        let result = SliceIndex::build(&table, 2);
        assert!(matches!(result, Err(PatchError::InconsistentShape { row: 1, .. })));

        let result = SliceIndex::build(&table, 4);
        assert!(matches!(result, Err(PatchError::InconsistentShape { row: 0, .. })));
    }
}
