// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Time and frequency interpolation of radio-interferometric calibration
solutions.

A calibration table holds solutions at sparse times for each (antenna,
spectral window, field). [`CalPatch`] arranges a table onto output antennas and
spectral windows and, on request, interpolates its solutions at arbitrary times
and resamples them onto arbitrary frequency grids.
 */

mod cli;
pub mod constants;
mod error;
pub mod interp;
pub mod params;
pub mod patch;
pub mod table;

// Re-exports.
pub use cli::Calpatch;
pub use error::CalpatchError;
pub use interp::{FreqInterp, TimeInterp};
pub use params::PatchParams;
pub use patch::{resample, CalMap, CalPatch, PatchError, PatchState, TripleState};
pub use table::{CalType, MemCalTable, SolutionRow, SolutionTable};
