// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

Times are kept in double precision (seconds); solution parameters are single
precision, as they are in calibration tables.
 */

pub use std::f64::consts::{PI, TAU};

/// The relative tolerance used when deciding whether the (unflagged) source
/// frequencies of a solution are the same as the requested frequencies. If they
/// are, values are copied rather than interpolated.
pub const FREQ_MATCH_TOLERANCE: f64 = 1e-10;

/// The value of "current time" of a time interpolator that has never been
/// queried.
pub(crate) const UNQUERIED_TIME: f64 = f64::NEG_INFINITY;

/// The number of output fields. Patching is currently only done for a single
/// field; all table fields feed into it.
pub const NUM_OUTPUT_FIELDS: usize = 1;
