// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameters for patching calibration tables.
//!
//! The code here is kind of "mirroring" the code within the `cli` module; the
//! idea is that `cli` is unparsed, user-facing code, whereas parameters have
//! been parsed and are ready to be used directly.

use crate::{
    interp::{parse_freq_interp, parse_time_interp, FreqInterp, TimeInterp},
    patch::CalMap,
    CalpatchError,
};

/// How a calibration table is patched. The default uses identity maps, the
/// calibration type's default time interpolation and linear frequency
/// interpolation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchParams {
    /// If `None`, the calibration type's default is used.
    pub time_interp: Option<TimeInterp>,

    pub freq_interp: FreqInterp,

    /// Output antenna -> table antenna.
    pub antenna_map: CalMap,

    /// Output spectral window -> table spectral window.
    pub spw_map: CalMap,

    /// If `None`, one more than the largest antenna in the table.
    pub num_output_antennas: Option<usize>,

    /// If `None`, one more than the largest spectral window in the table.
    pub num_output_spws: Option<usize>,
}

impl PatchParams {
    /// Set the interpolation types from user-supplied strings, e.g. "linear".
    /// Types that aren't given are left alone.
    pub fn set_interp_types(
        &mut self,
        time_interp: Option<&str>,
        freq_interp: Option<&str>,
    ) -> Result<(), CalpatchError> {
        if let Some(s) = time_interp {
            self.time_interp = Some(parse_time_interp(s)?);
        }
        if let Some(s) = freq_interp {
            self.freq_interp = parse_freq_interp(s)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_interp_types() {
        let mut params = PatchParams::default();
        assert_eq!(params.time_interp, None);
        assert_eq!(params.freq_interp, FreqInterp::Linear);

        params.set_interp_types(Some("linearPD"), None).unwrap();
        assert_eq!(params.time_interp, Some(TimeInterp::LinearPhaseDelay));
        assert_eq!(params.freq_interp, FreqInterp::Linear);

        params.set_interp_types(None, Some(" nearestflag")).unwrap();
        assert_eq!(params.freq_interp, FreqInterp::NearestFlag);

        let result = params.set_interp_types(Some("cubic"), None);
        assert!(matches!(result, Err(CalpatchError::Interp(_))));
        assert_eq!(params.time_interp, Some(TimeInterp::LinearPhaseDelay));
    }
}
