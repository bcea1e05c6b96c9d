// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

/// A map from output indices (e.g. antennas being calibrated) to input indices
/// (e.g. antennas in the calibration table).
///
/// An empty map is the identity. Output indices beyond the end of a non-empty
/// map use the map's last entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalMap(Vec<usize>);

impl CalMap {
    pub fn identity() -> CalMap {
        CalMap(vec![])
    }

    pub fn new(map: Vec<usize>) -> CalMap {
        CalMap(map)
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of entries in the map; zero for the identity.
    pub fn num_entries(&self) -> usize {
        self.0.len()
    }

    /// The input index for an output index.
    pub fn input_id(&self, output: usize) -> usize {
        match self.0.last() {
            None => output,
            Some(&last) => self.0.get(output).copied().unwrap_or(last),
        }
    }

    /// The input indices for output indices `0..num_output`.
    pub fn resolve(&self, num_output: usize) -> Vec<usize> {
        (0..num_output).map(|o| self.input_id(o)).collect()
    }
}

impl From<Vec<usize>> for CalMap {
    fn from(map: Vec<usize>) -> Self {
        CalMap(map)
    }
}
