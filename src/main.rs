// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The calpatch binary.

use clap::Parser;

fn main() {
    // We don't return a Result from main, because that prints the debug
    // representation of the error. The display form is what users should see.
    if let Err(e) = calpatch::Calpatch::parse().run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
