// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod cli;

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};
use ndarray::prelude::*;

use calpatch::{CalType, MemCalTable, SolutionRow};

fn calpatch() -> Command {
    Command::cargo_bin("calpatch").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

fn make_file_in_dir<T: AsRef<Path>, U: AsRef<Path>>(
    filename: T,
    dir: U,
    contents: &str,
) -> PathBuf {
    let path = dir.as_ref().join(filename);
    let mut f = File::create(&path).expect("couldn't make file");
    f.write_all(contents.as_bytes()).unwrap();
    path
}

/// Write a "K Jones" table for antenna 3 in spw 0 with solutions at t = 100
/// and t = 200, and a single channel at 150 MHz. Returns the table's path.
fn write_delay_table<T: AsRef<Path>>(dir: T) -> String {
    let mut table = MemCalTable::new(CalType::K);
    table.push_row(SolutionRow::new(
        100.0,
        3,
        0,
        0,
        array![[1.0], [10.0]],
        array![[false], [false]],
    ));
    table.push_row(SolutionRow::new(
        200.0,
        3,
        0,
        0,
        array![[3.0], [30.0]],
        array![[false], [false]],
    ));
    table.set_chan_freqs(0, vec![150e6]);

    let path = dir.as_ref().join("delays.json");
    table.write_to_ext(&path).unwrap();
    path.display().to_string()
}
