// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests for merging and parsing arguments.

use std::{fs::File, io::Write};

use indoc::indoc;
use tempfile::TempDir;

use super::*;
use crate::interp::{FreqInterp, TimeInterp};

fn write_arg_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut f = File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn test_merge_toml_prefers_cli() {
    let dir = TempDir::new().unwrap();
    let arg_file = write_arg_file(
        &dir,
        "args.toml",
        indoc! {r#"
            solutions = "table.json"
            times = [100.0, 150.0]
            time_interp = "nearest"
            antenna_map = [0, 0, 2]
            print_state = true
        "#},
    );

    let args = PatchArgs {
        args_file: Some(arg_file),
        time_interp: Some("linear".to_string()),
        spw: Some(1),
        ..Default::default()
    }
    .merge()
    .unwrap();

    assert_eq!(args.args_file, None);
    assert_eq!(args.solutions, Some(PathBuf::from("table.json")));
    assert_eq!(args.times, Some(vec![100.0, 150.0]));
    assert_eq!(args.time_interp.as_deref(), Some("linear"));
    assert_eq!(args.spw, Some(1));
    assert_eq!(args.antenna_map, Some(vec![0, 0, 2]));
    assert!(args.print_state);
}

#[test]
fn test_merge_json() {
    let dir = TempDir::new().unwrap();
    let arg_file = write_arg_file(
        &dir,
        "args.json",
        indoc! {r#"
            {
                "solutions": "table.bin",
                "freqs": [1.5e8, 1.6e8],
                "freq_interp": "nearestflag"
            }
        "#},
    );

    let args = PatchArgs {
        args_file: Some(arg_file),
        ..Default::default()
    }
    .merge()
    .unwrap();
    assert_eq!(args.solutions, Some(PathBuf::from("table.bin")));
    assert_eq!(args.freqs, Some(vec![1.5e8, 1.6e8]));
    assert_eq!(args.freq_interp.as_deref(), Some("nearestflag"));
    assert!(!args.print_state);
}

#[test]
fn test_merge_bad_arg_files() {
    let dir = TempDir::new().unwrap();
    let arg_file = write_arg_file(&dir, "args.yaml", "solutions: table.json");
    let result = PatchArgs {
        args_file: Some(arg_file),
        ..Default::default()
    }
    .merge();
    assert!(matches!(result, Err(CalpatchError::ArgFile(_))));

    let arg_file = write_arg_file(&dir, "args.toml", "solutions = [");
    let result = PatchArgs {
        args_file: Some(arg_file),
        ..Default::default()
    }
    .merge();
    assert!(matches!(result, Err(CalpatchError::ArgFile(_))));
}

#[test]
fn test_parse() {
    let parsed = PatchArgs {
        solutions: Some(PathBuf::from("table.json")),
        times: Some(vec![10.0, 20.0]),
        time_interp: Some("linearPD".to_string()),
        freq_interp: Some("linearflag".to_string()),
        spw_map: Some(vec![1]),
        num_output_spws: Some(2),
        ..Default::default()
    }
    .parse()
    .unwrap();

    assert_eq!(parsed.solutions, PathBuf::from("table.json"));
    assert_eq!(parsed.times.as_slice(), &[10.0, 20.0]);
    assert_eq!(parsed.spw, 0);
    assert!(parsed.freqs.is_none());
    assert!(!parsed.print_state);
    let params = parsed.patch_params;
    assert_eq!(params.time_interp, Some(TimeInterp::LinearPhaseDelay));
    assert_eq!(params.freq_interp, FreqInterp::LinearFlag);
    assert!(params.antenna_map.is_identity());
    assert_eq!(params.spw_map, CalMap::from(vec![1]));
    assert_eq!(params.num_output_antennas, None);
    assert_eq!(params.num_output_spws, Some(2));
}

#[test]
fn test_parse_errors() {
    let args = PatchArgs {
        solutions: Some(PathBuf::from("table.json")),
        times: Some(vec![10.0]),
        ..Default::default()
    };

    let result = PatchArgs {
        solutions: None,
        ..args.clone()
    }
    .parse();
    assert!(matches!(result, Err(CalpatchError::Args(_))));

    let result = PatchArgs {
        times: Some(vec![]),
        ..args.clone()
    }
    .parse();
    assert!(matches!(result, Err(CalpatchError::Args(_))));

    let result = PatchArgs {
        num_output_antennas: Some(0),
        ..args.clone()
    }
    .parse();
    match result {
        Err(CalpatchError::Args(s)) => assert!(s.contains("antennas"), "{s}"),
        other => panic!("unexpected result: {other:?}"),
    }

    let result = PatchArgs {
        time_interp: Some("cubic".to_string()),
        ..args
    }
    .parse();
    match result {
        Err(CalpatchError::Interp(s)) => assert!(s.contains("cubic"), "{s}"),
        other => panic!("unexpected result: {other:?}"),
    }
}
