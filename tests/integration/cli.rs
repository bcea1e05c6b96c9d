// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests running the calpatch binary.

use indoc::formatdoc;
use tempfile::TempDir;

use crate::*;

#[test]
fn test_help() {
    let (stdout, _) = get_cmd_output(calpatch().arg("--help").ok());
    assert!(stdout.contains("--time-interp"), "{stdout}");
    assert!(stdout.contains("ARGUMENTS_FILE"), "{stdout}");
}

#[test]
fn test_linear_interpolation() {
    let dir = TempDir::new().unwrap();
    let table = write_delay_table(&dir);

    let cmd = calpatch()
        .args([
            "-s",
            table.as_str(),
            "-t",
            "150",
            "--time-interp",
            "linear",
        ])
        .ok();
    let succeeded = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(succeeded, "{stdout}\n{stderr}");
    assert!(stdout.contains("Time interpolation: linear"), "{stdout}");
    assert!(stdout.contains("antenna 3: [2, 20]"), "{stdout}");
    assert!(stdout.contains("antenna 0: flagged"), "{stdout}");
    assert!(stdout.contains("calpatch complete."), "{stdout}");
}

#[test]
fn test_default_nearest_and_repeated_times() {
    let dir = TempDir::new().unwrap();
    let table = write_delay_table(&dir);

    let cmd = calpatch()
        .args(["-s", table.as_str(), "-t", "160", "160"])
        .ok();
    let succeeded = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(succeeded, "{stdout}\n{stderr}");
    assert!(stdout.contains("Time interpolation: nearest"), "{stdout}");
    assert!(stdout.contains("antenna 3: [3, 30]"), "{stdout}");
    assert!(stdout.contains("spw 0 at time 160 (unchanged)"), "{stdout}");
}

#[test]
fn test_frequency_resampling() {
    let dir = TempDir::new().unwrap();
    let table = write_delay_table(&dir);

    let cmd = calpatch()
        .args([
            "-s",
            table.as_str(),
            "-t",
            "150",
            "--time-interp",
            "linear",
            "-f",
            "150e6",
            "160e6",
        ])
        .ok();
    let succeeded = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(succeeded, "{stdout}\n{stderr}");
    assert!(stdout.contains("Resampling onto 2 frequencies"), "{stdout}");
    assert!(stdout.contains("antenna 3: [2, 2, 20, 20]"), "{stdout}");
    assert!(stdout.contains("antenna 1: flagged"), "{stdout}");
}

#[test]
fn test_arguments_file_and_state() {
    let dir = TempDir::new().unwrap();
    let table = write_delay_table(&dir);
    let arg_file = make_file_in_dir(
        "args.toml",
        &dir,
        &formatdoc! {r#"
            solutions = "{}"
            times = [150.0]
            time_interp = "nearest"
            antenna_map = [3]
            num_output_antennas = 2
            print_state = true
        "#, table},
    );

    // The command line overrides the time interpolation in the file.
    let cmd = calpatch()
        .arg(arg_file.display().to_string())
        .args(["--time-interp", "linear"])
        .ok();
    let succeeded = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(succeeded, "{stdout}\n{stderr}");
    assert!(stdout.contains("antenna 0: [2, 20]"), "{stdout}");
    assert!(stdout.contains("antenna 1: [2, 20]"), "{stdout}");
    assert!(stdout.contains("-state--------"), "{stdout}");
}

#[test]
fn test_dry_run() {
    let dir = TempDir::new().unwrap();
    let table = write_delay_table(&dir);

    let cmd = calpatch()
        .args(["-s", table.as_str(), "-t", "150", "--dry-run"])
        .ok();
    let succeeded = cmd.is_ok();
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(succeeded, "{stdout}\n{stderr}");
    assert!(stdout.contains("Dry run"), "{stdout}");
    assert!(!stdout.contains("antenna 3:"), "{stdout}");
}

#[test]
fn test_errors() {
    let dir = TempDir::new().unwrap();
    let table = write_delay_table(&dir);

    // Unsupported table extension.
    let bad = make_file_in_dir("table.txt", &dir, "");
    let cmd = calpatch()
        .args(["-s", bad.to_str().unwrap(), "-t", "150"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("unsupported extension 'txt'"), "{stderr}");

    // Unknown interpolation type.
    let cmd = calpatch()
        .args(["-s", table.as_str(), "-t", "150", "--time-interp", "cubic"])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("cubic"), "{stderr}");

    // No times.
    let cmd = calpatch().args(["-s", table.as_str()]).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("No times"), "{stderr}");

    // An output spectral window that wasn't arranged.
    let cmd = calpatch()
        .args(["-s", table.as_str(), "-t", "150", "--spw", "5"])
        .ok();
    assert!(cmd.is_err());
}
