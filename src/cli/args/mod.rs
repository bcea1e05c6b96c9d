// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Given a calibration table, interpolate its solutions at the requested
//! times (and optionally frequencies) and report them.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use log::{debug, info};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use vec1::Vec1;

use super::{
    common::{InfoPrinter, ARG_FILE_HELP},
    CliArgsError,
};
use crate::{
    interp::{FREQ_INTERP_TYPES, TIME_INTERP_TYPES},
    params::PatchParams,
    patch::{CalMap, CalPatch},
    table::{MemCalTable, SolutionTable, CAL_TABLE_EXTENSIONS},
    CalpatchError,
};

lazy_static::lazy_static! {
    static ref SOLS_INPUT_HELP: String =
        format!("Path to the calibration table to be patched. Supported formats: {}", *CAL_TABLE_EXTENSIONS);

    static ref TIME_INTERP_HELP: String =
        format!("How solutions are interpolated in time. The default depends on the table's calibration type. Supported types: {}", *TIME_INTERP_TYPES);

    static ref FREQ_INTERP_HELP: String =
        format!("How solutions are resampled in frequency. Default: linear. Supported types: {}", *FREQ_INTERP_TYPES);
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct PatchArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(short, long, help = SOLS_INPUT_HELP.as_str(), help_heading = "INPUT TABLE")]
    pub(super) solutions: Option<PathBuf>,

    /// The times to interpolate the solutions at \[seconds\].
    #[clap(short, long, multiple_values(true), help_heading = "QUERY")]
    pub(super) times: Option<Vec<f64>>,

    /// The output spectral window to interpolate. Default: 0
    #[clap(long, help_heading = "QUERY")]
    pub(super) spw: Option<usize>,

    /// The frequencies to resample the solutions onto \[Hz\]. If not given,
    /// solutions are reported on the table's own channels.
    #[clap(short, long, multiple_values(true), help_heading = "QUERY")]
    pub(super) freqs: Option<Vec<f64>>,

    #[clap(long, help = TIME_INTERP_HELP.as_str(), help_heading = "INTERPOLATION")]
    pub(super) time_interp: Option<String>,

    #[clap(long, help = FREQ_INTERP_HELP.as_str(), help_heading = "INTERPOLATION")]
    pub(super) freq_interp: Option<String>,

    /// The table antenna to use for each output antenna, e.g. "0 0 2" uses
    /// table antenna 0 for output antennas 0 and 1. Output antennas beyond
    /// the end of the map use the last entry. Default: identity
    #[clap(long, multiple_values(true), help_heading = "MAPPING")]
    pub(super) antenna_map: Option<Vec<usize>>,

    /// The table spectral window to use for each output spectral window.
    /// Default: identity
    #[clap(long, multiple_values(true), help_heading = "MAPPING")]
    pub(super) spw_map: Option<Vec<usize>>,

    /// The number of output antennas. Default: one more than the largest
    /// table antenna, or the length of the antenna map.
    #[clap(long, help_heading = "MAPPING")]
    pub(super) num_output_antennas: Option<usize>,

    /// The number of output spectral windows. Default: one more than the
    /// largest table spectral window, or the length of the spectral window
    /// map.
    #[clap(long, help_heading = "MAPPING")]
    pub(super) num_output_spws: Option<usize>,

    /// Report the state of every (antenna, spectral window, field) after the
    /// last time has been interpolated.
    #[clap(long)]
    #[serde(default)]
    pub(super) print_state: bool,
}

/// Arguments that are ready to be used.
#[derive(Debug)]
pub(super) struct ParsedArgs {
    pub(super) solutions: PathBuf,
    pub(super) times: Vec1<f64>,
    pub(super) spw: usize,
    pub(super) freqs: Option<Vec<f64>>,
    pub(super) patch_params: PatchParams,
    pub(super) print_state: bool,
}

impl PatchArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(crate) fn merge(self) -> Result<PatchArgs, CalpatchError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let PatchArgs {
                args_file: _,
                solutions,
                times,
                spw,
                freqs,
                time_interp,
                freq_interp,
                antenna_map,
                spw_map,
                num_output_antennas,
                num_output_spws,
                print_state,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(PatchArgs {
                args_file: None,
                solutions: cli_args.solutions.or(solutions),
                times: cli_args.times.or(times),
                spw: cli_args.spw.or(spw),
                freqs: cli_args.freqs.or(freqs),
                time_interp: cli_args.time_interp.or(time_interp),
                freq_interp: cli_args.freq_interp.or(freq_interp),
                antenna_map: cli_args.antenna_map.or(antenna_map),
                spw_map: cli_args.spw_map.or(spw_map),
                num_output_antennas: cli_args.num_output_antennas.or(num_output_antennas),
                num_output_spws: cli_args.num_output_spws.or(num_output_spws),
                print_state: cli_args.print_state || print_state,
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<ParsedArgs, CalpatchError> {
        let PatchArgs {
            args_file: _,
            solutions,
            times,
            spw,
            freqs,
            time_interp,
            freq_interp,
            antenna_map,
            spw_map,
            num_output_antennas,
            num_output_spws,
            print_state,
        } = self;

        let solutions = solutions.ok_or(CliArgsError::NoSolutions)?;
        let times =
            Vec1::try_from_vec(times.unwrap_or_default()).map_err(|_| CliArgsError::NoTimes)?;
        if num_output_antennas == Some(0) {
            return Err(CliArgsError::ZeroOutputs { what: "antennas" }.into());
        }
        if num_output_spws == Some(0) {
            return Err(CliArgsError::ZeroOutputs {
                what: "spectral windows",
            }
            .into());
        }

        let mut patch_params = PatchParams {
            antenna_map: antenna_map.map(CalMap::from).unwrap_or_default(),
            spw_map: spw_map.map(CalMap::from).unwrap_or_default(),
            num_output_antennas,
            num_output_spws,
            ..Default::default()
        };
        patch_params.set_interp_types(time_interp.as_deref(), freq_interp.as_deref())?;

        Ok(ParsedArgs {
            solutions,
            times,
            spw: spw.unwrap_or(0),
            freqs,
            patch_params,
            print_state,
        })
    }

    pub(crate) fn run(self, dry_run: bool) -> Result<(), CalpatchError> {
        debug!("Converting arguments into parameters");
        let ParsedArgs {
            solutions,
            times,
            spw,
            freqs,
            patch_params,
            print_state,
        } = self.parse()?;

        let table = MemCalTable::read_from_ext(&solutions)?;
        let mut printer = InfoPrinter::new("Calibration table".into());
        printer.push_block(vec![
            format!("File: {}", solutions.display()).into(),
            format!("Type: {}", table.cal_type_tag()).into(),
            format!(
                "{} rows, {} antennas, {} spectral windows",
                table.rows().len(),
                table.antennas().len(),
                table.spws().len()
            )
            .into(),
        ]);
        printer.display();

        let mut patch = CalPatch::new(table, &patch_params)?;
        let mut printer = InfoPrinter::new("Interpolation".into());
        printer.push_block(vec![
            format!("Time interpolation: {}", patch.time_interp()).into(),
            format!("Frequency interpolation: {}", patch.freq_interp()).into(),
        ]);
        printer.push_line(
            format!(
                "{} output antennas, {} output spectral windows",
                patch.num_output_antennas(),
                patch.num_output_spws()
            )
            .into(),
        );
        match freqs.as_deref() {
            Some(f) => printer.push_line(format!("Resampling onto {} frequencies", f.len()).into()),
            None => printer.push_line("Reporting the table's channels".into()),
        }
        printer.display();

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        for &time in &times {
            let changed = match freqs.as_deref() {
                Some(f) => patch.interpolate_freqs(spw, time, f)?,
                None => patch.interpolate(spw, time)?,
            };
            let (values, flags) = if freqs.is_some() {
                (patch.freq_result(spw), patch.freq_flags(spw))
            } else {
                (patch.result(spw), patch.flags(spw))
            };
            // Both are available after a successful interpolation.
            let (values, flags) = match (values, flags) {
                (Some(v), Some(f)) => (v, f),
                _ => continue,
            };

            info!(
                "spw {spw} at time {time}{}",
                if changed { "" } else { " (unchanged)" }
            );
            report(values, flags);
        }

        if print_state {
            info!("{}", patch.state());
        }

        Ok(())
    }
}

/// Log the solutions of each antenna. Dimensions are (parameter, channel,
/// antenna).
fn report(values: ArrayView3<f32>, flags: ArrayView3<bool>) {
    for (antenna, (values, flags)) in values
        .axis_iter(Axis(2))
        .zip(flags.axis_iter(Axis(2)))
        .enumerate()
    {
        if flags.iter().all(|&f| f) {
            info!("  antenna {antenna}: flagged");
            continue;
        }
        let values = values
            .iter()
            .zip(flags.iter())
            .map(|(v, &f)| if f { "flagged".to_string() } else { v.to_string() })
            .join(", ");
        info!("  antenna {antenna}: [{values}]");
    }
}
