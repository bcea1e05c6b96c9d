// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Code to read and write "André Offringa style" calibration solutions as
//! calibration tables.
//!
//! Each timeblock of the file becomes one row per tile. All rows are in
//! spectral window 0 and field 0, and have "Jones" type; the 4 complex
//! polarisations are stored as 8 (amplitude, phase) parameters per chanblock.
//! Jones matrices containing NaN are flagged.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use hifitime::{Duration, Epoch};
use itertools::Itertools;
use log::{debug, warn};
use marlu::Jones;
use ndarray::prelude::*;
use num_complex::Complex32;

use super::{error::*, from_amp_phase, CalType, MemCalTable, SolutionRow};

pub(crate) fn read(file: &Path) -> Result<MemCalTable, TableReadError> {
    let file_str = file.display().to_string();
    let mut bin_file = BufReader::new(File::open(file)?);
    // The first 7 bytes should be ASCII "MWAOCAL".
    let mut mwaocal = [0; 7];
    for b in mwaocal.iter_mut() {
        *b = bin_file.read_u8()?;
    }
    let mwaocal_str = String::from_utf8_lossy(&mwaocal).to_string();
    if mwaocal_str.as_str() != "MWAOCAL" {
        return Err(TableReadError::AndreBinaryStr {
            file: file_str,
            got: mwaocal_str,
        });
    }
    for _ in 0..9 {
        match bin_file.read_u8()? {
            0 => (),
            v => {
                return Err(TableReadError::AndreBinaryVal {
                    file: file_str,
                    expected: "0",
                    got: v.to_string(),
                })
            }
        }
    }
    let num_timeblocks = bin_file.read_u32::<LittleEndian>()? as usize;
    let total_num_tiles = bin_file.read_u32::<LittleEndian>()? as usize;
    let total_num_chanblocks = bin_file.read_u32::<LittleEndian>()? as usize;
    let num_polarisations = bin_file.read_u32::<LittleEndian>()? as usize;
    if num_polarisations != 4 {
        return Err(TableReadError::AndreBinaryVal {
            file: file_str,
            expected: "4 (polarisations)",
            got: num_polarisations.to_string(),
        });
    }
    // If the start time (read in here as `t`) is 0, then we don't really have a
    // start time!
    let t = bin_file.read_f64::<LittleEndian>()?;
    let start_time = if t.abs() < f64::EPSILON {
        None
    } else {
        Some(Epoch::from_gpst_seconds(t))
    };
    // And similarly for the end time.
    let t = bin_file.read_f64::<LittleEndian>()?;
    let end_time = if t.abs() < f64::EPSILON {
        None
    } else {
        Some(Epoch::from_gpst_seconds(t))
    };

    // The rest of the binary is only Jones matrices.
    let mut di_jones_vec =
        vec![0.0; num_timeblocks * total_num_tiles * total_num_chanblocks * 2 * num_polarisations];
    bin_file.read_f64_into::<LittleEndian>(&mut di_jones_vec)?;
    let di_jones_a4 = Array4::from_shape_vec(
        (
            num_timeblocks,
            total_num_tiles,
            total_num_chanblocks,
            2 * num_polarisations,
        ),
        di_jones_vec,
    )
    .expect("vec was allocated with this shape");
    let di_jones = di_jones_a4.map_axis(Axis(3), |view| {
        Jones::from([
            view[0], view[1], view[2], view[3], view[4], view[5], view[6], view[7],
        ])
    });

    let times = timeblock_times(start_time, end_time, num_timeblocks);
    debug!(
        "{file_str}: {num_timeblocks} timeblocks, {total_num_tiles} tiles, {total_num_chanblocks} chanblocks"
    );

    let mut table = MemCalTable::new(CalType::Jones);
    let mut gains = Array2::zeros((num_polarisations, total_num_chanblocks));
    let mut flags = Array2::from_elem((num_polarisations, total_num_chanblocks), false);
    for (di_jones, &time) in di_jones.outer_iter().zip(times.iter()) {
        for (i_tile, di_jones) in di_jones.outer_iter().enumerate() {
            for (i_chan, j) in di_jones.iter().enumerate() {
                let flagged = j.any_nan();
                for i_pol in 0..num_polarisations {
                    gains[(i_pol, i_chan)] = if flagged {
                        Complex32::new(0.0, 0.0)
                    } else {
                        Complex32::new(j[i_pol].re as f32, j[i_pol].im as f32)
                    };
                    flags[(i_pol, i_chan)] = flagged;
                }
            }
            table.push_row(SolutionRow::from_complex(
                time,
                i_tile,
                0,
                0,
                gains.view(),
                flags.view(),
            ));
        }
    }

    Ok(table)
}

/// We'd really like to have the *actual* timestamps of each timeblock, but
/// this isn't possible with this format. Here is the best effort: the
/// timeblocks evenly divide the start and end times, and the centroid of each
/// is used. Without times, the timeblock index is used as the time.
fn timeblock_times(start: Option<Epoch>, end: Option<Epoch>, num_timeblocks: usize) -> Vec<f64> {
    match (start, end) {
        (Some(s), Some(e)) if e > s && num_timeblocks > 0 => {
            let block: Duration = (e - s) / num_timeblocks as f64;
            (0..num_timeblocks)
                .map(|i| (s + block * (i as f64 + 0.5)).to_gpst_seconds())
                .collect()
        }
        (Some(t), _) | (_, Some(t)) if num_timeblocks == 1 => vec![t.to_gpst_seconds()],
        _ => {
            if num_timeblocks > 1 {
                warn!("No usable start and end times; using timeblock indices as solution times");
            }
            (0..num_timeblocks).map(|i| i as f64).collect()
        }
    }
}

/// Write a "André-Offringa calibrate format" calibration solutions binary
/// file. Row times are assumed to be regularly spaced timeblock centroids.
pub(crate) fn write(table: &MemCalTable, file: &Path) -> Result<(), TableWriteError> {
    let num_polarisations = 4;
    if table.cal_type != CalType::Jones.to_string() {
        return Err(TableWriteError::AndreNotJones {
            got: table.cal_type.clone(),
        });
    }
    let spws = table.rows.iter().map(|r| r.spw).sorted().dedup().count();
    if spws > 1 {
        return Err(TableWriteError::AndreMultipleSpws { num: spws });
    }
    let first = table.rows.first().ok_or(TableWriteError::Empty)?;
    let total_num_chanblocks = first.num_chans();
    for (i_row, row) in table.rows.iter().enumerate() {
        if row.num_params() != 2 * num_polarisations || row.num_chans() != total_num_chanblocks {
            return Err(TableWriteError::AndreRowShape {
                row: i_row,
                got: row.num_params(),
                got_chans: row.num_chans(),
                expected_chans: total_num_chanblocks,
            });
        }
    }
    let times: Vec<f64> = table
        .rows
        .iter()
        .map(|r| r.time)
        .sorted_by(|a, b| a.total_cmp(b))
        .dedup()
        .collect();
    let num_timeblocks = times.len();
    let total_num_tiles = table.rows.iter().map(|r| r.antenna).max().unwrap_or(0) + 1;

    // Anything not in the table is written as NaN (flagged).
    let mut di_jones = Array3::from_elem(
        (num_timeblocks, total_num_tiles, total_num_chanblocks),
        Jones::<f64>::nan(),
    );
    for row in &table.rows {
        let i_timeblock = times.partition_point(|&t| t < row.time);
        for i_chan in 0..total_num_chanblocks {
            if row.flags.column(i_chan).iter().any(|&f| f) {
                continue;
            }
            let c = (0..num_polarisations)
                .map(|i_pol| {
                    from_amp_phase(
                        row.params[(2 * i_pol, i_chan)],
                        row.params[(2 * i_pol + 1, i_chan)],
                    )
                })
                .collect::<Vec<_>>();
            di_jones[(i_timeblock, row.antenna, i_chan)] = Jones::from([
                c[0].re as f64,
                c[0].im as f64,
                c[1].re as f64,
                c[1].im as f64,
                c[2].re as f64,
                c[2].im as f64,
                c[3].re as f64,
                c[3].im as f64,
            ]);
        }
    }

    // Recover the timeblock edges from the centroids.
    let (start, end) = match times.as_slice() {
        [t] => (*t, *t),
        [t0, .., tn] => {
            let half_block = (tn - t0) / (num_timeblocks - 1) as f64 / 2.0;
            (t0 - half_block, tn + half_block)
        }
        [] => (0.0, 0.0),
    };

    let mut bin_file = BufWriter::new(File::create(file)?);
    // 8 floats, 8 bytes per float.
    let mut buf = [0; 8 * 8];
    bin_file.write_all(b"MWAOCAL")?;
    bin_file.write_u8(0)?;
    bin_file.write_u32::<LittleEndian>(0)?;
    bin_file.write_u32::<LittleEndian>(0)?;
    bin_file.write_u32::<LittleEndian>(num_timeblocks as _)?;
    bin_file.write_u32::<LittleEndian>(total_num_tiles as _)?;
    bin_file.write_u32::<LittleEndian>(total_num_chanblocks as _)?;
    bin_file.write_u32::<LittleEndian>(num_polarisations as _)?;
    bin_file.write_f64::<LittleEndian>(start)?;
    bin_file.write_f64::<LittleEndian>(end)?;

    for j in di_jones.iter() {
        LittleEndian::write_f64_into(
            &[
                j[0].re, j[0].im, j[1].re, j[1].im, j[2].re, j[2].im, j[3].re, j[3].im,
            ],
            &mut buf,
        );
        bin_file.write_all(&buf)?;
    }
    bin_file.flush()?;
    Ok(())
}
