//! Executes a run file.

use anyhow::{Context, Result};
use radar_regrid::{
    difference, floor_values, mask_beyond_range, source_for_path, GridSpec, PolarScan,
    RegridConfig, RegridOutput, Regridder, ScanInput,
};
use tracing::info;

use crate::output::{FieldOutput, OutputDocument};
use crate::run_config::RunConfig;

/// Regrid every radar of `run`, post-process, and assemble the output.
///
/// One radar yields its field; two radars also yield their difference
/// (second minus first) on the grid resolved from the first radar.
pub fn execute(run: &RunConfig, regrid_config: &RegridConfig) -> Result<OutputDocument> {
    let regridder = Regridder::from_config(regrid_config).context("Invalid regridder configuration")?;
    let spec = GridSpec::from_config(&run.grid).context("Invalid grid configuration")?;

    let scans = run
        .radars
        .iter()
        .map(|radar| {
            source_for_path(&radar.file)
                .and_then(|source| source.read_scan())
                .with_context(|| format!("Failed to read scan {:?}", radar.file))
        })
        .collect::<Result<Vec<PolarScan>>>()?;

    let factor_of = |i: usize| run.radars[i].azimuth_factor;
    let input = |i: usize| match factor_of(i) {
        Some(k) => ScanInput::new(&scans[i]).with_factor(k),
        None => ScanInput::new(&scans[i]),
    };

    let mut outputs: Vec<RegridOutput> = match scans.len() {
        1 => {
            let k = factor_of(0).unwrap_or(regridder.azimuth_factor());
            vec![regridder.regrid_with(&scans[0], &spec, k)?]
        }
        2 => {
            let (a, b) = regridder.regrid_pair(input(0), input(1), &spec)?;
            vec![a, b]
        }
        n => anyhow::bail!("Run config needs one or two radars, got {}", n),
    };

    for output in &mut outputs {
        let masked = mask_beyond_range(&mut output.field, &output.grid)?;
        if masked > 0 {
            info!(signature = %output.signature, masked, "Masked cells beyond max range");
        }
        if let Some(floor) = run.floor {
            floor_values(&mut output.field, floor);
        }
    }

    let diff = match outputs.as_slice() {
        [a, b] => Some(difference(&a.field, &b.field)?),
        _ => None,
    };

    let grid = outputs[0].grid.clone();
    let fields = scans
        .iter()
        .zip(outputs)
        .map(|(scan, output)| FieldOutput::new(&scan.radar, (scan.time_start, scan.time_end), output))
        .collect();

    Ok(OutputDocument::new(grid, fields, diff))
}
