//! JSON output document.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use radar_regrid::{GriddedField, RegridOutput, ResolvedGrid};
use serde::Serialize;

/// Everything a plotting collaborator needs: grid, axes and fields.
///
/// No-data cells are written as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct OutputDocument {
    pub grid: ResolvedGrid,
    /// Western edge of each column (rotated degrees)
    pub lon_axis: Vec<f64>,
    /// Southern edge of each row (rotated degrees)
    pub lat_axis: Vec<f64>,
    pub fields: Vec<FieldOutput>,
    /// Second field minus first, when two radars were given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<GriddedField>,
}

/// One radar's gridded field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldOutput {
    pub radar: String,
    pub signature: String,
    pub cache: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<DateTime<Utc>>,
    pub valid_cells: usize,
    pub field: GriddedField,
}

impl FieldOutput {
    pub fn new(
        radar: impl Into<String>,
        times: (Option<DateTime<Utc>>, Option<DateTime<Utc>>),
        output: RegridOutput,
    ) -> Self {
        Self {
            radar: radar.into(),
            signature: output.signature.to_string(),
            cache: output.cache.to_string(),
            time_start: times.0,
            time_end: times.1,
            valid_cells: output.field.valid_count(),
            field: output.field,
        }
    }
}

impl OutputDocument {
    pub fn new(grid: ResolvedGrid, fields: Vec<FieldOutput>, difference: Option<GriddedField>) -> Self {
        Self {
            lon_axis: grid.lon_axis(),
            lat_axis: grid.lat_axis(),
            grid,
            fields,
            difference,
        }
    }

    /// Write as pretty JSON to `path`, or to stdout when `None`.
    pub fn write(&self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create output directory {:?}", parent))?;
                }
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file {:?}", path))?;
                self.write_to(BufWriter::new(file))
                    .with_context(|| format!("Failed to write output to {:?}", path))
            }
            None => self
                .write_to(io::stdout().lock())
                .context("Failed to write output to stdout"),
        }
    }

    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
