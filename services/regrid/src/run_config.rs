//! Run file loader.
//!
//! A run file is YAML describing one regridding job:
//!
//! ```yaml
//! grid:
//!   lon_start: min
//!   lon_end: max
//!   lat_start: -0.2
//!   lat_end: 0.2
//!   res_m: 250.0
//!   res_deg: 0.00225
//!   center: [0.0, 0.0]
//!   max_range: 20000.0
//! regrid:
//!   azimuth_factor: 2
//!   cache_dir: ${REGRID_CACHE_DIR:-./cache}
//!   pole: { kind: centered_on, lon: 9.97, lat: 53.56 }
//! radars:
//!   - file: scans/pattern.json
//!     azimuth_factor: 4
//!   - file: scans/boo.json
//! floor: 5.0
//! output: out/field.json
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are replaced from the environment before
//! parsing. Relative paths are taken relative to the run file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use radar_regrid::{GridConfig, RegridConfig};
use serde::{Deserialize, Serialize};

/// One regridding job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub grid: GridConfig,

    /// Regridder settings. Absent means "from the environment".
    #[serde(default)]
    pub regrid: Option<RegridConfig>,

    /// One radar, or two for a difference field.
    pub radars: Vec<RadarInput>,

    /// Floor applied to every field before differencing (e.g. 5 dBZ).
    #[serde(default)]
    pub floor: Option<f32>,

    /// Output JSON path. Absent writes to stdout.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// A scan file and its densification factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadarInput {
    pub file: PathBuf,

    /// Overrides the regridder's default factor for this radar.
    #[serde(default)]
    pub azimuth_factor: Option<usize>,
}

impl RunConfig {
    /// Make relative paths relative to `base`.
    pub fn rebase(&mut self, base: &Path) {
        for radar in &mut self.radars {
            if radar.file.is_relative() {
                radar.file = base.join(&radar.file);
            }
        }
        if let Some(output) = self.output.as_mut() {
            if output.is_relative() {
                *output = base.join(&*output);
            }
        }
        if let Some(dir) = self.regrid.as_mut().and_then(|r| r.cache_dir.as_mut()) {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
}

/// Load, expand and validate a run file.
pub fn load_run_config<P: AsRef<Path>>(path: P) -> Result<RunConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read run config from {:?}", path))?;

    let expanded = expand_env_vars(&content, |name| std::env::var(name).ok())?;

    let mut config: RunConfig = serde_yaml::from_str(&expanded)
        .with_context(|| format!("Failed to parse run config from {:?}", path))?;

    validate_run_config(&config)?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.rebase(base);
    Ok(config)
}

/// Replace `${VAR}` and `${VAR:-default}` using `lookup`.
pub fn expand_env_vars<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            let value = match var_expr.split_once(":-") {
                Some((name, default)) => lookup(name.trim())
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| default.to_string()),
                None => lookup(var_expr.trim())
                    .with_context(|| format!("Environment variable {} not set", var_expr))?,
            };
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn validate_run_config(config: &RunConfig) -> Result<()> {
    anyhow::ensure!(
        matches!(config.radars.len(), 1 | 2),
        "Run config needs one or two radars, got {}",
        config.radars.len()
    );

    for radar in &config.radars {
        anyhow::ensure!(
            radar.azimuth_factor != Some(0),
            "azimuth_factor for {:?} must be at least 1",
            radar.file
        );
    }

    if let Some(floor) = config.floor {
        anyhow::ensure!(floor.is_finite(), "floor must be finite, got {}", floor);
    }

    if let Some(regrid) = &config.regrid {
        regrid.validate()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_regrid::BoundValue;

    const RUN_YAML: &str = r#"
grid:
  lon_start: min
  lon_end: 0.2
  lat_start: -0.2
  lat_end: max
  res_m: 250.0
  res_deg: 0.00225
regrid:
  azimuth_factor: 2
  cache_dir: cache
radars:
  - file: scans/pattern.json
    azimuth_factor: 4
  - file: /data/boo.json
floor: 5.0
"#;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_run_yaml() {
        let config: RunConfig = serde_yaml::from_str(RUN_YAML).unwrap();

        assert_eq!(config.grid.lon_start, BoundValue::Keyword("min".into()));
        assert_eq!(config.grid.lat_start, BoundValue::Number(-0.2));
        assert_eq!(config.grid.max_range, 0.0);
        assert_eq!(config.radars.len(), 2);
        assert_eq!(config.radars[0].azimuth_factor, Some(4));
        assert_eq!(config.radars[1].azimuth_factor, None);
        assert_eq!(config.floor, Some(5.0));
        assert!(config.output.is_none());
        assert_eq!(config.regrid.unwrap().memory_cache_entries, 8);
    }

    #[test]
    fn test_rebase_relative_paths() {
        let mut config: RunConfig = serde_yaml::from_str(RUN_YAML).unwrap();
        config.rebase(Path::new("/jobs/hamburg"));

        assert_eq!(config.radars[0].file, PathBuf::from("/jobs/hamburg/scans/pattern.json"));
        assert_eq!(config.radars[1].file, PathBuf::from("/data/boo.json"));
        assert_eq!(
            config.regrid.unwrap().cache_dir,
            Some(PathBuf::from("/jobs/hamburg/cache"))
        );
    }

    #[test]
    fn test_expand_env_vars() {
        let lookup = |name: &str| (name == "SCAN_DIR").then(|| "/data/scans".to_string());

        let out = expand_env_vars("file: ${SCAN_DIR}/a.json", lookup).unwrap();
        assert_eq!(out, "file: /data/scans/a.json");

        let out = expand_env_vars("dir: ${CACHE:-./cache}", no_env).unwrap();
        assert_eq!(out, "dir: ./cache");

        assert!(expand_env_vars("x: ${MISSING}", no_env).is_err());
        assert!(expand_env_vars("x: ${UNCLOSED", no_env).is_err());
        assert_eq!(expand_env_vars("cost: $5", no_env).unwrap(), "cost: $5");
    }

    #[test]
    fn test_validate_radar_count() {
        let mut config: RunConfig = serde_yaml::from_str(RUN_YAML).unwrap();
        assert!(validate_run_config(&config).is_ok());

        config.radars.clear();
        assert!(validate_run_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_factor() {
        let mut config: RunConfig = serde_yaml::from_str(RUN_YAML).unwrap();
        config.radars[1].azimuth_factor = Some(0);
        assert!(validate_run_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        fs::write(&path, RUN_YAML).unwrap();

        let config = load_run_config(&path).unwrap();
        assert_eq!(config.radars[0].file, dir.path().join("scans/pattern.json"));
    }
}
