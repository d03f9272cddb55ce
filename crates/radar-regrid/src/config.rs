//! Configuration for the regridder.

use std::path::PathBuf;

use projection::RotatedPole;
use serde::{Deserialize, Serialize};

use crate::cache::{FileCacheStore, IndexMatrixStore, MemoryCacheStore, NoopCacheStore, TieredCacheStore};
use crate::error::{RegridError, Result};

/// Target frame for the rotated-pole stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoleConfig {
    /// Explicit geographic position of the rotated north pole.
    Pole { lon: f64, lat: f64 },
    /// Frame whose origin is at this geographic point.
    CenteredOn { lon: f64, lat: f64 },
    /// No rotation.
    Identity,
}

impl Default for PoleConfig {
    fn default() -> Self {
        // Hamburg
        Self::CenteredOn {
            lon: 9.97,
            lat: 53.56,
        }
    }
}

impl PoleConfig {
    pub fn rotated_pole(&self) -> Result<RotatedPole> {
        let pole = match *self {
            Self::Pole { lon, lat } => RotatedPole::new(lon, lat),
            Self::CenteredOn { lon, lat } => RotatedPole::centered_on(lon, lat),
            Self::Identity => Ok(RotatedPole::identity()),
        };
        pole.map_err(|e| RegridError::config("pole", e.to_string()))
    }
}

/// Configuration for the regridder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegridConfig {
    /// Azimuth densification factor (>= 1).
    pub azimuth_factor: usize,

    /// Directory for persisted index matrices. `None` disables the file cache.
    pub cache_dir: Option<PathBuf>,

    /// Index matrices kept in memory. 0 disables the memory cache.
    pub memory_cache_entries: usize,

    /// Rotated-pole target frame.
    pub pole: PoleConfig,
}

impl Default for RegridConfig {
    fn default() -> Self {
        Self {
            azimuth_factor: 1,
            cache_dir: None,
            memory_cache_entries: 8,
            pole: PoleConfig::default(),
        }
    }
}

impl RegridConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value lookup. Unparseable values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("REGRID_AZIMUTH_FACTOR") {
            if let Ok(factor) = val.trim().parse() {
                config.azimuth_factor = factor;
            }
        }

        if let Some(val) = lookup("REGRID_CACHE_DIR") {
            if !val.trim().is_empty() {
                config.cache_dir = Some(PathBuf::from(val.trim()));
            }
        }

        if let Some(val) = lookup("REGRID_MEMORY_CACHE_ENTRIES") {
            if let Ok(entries) = val.trim().parse() {
                config.memory_cache_entries = entries;
            }
        }

        let lon = lookup("REGRID_POLE_LON").and_then(|v| v.trim().parse().ok());
        let lat = lookup("REGRID_POLE_LAT").and_then(|v| v.trim().parse().ok());
        if let (Some(lon), Some(lat)) = (lon, lat) {
            config.pole = PoleConfig::Pole { lon, lat };
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.azimuth_factor == 0 {
            return Err(RegridError::config(
                "azimuth_factor",
                "densification factor must be at least 1",
            ));
        }
        self.pole.rotated_pole()?;
        Ok(())
    }

    /// Disable both cache tiers.
    pub fn without_cache(mut self) -> Self {
        self.cache_dir = None;
        self.memory_cache_entries = 0;
        self
    }

    /// Store matching the configured tiers.
    pub fn cache_store(&self) -> Box<dyn IndexMatrixStore + Send + Sync> {
        match (self.memory_cache_entries, &self.cache_dir) {
            (0, None) => Box::new(NoopCacheStore),
            (n, None) => Box::new(MemoryCacheStore::new(n)),
            (0, Some(dir)) => Box::new(FileCacheStore::new(dir)),
            (n, Some(dir)) => Box::new(TieredCacheStore::new(
                MemoryCacheStore::new(n),
                FileCacheStore::new(dir),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RegridConfig::default();
        assert_eq!(config.azimuth_factor, 1);
        assert!(config.cache_dir.is_none());
        assert_eq!(config.memory_cache_entries, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = RegridConfig::from_lookup(lookup(&[
            ("REGRID_AZIMUTH_FACTOR", "4"),
            ("REGRID_CACHE_DIR", "/var/cache/regrid"),
            ("REGRID_MEMORY_CACHE_ENTRIES", "0"),
            ("REGRID_POLE_LON", "-170.0"),
            ("REGRID_POLE_LAT", "36.0"),
        ]));

        assert_eq!(config.azimuth_factor, 4);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/var/cache/regrid")));
        assert_eq!(config.memory_cache_entries, 0);
        assert_eq!(config.pole, PoleConfig::Pole { lon: -170.0, lat: 36.0 });
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config = RegridConfig::from_lookup(lookup(&[
            ("REGRID_AZIMUTH_FACTOR", "many"),
            ("REGRID_POLE_LON", "10.0"),
        ]));
        assert_eq!(config.azimuth_factor, 1);
        assert_eq!(config.pole, PoleConfig::default());
    }

    #[test]
    fn test_validate() {
        let config = RegridConfig {
            azimuth_factor: 0,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().is_configuration());

        let config = RegridConfig {
            pole: PoleConfig::Pole { lon: 0.0, lat: 120.0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pole_config_serde() {
        let pole: PoleConfig = serde_json::from_str(r#"{"kind": "centered_on", "lon": 10.0, "lat": 54.0}"#).unwrap();
        assert_eq!(pole, PoleConfig::CenteredOn { lon: 10.0, lat: 54.0 });

        let pole: PoleConfig = serde_json::from_str(r#"{"kind": "identity"}"#).unwrap();
        assert_eq!(pole.rotated_pole().unwrap(), projection::RotatedPole::identity());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RegridConfig = serde_json::from_str(r#"{"azimuth_factor": 3}"#).unwrap();
        assert_eq!(config.azimuth_factor, 3);
        assert_eq!(config.memory_cache_entries, 8);
    }
}
