//! Batch regridding of polar radar scans.
//!
//! Loads a YAML run file, reads one or two scans, regrids them onto a
//! rotated-pole grid and writes the fields (and their difference) as JSON.

pub mod output;
pub mod run;
pub mod run_config;

pub use output::{FieldOutput, OutputDocument};
pub use run::execute;
pub use run_config::{expand_env_vars, load_run_config, RadarInput, RunConfig};
