//! Radar Regrid CLI
//!
//! Regrids polar radar scans described by a YAML run file.

use std::path::PathBuf;

use clap::Parser;
use radar_regrid::RegridConfig;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use regrid::{execute, load_run_config};

/// Radar Regrid
#[derive(Parser, Debug)]
#[command(name = "regrid")]
#[command(about = "Resample polar radar scans onto a rotated-pole lon/lat grid")]
struct Args {
    /// YAML run file
    #[arg(short, long, env = "REGRID_RUN_CONFIG")]
    config: PathBuf,

    /// Directory for cached index matrices (overrides the run file)
    #[arg(long, env = "REGRID_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Disable all index matrix caching
    #[arg(long)]
    no_cache: bool,

    /// Output JSON path (overrides the run file; default stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "REGRID_JSON_LOGS")]
    json_logs: bool,
}

fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args);

    if let Err(e) = run(args) {
        error!("Regrid failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(args: &Args) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Logs go to stderr so stdout stays clean for the JSON document
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);

    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let run_config = load_run_config(&args.config)?;

    let mut regrid_config = run_config
        .regrid
        .clone()
        .unwrap_or_else(RegridConfig::from_env);
    if let Some(dir) = args.cache_dir {
        regrid_config.cache_dir = Some(dir);
    }
    if args.no_cache {
        regrid_config = regrid_config.without_cache();
    }

    info!(
        config = %args.config.display(),
        radars = run_config.radars.len(),
        azimuth_factor = regrid_config.azimuth_factor,
        cache_dir = ?regrid_config.cache_dir,
        "Starting regrid"
    );

    let document = execute(&run_config, &regrid_config)?;

    let output = args.output.or_else(|| run_config.output.clone());
    document.write(output.as_deref())?;

    info!(
        fields = document.fields.len(),
        dims = ?document.grid.cell_dims(),
        output = ?output,
        "Regrid complete"
    );
    Ok(())
}
