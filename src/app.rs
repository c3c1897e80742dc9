//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - runs the fit (or synthetic generation)
//! - prints the report and writes optional exports

use clap::Parser;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use crate::cli::{Cli, Command, FitArgs, SynthArgs};
use crate::error::AppError;

pub mod pipeline;

/// Environment variable consulted when `--log-level` is not given.
pub const LOG_ENV: &str = "ASGLM_LOG";

/// Entry point for the `asglm` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Synth(args) => handle_synth(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let run = pipeline::run_fit(&args)?;

    println!("{}", crate::report::format_fit_summary(&run.fit, &run.config));

    // Optional exports.
    if let Some(path) = &args.export {
        crate::io::export::write_fit_json(path, &run.fit, &run.config, &args.rates)?;
        info!(path = %path.display(), "wrote fit JSON");
    }
    if let Some(path) = &args.export_csv {
        crate::io::export::write_fit_csv(path, &run.fit)?;
        info!(path = %path.display(), "wrote fit CSV");
    }
    if let Some(path) = &args.export_traces {
        let traces = crate::report::sweep_traces(&run.sweeps.sweeps, &run.fit, &run.config);
        crate::io::export::write_traces_csv(path, &traces, run.config.dt)?;
        info!(path = %path.display(), sweeps = traces.len(), "wrote trace CSV");
    }

    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let config = pipeline::synth_config_from_args(&args)?;
    let file = crate::data::generate_sweeps(&config)?;
    crate::io::sweeps::write_sweep_file(&args.out, &file)?;

    let spikes: usize = file.sweeps.iter().map(|s| s.spike_indices.len()).sum();
    println!(
        "Wrote {} sweeps ({} samples each, {} spikes) to {}",
        file.sweeps.len(),
        config.samples,
        spikes,
        args.out.display()
    );
    Ok(())
}

/// Resolve the log level: explicit flag, then `ASGLM_LOG`, then `info`.
pub fn resolve_log_level(flag: Option<&str>, env: Option<&str>) -> Result<LevelFilter, AppError> {
    match flag.or(env) {
        Some(raw) => raw
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| AppError::config(format!("Unknown log level '{raw}'."))),
        None => Ok(LevelFilter::INFO),
    }
}

fn init_logging(flag: Option<&str>) -> Result<(), AppError> {
    let env = std::env::var(LOG_ENV).ok();
    let level = resolve_log_level(flag, env.as_deref())?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
