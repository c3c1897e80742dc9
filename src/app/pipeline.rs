//! Shared "fit pipeline" logic used by the CLI.
//!
//! Keeping this in one place keeps the workflow testable without the binary:
//! sweep file -> config -> pairwise fit/search -> selection

use std::path::Path;

use crate::cli::{FitArgs, SynthArgs};
use crate::data::SynthConfig;
use crate::domain::{AscFit, BASIS_COUNT, FitConfig, SeedParams, SweepFile};
use crate::error::AppError;

/// All computed outputs of a single `asglm fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub sweeps: SweepFile,
    pub config: FitConfig,
    pub fit: AscFit,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(args: &FitArgs) -> Result<RunOutput, AppError> {
    let sweeps = crate::io::sweeps::read_sweep_file(&args.sweeps)?;
    run_fit_with_sweeps(args, sweeps)
}

/// Execute the fitting pipeline with sweeps already in memory.
pub fn run_fit_with_sweeps(args: &FitArgs, sweeps: SweepFile) -> Result<RunOutput, AppError> {
    let config = fit_config_from_args(args, sweeps.dt, &args.sweeps)?;
    let fit = crate::fit::fit_asc_pairwise(&args.rates, &sweeps.sweeps, &config)?;
    Ok(RunOutput { sweeps, config, fit })
}

/// Build the fit configuration; `--dt` wins over the sweep file's `dt`.
pub fn fit_config_from_args(args: &FitArgs, file_dt: Option<f64>, source: &Path) -> Result<FitConfig, AppError> {
    let dt = args.dt.or(file_dt).ok_or_else(|| {
        AppError::config(format!(
            "No sample interval: pass --dt or store \"dt\" in '{}'.",
            source.display()
        ))
    })?;

    let seeds = SeedParams {
        capacitance: args.capacitance,
        time_constant: args.tau,
        resting_potential: args.resting_potential,
    };

    let mut config = FitConfig::new(seeds, dt, args.npcut);
    config.mode = args.mode;
    config.basis = args.basis;
    config.filter_len = args.nkt;
    config.start = args.start;
    config.short_run = args.short_run;
    config.validate()?;
    Ok(config)
}

/// Build the synthetic generator configuration from `asglm synth` flags.
pub fn synth_config_from_args(args: &SynthArgs) -> Result<SynthConfig, AppError> {
    let asc_rates = exactly_two(&args.rates, "rates")?;
    let asc_amplitudes = exactly_two(&args.amplitudes, "amplitudes")?;
    Ok(SynthConfig {
        n_sweeps: args.sweeps,
        samples: args.samples,
        dt: args.dt,
        seed: args.seed,
        asc_rates,
        asc_amplitudes,
        filter_len: args.nkt,
        voltage_noise: args.voltage_noise,
        ..SynthConfig::default()
    })
}

fn exactly_two(values: &[f64], what: &str) -> Result<[f64; BASIS_COUNT], AppError> {
    <[f64; BASIS_COUNT]>::try_from(values)
        .map_err(|_| AppError::config(format!("Expected exactly {BASIS_COUNT} {what}, got {}.", values.len())))
}
