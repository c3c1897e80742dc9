//! Command-line parsing for the after-spike current fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{BasisFamily, DEFAULT_FILTER_LEN, FitMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "asglm", version, about = "After-spike current GLM fitter")]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace). Falls back to `ASGLM_LOG`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit after-spike currents to a sweep file, print diagnostics, and optionally export.
    Fit(FitArgs),
    /// Write a synthetic sweep file generated from a known after-spike current model.
    Synth(SynthArgs),
}

/// Options for fitting.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Sweep JSON file (`{"dt": .., "sweeps": [{"current", "voltage", "spike_indices"}]}`).
    #[arg(long, value_name = "JSON")]
    pub sweeps: PathBuf,

    /// Candidate decay rates (1/s), comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    pub rates: Vec<f64>,

    /// Seed membrane capacitance (F).
    #[arg(long, default_value_t = 100e-12)]
    pub capacitance: f64,

    /// Seed membrane time constant (s).
    #[arg(long, default_value_t = 10e-3)]
    pub tau: f64,

    /// Seed resting potential (V).
    #[arg(long, default_value_t = -0.07, allow_negative_numbers = true)]
    pub resting_potential: f64,

    /// Samples removed after each spike onset.
    #[arg(long, default_value_t = 40)]
    pub npcut: usize,

    /// Sample interval (s). Overrides the value stored in the sweep file.
    #[arg(long)]
    pub dt: Option<f64>,

    /// Which parameters the regression frees.
    #[arg(long, value_enum, default_value_t = FitMode::Asc)]
    pub mode: FitMode,

    /// Kernel family for the after-spike current bases.
    #[arg(long, value_enum, default_value_t = BasisFamily::Exponential)]
    pub basis: BasisFamily,

    /// Post-spike filter length (samples).
    #[arg(long, default_value_t = DEFAULT_FILTER_LEN)]
    pub nkt: usize,

    /// First sample considered.
    #[arg(long, default_value_t = 0)]
    pub start: usize,

    /// Only evaluate the first candidate pair (smoke test).
    #[arg(long)]
    pub short_run: bool,

    /// Export the fit (config + best pair + per-sweep estimates) to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export per-sweep estimates of the best pair to CSV.
    #[arg(long = "export-csv")]
    pub export_csv: Option<PathBuf>,

    /// Export the best pair's post-spike current and decay traces to CSV.
    #[arg(long = "export-traces")]
    pub export_traces: Option<PathBuf>,
}

/// Options for synthetic sweep generation.
#[derive(Debug, Parser, Clone)]
pub struct SynthArgs {
    /// Output sweep JSON file.
    #[arg(long, value_name = "JSON")]
    pub out: PathBuf,

    /// Number of sweeps.
    #[arg(long, default_value_t = 3)]
    pub sweeps: usize,

    /// Samples per sweep.
    #[arg(long, default_value_t = 20_000)]
    pub samples: usize,

    /// Random seed for the stimulus.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Sample interval (s).
    #[arg(long, default_value_t = 5e-5)]
    pub dt: f64,

    /// Generating after-spike current rates (1/s), exactly two.
    #[arg(long, value_delimiter = ',', default_values_t = [20.0, 200.0])]
    pub rates: Vec<f64>,

    /// Generating after-spike current amplitudes (A), exactly two.
    #[arg(long, value_delimiter = ',', default_values_t = [-10e-12, -40e-12], allow_negative_numbers = true)]
    pub amplitudes: Vec<f64>,

    /// Post-spike filter length of the generating kernels (samples).
    #[arg(long, default_value_t = DEFAULT_FILTER_LEN)]
    pub nkt: usize,

    /// Standard deviation of additive voltage noise (V).
    #[arg(long, default_value_t = 0.0)]
    pub voltage_noise: f64,
}
