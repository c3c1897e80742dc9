//! Export fit results to JSON and CSV.
//!
//! The JSON export is the "portable" representation of a fit:
//! - tool name and generation timestamp
//! - the configuration and candidate rates that produced it
//! - the selected pair, per-sweep estimates and per-candidate diagnostics
//!
//! The CSV exports are meant to be easy to consume in spreadsheets or downstream
//! scripts:
//! - fit CSV: one row per sweep of the winning pair
//! - traces CSV: one row per (sweep, sample) with the total post-spike current
//!   and the decay of each after-spike current

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{AscFit, FitConfig};
use crate::error::AppError;
use crate::report::SweepTraces;

/// Serialized form of a fit run. Non-finite values are written as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct FitFile<'a> {
    pub tool: String,
    pub generated: DateTime<Utc>,
    pub config: &'a FitConfig,
    pub candidate_rates: &'a [f64],
    pub fit: &'a AscFit,
}

/// Write the fit JSON file.
pub fn write_fit_json(path: &Path, fit: &AscFit, config: &FitConfig, rates: &[f64]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    let doc = FitFile {
        tool: format!("asglm {}", env!("CARGO_PKG_VERSION")),
        generated: Utc::now(),
        config,
        candidate_rates: rates,
        fit,
    };

    serde_json::to_writer_pretty(BufWriter::new(file), &doc)
        .map_err(|e| AppError::config(format!("Failed to write fit JSON: {e}")))?;
    Ok(())
}

/// Write per-sweep results of the winning pair to a CSV file.
pub fn write_fit_csv(path: &Path, fit: &AscFit) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_fit_rows(&mut out, fit).map_err(|e| AppError::config(format!("Failed to write export CSV: {e}")))
}

fn write_fit_rows(out: &mut impl Write, fit: &AscFit) -> std::io::Result<()> {
    writeln!(
        out,
        "sweep,k1,k2,amp1,amp2,resistance,capacitance,reversal_potential,log_likelihood"
    )?;

    for (i, amps) in fit.amplitudes.iter().enumerate() {
        writeln!(
            out,
            "{},{},{},{:e},{:e},{:e},{},{},{:.6}",
            i,
            fit.best_rates[0],
            fit.best_rates[1],
            amps[0],
            amps[1],
            fit.resistances[i],
            fmt_opt(fit.capacitances.get(i).copied().flatten()),
            fmt_opt(fit.reversal_potentials.get(i).copied().flatten()),
            fit.log_likelihoods[i],
        )?;
    }
    out.flush()
}

/// Write post-spike current and decay traces to a CSV file.
pub fn write_traces_csv(path: &Path, traces: &[SweepTraces], dt: f64) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create traces CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_trace_rows(&mut out, traces, dt).map_err(|e| AppError::config(format!("Failed to write traces CSV: {e}")))
}

fn write_trace_rows(out: &mut impl Write, traces: &[SweepTraces], dt: f64) -> std::io::Result<()> {
    writeln!(out, "sweep,sample,time_s,post_spike_current,asc1,asc2")?;

    for tr in traces {
        let decay = |j: usize, t: usize| tr.decays[j].get(t).map(|v| format!("{v:e}")).unwrap_or_default();
        for (t, total) in tr.post_spike_current.iter().enumerate() {
            writeln!(
                out,
                "{},{},{:e},{:e},{},{}",
                tr.sweep,
                t,
                t as f64 * dt,
                total,
                decay(0, t),
                decay(1, t),
            )?;
        }
    }
    out.flush()
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:e}")).unwrap_or_default()
}
