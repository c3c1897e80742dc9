//! Post-spike kernel families and rate/time-constant conversions.
//!
//! Candidate rates arrive in physical units (1/s). The kernels are indexed in
//! filter steps (one step per sample), so each rate `k` is converted to:
//!
//! - a time constant in ms: `1000 / k`
//! - a time constant in filter steps: `tau_ms * f`, with `f = 1e-3 / dt`
//! - a per-step decay rate: `1 / tau_filter` (which equals `k * dt`)
//!
//! Both families return kernels with unit peak amplitude.

use std::f64::consts::PI;

/// Offset of the log time-stretch used by the raised-cosine family.
pub const RAISED_COSINE_OFFSET: f64 = 1.0;

/// Pre-factor converting milliseconds to filter steps.
pub fn filter_factor(dt: f64) -> f64 {
    1e-3 / dt
}

/// Rate (1/s) -> basis time constant in filter steps.
pub fn rate_to_filter_tau(rate: f64, dt: f64) -> f64 {
    let tau_ms = 1000.0 / rate;
    tau_ms * filter_factor(dt)
}

/// Basis time constant in filter steps -> per-step decay rate.
pub fn filter_tau_to_step_rate(filter_tau: f64) -> f64 {
    1.0 / filter_tau
}

/// Per-step decay rate -> rate (1/s).
pub fn step_rate_to_rate(step_rate: f64, dt: f64) -> f64 {
    step_rate / dt
}

/// `exp(-step_rate * j)` for `j` in `0..len`.
pub fn exponential_kernel(step_rate: f64, len: usize) -> Vec<f64> {
    (0..len).map(|j| (-step_rate * j as f64).exp()).collect()
}

/// Raised-cosine bumps on a log-stretched time axis, one per peak.
///
/// Peaks are given in filter steps. Each bump is
/// `0.5 * (1 + cos(clamp((ln(j + b) - c) * π / (2 Δ), -π, π)))`
/// where `c = ln(peak + b)` and `Δ` is the mean spacing between adjacent
/// centres. A single peak uses `Δ = 1`.
pub fn raised_cosine_kernels(peaks: &[f64], len: usize) -> Vec<Vec<f64>> {
    let stretch = |x: f64| (x + RAISED_COSINE_OFFSET).ln();
    let centres: Vec<f64> = peaks.iter().map(|&p| stretch(p.max(0.0))).collect();

    let spacing = match (centres.iter().copied().reduce(f64::min), centres.iter().copied().reduce(f64::max)) {
        (Some(lo), Some(hi)) if centres.len() > 1 && hi > lo => (hi - lo) / (centres.len() as f64 - 1.0),
        _ => 1.0,
    };

    centres
        .iter()
        .map(|&c| {
            (0..len)
                .map(|j| {
                    let arg = (stretch(j as f64) - c) * PI / (2.0 * spacing);
                    if arg.abs() >= PI {
                        0.0
                    } else {
                        0.5 * (1.0 + arg.cos())
                    }
                })
                .collect()
        })
        .collect()
}
