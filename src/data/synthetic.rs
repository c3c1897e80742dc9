//! Synthetic sweep generation from a known after-spike current model.
//!
//! The generator integrates (forward Euler, one step per sample)
//!
//! ```text
//! C dV/dt = I(t) + Σ_j a_j Σ_s exp(-k_j (t - s)) - (V - E_L) / R
//! ```
//!
//! with a noisy step stimulus `I(t)`, a fixed threshold and a voltage reset.
//! After-spike kernels are truncated at `filter_len` samples, exactly like the
//! fitting bases, so a fit with matching seeds and the true rate pair recovers
//! the generating amplitudes and resistance.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::{BASIS_COUNT, DEFAULT_FILTER_LEN, Sweep, SweepFile};
use crate::error::AppError;

/// Generating parameters for synthetic sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    pub n_sweeps: usize,
    pub samples: usize,
    /// Sample interval (s).
    pub dt: f64,
    pub seed: u64,

    pub capacitance: f64,
    pub resistance: f64,
    pub resting_potential: f64,
    pub threshold: f64,
    pub reset: f64,

    /// After-spike current decay rates (1/s).
    pub asc_rates: [f64; BASIS_COUNT],
    /// After-spike current amplitudes (A).
    pub asc_amplitudes: [f64; BASIS_COUNT],
    pub filter_len: usize,

    /// Stimulus mean and per-sample standard deviation (A).
    pub stim_mean: f64,
    pub stim_sd: f64,
    /// Standard deviation of additive voltage measurement noise (V).
    pub voltage_noise: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            n_sweeps: 3,
            samples: 20_000,
            dt: 5e-5,
            seed: 42,
            capacitance: 100e-12,
            resistance: 100e6,
            resting_potential: -0.07,
            threshold: -0.05,
            reset: -0.065,
            asc_rates: [20.0, 200.0],
            asc_amplitudes: [-10e-12, -40e-12],
            filter_len: DEFAULT_FILTER_LEN,
            stim_mean: 300e-12,
            stim_sd: 100e-12,
            voltage_noise: 0.0,
        }
    }
}

/// Generate a sweep file from the configured model.
pub fn generate_sweeps(config: &SynthConfig) -> Result<SweepFile, AppError> {
    if config.n_sweeps == 0 || config.samples < 2 {
        return Err(AppError::config("Synthetic data needs at least one sweep of two samples."));
    }
    if !(config.dt.is_finite() && config.dt > 0.0) {
        return Err(AppError::config("Synthetic dt must be finite and >0."));
    }
    if !(config.capacitance > 0.0 && config.resistance > 0.0) {
        return Err(AppError::config("Synthetic capacitance and resistance must be >0."));
    }
    if !(config.threshold > config.reset) {
        return Err(AppError::config("Synthetic threshold must lie above the reset potential."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let stim = Normal::new(config.stim_mean, config.stim_sd.max(0.0))
        .map_err(|e| AppError::config(format!("Stimulus distribution error: {e}")))?;
    let noise = Normal::new(0.0, config.voltage_noise.max(0.0))
        .map_err(|e| AppError::config(format!("Voltage noise distribution error: {e}")))?;

    let mut sweeps = Vec::with_capacity(config.n_sweeps);
    for _ in 0..config.n_sweeps {
        let current: Vec<f64> = (0..config.samples).map(|_| stim.sample(&mut rng)).collect();
        let (mut voltage, spike_indices) = integrate(config, &current);
        if config.voltage_noise > 0.0 {
            for v in &mut voltage {
                *v += noise.sample(&mut rng);
            }
        }
        sweeps.push(Sweep {
            current,
            voltage,
            spike_indices,
        });
    }

    Ok(SweepFile {
        dt: Some(config.dt),
        sweeps,
    })
}

/// Total after-spike current at sample `t` from the spikes emitted so far.
pub fn after_spike_current(config: &SynthConfig, spikes: &[usize], t: usize) -> f64 {
    let mut total = 0.0;
    for &s in spikes.iter().rev() {
        let lag = t - s;
        if lag >= config.filter_len {
            break;
        }
        for j in 0..BASIS_COUNT {
            total += config.asc_amplitudes[j] * (-config.asc_rates[j] * config.dt * lag as f64).exp();
        }
    }
    total
}

fn integrate(config: &SynthConfig, current: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let n = current.len();
    let mut voltage = vec![config.resting_potential; n];
    let mut spikes = Vec::new();

    for t in 0..n - 1 {
        if t > 0 && voltage[t] >= config.threshold {
            spikes.push(t);
            voltage[t + 1] = config.reset;
            continue;
        }
        let asc = after_spike_current(config, &spikes, t);
        let leak = (voltage[t] - config.resting_potential) / config.resistance;
        voltage[t + 1] = voltage[t] + config.dt / config.capacitance * (current[t] + asc - leak);
    }

    (voltage, spikes)
}
