//! Reporting utilities: post-spike current traces and formatted terminal output.

use tracing::warn;

use crate::domain::{AscFit, BASIS_COUNT, FitConfig, Sweep};
use crate::error::AppError;
use crate::fit::basis_current::{basis_kernels, build_basis_currents, retained_spikes};
use crate::fit::candidates::rate_pair;

pub mod format;

pub use format::*;

/// Total fitted after-spike current of one sweep, `Σ amp_i · basis_i(t)`.
///
/// The bases are rebuilt from the winning pair the same way the fit built them,
/// so the trace is exactly the current the regression attributed to spiking.
pub fn post_spike_current(
    sweep: &Sweep,
    amplitudes: &[f64; BASIS_COUNT],
    fit: &AscFit,
    config: &FitConfig,
) -> Result<Vec<f64>, AppError> {
    if amplitudes.iter().any(|a| !a.is_finite()) {
        return Err(AppError::new(4, "Cannot build a post-spike current from non-finite amplitudes."));
    }
    let pair = rate_pair(fit.best_rates, config.dt);
    let kernels = basis_kernels(&pair, config.basis, config.filter_len);
    let spikes = retained_spikes(sweep, config.start);
    let basis = build_basis_currents(sweep.len(), &spikes, &kernels);

    let amps = nalgebra::DVector::from_column_slice(amplitudes);
    Ok((basis * amps).iter().copied().collect())
}

/// Single after-spike current decaying from `amplitude` at `rate` (1/s),
/// sampled every `dt` seconds for `n` samples.
pub fn asc_decay_trace(amplitude: f64, rate: f64, dt: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| amplitude * (-rate * dt * i as f64).exp()).collect()
}

/// Diagnostic traces of one successfully fitted sweep.
#[derive(Debug, Clone)]
pub struct SweepTraces {
    pub sweep: usize,
    /// Total fitted after-spike current over the sweep (A).
    pub post_spike_current: Vec<f64>,
    /// Each after-spike current of the winning pair decaying from its amplitude,
    /// over one filter length.
    pub decays: [Vec<f64>; BASIS_COUNT],
}

/// Traces for every sweep of the winning pair. Failed sweeps are skipped.
pub fn sweep_traces(sweeps: &[Sweep], fit: &AscFit, config: &FitConfig) -> Vec<SweepTraces> {
    let mut out = Vec::with_capacity(sweeps.len());
    for (i, (sweep, amps)) in sweeps.iter().zip(fit.amplitudes.iter()).enumerate() {
        match post_spike_current(sweep, amps, fit, config) {
            Ok(total) => out.push(SweepTraces {
                sweep: i,
                post_spike_current: total,
                decays: std::array::from_fn(|j| asc_decay_trace(amps[j], fit.best_rates[j], config.dt, config.filter_len)),
            }),
            Err(e) => warn!(sweep = i, "skipping traces: {e}"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitMode, SeedParams};

    fn config() -> FitConfig {
        let mut cfg = FitConfig::new(
            SeedParams {
                capacitance: 100e-12,
                time_constant: 10e-3,
                resting_potential: -0.07,
            },
            1e-3,
            5,
        );
        cfg.filter_len = 50;
        cfg
    }

    fn fit() -> AscFit {
        AscFit {
            mode: FitMode::Asc,
            best_index: 0,
            best_rates: [50.0, 500.0],
            amplitudes: vec![[-2e-11, -5e-11]],
            resistances: vec![1e8],
            capacitances: vec![None],
            reversal_potentials: vec![None],
            log_likelihoods: vec![-1.0],
            candidates: vec![],
        }
    }

    #[test]
    fn decay_trace_starts_at_amplitude_and_halves_at_ln2_over_k() {
        let trace = asc_decay_trace(-4e-11, 100.0, 1e-4, 200);
        assert_eq!(trace.len(), 200);
        assert_eq!(trace[0], -4e-11);
        // ln 2 / 100 s ≈ 69.3 samples at dt = 0.1 ms.
        let half = (std::f64::consts::LN_2 / 100.0 / 1e-4).round() as usize;
        assert!((trace[half] / trace[0] - 0.5).abs() < 0.01);
    }

    #[test]
    fn post_spike_current_sums_both_bases_from_each_spike() {
        let sweep = Sweep {
            current: vec![0.0; 100],
            voltage: vec![-0.07; 100],
            spike_indices: vec![10, 30],
        };
        let cfg = config();
        let fit = fit();
        let amps = fit.amplitudes[0];
        let trace = post_spike_current(&sweep, &amps, &fit, &cfg).unwrap();
        assert_eq!(trace.len(), 100);
        assert_eq!(trace[9], 0.0);
        assert!((trace[10] - (amps[0] + amps[1])).abs() < 1e-24);

        // Overlap region: both spikes contribute.
        let single = |lag: f64| amps[0] * (-0.05 * lag).exp() + amps[1] * (-0.5 * lag).exp();
        assert!((trace[35] - (single(25.0) + single(5.0))).abs() < 1e-22);
        // Past the first kernel's window only the second spike remains.
        assert!((trace[65] - single(35.0)).abs() < 1e-22);
        assert_eq!(trace[90], 0.0);
    }

    #[test]
    fn sweep_traces_skip_failed_sweeps() {
        let sweep = Sweep {
            current: vec![0.0; 80],
            voltage: vec![-0.07; 80],
            spike_indices: vec![10],
        };
        let mut fit = fit();
        fit.amplitudes.push([f64::NAN, f64::NAN]);
        let traces = sweep_traces(&[sweep.clone(), sweep], &fit, &config());

        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].sweep, 0);
        assert_eq!(traces[0].post_spike_current.len(), 80);
        assert_eq!(traces[0].decays[0].len(), 50);
        assert_eq!(traces[0].decays[1][0], -5e-11);
        assert_eq!(traces[0].post_spike_current[10], traces[0].decays[0][0] + traces[0].decays[1][0]);
    }

    #[test]
    fn failed_sweep_amplitudes_are_rejected() {
        let sweep = Sweep {
            current: vec![0.0; 10],
            voltage: vec![0.0; 10],
            spike_indices: vec![],
        };
        let err = post_spike_current(&sweep, &[f64::NAN, 0.0], &fit(), &config()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
