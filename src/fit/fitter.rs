//! Per-sweep regression and candidate evaluation.
//!
//! Given:
//! - the recorded sweeps
//! - a list of candidate rate pairs
//! - the fit configuration (seeds, cut width, mode, basis family)
//!
//! we run, for each (candidate, sweep) unit independently:
//! - basis construction for the pair
//! - spike masking
//! - one Gaussian-identity regression
//!
//! A unit that cannot be fitted is recorded as a `RegressionFailure` and the
//! search continues; only configuration problems and cancellation abort.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{CandidateFit, FitConfig, FitMode, RatePair, SeedParams, Sweep, SweepFit, SweepOutcome};
use crate::error::AppError;
use crate::fit::basis_current::{basis_kernels, build_basis_currents, retained_spikes};
use crate::fit::cancel::CancelToken;
use crate::fit::mask::{MaskedSweep, mask_sweep};
use crate::math::fit_gaussian_identity;
use crate::models::{estimate_from_coefficients, fill_design_row};

/// Check the sweep set before any computation.
pub fn validate_sweeps(sweeps: &[Sweep], config: &FitConfig) -> Result<(), AppError> {
    if sweeps.is_empty() {
        return Err(AppError::config("No sweeps to fit."));
    }
    for (i, sweep) in sweeps.iter().enumerate() {
        if sweep.current.len() != sweep.voltage.len() {
            return Err(AppError::config(format!(
                "Sweep {i}: current has {} samples but voltage has {}.",
                sweep.current.len(),
                sweep.voltage.len()
            )));
        }
        if sweep.len() < config.start + 2 {
            return Err(AppError::config(format!(
                "Sweep {i}: {} samples is too short for start offset {}.",
                sweep.len(),
                config.start
            )));
        }
    }
    Ok(())
}

/// Fit one spike-deleted sweep.
pub fn regress_sweep(masked: &MaskedSweep, mode: FitMode, seeds: &SeedParams) -> SweepOutcome {
    let p = mode.coefficient_count();
    let n = masked.len();

    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut y = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; p];
    for (i, sample) in masked.rows.iter().enumerate() {
        y[i] = fill_design_row(mode, seeds, sample, &mut row);
        for (j, &value) in row.iter().enumerate() {
            x[(i, j)] = value;
        }
    }

    let fit = fit_gaussian_identity(&x, &y)?;
    let estimate = estimate_from_coefficients(mode, seeds, fit.beta.as_slice())?;
    Ok(SweepFit {
        estimate,
        log_likelihood: fit.log_likelihood,
        n_samples: fit.n,
    })
}

/// Indices of sweeps without a retained spike. Their basis columns are all
/// zero, so every candidate fails on them.
pub fn spikeless_sweeps(spikes: &[Vec<usize>]) -> Vec<usize> {
    spikes
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_empty())
        .map(|(i, _)| i)
        .collect()
}

/// Evaluate every (candidate, sweep) unit in parallel.
///
/// Results come back in enumeration order regardless of scheduling.
pub fn evaluate_candidates(
    pairs: &[RatePair],
    sweeps: &[Sweep],
    config: &FitConfig,
    cancel: &CancelToken,
) -> Result<Vec<CandidateFit>, AppError> {
    let spikes: Vec<Vec<usize>> = sweeps.iter().map(|s| retained_spikes(s, config.start)).collect();
    for s in spikeless_sweeps(&spikes) {
        warn!(sweep = s, "sweep has no spikes after the start offset; its after-spike bases are all zero");
    }
    let kernels: Vec<_> = pairs
        .par_iter()
        .map(|p| basis_kernels(p, config.basis, config.filter_len))
        .collect();

    let units: Vec<(usize, usize)> = (0..pairs.len())
        .flat_map(|c| (0..sweeps.len()).map(move |s| (c, s)))
        .collect();

    let outcomes: Vec<Option<SweepOutcome>> = units
        .par_iter()
        .map(|&(c, s)| {
            if cancel.is_cancelled() {
                return None;
            }
            let sweep = &sweeps[s];
            let basis = build_basis_currents(sweep.len(), &spikes[s], &kernels[c]);
            let masked = mask_sweep(sweep, &basis, &spikes[s], config.start, config.npcut, config.dt);
            let outcome = regress_sweep(&masked, config.mode, &config.seeds);
            if let Err(e) = &outcome {
                warn!(candidate = c, sweep = s, rates = ?pairs[c].rates, "fit didn't work: {e}");
            }
            Some(outcome)
        })
        .collect();

    if cancel.is_cancelled() {
        return Err(AppError::new(5, "Fit cancelled."));
    }

    let mut outcomes = outcomes.into_iter();
    let mut out = Vec::with_capacity(pairs.len());
    for (index, pair) in pairs.iter().enumerate() {
        let per_sweep = outcomes
            .by_ref()
            .take(sweeps.len())
            .map(|o| o.ok_or_else(|| AppError::new(5, "Fit cancelled.")))
            .collect::<Result<Vec<_>, _>>()?;
        let candidate = CandidateFit {
            index,
            pair: *pair,
            sweeps: per_sweep,
        };
        debug!(
            candidate = index,
            rates = ?pair.rates,
            failures = candidate.failure_count(),
            "evaluated candidate"
        );
        out.push(candidate);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BASIS_COUNT, RegressionFailure, SweepEstimate};
    use crate::models::SampleRow;

    fn seeds() -> SeedParams {
        SeedParams {
            capacitance: 100e-12,
            time_constant: 10e-3,
            resting_potential: -0.07,
        }
    }

    /// Rows generated exactly from the `asc` design with known parameters.
    fn synthetic_rows(amps: [f64; BASIS_COUNT], resistance: f64, noise: f64) -> MaskedSweep {
        let s = seeds();
        let n = 400;
        let rows = (0..n)
            .map(|t| {
                let tf = t as f64;
                // Spikes at 0 and 200.
                let triggered = |tau: f64| {
                    [0.0, 200.0]
                        .iter()
                        .filter(|&&s| tf >= s)
                        .map(|&s| (-(tf - s) / tau).exp())
                        .sum::<f64>()
                };
                let basis = [triggered(40.0), triggered(5.0)];
                let current = 1e-10 * (1.0 + (tf * 0.37).sin());
                let voltage = -0.07 + 0.01 * (tf * 0.05).cos();
                let deterministic = current / s.capacitance
                    + (amps[0] * basis[0] + amps[1] * basis[1]) / s.capacitance
                    - (voltage - s.resting_potential) / (resistance * s.capacitance);
                let wiggle = noise * ((tf * 1.7).sin() + (tf * 0.9).cos());
                SampleRow {
                    current,
                    voltage,
                    dv: deterministic + wiggle,
                    basis,
                }
            })
            .collect();
        MaskedSweep { rows, deleted: 0 }
    }

    #[test]
    fn noiseless_data_recovers_amplitudes_and_resistance() {
        let amps = [-2e-11, 5e-12];
        let r = 150e6;
        let masked = synthetic_rows(amps, r, 0.0);
        let fit = regress_sweep(&masked, FitMode::Asc, &seeds()).unwrap();

        let got = fit.estimate.amplitudes();
        assert!((got[0] - amps[0]).abs() / amps[0].abs() < 1e-8, "{got:?}");
        assert!((got[1] - amps[1]).abs() / amps[1].abs() < 1e-8, "{got:?}");
        assert!((fit.estimate.resistance() - r).abs() / r < 1e-8);
        assert!(matches!(fit.estimate, SweepEstimate::AscR { .. }));
        assert_eq!(fit.n_samples, 400);
    }

    #[test]
    fn true_model_beats_a_perturbed_one() {
        let masked = synthetic_rows([-2e-11, 5e-12], 150e6, 1e-3);
        let s = seeds();
        let fit = regress_sweep(&masked, FitMode::Asc, &s).unwrap();
        assert!(fit.log_likelihood.is_finite());

        // Re-evaluate the likelihood with one amplitude nudged off the optimum.
        let mut beta = fit.estimate.amplitudes().to_vec();
        beta[0] *= 1.05;
        beta.push(s.time_constant / (fit.estimate.resistance() * s.capacitance));
        let mut row = vec![0.0; 3];
        let sse: f64 = masked
            .rows
            .iter()
            .map(|sample| {
                let y = fill_design_row(FitMode::Asc, &s, sample, &mut row);
                let pred: f64 = row.iter().zip(beta.iter()).map(|(a, b)| a * b).sum();
                (y - pred).powi(2)
            })
            .sum();
        let perturbed = crate::math::gaussian_log_likelihood(sse, masked.len());
        assert!(fit.log_likelihood > perturbed);
    }

    #[test]
    fn zero_basis_column_is_a_recorded_failure() {
        let mut masked = synthetic_rows([-2e-11, 5e-12], 150e6, 1e-3);
        for row in &mut masked.rows {
            row.basis = [0.0, 0.0];
        }
        let err = regress_sweep(&masked, FitMode::Asc, &seeds()).unwrap_err();
        assert!(matches!(err, RegressionFailure::RankDeficient { .. }));
    }

    #[test]
    fn empty_masked_sweep_is_a_recorded_failure() {
        let masked = MaskedSweep { rows: vec![], deleted: 10 };
        let err = regress_sweep(&masked, FitMode::AscRElC, &seeds()).unwrap_err();
        assert_eq!(err, RegressionFailure::TooFewSamples { rows: 0, cols: 5 });
    }

    #[test]
    fn spikeless_sweeps_are_listed_by_index() {
        let spikes = vec![vec![10, 40], vec![], vec![7], vec![]];
        assert_eq!(spikeless_sweeps(&spikes), vec![1, 3]);
        assert!(spikeless_sweeps(&[vec![1]]).is_empty());
    }

    #[test]
    fn mismatched_sweep_lengths_are_rejected() {
        let config = crate::domain::FitConfig::new(seeds(), 1e-4, 10);
        let sweeps = vec![Sweep {
            current: vec![0.0; 10],
            voltage: vec![0.0; 9],
            spike_indices: vec![],
        }];
        assert_eq!(validate_sweeps(&sweeps, &config).unwrap_err().exit_code(), 2);
        assert_eq!(validate_sweeps(&[], &config).unwrap_err().exit_code(), 2);
    }
}
