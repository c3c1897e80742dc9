//! Candidate selection and the pairwise ASC fit entry point.
//!
//! The search evaluates every candidate pair on every sweep and computes:
//! - the mean log-likelihood across sweeps per candidate
//!
//! Selection rules:
//! 1. A failed sweep contributes NaN, which poisons that candidate's mean.
//! 2. Candidates with a NaN mean are not eligible.
//! 3. Choose the maximum mean; ties go to the first pair in enumeration order.
//! 4. If no candidate is eligible the fit fails with "no viable candidate".

use tracing::{info, warn};

use crate::domain::{AscFit, CandidateFit, CandidateSummary, FitConfig, Sweep};
use crate::error::AppError;
use crate::fit::basis_current::retained_spikes;
use crate::fit::cancel::CancelToken;
use crate::fit::candidates::rate_pairs;
use crate::fit::fitter::{evaluate_candidates, spikeless_sweeps, validate_sweeps};
use crate::math::step_rate_to_rate;

/// Fit after-spike current amplitudes for every pair of candidate rates and
/// keep the pair with the highest mean log-likelihood.
///
/// # Arguments
/// - `rates`: candidate decay rates (1/s)
/// - `sweeps`: recorded current/voltage/spike data
/// - `config`: seeds, sample interval, cut width and search options
pub fn fit_asc_pairwise(rates: &[f64], sweeps: &[Sweep], config: &FitConfig) -> Result<AscFit, AppError> {
    fit_asc_pairwise_with_cancel(rates, sweeps, config, &CancelToken::new())
}

/// Same as [`fit_asc_pairwise`], stopping early once `cancel` is set.
pub fn fit_asc_pairwise_with_cancel(
    rates: &[f64],
    sweeps: &[Sweep],
    config: &FitConfig,
    cancel: &CancelToken,
) -> Result<AscFit, AppError> {
    config.validate()?;
    validate_sweeps(sweeps, config)?;
    let mut pairs = rate_pairs(rates, config.dt)?;

    if config.short_run {
        warn!("short run: only the first of {} candidate pairs is evaluated", pairs.len());
        pairs.truncate(1);
    }

    let candidates = evaluate_candidates(&pairs, sweeps, config, cancel)?;
    let means: Vec<f64> = candidates
        .iter()
        .map(|c| mean_log_likelihood(&c.log_likelihoods()))
        .collect();
    let best = select_best(&means).map_err(|e| {
        let spikes: Vec<Vec<usize>> = sweeps.iter().map(|s| retained_spikes(s, config.start)).collect();
        explain_no_viable(e, &spikeless_sweeps(&spikes))
    })?;

    let fit = assemble_fit(&candidates, &means, best, config);
    info!(
        best_index = best,
        rates = ?fit.best_rates,
        mean_log_likelihood = means[best],
        "selected after-spike current pair"
    );
    Ok(fit)
}

/// Arithmetic mean; any NaN (or an empty slice) gives NaN.
pub fn mean_log_likelihood(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Index of the largest non-NaN mean, first occurrence on ties.
pub fn select_best(means: &[f64]) -> Result<usize, AppError> {
    let mut best: Option<usize> = None;
    for (i, &m) in means.iter().enumerate() {
        if m.is_nan() {
            continue;
        }
        match best {
            Some(b) if m <= means[b] => {}
            _ => best = Some(i),
        }
    }
    best.ok_or_else(|| {
        AppError::new(
            4,
            format!(
                "No viable candidate: all {} candidate pairs have an undefined mean log-likelihood.",
                means.len()
            ),
        )
    })
}

/// Name sweeps without spikes in a "no viable candidate" error; they are the
/// usual cause.
fn explain_no_viable(err: AppError, spikeless: &[usize]) -> AppError {
    if spikeless.is_empty() {
        return err;
    }
    AppError::new(
        err.exit_code(),
        format!(
            "{} Sweeps {spikeless:?} have no spikes after the start offset, so their after-spike bases are all zero.",
            err.message()
        ),
    )
}

/// Build the output bundle from the winning candidate.
pub fn assemble_fit(candidates: &[CandidateFit], means: &[f64], best: usize, config: &FitConfig) -> AscFit {
    let winner = &candidates[best];
    let summaries = candidates
        .iter()
        .zip(means.iter())
        .map(|(c, &mean)| CandidateSummary {
            index: c.index,
            rates: c.pair.rates,
            mean_log_likelihood: mean,
            failures: c.failure_count(),
        })
        .collect();

    AscFit {
        mode: config.mode,
        best_index: winner.index,
        best_rates: winner.pair.step_rates.map(|k| step_rate_to_rate(k, config.dt)),
        amplitudes: winner.amplitudes(),
        resistances: winner.resistances(),
        capacitances: winner.capacitances(config.mode),
        reversal_potentials: winner.reversal_potentials(config.mode),
        log_likelihoods: winner.log_likelihoods(),
        candidates: summaries,
    }
}
