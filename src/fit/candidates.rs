//! Candidate rate-pair enumeration.
//!
//! We select after-spike current time scales by exhaustive search over every
//! unordered pair of the supplied rates. The enumeration order is the
//! lexicographic order of `(i, j)` with `i < j`, which is also the tie-break
//! order used by the selector.

use crate::domain::{BASIS_COUNT, RatePair};
use crate::error::AppError;
use crate::math::{filter_tau_to_step_rate, rate_to_filter_tau};

/// Number of unordered pairs drawn from `n` rates: `n (n - 1) / 2`.
pub fn expected_pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Build every unordered pair of candidate rates.
pub fn rate_pairs(rates: &[f64], dt: f64) -> Result<Vec<RatePair>, AppError> {
    if rates.len() < BASIS_COUNT {
        return Err(AppError::config(format!(
            "Need at least {BASIS_COUNT} candidate rates, got {}.",
            rates.len()
        )));
    }
    if let Some(bad) = rates.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
        return Err(AppError::config(format!(
            "Invalid candidate rate {bad} (must be finite and >0)."
        )));
    }
    for (i, a) in rates.iter().enumerate() {
        if rates[i + 1..].contains(a) {
            return Err(AppError::config(format!("Candidate rate {a} is listed more than once.")));
        }
    }

    let mut out = Vec::with_capacity(expected_pair_count(rates.len()));
    for i in 0..rates.len() {
        for j in (i + 1)..rates.len() {
            out.push(rate_pair([rates[i], rates[j]], dt));
        }
    }

    check_pair_count(&out, rates.len())?;
    Ok(out)
}

/// Guard the combinatorial layout that downstream aggregation assumes.
pub fn check_pair_count(pairs: &[RatePair], n_rates: usize) -> Result<(), AppError> {
    let expected = expected_pair_count(n_rates);
    if pairs.len() != expected {
        return Err(AppError::new(
            3,
            format!(
                "Expected {expected} candidate pairs for {n_rates} rates, found {}.",
                pairs.len()
            ),
        ));
    }
    Ok(())
}

/// Derive the filter time constants and per-step rates of one pair.
pub fn rate_pair(rates: [f64; BASIS_COUNT], dt: f64) -> RatePair {
    let filter_taus = rates.map(|k| rate_to_filter_tau(k, dt));
    let step_rates = filter_taus.map(filter_tau_to_step_rate);
    RatePair {
        rates,
        filter_taus,
        step_rates,
    }
}
