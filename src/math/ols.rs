//! Ordinary least squares under a Gaussian / identity-link GLM.
//!
//! Every (candidate pair, sweep) unit solves one small regression of the form:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! with 3–5 columns and thousands of rows. For a Gaussian family with identity
//! link the GLM estimate is exactly the OLS estimate, and the log-likelihood
//! evaluated at the MLE scale `σ² = SSE / n` is:
//!
//! ```text
//! llf = -n/2 * (ln(2π SSE / n) + 1)
//! ```
//!
//! Implementation choices:
//! - Columns are scaled to unit norm before the SVD. The raw design mixes
//!   columns of order `1/C` (~1e10) with columns of order 1, so a rank test on
//!   the raw matrix would be dominated by units rather than collinearity.
//! - A column of zeros or a numerically rank-deficient design is a failure,
//!   not a silently regularized solution.

use nalgebra::{DMatrix, DVector};

use crate::domain::RegressionFailure;

/// Result of a successful Gaussian-identity fit.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub beta: DVector<f64>,
    /// Rows used by the fit.
    pub n: usize,
    pub log_likelihood: f64,
}

/// Solve a least squares problem using SVD on the column-equilibrated design.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>, RegressionFailure> {
    let (rows, cols) = x.shape();
    if cols == 0 || rows < cols || y.len() != rows {
        return Err(RegressionFailure::TooFewSamples { rows, cols });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(RegressionFailure::NonFiniteInput);
    }

    let norms: Vec<f64> = x.column_iter().map(|c| c.norm()).collect();
    if norms.iter().any(|&s| s <= 0.0) {
        let rank = norms.iter().filter(|&&s| s > 0.0).count();
        return Err(RegressionFailure::RankDeficient { rank, cols });
    }

    let mut scaled = x.clone();
    for (mut col, &s) in scaled.column_iter_mut().zip(norms.iter()) {
        col /= s;
    }

    let svd = scaled.svd(true, true);
    let max_sv = svd.singular_values.max();
    let tol = max_sv * rows.max(cols) as f64 * f64::EPSILON;
    let rank = svd.rank(tol);
    if rank < cols {
        return Err(RegressionFailure::RankDeficient { rank, cols });
    }

    let beta_scaled = svd
        .solve(y, tol)
        .map_err(|e| RegressionFailure::Solver(e.to_string()))?;
    let beta = DVector::from_iterator(cols, beta_scaled.iter().zip(norms.iter()).map(|(b, s)| b / s));

    if beta.iter().all(|v| v.is_finite()) {
        Ok(beta)
    } else {
        Err(RegressionFailure::NonFiniteEstimate)
    }
}

/// Gaussian log-likelihood at the MLE scale.
///
/// A perfect fit (`sse == 0`) yields `+inf`.
pub fn gaussian_log_likelihood(sse: f64, n: usize) -> f64 {
    let n_f = n as f64;
    -0.5 * n_f * ((2.0 * std::f64::consts::PI * sse / n_f).ln() + 1.0)
}

/// Fit `y ~ x` (no implicit intercept) and report the log-likelihood.
pub fn fit_gaussian_identity(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<OlsFit, RegressionFailure> {
    let beta = solve_least_squares(x, y)?;
    let residual = y - x * &beta;
    let sse = residual.norm_squared();
    let n = y.len();
    Ok(OlsFit {
        log_likelihood: gaussian_log_likelihood(sse, n),
        beta,
        n,
    })
}
