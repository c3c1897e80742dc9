//! Design matrices for the four fit modes.
//!
//! The membrane equation with after-spike currents is
//!
//! ```text
//! C dV/dt = I + Σ_j a_j b_j(t) - (V - E_L) / R
//! ```
//!
//! With the seed capacitance `C`, seed time constant `τ` and resting potential
//! `E_L` held fixed, the regressor relies on two primitive operations:
//! - fill a design row (and return the response) for one spike-deleted sample
//! - turn fitted coefficients back into physical parameters
//!
//! Column layout (`B = BASIS_COUNT`):
//!
//! | mode              | columns                                 | response   |
//! |-------------------|-----------------------------------------|------------|
//! | `asc`, `ascR`     | `b_j/C`, `-(V-E_L)/τ`                   | `dV - I/C` |
//! | `ascREl`          | `b_j/C`, `-(V-E_L)/τ`, `1`              | `dV - I/C` |
//! | `ascRElC`         | `b_j/C`, `-(V-E_L)/τ`, `I/C`, `1`       | `dV`       |

use crate::domain::{BASIS_COUNT, FitMode, RegressionFailure, SeedParams, SweepEstimate};

/// One spike-deleted sample of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRow {
    pub current: f64,
    pub voltage: f64,
    /// Forward-difference voltage derivative (V/s).
    pub dv: f64,
    pub basis: [f64; BASIS_COUNT],
}

/// Fill a design row for the given mode and return the response value.
///
/// # Panics
/// Panics if `out` is shorter than `mode.coefficient_count()`.
pub fn fill_design_row(mode: FitMode, seeds: &SeedParams, row: &SampleRow, out: &mut [f64]) -> f64 {
    let c = seeds.capacitance;
    for j in 0..BASIS_COUNT {
        out[j] = row.basis[j] / c;
    }
    out[BASIS_COUNT] = -(row.voltage - seeds.resting_potential) / seeds.time_constant;

    match mode {
        FitMode::Asc | FitMode::AscR => row.dv - row.current / c,
        FitMode::AscREl => {
            out[BASIS_COUNT + 1] = 1.0;
            row.dv - row.current / c
        }
        FitMode::AscRElC => {
            out[BASIS_COUNT + 1] = row.current / c;
            out[BASIS_COUNT + 2] = 1.0;
            row.dv
        }
    }
}

/// Map fitted coefficients to physical parameters.
///
/// - resistance: `τ / (β_leak · C)`
/// - reversal potential: `E_L + β_const · τ / β_leak`
/// - capacitance: `C / β_I`
pub fn estimate_from_coefficients(
    mode: FitMode,
    seeds: &SeedParams,
    beta: &[f64],
) -> Result<SweepEstimate, RegressionFailure> {
    if beta.len() != mode.coefficient_count() {
        return Err(RegressionFailure::Solver(format!(
            "expected {} coefficients, got {}",
            mode.coefficient_count(),
            beta.len()
        )));
    }

    let mut amplitudes = [0.0; BASIS_COUNT];
    amplitudes.copy_from_slice(&beta[..BASIS_COUNT]);
    let leak = beta[BASIS_COUNT];
    let tau = seeds.time_constant;
    let resistance = tau / (leak * seeds.capacitance);

    let estimate = match mode {
        FitMode::Asc | FitMode::AscR => SweepEstimate::AscR { amplitudes, resistance },
        FitMode::AscREl => SweepEstimate::AscREl {
            amplitudes,
            resistance,
            reversal_potential: seeds.resting_potential + beta[BASIS_COUNT + 1] * tau / leak,
        },
        FitMode::AscRElC => SweepEstimate::AscRElC {
            amplitudes,
            resistance,
            reversal_potential: seeds.resting_potential + beta[BASIS_COUNT + 2] * tau / leak,
            capacitance: seeds.capacitance / beta[BASIS_COUNT + 1],
        },
    };

    let finite = amplitudes.iter().all(|a| a.is_finite())
        && resistance.is_finite()
        && estimate.reversal_potential().is_none_or(f64::is_finite)
        && estimate.capacitance().is_none_or(f64::is_finite);
    if finite {
        Ok(estimate)
    } else {
        Err(RegressionFailure::NonFiniteEstimate)
    }
}
