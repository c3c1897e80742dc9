//! Basis constructor: spike-triggered after-spike current bases.
//!
//! For one candidate pair we build a kernel per rate once, then for each sweep
//! add a copy of every kernel starting at each retained spike index. Kernels
//! from consecutive spikes overlap and sum; a kernel running past the end of
//! the sweep is truncated.

use nalgebra::DMatrix;

use crate::domain::{BASIS_COUNT, BasisFamily, RatePair, Sweep};
use crate::math::{exponential_kernel, raised_cosine_kernels};

/// Unit-amplitude kernels (length `filter_len`) for each rate of the pair.
pub fn basis_kernels(pair: &RatePair, family: BasisFamily, filter_len: usize) -> [Vec<f64>; BASIS_COUNT] {
    match family {
        BasisFamily::Exponential => pair.step_rates.map(|k| exponential_kernel(k, filter_len)),
        BasisFamily::RaisedCosine => {
            let mut bumps = raised_cosine_kernels(&pair.filter_taus, filter_len).into_iter();
            std::array::from_fn(|_| bumps.next().unwrap_or_else(|| vec![0.0; filter_len]))
        }
    }
}

/// Spike indices that take part in the fit: strictly after `start`, strictly
/// before the end of the sweep.
pub fn retained_spikes(sweep: &Sweep, start: usize) -> Vec<usize> {
    let len = sweep.len();
    sweep
        .spike_indices
        .iter()
        .copied()
        .filter(|&s| s > start && s < len)
        .collect()
}

/// Build the `len × BASIS_COUNT` basis current matrix for one sweep.
pub fn build_basis_currents(len: usize, spikes: &[usize], kernels: &[Vec<f64>; BASIS_COUNT]) -> DMatrix<f64> {
    let mut basis = DMatrix::<f64>::zeros(len, BASIS_COUNT);
    for &s in spikes {
        if s >= len {
            continue;
        }
        for (col, kernel) in kernels.iter().enumerate() {
            let m = kernel.len().min(len - s);
            for (j, &value) in kernel[..m].iter().enumerate() {
                basis[(s + j, col)] += value;
            }
        }
    }
    basis
}
