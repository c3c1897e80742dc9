//! Spike masker: remove spike-contaminated samples before regression.
//!
//! The voltage derivative is a forward difference, so every aligned signal is
//! trimmed to the window `[start, len - 1)` first. Then `npcut` samples starting
//! at each retained spike are deleted from current, voltage, derivative and
//! basis rows alike. Overlapping windows delete a sample once; window samples
//! past the end of the trimmed signal are ignored.

use nalgebra::DMatrix;

use crate::domain::{BASIS_COUNT, Sweep};
use crate::models::SampleRow;

/// Spike-deleted training data for one sweep and one candidate pair.
#[derive(Debug, Clone)]
pub struct MaskedSweep {
    pub rows: Vec<SampleRow>,
    /// Samples deleted from the trimmed window.
    pub deleted: usize,
}

impl MaskedSweep {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Forward-difference derivative `(v[t+1] - v[t]) / dt` for `t` in `[start, len - 1)`.
pub fn voltage_derivative(voltage: &[f64], start: usize, dt: f64) -> Vec<f64> {
    if voltage.len() < start + 2 {
        return Vec::new();
    }
    voltage[start..].windows(2).map(|w| (w[1] - w[0]) / dt).collect()
}

/// Keep-mask over a trimmed window of `window_len` samples.
pub fn deletion_mask(window_len: usize, spikes: &[usize], start: usize, npcut: usize) -> Vec<bool> {
    let mut delete = vec![false; window_len];
    for &s in spikes {
        let Some(lo) = s.checked_sub(start) else {
            continue;
        };
        let hi = lo.saturating_add(npcut).min(window_len);
        for flag in delete.iter_mut().take(hi).skip(lo) {
            *flag = true;
        }
    }
    delete
}

/// Apply the trailing trim and spike deletion to one sweep.
pub fn mask_sweep(
    sweep: &Sweep,
    basis: &DMatrix<f64>,
    spikes: &[usize],
    start: usize,
    npcut: usize,
    dt: f64,
) -> MaskedSweep {
    let dv = voltage_derivative(&sweep.voltage, start, dt);
    let window_len = dv.len();
    let delete = deletion_mask(window_len, spikes, start, npcut);

    let mut rows = Vec::with_capacity(window_len);
    for (w, (&dv_t, &drop)) in dv.iter().zip(delete.iter()).enumerate() {
        if drop {
            continue;
        }
        let t = start + w;
        let mut b = [0.0; BASIS_COUNT];
        for (j, slot) in b.iter_mut().enumerate() {
            *slot = basis[(t, j)];
        }
        rows.push(SampleRow {
            current: sweep.current[t],
            voltage: sweep.voltage[t],
            dv: dv_t,
            basis: b,
        });
    }

    MaskedSweep {
        deleted: window_len - rows.len(),
        rows,
    }
}
