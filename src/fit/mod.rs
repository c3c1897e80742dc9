//! After-spike current fitting orchestration.
//!
//! Responsibilities:
//!
//! - enumerate candidate rate pairs
//! - build spike-triggered basis currents and mask spike windows
//! - evaluate each (candidate, sweep) regression (parallel)
//! - select the pair with the best mean log-likelihood

pub mod basis_current;
pub mod cancel;
pub mod candidates;
pub mod fitter;
pub mod mask;
pub mod selection;

pub use cancel::CancelToken;
pub use fitter::*;
pub use selection::*;
