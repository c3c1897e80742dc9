//! Mathematical utilities: post-spike kernels and Gaussian least squares.

pub mod basis;
pub mod ols;

pub use basis::*;
pub use ols::*;
