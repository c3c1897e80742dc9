//! `asc-glm` library crate.
//!
//! Fits after-spike currents of a generalized leaky integrate-and-fire neuron
//! by exhaustive search over pairs of candidate decay rates, one linear
//! Gaussian regression per (pair, sweep).
//!
//! The binary (`asglm`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - modules are reusable by other front-ends or notebooks

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
