//! Input data sources.
//!
//! Recorded sweeps come from files (`crate::io`); this module generates
//! synthetic sweeps with known after-spike currents for demos and tests.

pub mod synthetic;

pub use synthetic::*;
