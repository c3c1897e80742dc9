//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input data (`Sweep`, `SweepFile`)
//! - configuration (`FitMode`, `BasisFamily`, `SeedParams`, `FitConfig`)
//! - fit outputs (`SweepEstimate`, `CandidateFit`, `AscFit`, etc.)

pub mod types;

pub use types::*;
