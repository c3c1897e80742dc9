//! Input/output helpers.
//!
//! - sweep JSON read/write (`sweeps`)
//! - fit exports (JSON/CSV) (`export`)

pub mod export;
pub mod sweeps;

pub use export::*;
pub use sweeps::*;
