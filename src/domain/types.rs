//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - read from the acquisition layer's sweep files
//! - used in-memory during fitting
//! - exported to JSON/CSV for downstream storage

use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Number of after-spike current bases fitted per candidate (one per rate of a pair).
pub const BASIS_COUNT: usize = 2;

/// Default post-spike filter length, in samples.
pub const DEFAULT_FILTER_LEN: usize = 8000;

/// One recorded trial: injected current, membrane voltage and spike onsets.
///
/// `current` and `voltage` are parallel sequences sampled at the same interval.
/// Spike indices point into those sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    /// Injected current (A).
    pub current: Vec<f64>,
    /// Membrane voltage (V).
    pub voltage: Vec<f64>,
    /// Spike onset positions (sample index).
    #[serde(default)]
    pub spike_indices: Vec<usize>,
}

impl Sweep {
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

/// A sweep file as exchanged with the acquisition/session layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepFile {
    /// Sample interval (s), if the producer recorded it.
    #[serde(default)]
    pub dt: Option<f64>,
    pub sweeps: Vec<Sweep>,
}

/// Which parameters the regression frees.
///
/// `asc` and `ascR` share one design: the after-spike current amplitudes plus
/// the leak scale (from which the resistance is derived). `ascREl` adds an
/// intercept (reversal potential), `ascRElC` additionally frees the current
/// gain (capacitance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum FitMode {
    #[serde(rename = "asc")]
    #[value(name = "asc")]
    Asc,
    #[serde(rename = "ascR")]
    #[value(name = "ascR")]
    AscR,
    #[serde(rename = "ascREl")]
    #[value(name = "ascREl")]
    AscREl,
    #[serde(rename = "ascRElC")]
    #[value(name = "ascRElC")]
    AscRElC,
}

impl FitMode {
    pub const ALL: [FitMode; 4] = [FitMode::Asc, FitMode::AscR, FitMode::AscREl, FitMode::AscRElC];

    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Asc => "asc",
            FitMode::AscR => "ascR",
            FitMode::AscREl => "ascREl",
            FitMode::AscRElC => "ascRElC",
        }
    }

    /// Number of regression coefficients.
    pub fn coefficient_count(self) -> usize {
        match self {
            FitMode::Asc | FitMode::AscR => BASIS_COUNT + 1,
            FitMode::AscREl => BASIS_COUNT + 2,
            FitMode::AscRElC => BASIS_COUNT + 3,
        }
    }

    pub fn estimates_reversal_potential(self) -> bool {
        matches!(self, FitMode::AscREl | FitMode::AscRElC)
    }

    pub fn estimates_capacitance(self) -> bool {
        matches!(self, FitMode::AscRElC)
    }
}

impl FromStr for FitMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FitMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                AppError::config(format!(
                    "Unknown fit mode '{s}' (expected one of asc, ascR, ascREl, ascRElC)."
                ))
            })
    }
}

impl std::fmt::Display for FitMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kernel family used for the after-spike current bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BasisFamily {
    /// `exp(-k t)` decays, one per candidate rate.
    Exponential,
    /// Log-time raised-cosine bumps peaking at each candidate time constant.
    RaisedCosine,
}

/// Neuron model seed values held fixed during the linear fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeedParams {
    /// Membrane capacitance (F).
    pub capacitance: f64,
    /// Membrane time constant (s).
    pub time_constant: f64,
    /// Resting potential (V).
    pub resting_potential: f64,
}

/// A full fit configuration (seeds plus search options).
///
/// This is derived from CLI flags (plus defaults) or built directly by library callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitConfig {
    pub seeds: SeedParams,
    /// Sample interval (s).
    pub dt: f64,
    /// Number of samples removed after each spike onset.
    pub npcut: usize,
    pub mode: FitMode,
    pub basis: BasisFamily,
    /// Post-spike filter length (samples).
    pub filter_len: usize,
    /// First sample considered; spikes must lie strictly after it.
    pub start: usize,
    /// Only evaluate the first candidate pair.
    pub short_run: bool,
}

impl FitConfig {
    /// Configuration with the defaults of the reference procedure
    /// (`asc` mode, exponential bases, 8000-sample filter, start at 0).
    pub fn new(seeds: SeedParams, dt: f64, npcut: usize) -> Self {
        Self {
            seeds,
            dt,
            npcut,
            mode: FitMode::Asc,
            basis: BasisFamily::Exponential,
            filter_len: DEFAULT_FILTER_LEN,
            start: 0,
            short_run: false,
        }
    }

    /// Reject configurations that would make every regression meaningless.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(AppError::config(format!("Invalid sample interval dt={} (must be finite and >0).", self.dt)));
        }
        let s = &self.seeds;
        if !(s.capacitance.is_finite() && s.capacitance > 0.0) {
            return Err(AppError::config(format!(
                "Invalid seed capacitance {} (must be finite and >0).",
                s.capacitance
            )));
        }
        if !(s.time_constant.is_finite() && s.time_constant > 0.0) {
            return Err(AppError::config(format!(
                "Invalid seed time constant {} (must be finite and >0).",
                s.time_constant
            )));
        }
        if !s.resting_potential.is_finite() {
            return Err(AppError::config("Resting potential must be finite."));
        }
        if self.filter_len == 0 {
            return Err(AppError::config("Filter length must be >= 1."));
        }
        Ok(())
    }
}

/// An unordered pair of candidate decay rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePair {
    /// Rates in physical units (1/s), as supplied by the caller.
    pub rates: [f64; BASIS_COUNT],
    /// Basis time constants in filter steps (`1000/k` ms scaled by `1e-3/dt`).
    pub filter_taus: [f64; BASIS_COUNT],
    /// Per-step decay rates (`1 / filter_tau`).
    pub step_rates: [f64; BASIS_COUNT],
}

/// Why a single (sweep, candidate) regression produced no estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum RegressionFailure {
    /// Fewer usable samples than coefficients.
    TooFewSamples { rows: usize, cols: usize },
    /// Input rows contain NaN/inf.
    NonFiniteInput,
    /// Design matrix is (numerically) rank deficient.
    RankDeficient { rank: usize, cols: usize },
    /// Solver returned an error.
    Solver(String),
    /// Coefficients or derived parameters are not finite.
    NonFiniteEstimate,
}

impl std::fmt::Display for RegressionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegressionFailure::TooFewSamples { rows, cols } => {
                write!(f, "too few samples: {rows} rows for {cols} coefficients")
            }
            RegressionFailure::NonFiniteInput => write!(f, "non-finite values in design or response"),
            RegressionFailure::RankDeficient { rank, cols } => {
                write!(f, "singular design matrix (rank {rank} < {cols})")
            }
            RegressionFailure::Solver(msg) => write!(f, "least-squares solve failed: {msg}"),
            RegressionFailure::NonFiniteEstimate => write!(f, "non-finite coefficient estimate"),
        }
    }
}

impl std::error::Error for RegressionFailure {}

/// Parameters estimated for one sweep, shaped by the fit mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SweepEstimate {
    /// `asc` / `ascR`: amplitudes and resistance.
    AscR {
        amplitudes: [f64; BASIS_COUNT],
        resistance: f64,
    },
    /// `ascREl`: adds the reversal potential.
    AscREl {
        amplitudes: [f64; BASIS_COUNT],
        resistance: f64,
        reversal_potential: f64,
    },
    /// `ascRElC`: adds the capacitance.
    AscRElC {
        amplitudes: [f64; BASIS_COUNT],
        resistance: f64,
        reversal_potential: f64,
        capacitance: f64,
    },
}

impl SweepEstimate {
    pub fn amplitudes(&self) -> [f64; BASIS_COUNT] {
        match *self {
            SweepEstimate::AscR { amplitudes, .. }
            | SweepEstimate::AscREl { amplitudes, .. }
            | SweepEstimate::AscRElC { amplitudes, .. } => amplitudes,
        }
    }

    pub fn resistance(&self) -> f64 {
        match *self {
            SweepEstimate::AscR { resistance, .. }
            | SweepEstimate::AscREl { resistance, .. }
            | SweepEstimate::AscRElC { resistance, .. } => resistance,
        }
    }

    pub fn reversal_potential(&self) -> Option<f64> {
        match *self {
            SweepEstimate::AscR { .. } => None,
            SweepEstimate::AscREl { reversal_potential, .. }
            | SweepEstimate::AscRElC { reversal_potential, .. } => Some(reversal_potential),
        }
    }

    pub fn capacitance(&self) -> Option<f64> {
        match *self {
            SweepEstimate::AscRElC { capacitance, .. } => Some(capacitance),
            _ => None,
        }
    }
}

/// A successful per-sweep regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepFit {
    pub estimate: SweepEstimate,
    pub log_likelihood: f64,
    /// Spike-deleted samples used by the regression.
    pub n_samples: usize,
}

/// Outcome of one (candidate, sweep) unit.
pub type SweepOutcome = Result<SweepFit, RegressionFailure>;

/// All per-sweep outcomes for one candidate pair.
#[derive(Debug, Clone)]
pub struct CandidateFit {
    /// Position of the pair in enumeration order.
    pub index: usize,
    pub pair: RatePair,
    pub sweeps: Vec<SweepOutcome>,
}

impl CandidateFit {
    /// Per-sweep log-likelihoods (NaN for failed sweeps).
    pub fn log_likelihoods(&self) -> Vec<f64> {
        self.sweeps
            .iter()
            .map(|o| o.as_ref().map(|f| f.log_likelihood).unwrap_or(f64::NAN))
            .collect()
    }

    pub fn amplitudes(&self) -> Vec<[f64; BASIS_COUNT]> {
        self.sweeps
            .iter()
            .map(|o| o.as_ref().map(|f| f.estimate.amplitudes()).unwrap_or([f64::NAN; BASIS_COUNT]))
            .collect()
    }

    pub fn resistances(&self) -> Vec<f64> {
        self.sweeps
            .iter()
            .map(|o| o.as_ref().map(|f| f.estimate.resistance()).unwrap_or(f64::NAN))
            .collect()
    }

    /// Per-sweep capacitances; `None` when the fit mode does not estimate it.
    pub fn capacitances(&self, mode: FitMode) -> Vec<Option<f64>> {
        self.sweeps
            .iter()
            .map(|o| match o {
                Ok(f) => f.estimate.capacitance(),
                Err(_) if mode.estimates_capacitance() => Some(f64::NAN),
                Err(_) => None,
            })
            .collect()
    }

    /// Per-sweep reversal potentials; `None` when the fit mode does not estimate it.
    pub fn reversal_potentials(&self, mode: FitMode) -> Vec<Option<f64>> {
        self.sweeps
            .iter()
            .map(|o| match o {
                Ok(f) => f.estimate.reversal_potential(),
                Err(_) if mode.estimates_reversal_potential() => Some(f64::NAN),
                Err(_) => None,
            })
            .collect()
    }

    pub fn failure_count(&self) -> usize {
        self.sweeps.iter().filter(|o| o.is_err()).count()
    }
}

/// Compact per-candidate diagnostics kept alongside the best fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub index: usize,
    /// Pair rates (1/s).
    pub rates: [f64; BASIS_COUNT],
    pub mean_log_likelihood: f64,
    pub failures: usize,
}

/// Output bundle of the pairwise ASC fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AscFit {
    pub mode: FitMode,
    /// Index of the winning pair in enumeration order.
    pub best_index: usize,
    /// Winning pair in physical units (1/s), recovered as `step_rate / dt`.
    pub best_rates: [f64; BASIS_COUNT],
    pub amplitudes: Vec<[f64; BASIS_COUNT]>,
    pub resistances: Vec<f64>,
    pub capacitances: Vec<Option<f64>>,
    pub reversal_potentials: Vec<Option<f64>>,
    pub log_likelihoods: Vec<f64>,
    pub candidates: Vec<CandidateSummary>,
}

impl AscFit {
    /// The six aggregates in the order downstream storage expects:
    /// best pair, amplitudes, resistances, capacitances, reversal potentials, log-likelihoods.
    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        [f64; BASIS_COUNT],
        Vec<[f64; BASIS_COUNT]>,
        Vec<f64>,
        Vec<Option<f64>>,
        Vec<Option<f64>>,
        Vec<f64>,
    ) {
        (
            self.best_rates,
            self.amplitudes,
            self.resistances,
            self.capacitances,
            self.reversal_potentials,
            self.log_likelihoods,
        )
    }
}
