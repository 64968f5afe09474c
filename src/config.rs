//! Solver configuration shared by every rank.

use clap::ValueEnum;

use crate::error::{HeatgridError, Result};

/// How the first and last rank relate to each other.
///
/// `Linear` treats the top of rank 0 and the bottom of the last rank as
/// fixed domain edges. `Ring` wraps them around, making the field periodic
/// in the row direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Topology {
    Linear,
    Ring,
}

/// Per-run parameters. Every rank receives an identical copy.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Updatable rows in the global grid (excluding the fixed padding rows).
    pub global_rows: usize,
    /// Updatable columns (excluding the two fixed boundary columns).
    pub columns: usize,
    /// Convergence threshold on the global max per-cell change.
    pub epsilon: f64,
    pub max_iterations: u32,
    pub topology: Topology,
    /// Invoke the progress hook every N iterations; 0 disables it.
    pub progress_interval: u32,
}

impl SolverConfig {
    pub fn validate(&self) -> Result<()> {
        if self.global_rows == 0 || self.columns == 0 {
            return Err(HeatgridError::Config(format!(
                "grid dimensions must be positive (got {}x{})",
                self.global_rows, self.columns
            )));
        }
        // Written as a negated >= so NaN is rejected too.
        if !(self.epsilon >= 0.0) {
            return Err(HeatgridError::Config(format!(
                "epsilon must be non-negative (got {})",
                self.epsilon
            )));
        }
        Ok(())
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            global_rows: 1000,
            columns: 1000,
            epsilon: 0.01,
            max_iterations: 4000,
            topology: Topology::Linear,
            progress_interval: 0,
        }
    }
}
