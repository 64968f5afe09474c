//! Distributed row-banded Jacobi relaxation of the 2D Laplace equation.
//!
//! The global grid is split into contiguous row bands, one per rank. Each
//! iteration a rank posts a non-blocking halo exchange with its vertical
//! neighbors, updates the rows that do not touch the ghost margin while the
//! messages are in flight, waits for the exchange, updates the two
//! ghost-dependent boundary rows, and agrees on a global convergence
//! measure through an all-reduce max.
//!
//! Ranks are realized either as in-process threads wired with channels
//! ([`solver::run_threaded`]) or, with the `distributed` feature, as MPI
//! processes.

pub mod config;
pub mod error;
pub mod grid;
pub mod partition;
pub mod solver;

pub use config::{SolverConfig, Topology};
pub use error::{HeatgridError, Result};
pub use solver::driver::{run, CellSample, RunReport, Status};
pub use solver::run_threaded;
