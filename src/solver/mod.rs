//! The distributed relaxation engine.

pub mod channel;
pub mod comm;
#[cfg(feature = "distributed")]
pub mod comm_mpi;
pub mod driver;
pub mod halo;
pub mod stencil;

use std::thread;

use crate::config::SolverConfig;
use crate::error::{HeatgridError, Result};

use channel::ChannelFabric;
use driver::{ProgressHook, RunReport};

/// Run the solver with `num_ranks` in-process ranks, one thread each,
/// wired through the channel fabric. Reports are returned in rank order.
///
/// This is the default deployment; multi-node runs go through the MPI
/// transport behind the `distributed` feature instead.
pub fn run_threaded(
    config: &SolverConfig,
    num_ranks: usize,
    on_progress: Option<&ProgressHook>,
) -> Result<Vec<RunReport>> {
    let transports = ChannelFabric::connect(num_ranks)?;
    let _span = tracing::debug_span!("run_threaded", num_ranks).entered();

    thread::scope(|scope| {
        let handles: Vec<_> = transports
            .into_iter()
            .map(|mut transport| {
                scope.spawn(move || driver::run(config, &mut transport, on_progress))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| HeatgridError::Solve("solver rank panicked".to_string()))?
            })
            .collect()
    })
}
