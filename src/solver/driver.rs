//! Per-rank iteration loop: post, compute, wait, compute, reduce, swap.

use super::comm::Transport;
use super::halo::HaloExchange;
use super::stencil;
use crate::config::SolverConfig;
use crate::error::Result;
use crate::grid::{BufferPair, Grid};
use crate::partition::RowPartition;

/// How a run ended. Both are normal terminations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Converged,
    IterationLimitReached,
}

/// One rank's result: how far the run went and the band it computed.
#[derive(Debug)]
pub struct RunReport {
    pub rank: usize,
    pub iterations_run: u32,
    pub final_global_delta: f64,
    pub status: Status,
    pub partition: RowPartition,
    pub grid: Grid,
}

/// A sample cell reported through the progress hook, in global coordinates
/// (row 0 is the first updatable row of the whole domain).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSample {
    pub global_row: usize,
    pub global_col: usize,
    pub value: f64,
}

/// Progress callback: `(iteration, samples)`. Invoked on the rank owning
/// the bottom-right corner of the domain, every `progress_interval`
/// iterations. Formatting is entirely the caller's business.
pub type ProgressHook<'a> = dyn Fn(u32, &[CellSample]) + Send + Sync + 'a;

/// Relax this rank's band until the global change drops to `epsilon` or
/// the iteration cap is hit.
///
/// Every rank taking part in the computation must call this with the same
/// configuration; the convergence reduction keeps their loop decisions in
/// lockstep.
pub fn run<T: Transport>(
    config: &SolverConfig,
    transport: &mut T,
    on_progress: Option<&ProgressHook>,
) -> Result<RunReport> {
    config.validate()?;
    let partition = RowPartition::new(config.global_rows, transport.num_ranks(), transport.rank())?;

    let _span = tracing::debug_span!(
        "relaxation",
        rank = partition.rank(),
        local_rows = partition.local_rows()
    )
    .entered();

    let mut buffers = BufferPair::new(partition.local_rows(), config.columns)?;
    buffers.initialize(&partition);
    let halo = HaloExchange::new(&partition, config.topology);

    let mut global_delta = f64::INFINITY;
    let mut iterations_run = 0u32;

    let status = loop {
        if iterations_run >= config.max_iterations {
            break Status::IterationLimitReached;
        }

        let (prev, next) = buffers.split_mut();
        let pending = halo.post(transport, prev)?;
        let mut local_delta = stencil::interior_pass(prev, next);
        halo.wait(transport, pending, prev)?;
        local_delta = local_delta.max(stencil::boundary_pass(prev, next));

        global_delta = transport.all_reduce_max(local_delta)?;
        buffers.swap();
        iterations_run += 1;

        if let Some(hook) = on_progress {
            if config.progress_interval > 0
                && iterations_run % config.progress_interval == 0
                && partition.is_last()
            {
                let samples = sample_cells(buffers.current(), &partition);
                hook(iterations_run, &samples);
            }
        }

        if global_delta <= config.epsilon {
            break Status::Converged;
        }
    };

    tracing::debug!(
        ?status,
        iterations_run,
        global_delta,
        "relaxation finished"
    );

    Ok(RunReport {
        rank: partition.rank(),
        iterations_run,
        final_global_delta: global_delta,
        status,
        partition,
        grid: buffers.into_current(),
    })
}

/// Up to six cells along the diagonal ending at the bottom-right corner of
/// the band, reported in global coordinates so callers need not understand
/// the decomposition.
fn sample_cells(grid: &Grid, partition: &RowPartition) -> Vec<CellSample> {
    let count = partition.local_rows().min(grid.columns()).min(6);
    (0..count)
        .rev()
        .map(|back| {
            let i = partition.local_rows() - back;
            let j = grid.columns() - back;
            CellSample {
                global_row: partition.global_start_row() + i - 1,
                global_col: j - 1,
                value: grid.get(i, j),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Topology;
    use crate::solver::comm::Loopback;

    fn config(rows: usize, cols: usize, epsilon: f64, max_iterations: u32) -> SolverConfig {
        SolverConfig {
            global_rows: rows,
            columns: cols,
            epsilon,
            max_iterations,
            topology: Topology::Linear,
            progress_interval: 0,
        }
    }

    /// 4x4 grid, one iteration: each updated cell is the mean of its four
    /// initial neighbors. The bottom-right interior cell sees 100 from the
    /// bottom gradient row and 100 from the right gradient column.
    #[test]
    fn one_iteration_matches_hand_computation() {
        let mut transport = Loopback::new();
        let report = run(&config(4, 4, 0.0, 1), &mut transport, None).unwrap();

        assert_eq!(report.status, Status::IterationLimitReached);
        assert_eq!(report.iterations_run, 1);
        // (4,4): 0.25 * (100 + 0 + 100 + 0)
        assert_eq!(report.grid.get(4, 4), 50.0);
        // (1,1): all four initial neighbors are 0.
        assert_eq!(report.grid.get(1, 1), 0.0);
        // (1,4): only the right column contributes, 0.25 * 25.
        assert_eq!(report.grid.get(1, 4), 6.25);
        // The largest change anywhere was the corner cell's 0 -> 50.
        assert_eq!(report.final_global_delta, 50.0);
    }

    #[test]
    fn fixed_boundary_cells_survive_a_full_run() {
        let mut transport = Loopback::new();
        let report = run(&config(6, 5, 0.0, 40), &mut transport, None).unwrap();
        let g = &report.grid;

        // Right column gradient (the bottom padding row overwrites row 7).
        for i in 0..=6 {
            assert_eq!(g.get(i, 0), 0.0);
            assert_eq!(g.get(i, 6), 100.0 * i as f64 / 6.0);
        }
        for j in 0..=6 {
            assert_eq!(g.get(0, j), 0.0);
            assert_eq!(g.get(7, j), 100.0 * j as f64 / 5.0);
        }
    }

    #[test]
    fn converges_on_a_small_grid() {
        let mut transport = Loopback::new();
        let report = run(&config(8, 8, 0.01, 4000), &mut transport, None).unwrap();
        assert_eq!(report.status, Status::Converged);
        assert!(report.final_global_delta <= 0.01);
        assert!(report.iterations_run < 4000);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut t1 = Loopback::new();
        let mut t2 = Loopback::new();
        let cfg = config(12, 9, 0.05, 500);
        let a = run(&cfg, &mut t1, None).unwrap();
        let b = run(&cfg, &mut t2, None).unwrap();
        assert_eq!(a.status, b.status);
        assert_eq!(a.iterations_run, b.iterations_run);
        assert_eq!(a.final_global_delta, b.final_global_delta);
    }

    #[test]
    fn invalid_decomposition_fails_before_any_step() {
        let mut transport = Loopback::new();
        // 1 rank is fine for any positive row count; zero rows is not.
        assert!(run(&config(0, 4, 0.0, 1), &mut transport, None).is_err());
    }

    #[test]
    fn sample_cells_report_global_coordinates() {
        let partition = RowPartition::new(10, 2, 1).unwrap();
        let mut grid = Grid::new(partition.local_rows(), 8).unwrap();
        for i in 1..=5 {
            for j in 1..=8 {
                grid.set(i, j, (i * 10 + j) as f64);
            }
        }
        let samples = sample_cells(&grid, &partition);
        assert_eq!(samples.len(), 5);
        // Last sample is the bottom-right corner: local (5,8), global (9,7).
        let corner = samples.last().unwrap();
        assert_eq!(corner.global_row, 9);
        assert_eq!(corner.global_col, 7);
        assert_eq!(corner.value, 58.0);
        // First sample sits four cells up the diagonal.
        assert_eq!(samples[0].global_row, 5);
        assert_eq!(samples[0].global_col, 3);
        assert_eq!(samples[0].value, 14.0);
    }
}
