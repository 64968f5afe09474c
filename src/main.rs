use clap::Parser;
use heatgrid::solver;
use heatgrid::{CellSample, SolverConfig, Topology};
use std::time::Instant;

/// Distributed Jacobi relaxation of the 2D Laplace equation
#[derive(Parser)]
#[command(name = "heatgrid", version)]
struct Cli {
    /// Global updatable row count
    #[arg(long, default_value_t = 1000)]
    rows: usize,

    /// Global updatable column count
    #[arg(long, default_value_t = 1000)]
    columns: usize,

    /// Number of ranks (worker threads; MPI processes with --mpi)
    #[arg(long, default_value_t = 4)]
    processes: usize,

    /// Convergence threshold on the global max per-cell change
    #[arg(long, default_value_t = 0.01)]
    epsilon: f64,

    #[arg(long, default_value_t = 4000)]
    max_iterations: u32,

    /// Whether the first and last rank wrap around to each other
    #[arg(long, value_enum, default_value = "linear")]
    topology: Topology,

    /// Print sample cells every N iterations (0 = never)
    #[arg(long, default_value_t = 100)]
    progress_interval: u32,

    /// Run as one rank of an MPI job instead of spawning threads
    #[cfg(feature = "distributed")]
    #[arg(long)]
    mpi: bool,
}

fn print_progress(iteration: u32, samples: &[CellSample]) {
    println!("---------- Iteration number: {iteration} ------------");
    let line: Vec<String> = samples
        .iter()
        .map(|s| format!("[{},{}]: {:5.2}", s.global_row, s.global_col, s.value))
        .collect();
    println!("{}", line.join("  "));
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = SolverConfig {
        global_rows: cli.rows,
        columns: cli.columns,
        epsilon: cli.epsilon,
        max_iterations: cli.max_iterations,
        topology: cli.topology,
        progress_interval: cli.progress_interval,
    };

    #[cfg(feature = "distributed")]
    if cli.mpi {
        run_mpi(&config);
        return;
    }

    let start = Instant::now();
    let reports = solver::run_threaded(&config, cli.processes, Some(&print_progress))
        .unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        });
    let elapsed = start.elapsed();

    if let Some(report) = reports.first() {
        println!();
        println!(
            "Max error at iteration {} was {}",
            report.iterations_run, report.final_global_delta
        );
        println!("Total time was {:.6} seconds.", elapsed.as_secs_f64());
        println!(
            "Grid size: {}x{}, Processes: {}",
            cli.rows, cli.columns, cli.processes
        );
    }
}

#[cfg(feature = "distributed")]
fn run_mpi(config: &SolverConfig) {
    use heatgrid::solver::comm_mpi::MpiTransport;

    let _universe = mpi::initialize().unwrap_or_else(|| {
        eprintln!("Error: MPI initialization failed");
        std::process::exit(1);
    });

    let start = Instant::now();
    let mut transport = MpiTransport::new();
    let report = heatgrid::run(config, &mut transport, Some(&print_progress)).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    if report.partition.is_first() {
        println!();
        println!(
            "Max error at iteration {} was {}",
            report.iterations_run, report.final_global_delta
        );
        println!("Total time was {:.6} seconds.", start.elapsed().as_secs_f64());
        println!(
            "Grid size: {}x{}, Processes: {}",
            config.global_rows,
            config.columns,
            report.partition.num_ranks()
        );
    }
}
