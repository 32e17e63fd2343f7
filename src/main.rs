// src/main.rs
use clap::Parser;
use rayon::prelude::*;
use std::time::{Duration, Instant};
use sudoku_miner_rs::miner::solver::CancelToken;
use sudoku_miner_rs::puzzle::{hash_grid, seed_from_hash};
use sudoku_miner_rs::utils::logging::init_bench_logging;
use sudoku_miner_rs::{self, *};
use tokio::runtime::Runtime;

/// Main entry point for the Sudoku miner
///
/// # Returns
/// - `Ok(())` on successful execution
/// - `Err(MinerError)` if any operation fails
///
/// # Flow
/// 1. Parses command line arguments
/// 2. Delegates to appropriate subcommand handler
/// 3. Propagates any errors upward
fn main() -> Result<(), MinerError> {
    let cli = cli::Commands::parse();

    match cli.action {
        cli::Action::Simulate(opts) => run_simulation(opts),
        cli::Action::Benchmark(opts) => run_benchmark(opts),
        cli::Action::Puzzle(opts) => show_puzzle(opts),
        cli::Action::Verify(opts) => verify(opts),
        cli::Action::Config(opts) => generate_config(opts),
    }
}

/// Runs the network simulation
///
/// # Operations
/// 1. Initializes logging
/// 2. Loads configuration (or the built-in defaults) and applies overrides
/// 3. Drives the simulation on a tokio runtime
/// 4. Logs the summary and optionally dumps the longest chain
fn run_simulation(opts: cli::SimulateOptions) -> Result<(), MinerError> {
    utils::init_logging();

    let mut config = match &opts.config {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };
    // Apply CLI overrides
    if let Some(duration) = opts.duration_ms {
        config.duration_ms = duration;
    }
    if let Some(base) = opts.base {
        config.base = base;
    }
    config.validate()?;

    let rt = Runtime::new()?;
    let report = rt.block_on(simulation::run(&config))?;
    report.log_summary();

    if let Some(path) = opts.dump_chain {
        report.dump_longest(&path)?;
    }
    Ok(())
}

/// Solves and verifies many puzzles in parallel
///
/// # Operations
/// 1. Initializes benchmark-specific logging
/// 2. Builds a rayon pool with the requested thread count
/// 3. Generates, solves and verifies one puzzle per seed
/// 4. Reports throughput and the solve/verify time asymmetry
fn run_benchmark(opts: cli::BenchmarkOptions) -> Result<(), MinerError> {
    init_bench_logging();

    if !(1..=puzzle::codec::MAX_BASE).contains(&opts.base) {
        return Err(MinerError::ConfigError(format!(
            "Unsupported base: {}",
            opts.base
        )));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.threads)
        .build()
        .map_err(|e| MinerError::TaskError(format!("Failed to build thread pool: {}", e)))?;
    let mut reporter = stats::StatsReporter::new(Duration::from_secs(5));

    log::info!(
        "Benchmarking {} puzzles (base {}, emptiness {}) on {} threads",
        opts.puzzles,
        opts.base,
        opts.emptiness,
        opts.threads
    );

    let start_time = Instant::now();
    let solver = BacktrackSolver::new();
    let results: Vec<Result<(Duration, Duration), MinerError>> = pool.install(|| {
        (0..opts.puzzles)
            .into_par_iter()
            .map(|seed| {
                let puzzle = Puzzle::generate(seed, opts.base, opts.emptiness).serialize();

                let solve_start = Instant::now();
                let solution = solver.solve(&puzzle, &CancelToken::detached())?;
                let solve_time = solve_start.elapsed();

                let commitment = hash_grid(&solution.solved.digits());
                let verify_start = Instant::now();
                if !verify_solution(&puzzle, &commitment, &solution.moves) {
                    return Err(MinerError::SolverError(format!(
                        "solution for seed {} failed verification",
                        seed
                    )));
                }
                Ok((solve_time, verify_start.elapsed()))
            })
            .collect()
    });
    let elapsed = start_time.elapsed();

    let mut solved = 0u32;
    let (mut solve_total, mut verify_total) = (Duration::ZERO, Duration::ZERO);
    for result in results {
        match result {
            Ok((solve, verify)) => {
                solved += 1;
                solve_total += solve;
                verify_total += verify;
            }
            Err(e) => log::warn!("{}", e),
        }
    }

    let hw = reporter.get_hardware_stats();
    log::info!("Benchmark results:");
    log::info!(
        "Solved and verified: {}/{} in {:.2?} ({:.1} puzzles/s)",
        solved,
        opts.puzzles,
        elapsed,
        solved as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    if solved > 0 {
        log::info!("Average solve time: {:.2?}", solve_total / solved);
        log::info!("Average verify time: {:.2?}", verify_total / solved);
    }
    log::info!("{}", hw);
    log::logger().flush(); // Ensure final results appear

    Ok(())
}

/// Prints the puzzle for a seed or a parent block hash
///
/// # Arguments
/// * `opts` - Seed source, size and emptiness; optionally solve it
fn show_puzzle(opts: cli::PuzzleOptions) -> Result<(), MinerError> {
    utils::init_logging();

    if !(1..=puzzle::codec::MAX_BASE).contains(&opts.base) {
        return Err(MinerError::ConfigError(format!(
            "Unsupported base: {}",
            opts.base
        )));
    }
    let seed = match (&opts.seed, &opts.parent_hash) {
        (Some(seed), _) => *seed,
        (None, Some(hash)) => seed_from_hash(hash),
        (None, None) => puzzle::seed::GENESIS_SEED,
    };

    let puzzle = Puzzle::generate(seed, opts.base, opts.emptiness);
    println!("seed {} ({} blanks)", seed, puzzle.blanks());
    println!("{}", puzzle);
    println!("{}", puzzle.serialize());

    if opts.solve {
        let solution = BacktrackSolver::new().solve(&puzzle.serialize(), &CancelToken::detached())?;
        println!();
        println!("{}", solution.solved);
        println!("commitment {}", hash_grid(&solution.solved.digits()));
        println!("moves {}", solution.moves.encode()?);
    }
    Ok(())
}

/// Verifies one proof or audits a dumped chain
///
/// # Errors
/// `MinerError::PuzzleError` when the proof is rejected, the audit error for
/// a bad chain, `MinerError::ConfigError` when nothing was given to check
fn verify(opts: cli::VerifyOptions) -> Result<(), MinerError> {
    utils::init_logging();

    if let Some(path) = &opts.chain {
        let dump = ChainDump::load(path)?;
        let checked = dump.audit()?;
        log::info!("Chain OK: {} proofs verified", checked);
        return Ok(());
    }

    match (&opts.puzzle, &opts.commitment, &opts.moves) {
        (Some(puzzle), Some(commitment), Some(moves)) => {
            if verify_encoded(puzzle, commitment, moves) {
                log::info!("Proof OK");
                Ok(())
            } else {
                Err(MinerError::PuzzleError("proof rejected".into()))
            }
        }
        _ => Err(MinerError::ConfigError(
            "pass --chain, or --puzzle with --commitment and --moves".into(),
        )),
    }
}

/// Generates configuration template file
///
/// # Arguments
/// * `opts` - Configuration generation options
///
/// # Operations
/// 1. Generates template content based on options
/// 2. Writes template to specified output file
fn generate_config(opts: cli::ConfigOptions) -> Result<(), MinerError> {
    let config = config::generate_template(opts.late_joiner);
    std::fs::write(opts.output, config)?;
    Ok(())
}
