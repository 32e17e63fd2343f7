// src/cli/commands.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sudoku Miner CLI - puzzle proof-of-work blockchain simulation in Rust
#[derive(Parser, Debug)]
#[command(name = "sudoku-miner-rs")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Run a simulated network of wallets and miners
    Simulate(SimulateOptions),

    /// Measure solve and verify throughput
    Benchmark(BenchmarkOptions),

    /// Print the puzzle for a seed or a parent block hash
    Puzzle(PuzzleOptions),

    /// Check a single proof or audit a dumped chain
    Verify(VerifyOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Options for running a simulation
#[derive(Parser, Debug)]
pub struct SimulateOptions {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Simulation length in milliseconds (overrides config)
    #[arg(short, long)]
    pub duration_ms: Option<u64>,

    /// Sudoku box size (overrides config)
    #[arg(short, long)]
    pub base: Option<usize>,

    /// Write the longest final chain as JSON to this file
    #[arg(long)]
    pub dump_chain: Option<PathBuf>,
}

/// Options for running benchmarks
#[derive(Parser, Debug)]
pub struct BenchmarkOptions {
    /// Number of puzzles to solve and verify
    #[arg(short, long, default_value_t = 500)]
    pub puzzles: u64,

    /// Number of threads to use
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Sudoku box size
    #[arg(short, long, default_value_t = 3)]
    pub base: usize,

    /// Fraction of cells left blank
    #[arg(short, long, default_value_t = 0.5)]
    pub emptiness: f64,
}

/// Options for printing a puzzle
#[derive(Parser, Debug)]
pub struct PuzzleOptions {
    /// Generator seed
    #[arg(short, long, conflicts_with = "parent_hash")]
    pub seed: Option<u64>,

    /// Derive the seed from this parent block hash
    #[arg(long)]
    pub parent_hash: Option<String>,

    /// Sudoku box size
    #[arg(short, long, default_value_t = 3)]
    pub base: usize,

    /// Fraction of cells left blank
    #[arg(short, long, default_value_t = 0.5)]
    pub emptiness: f64,

    /// Also solve the puzzle and print the proof
    #[arg(long)]
    pub solve: bool,
}

/// Options for verifying proofs
#[derive(Parser, Debug)]
pub struct VerifyOptions {
    /// Serialized puzzle (`<side>_<digits>`)
    #[arg(long, requires_all = ["commitment", "moves"], conflicts_with = "chain")]
    pub puzzle: Option<String>,

    /// Hex SHA-256 of the solved grid
    #[arg(long)]
    pub commitment: Option<String>,

    /// Base64 JSON move list
    #[arg(long)]
    pub moves: Option<String>,

    /// Chain JSON written by `simulate --dump-chain`
    #[arg(long)]
    pub chain: Option<PathBuf>,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,

    /// Include a miner that joins after the start
    #[arg(short, long)]
    pub late_joiner: bool,
}
