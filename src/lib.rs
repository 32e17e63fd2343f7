//! Sudoku Miner - puzzle proof-of-work blockchain simulation in Rust
//!
//! This crate replaces hash-based proof of work with Sudoku puzzles whose
//! solutions are expensive to find and cheap to check:
//! - Deterministic puzzle generation seeded from the parent block hash
//! - Difficulty retargeting by blank density
//! - A mining engine with cancellable searches and pool reorganization
//! - A threaded in-process network of wallets and miners
//! - Performance benchmarking and offline chain audits

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Puzzle generation, encoding and proof verification
pub mod puzzle;

/// Blocks, transactions, block storage and the ledger client
pub mod chain;

/// Miner core implementation: solvers, worker thread, engine, reconciliation
pub mod miner;

/// Simulated network and participant threads
pub mod network;

/// Simulation driver
pub mod simulation;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use chain::{Block, ChainDump, ChainParams, Client, Transaction};
pub use cli::Commands;
pub use config::Config;
pub use miner::{BacktrackSolver, MiningEngine, PacedSolver, ProofSolver};
pub use network::{FakeNet, Participant};
pub use puzzle::{DifficultyPolicy, Puzzle, verify_encoded, verify_solution};
pub use stats::{HardwareStats, MiningStats, StatsReporter};
pub use types::Role;
pub use utils::{MinerError, init_logging};
