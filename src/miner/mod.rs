// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains all components related to the mining process:
//! - Proof solvers (native backtracking, paced)
//! - The solve worker thread
//! - The mining engine state machine
//! - Pending-pool reconciliation after a chain switch

/// Mining engine
///
/// Builds candidates on the chain tip, announces found proofs and switches
/// to competing blocks that are at least as long as the candidate.
pub mod engine;

/// Pool reconciliation
///
/// Walks two branches back to their common ancestor and computes the
/// transactions that must be re-offered.
pub mod reconcile;

/// Puzzle solver implementations
pub mod solver;

/// Worker thread implementation
///
/// Runs the solver off the participant loop and posts results back to its
/// inbox.
pub mod worker;

// Re-export main components for cleaner imports
pub use self::engine::{MiningEngine, SearchState};
pub use self::reconcile::{ChainDiff, ChainReconciler};
pub use self::solver::{BacktrackSolver, CancelToken, PacedSolver, ProofSolver, Solution};
pub use self::worker::{SolveJob, SolveOutcome, SolveWorker};
