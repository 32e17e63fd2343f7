// src/miner/solver/mod.rs
//! Proof solvers
//!
//! A solver turns a serialized puzzle into a solved grid plus the moves that
//! produce it. Solving may take arbitrarily long, so every solver polls a
//! [`CancelToken`] and gives up with [`MinerError::SearchCancelled`] once the
//! search it belongs to has been replaced.

/// Native backtracking solver
pub mod backtrack;

/// Wrapper stretching solves to model mining power
pub mod paced;

use crate::puzzle::{MoveList, Puzzle};
use crate::utils::error::MinerError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub use backtrack::BacktrackSolver;
pub use paced::PacedSolver;

/// A solved puzzle and the moves that fill it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// The completed grid
    pub solved: Puzzle,
    /// Moves applied to the puzzle, in order
    pub moves: MoveList,
}

/// Identifies one search; it is cancelled as soon as the engine's live
/// search counter moves past it
#[derive(Debug, Clone)]
pub struct CancelToken {
    id: u64,
    live: Arc<AtomicU64>,
}

impl CancelToken {
    /// Token for search `id`, live while `live` holds `id`
    pub fn new(id: u64, live: Arc<AtomicU64>) -> Self {
        CancelToken { id, live }
    }

    /// A token that is never cancelled
    pub fn detached() -> Self {
        CancelToken {
            id: 0,
            live: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Search identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether a newer search has replaced this one
    pub fn is_cancelled(&self) -> bool {
        self.live.load(Ordering::Acquire) != self.id
    }
}

/// Common interface for puzzle solvers
///
/// Implementations must be usable from the solve worker thread.
pub trait ProofSolver: Send + Sync {
    /// Solve a serialized puzzle
    ///
    /// # Arguments
    /// * `puzzle` - Puzzle in `"<side>_<digits>"` form
    /// * `token` - Checked periodically; a cancelled token aborts the solve
    ///
    /// # Returns
    /// The solution, or a recoverable error: `PuzzleError` for malformed
    /// input, `SolverError` when no solution exists, `SearchCancelled` when
    /// the token was cancelled
    fn solve(&self, puzzle: &str, token: &CancelToken) -> Result<Solution, MinerError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

impl<S: ProofSolver + ?Sized> ProofSolver for Arc<S> {
    fn solve(&self, puzzle: &str, token: &CancelToken) -> Result<Solution, MinerError> {
        (**self).solve(puzzle, token)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
