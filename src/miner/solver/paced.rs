// src/miner/solver/paced.rs
//! Solver wrapper that spends a minimum amount of wall-clock time per blank.
//!
//! Native solving takes microseconds, which would flood the simulation with
//! blocks. Pacing restores a notion of mining power: a miner with a smaller
//! `work_per_blank` finishes first more often.

use crate::miner::solver::{CancelToken, ProofSolver, Solution};
use crate::utils::error::MinerError;
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep between cancellation checks
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Wraps a solver so each solve lasts at least `moves × work_per_blank`
#[derive(Debug, Clone)]
pub struct PacedSolver<S> {
    inner: S,
    work_per_blank: Duration,
}

impl<S: ProofSolver> PacedSolver<S> {
    /// Creates a paced solver
    ///
    /// # Arguments
    /// * `inner` - Solver doing the actual work
    /// * `work_per_blank` - Simulated time spent per filled cell
    pub fn new(inner: S, work_per_blank: Duration) -> Self {
        PacedSolver {
            inner,
            work_per_blank,
        }
    }
}

impl<S: ProofSolver> ProofSolver for PacedSolver<S> {
    fn solve(&self, puzzle: &str, token: &CancelToken) -> Result<Solution, MinerError> {
        let started = Instant::now();
        let solution = self.inner.solve(puzzle, token)?;
        let target = self.work_per_blank * solution.moves.len() as u32;

        loop {
            if token.is_cancelled() {
                return Err(MinerError::SearchCancelled);
            }
            let elapsed = started.elapsed();
            if elapsed >= target {
                return Ok(solution);
            }
            thread::sleep((target - elapsed).min(POLL_INTERVAL));
        }
    }

    fn name(&self) -> &'static str {
        "paced"
    }
}
