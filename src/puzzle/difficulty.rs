// src/puzzle/difficulty.rs
//! Difficulty retargeting by blank density.
//!
//! The previous block's solve time selects how many cells the next puzzle
//! leaves blank: fast solves get harder puzzles, slow solves easier ones.

use crate::puzzle::seed::{GENESIS_SEED, seed_from_hash};
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};

/// Maps the previous block's solve time to an emptiness factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyPolicy {
    /// Solves faster than this (ms) make the next puzzle harder
    pub fast_threshold_ms: u64,
    /// Solves slower than this (ms) make the next puzzle easier
    pub slow_threshold_ms: u64,
    /// Factor used between the thresholds and after genesis
    pub default_emptiness: f64,
    /// Factor used after a fast solve
    pub fast_emptiness: f64,
    /// Factor used after a slow solve
    pub slow_emptiness: f64,
}

impl Default for DifficultyPolicy {
    fn default() -> Self {
        DifficultyPolicy {
            fast_threshold_ms: 60,
            slow_threshold_ms: 100,
            default_emptiness: 0.5,
            fast_emptiness: 0.75,
            slow_emptiness: 0.25,
        }
    }
}

/// Seed and blank density for one puzzle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PuzzleParams {
    /// Generator seed
    pub seed: u64,
    /// Fraction of blank cells
    pub emptiness: f64,
}

impl DifficultyPolicy {
    /// Emptiness factor following a solve that took `prev_solve_ms`
    pub fn emptiness_for(&self, prev_solve_ms: u64) -> f64 {
        if prev_solve_ms < self.fast_threshold_ms {
            self.fast_emptiness
        } else if prev_solve_ms > self.slow_threshold_ms {
            self.slow_emptiness
        } else {
            self.default_emptiness
        }
    }

    /// Puzzle parameters for a block whose parent is described by the
    /// arguments. A genesis parent always gets seed 0 and the default factor.
    pub fn params_for_parent(
        &self,
        parent_is_genesis: bool,
        parent_hash: &str,
        parent_solve_ms: u64,
    ) -> PuzzleParams {
        if parent_is_genesis {
            PuzzleParams {
                seed: GENESIS_SEED,
                emptiness: self.default_emptiness,
            }
        } else {
            PuzzleParams {
                seed: seed_from_hash(parent_hash),
                emptiness: self.emptiness_for(parent_solve_ms),
            }
        }
    }

    /// Checks thresholds and factors
    ///
    /// # Errors
    /// `MinerError::ConfigError` if the thresholds are inverted or a factor
    /// lies outside `[0, 1]`
    pub fn validate(&self) -> Result<(), MinerError> {
        if self.fast_threshold_ms > self.slow_threshold_ms {
            return Err(MinerError::ConfigError(format!(
                "fast_threshold_ms ({}) exceeds slow_threshold_ms ({})",
                self.fast_threshold_ms, self.slow_threshold_ms
            )));
        }
        for (name, value) in [
            ("default_emptiness", self.default_emptiness),
            ("fast_emptiness", self.fast_emptiness),
            ("slow_emptiness", self.slow_emptiness),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MinerError::ConfigError(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
