// src/chain/params.rs
//! Deployment rules shared by every participant
//!
//! The puzzle a block must solve is fully determined by its parent and
//! these parameters, so miners and verifiers derive it independently.

use crate::chain::block::Block;
use crate::puzzle::{DifficultyPolicy, Puzzle, PuzzleParams};

/// Deployment-wide rules every participant applies identically
#[derive(Debug, Clone, PartialEq)]
pub struct ChainParams {
    /// Puzzle box size (3 gives 9x9 grids)
    pub base: usize,
    /// Difficulty retargeting rule
    pub policy: DifficultyPolicy,
}

impl Default for ChainParams {
    fn default() -> Self {
        ChainParams {
            base: 3,
            policy: DifficultyPolicy::default(),
        }
    }
}

impl ChainParams {
    /// Seed and emptiness for a child of `parent`
    pub fn params_for(&self, parent: &Block) -> PuzzleParams {
        self.policy.params_for_parent(
            parent.is_genesis(),
            &parent.hash(),
            parent.solve_duration_ms,
        )
    }

    /// The puzzle every child of `parent` must solve
    pub fn puzzle_for(&self, parent: &Block) -> Puzzle {
        let params = self.params_for(parent);
        Puzzle::generate(params.seed, self.base, params.emptiness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_children_share_the_seed_zero_puzzle() {
        let params = ChainParams::default();
        assert_eq!(
            params.puzzle_for(&Block::genesis()),
            Puzzle::generate(0, 3, 0.5)
        );
    }

    #[test]
    fn later_puzzles_follow_parent_hash_and_solve_time() {
        let params = ChainParams::default();
        let mut parent = Block::new("m".into(), &Block::genesis());
        parent.solve_duration_ms = 500;
        let p = params.params_for(&parent);
        assert_eq!(p.emptiness, 0.25);
        assert_eq!(p.seed, crate::puzzle::seed_from_hash(&parent.hash()));
        assert_eq!(params.puzzle_for(&parent), params.puzzle_for(&parent));
    }
}
