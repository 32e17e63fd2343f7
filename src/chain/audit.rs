// src/chain/audit.rs
//! Offline chain audit
//!
//! A dumped chain carries the deployment rules it was mined under, so any
//! third party can regenerate every puzzle from the parent hashes and check
//! every proof with nothing but the puzzle codec.

use crate::chain::block::Block;
use crate::chain::params::ChainParams;
use crate::puzzle::DifficultyPolicy;
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A main chain plus the rules needed to re-derive its puzzles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDump {
    /// Puzzle box size
    pub base: usize,
    /// Difficulty rule in force
    pub difficulty: DifficultyPolicy,
    /// Blocks, genesis first
    pub blocks: Vec<Block>,
}

impl ChainDump {
    /// Bundles `blocks` with the rules they were mined under
    pub fn new(params: &ChainParams, blocks: Vec<Block>) -> Self {
        ChainDump {
            base: params.base,
            difficulty: params.policy.clone(),
            blocks,
        }
    }

    /// Reads a dump written by [`ChainDump::save`]
    pub fn load(path: &Path) -> Result<Self, MinerError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the dump as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), MinerError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Checks linkage, puzzle derivation, proofs and signatures of every
    /// block
    ///
    /// # Returns
    /// Number of proofs verified
    ///
    /// # Errors
    /// `MinerError::BlockError` naming the first offending block, or the
    /// transaction error of the first bad transaction
    pub fn audit(&self) -> Result<usize, MinerError> {
        let params = ChainParams {
            base: self.base,
            policy: self.difficulty.clone(),
        };

        let Some(first) = self.blocks.first() else {
            return Err(MinerError::BlockError("empty chain".into()));
        };
        if *first != Block::genesis() {
            return Err(MinerError::BlockError("chain does not start at genesis".into()));
        }

        for (height, pair) in self.blocks.windows(2).enumerate() {
            let (parent, block) = (&pair[0], &pair[1]);
            let height = height as u64 + 1;

            if block.prev_block_hash.as_deref() != Some(parent.hash().as_str()) {
                return Err(MinerError::BlockError(format!(
                    "block {} does not link to its predecessor",
                    height
                )));
            }
            if block.chain_length != height {
                return Err(MinerError::BlockError(format!(
                    "block {} claims length {}",
                    height, block.chain_length
                )));
            }
            let expected = params.puzzle_for(parent).serialize();
            if block.puzzle.as_deref() != Some(expected.as_str()) {
                return Err(MinerError::BlockError(format!(
                    "block {} carries a puzzle its parent does not dictate",
                    height
                )));
            }
            if !block.has_valid_proof() {
                return Err(MinerError::BlockError(format!(
                    "block {} has an invalid proof",
                    height
                )));
            }
            for tx in block.transactions.values() {
                tx.verify()?;
            }
        }

        Ok(self.blocks.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::client::tests::solved_child;

    fn chain(len: usize) -> (ChainParams, Vec<Block>) {
        let params = ChainParams::default();
        let mut blocks = vec![Block::genesis()];
        for _ in 0..len {
            let next = solved_child(&params, blocks.last().unwrap(), "m");
            blocks.push(next);
        }
        (params, blocks)
    }

    #[test]
    fn honest_chain_passes() {
        let (params, blocks) = chain(3);
        assert_eq!(ChainDump::new(&params, blocks).audit().unwrap(), 3);
    }

    #[test]
    fn tampered_proof_is_caught() {
        let (params, mut blocks) = chain(2);
        blocks[2].commitment = Some(crate::puzzle::hash_grid("0"));
        let err = ChainDump::new(&params, blocks).audit().unwrap_err();
        assert!(err.to_string().contains("block 2"));
    }

    #[test]
    fn broken_link_is_caught() {
        let (params, mut blocks) = chain(2);
        blocks.remove(1);
        assert!(ChainDump::new(&params, blocks).audit().is_err());
    }

    #[test]
    fn json_round_trip_keeps_the_chain_auditable() {
        let (params, blocks) = chain(2);
        let dump = ChainDump::new(&params, blocks);
        let text = serde_json::to_string(&dump).unwrap();
        let back: ChainDump = serde_json::from_str(&text).unwrap();
        assert_eq!(back.audit().unwrap(), 2);
    }
}
