// src/chain/store.rs
//! Append-only block storage.

use crate::chain::block::Block;
use crate::types::BlockHash;
use crate::utils::error::MinerError;
use std::collections::HashMap;
use std::sync::Arc;

/// Every accepted block by hash
///
/// Blocks are only ever inserted. Ancestor walks rely on the store holding
/// the parent of every block it holds, back to genesis.
#[derive(Debug, Clone)]
pub struct BlockStore {
    blocks: HashMap<BlockHash, Arc<Block>>,
}

impl BlockStore {
    /// Creates a store seeded with the genesis block
    pub fn new(genesis: Arc<Block>) -> Self {
        let mut store = BlockStore {
            blocks: HashMap::new(),
        };
        store.insert(genesis);
        store
    }

    /// Stores a block, returning its hash
    pub fn insert(&mut self, block: Arc<Block>) -> BlockHash {
        let hash = block.hash();
        self.blocks.entry(hash.clone()).or_insert(block);
        hash
    }

    /// Looks up a block
    pub fn get(&self, hash: &str) -> Option<&Arc<Block>> {
        self.blocks.get(hash)
    }

    /// Looks up a block that must exist
    ///
    /// # Errors
    /// `MinerError::ConsistencyError` if the hash is unknown
    pub fn lookup(&self, hash: &str) -> Result<&Arc<Block>, MinerError> {
        self.blocks.get(hash).ok_or_else(|| {
            MinerError::ConsistencyError(format!("block {} missing from store", hash))
        })
    }

    /// Whether the hash is stored
    pub fn contains(&self, hash: &str) -> bool {
        self.blocks.contains_key(hash)
    }

    /// Number of stored blocks, genesis included
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True if the store is empty
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The chain ending at `tip`, ordered genesis first
    ///
    /// # Errors
    /// `MinerError::ConsistencyError` if an ancestor is missing
    pub fn chain_to(&self, tip: &Arc<Block>) -> Result<Vec<Arc<Block>>, MinerError> {
        let mut chain = vec![tip.clone()];
        let mut current = tip.clone();
        while let Some(prev) = &current.prev_block_hash {
            let parent = self.lookup(prev)?.clone();
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_walk_reaches_genesis() {
        let genesis = Arc::new(Block::genesis());
        let mut store = BlockStore::new(genesis.clone());
        let b1 = Arc::new(Block::new("m".into(), &genesis));
        let b2 = Arc::new(Block::new("m".into(), &b1));
        store.insert(b1.clone());
        store.insert(b2.clone());

        let chain = store.chain_to(&b2).unwrap();
        let lengths: Vec<u64> = chain.iter().map(|b| b.chain_length).collect();
        assert_eq!(lengths, vec![0, 1, 2]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn missing_ancestor_is_a_consistency_error() {
        let genesis = Arc::new(Block::genesis());
        let store = BlockStore::new(genesis.clone());
        let b1 = Block::new("m".into(), &genesis);
        let b2 = Arc::new(Block::new("m".into(), &b1));

        assert!(matches!(
            store.chain_to(&b2),
            Err(MinerError::ConsistencyError(_))
        ));
        assert!(store.lookup("nope").is_err());
    }

    #[test]
    fn insert_is_idempotent() {
        let genesis = Arc::new(Block::genesis());
        let mut store = BlockStore::new(genesis.clone());
        store.insert(genesis.clone());
        assert_eq!(store.len(), 1);
        assert!(store.contains(&genesis.hash()));
    }
}
