// src/miner/reconcile.rs
//! Pending-pool reconciliation after a chain switch
//!
//! When a miner accepts a block that replaces its candidate, transactions
//! that its own branch carried but the accepted branch does not must be
//! offered again, and nothing the accepted branch already holds may be
//! included twice.

use crate::chain::{Block, BlockStore, Transaction};
use crate::types::BlockHash;
use crate::utils::error::MinerError;
use std::collections::HashSet;

/// Transactions on each side of a fork, back to the common ancestor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainDiff {
    /// Transactions in the candidate and its branch above the ancestor
    pub old_chain_txs: HashSet<Transaction>,
    /// Transactions in the accepted branch above the ancestor
    pub new_chain_txs: HashSet<Transaction>,
    /// Common ancestor, `None` when the walk ran off a chain end
    pub common_ancestor: Option<BlockHash>,
    /// Blocks of the old branch that were walked back
    pub rolled_back: usize,
}

impl ChainDiff {
    /// Transactions to re-offer: the old branch minus the new branch
    pub fn carry_forward(&self) -> HashSet<Transaction> {
        self.old_chain_txs
            .difference(&self.new_chain_txs)
            .cloned()
            .collect()
    }
}

/// Walks two branches of a block store back to their common ancestor
pub struct ChainReconciler<'a> {
    store: &'a BlockStore,
}

impl<'a> ChainReconciler<'a> {
    /// Creates a reconciler over `store`
    pub fn new(store: &'a BlockStore) -> Self {
        ChainReconciler { store }
    }

    /// Diffs the branch ending at `accepted` against the one ending at
    /// `candidate`
    ///
    /// `candidate` need not be stored (an unsolved candidate never is), but
    /// every ancestor of both blocks must be.
    ///
    /// # Errors
    /// `MinerError::ConsistencyError` if an ancestor is missing from the store
    pub fn diff(&self, accepted: &Block, candidate: &Block) -> Result<ChainDiff, MinerError> {
        let mut diff = ChainDiff::default();
        let mut nb: &Block = accepted;
        let mut cb: &Block = candidate;

        // The accepted branch may be ahead; roll it back to the candidate's height.
        while nb.chain_length > cb.chain_length {
            diff.new_chain_txs.extend(nb.transactions.values().cloned());
            match &nb.prev_block_hash {
                Some(prev) => nb = &**self.store.lookup(prev)?,
                None => break,
            }
        }

        loop {
            let nb_hash = nb.hash();
            if cb.hash() == nb_hash {
                diff.common_ancestor = Some(nb_hash);
                break;
            }

            diff.old_chain_txs.extend(cb.transactions.values().cloned());
            diff.new_chain_txs.extend(nb.transactions.values().cloned());
            diff.rolled_back += 1;

            match (&cb.prev_block_hash, &nb.prev_block_hash) {
                (Some(c_prev), Some(n_prev)) => {
                    cb = &**self.store.lookup(c_prev)?;
                    nb = &**self.store.lookup(n_prev)?;
                }
                _ => break,
            }
        }

        Ok(diff)
    }

    /// Transactions that must be re-offered after switching from
    /// `candidate`'s branch to `accepted`'s
    pub fn reconcile(
        &self,
        accepted: &Block,
        candidate: &Block,
    ) -> Result<HashSet<Transaction>, MinerError> {
        Ok(self.diff(accepted, candidate)?.carry_forward())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::transaction::tests::signed_tx;
    use std::sync::Arc;

    fn child(prev: &Block, miner: &str, txs: &[&Transaction]) -> Block {
        let mut block = Block::new(miner.into(), prev);
        for tx in txs {
            block.add_transaction((*tx).clone());
        }
        block
    }

    #[test]
    fn fork_returns_only_transactions_missing_from_the_new_branch() {
        let (a, b, c) = (signed_tx(1, 0), signed_tx(2, 0), signed_tx(3, 0));
        let genesis = Arc::new(Block::genesis());
        let mut store = BlockStore::new(genesis.clone());

        // common ancestor at height 1
        let h = Arc::new(child(&genesis, "x", &[]));
        store.insert(h.clone());

        // local branch: candidate at height 2 holding {A, B}
        let candidate = child(&h, "local", &[&a, &b]);

        // accepted branch: heights 2 and 3 holding {B} and {C}
        let n2 = Arc::new(child(&h, "remote", &[&b]));
        let n3 = Arc::new(child(&n2, "remote", &[&c]));
        store.insert(n2.clone());
        store.insert(n3.clone());

        let reconciler = ChainReconciler::new(&store);
        let carry = reconciler.reconcile(&n3, &candidate).unwrap();
        assert_eq!(carry, HashSet::from([a.clone()]));

        let diff = reconciler.diff(&n3, &candidate).unwrap();
        assert_eq!(diff.common_ancestor, Some(h.hash()));
        assert_eq!(diff.rolled_back, 1);
        assert_eq!(diff.new_chain_txs, HashSet::from([b, c]));
    }

    #[test]
    fn own_block_reconciles_to_nothing() {
        let tx = signed_tx(1, 0);
        let genesis = Arc::new(Block::genesis());
        let mut store = BlockStore::new(genesis.clone());
        let own = Arc::new(child(&genesis, "me", &[&tx]));
        store.insert(own.clone());

        let diff = ChainReconciler::new(&store).diff(&own, &own).unwrap();
        assert!(diff.carry_forward().is_empty());
        assert_eq!(diff.rolled_back, 0);
    }

    #[test]
    fn empty_candidate_carries_nothing_forward() {
        let genesis = Arc::new(Block::genesis());
        let mut store = BlockStore::new(genesis.clone());
        let candidate = child(&genesis, "me", &[]);
        let remote = Arc::new(child(&genesis, "them", &[&signed_tx(5, 0)]));
        store.insert(remote.clone());

        let carry = ChainReconciler::new(&store)
            .reconcile(&remote, &candidate)
            .unwrap();
        assert!(carry.is_empty());
    }

    #[test]
    fn equal_length_branches_meet_at_genesis() {
        let (a, b, c) = (signed_tx(1, 0), signed_tx(2, 0), signed_tx(3, 0));
        let genesis = Arc::new(Block::genesis());
        let mut store = BlockStore::new(genesis.clone());

        let l1 = Arc::new(child(&genesis, "local", &[&a]));
        store.insert(l1.clone());
        let candidate = child(&l1, "local", &[&b]);

        let r1 = Arc::new(child(&genesis, "remote", &[&c]));
        let r2 = Arc::new(child(&r1, "remote", &[]));
        store.insert(r1);
        store.insert(r2.clone());

        let diff = ChainReconciler::new(&store).diff(&r2, &candidate).unwrap();
        assert_eq!(diff.common_ancestor, Some(genesis.hash()));
        assert_eq!(diff.rolled_back, 2);
        assert_eq!(diff.carry_forward(), HashSet::from([a, b]));
    }

    #[test]
    fn missing_ancestor_is_fatal() {
        let genesis = Arc::new(Block::genesis());
        let store = BlockStore::new(genesis.clone());
        let unknown = child(&genesis, "ghost", &[]);
        let orphan = child(&unknown, "ghost", &[]);
        let accepted = child(&orphan, "ghost", &[]);
        let candidate = child(&genesis, "me", &[]);

        let err = ChainReconciler::new(&store)
            .diff(&accepted, &candidate)
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
