// src/chain/client.rs
//! Wallet/ledger client: key pair, block store and chain tip.
//!
//! Every participant owns one. Miners embed it in their mining engine.

use crate::chain::block::Block;
use crate::chain::params::ChainParams;
use crate::chain::store::BlockStore;
use crate::chain::transaction::{Output, Transaction, calc_address};
use crate::network::fake_net::FakeNet;
use crate::network::message::NetEvent;
use crate::types::{Address, BlockHash};
use crate::utils::error::MinerError;
use ed25519_dalek::SigningKey;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// A participant's view of the chain plus its signing identity
pub struct Client {
    /// Display name used in log lines
    name: String,
    /// Key used to sign posted transactions
    signing_key: SigningKey,
    /// Address derived from the public key
    address: Address,
    /// Shared deployment rules
    params: ChainParams,
    /// Network used to post transactions and request blocks
    net: Arc<FakeNet>,
    /// Every accepted block
    blocks: BlockStore,
    /// Head of the longest known chain
    last_block: Arc<Block>,
    /// Blocks waiting for their parent, keyed by the parent hash
    orphans: HashMap<BlockHash, Vec<Arc<Block>>>,
    /// Next transaction nonce
    nonce: u64,
}

impl Client {
    /// Creates a client whose chain starts at `genesis`
    ///
    /// # Arguments
    /// * `name` - Display name for logs
    /// * `signing_key` - Identity of the participant
    /// * `genesis` - Block every participant agrees on
    /// * `params` - Puzzle and difficulty rules
    /// * `net` - Network for outgoing events
    pub fn new(
        name: impl Into<String>,
        signing_key: SigningKey,
        genesis: Arc<Block>,
        params: ChainParams,
        net: Arc<FakeNet>,
    ) -> Self {
        let address = calc_address(&signing_key.verifying_key());
        Client {
            name: name.into(),
            signing_key,
            address,
            params,
            net,
            blocks: BlockStore::new(genesis.clone()),
            last_block: genesis,
            orphans: HashMap::new(),
            nonce: 0,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address derived from the public key
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Tip of the longest known chain
    pub fn last_block(&self) -> Arc<Block> {
        self.last_block.clone()
    }

    /// Accepted blocks
    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    /// Deployment rules
    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Network handle
    pub fn net(&self) -> &Arc<FakeNet> {
        &self.net
    }

    /// Number of blocks parked until their parent arrives
    pub fn orphan_count(&self) -> usize {
        self.orphans.values().map(Vec::len).sum()
    }

    /// Builds and signs a transaction from this client
    pub fn make_transaction(&mut self, outputs: Vec<Output>, fee: u64) -> Transaction {
        let mut tx = Transaction::new(&self.signing_key.verifying_key(), self.nonce, outputs, fee);
        tx.sign(&self.signing_key);
        self.nonce += 1;
        tx
    }

    /// Signs a transaction and broadcasts it
    pub fn post_transaction(
        &mut self,
        outputs: Vec<Output>,
        fee: u64,
    ) -> Result<Transaction, MinerError> {
        let tx = self.make_transaction(outputs, fee);
        self.validate_transaction(&tx)?;
        log::info!(
            "{}: posting transaction {} ({} gold)",
            self.name,
            &tx.id()[..12],
            tx.total_output()
        );
        self.net.broadcast(NetEvent::PostTransaction(tx.clone()));
        Ok(tx)
    }

    /// Ledger-side transaction check
    pub fn validate_transaction(&self, tx: &Transaction) -> Result<(), MinerError> {
        tx.verify()
    }

    /// Validates and stores a block
    ///
    /// A block whose parent is unknown is parked and requested from the
    /// network; when the parent arrives, the parked descendants are accepted
    /// too.
    ///
    /// # Returns
    /// Newly accepted blocks in acceptance order (empty for duplicates and
    /// parked blocks)
    ///
    /// # Errors
    /// `MinerError::BlockError` or `MinerError::TransactionError` if the
    /// block itself is invalid
    pub fn receive_block(&mut self, block: Arc<Block>) -> Result<Vec<Arc<Block>>, MinerError> {
        let mut accepted = Vec::new();
        let Some(first) = self.accept_block(block)? else {
            return Ok(accepted);
        };

        let mut queue = VecDeque::from([first]);
        while let Some(block) = queue.pop_front() {
            if let Some(children) = self.orphans.remove(&block.hash()) {
                for child in children {
                    match self.accept_block(child) {
                        Ok(Some(b)) => queue.push_back(b),
                        Ok(None) => {}
                        Err(e) => log::warn!("{}: dropping parked block: {}", self.name, e),
                    }
                }
            }
            accepted.push(block);
        }
        Ok(accepted)
    }

    /// Validates one block against its parent and stores it
    fn accept_block(&mut self, block: Arc<Block>) -> Result<Option<Arc<Block>>, MinerError> {
        let hash = block.hash();
        if self.blocks.contains(&hash) {
            return Ok(None);
        }

        let Some(prev_hash) = block.prev_block_hash.clone() else {
            return Err(MinerError::BlockError(format!(
                "foreign genesis block {}",
                hash
            )));
        };

        if !block.has_valid_proof() {
            return Err(MinerError::BlockError(format!(
                "block {} has an invalid proof",
                hash
            )));
        }

        let Some(parent) = self.blocks.get(&prev_hash).cloned() else {
            log::debug!(
                "{}: parking block {} until {} arrives",
                self.name,
                &hash[..12],
                &prev_hash[..prev_hash.len().min(12)]
            );
            self.orphans.entry(prev_hash.clone()).or_default().push(block);
            self.net.broadcast(NetEvent::MissingBlock {
                requester: self.address.clone(),
                hash: prev_hash,
            });
            return Ok(None);
        };

        if block.chain_length != parent.chain_length + 1 {
            return Err(MinerError::BlockError(format!(
                "block {} claims length {} on a parent of length {}",
                hash, block.chain_length, parent.chain_length
            )));
        }

        let expected = self.params.puzzle_for(&parent).serialize();
        if block.puzzle.as_deref() != Some(expected.as_str()) {
            return Err(MinerError::BlockError(format!(
                "block {} solves a puzzle its parent does not dictate",
                hash
            )));
        }

        for tx in block.transactions.values() {
            self.validate_transaction(tx)?;
        }

        self.blocks.insert(block.clone());
        if block.chain_length > self.last_block.chain_length {
            self.last_block = block.clone();
        }
        Ok(Some(block))
    }

    /// Answers a peer's request for a block this client holds
    pub fn provide_missing_block(&self, requester: &str, hash: &str) {
        if requester == self.address {
            return;
        }
        if let Some(block) = self.blocks.get(hash) {
            log::debug!("{}: providing block {} to {}", self.name, &hash[..12], requester);
            self.net.send_to(requester, NetEvent::ProofFound(block.clone()));
        }
    }

    /// Reacts to a network event the way a plain wallet does
    pub fn handle_event(&mut self, event: NetEvent) -> Result<(), MinerError> {
        match event {
            NetEvent::ProofFound(block) => {
                self.receive_block(block)?;
            }
            NetEvent::MissingBlock { requester, hash } => {
                self.provide_missing_block(&requester, &hash);
            }
            NetEvent::PostTransaction(_) => {}
        }
        Ok(())
    }

    /// The chain ending at the current tip, genesis first
    pub fn main_chain(&self) -> Result<Vec<Arc<Block>>, MinerError> {
        self.blocks.chain_to(&self.last_block)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::puzzle::{Puzzle, hash_grid};
    use crate::puzzle::{Move, MoveList};
    use rand::rngs::OsRng;

    pub(crate) fn client_on(net: Arc<FakeNet>, genesis: Arc<Block>) -> Client {
        Client::new(
            "tester",
            SigningKey::generate(&mut OsRng),
            genesis,
            ChainParams::default(),
            net,
        )
    }

    /// A solved child of `parent`, proof built from the unblanked grid
    pub(crate) fn solved_child(params: &ChainParams, parent: &Block, miner: &str) -> Block {
        let mut block = Block::new(miner.into(), parent);
        let p = params.params_for(parent);
        let puzzle = Puzzle::generate(p.seed, params.base, p.emptiness);
        let full = Puzzle::generate(p.seed, params.base, 0.0);
        let side = puzzle.side();
        let moves: Vec<Move> = (0..side * side)
            .filter(|&i| puzzle.cells()[i] == 0)
            .map(|i| Move {
                row: i / side + 1,
                col: i % side + 1,
                num: full.cells()[i],
            })
            .collect();
        block.puzzle = Some(puzzle.serialize());
        block.commitment = Some(hash_grid(&full.digits()));
        block.moves = Some(MoveList::new(moves).encode().unwrap());
        block.solve_duration_ms = 80;
        block
    }

    #[test]
    fn accepts_a_valid_child_and_moves_the_tip() {
        let genesis = Arc::new(Block::genesis());
        let mut client = client_on(Arc::new(FakeNet::new()), genesis.clone());
        let b1 = Arc::new(solved_child(client.params(), &genesis, "m"));

        let accepted = client.receive_block(b1.clone()).unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(client.last_block().hash(), b1.hash());

        // duplicates are ignored
        assert!(client.receive_block(b1).unwrap().is_empty());
    }

    #[test]
    fn rejects_a_proof_for_the_wrong_puzzle() {
        let genesis = Arc::new(Block::genesis());
        let mut client = client_on(Arc::new(FakeNet::new()), genesis.clone());
        let b1 = solved_child(client.params(), &genesis, "m");
        // a valid proof, but for the grandchild's puzzle slot
        let mut wrong = solved_child(client.params(), &b1, "m");
        wrong.prev_block_hash = Some(genesis.hash());
        wrong.chain_length = 1;

        assert!(matches!(
            client.receive_block(Arc::new(wrong)),
            Err(MinerError::BlockError(_))
        ));
        assert_eq!(client.last_block().chain_length, 0);
    }

    #[test]
    fn rejects_unsolved_blocks() {
        let genesis = Arc::new(Block::genesis());
        let mut client = client_on(Arc::new(FakeNet::new()), genesis.clone());
        let unsolved = Arc::new(Block::new("m".into(), &genesis));
        assert!(client.receive_block(unsolved).is_err());
    }

    #[test]
    fn orphans_wait_for_their_parent() {
        let genesis = Arc::new(Block::genesis());
        let net = Arc::new(FakeNet::new());
        let mut client = client_on(net, genesis.clone());
        let b1 = Arc::new(solved_child(client.params(), &genesis, "m"));
        let b2 = Arc::new(solved_child(client.params(), &b1, "m"));

        assert!(client.receive_block(b2.clone()).unwrap().is_empty());
        assert_eq!(client.orphan_count(), 1);

        let accepted = client.receive_block(b1.clone()).unwrap();
        let lengths: Vec<u64> = accepted.iter().map(|b| b.chain_length).collect();
        assert_eq!(lengths, vec![1, 2]);
        assert_eq!(client.last_block().hash(), b2.hash());
        assert_eq!(client.orphan_count(), 0);
        assert_eq!(client.main_chain().unwrap().len(), 3);
    }

    #[test]
    fn orphan_triggers_a_missing_block_request() {
        use crossbeam_channel::unbounded;
        let genesis = Arc::new(Block::genesis());
        let net = Arc::new(FakeNet::new());
        let (tx, rx) = unbounded();
        net.register("observer".into(), tx);
        let mut client = client_on(net, genesis.clone());
        let b1 = solved_child(client.params(), &genesis, "m");
        let b2 = Arc::new(solved_child(client.params(), &b1, "m"));

        client.receive_block(b2).unwrap();
        match rx.try_recv() {
            Ok(crate::network::Message::Event(NetEvent::MissingBlock { hash, .. })) => {
                assert_eq!(hash, b1.hash())
            }
            other => panic!("expected a missing block request, got {:?}", other),
        }
    }

    #[test]
    fn posted_transactions_are_signed_and_sequenced() {
        let genesis = Arc::new(Block::genesis());
        let mut client = client_on(Arc::new(FakeNet::new()), genesis);
        let out = || {
            vec![Output {
                amount: 3,
                address: "bob".into(),
            }]
        };
        let a = client.post_transaction(out(), 0).unwrap();
        let b = client.post_transaction(out(), 0).unwrap();
        assert_ne!(a, b);
        assert_eq!((a.nonce, b.nonce), (0, 1));
        assert_eq!(&a.from, client.address());
    }
}
