// src/miner/engine.rs
//! Mining engine state machine
//!
//! The engine owns a [`Client`], the pending transaction pool and the
//! candidate block currently being solved. It moves through:
//! - `Idle`: no candidate
//! - `Searching`: a candidate on the client tip is being solved by the worker
//! - found: the proof is stamped, broadcast and accepted locally
//! - superseded: an accepted block at least as long as the candidate
//!   replaces it, the pool is reconciled and a new search starts

use crate::chain::{Block, Client, Output, Transaction};
use crate::miner::reconcile::ChainReconciler;
use crate::miner::solver::{CancelToken, ProofSolver, Solution};
use crate::miner::worker::{SolveJob, SolveOutcome, SolveWorker};
use crate::network::message::{Message, NetEvent};
use crate::puzzle::hash_grid;
use crate::stats::MiningEvent;
use crate::utils::error::MinerError;
use crossbeam_channel::Sender;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Whether the engine is currently working on a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    /// No candidate
    Idle,
    /// A candidate is being solved
    Searching,
}

/// The block being solved and the search it belongs to
struct Candidate {
    id: u64,
    block: Block,
    started: Instant,
}

/// Drives one miner: candidate construction, proof announcement and
/// reorganization of the pending pool
pub struct MiningEngine {
    /// Ledger view and signing identity
    client: Client,
    /// Transactions waiting for the next candidate
    pool: HashSet<Transaction>,
    /// Current search, if any
    candidate: Option<Candidate>,
    /// Id of the live search; moving it cancels every older job
    live_search: Arc<AtomicU64>,
    /// Solve thread
    worker: SolveWorker,
    /// Optional statistics sink
    events: Option<Sender<MiningEvent>>,
}

impl MiningEngine {
    /// Creates an idle engine and spawns its solve worker
    ///
    /// # Arguments
    /// * `client` - Ledger client the engine mines on top of
    /// * `solver` - Solver run by the worker
    /// * `inbox` - The participant inbox; solve results arrive there
    /// * `events` - Optional channel for mining statistics
    ///
    /// # Errors
    /// `MinerError::IoError` if the worker thread cannot be spawned
    pub fn new(
        client: Client,
        solver: Arc<dyn ProofSolver>,
        inbox: Sender<Message>,
        events: Option<Sender<MiningEvent>>,
    ) -> Result<Self, MinerError> {
        let worker = SolveWorker::spawn(client.name(), solver, inbox)?;
        Ok(MiningEngine {
            client,
            pool: HashSet::new(),
            candidate: None,
            live_search: Arc::new(AtomicU64::new(0)),
            worker,
            events,
        })
    }

    /// The embedded client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Current lifecycle state
    pub fn state(&self) -> SearchState {
        if self.candidate.is_some() {
            SearchState::Searching
        } else {
            SearchState::Idle
        }
    }

    /// The candidate being solved
    pub fn candidate(&self) -> Option<&Block> {
        self.candidate.as_ref().map(|c| &c.block)
    }

    /// Id of the live search, if any
    pub fn search_id(&self) -> Option<u64> {
        self.candidate.as_ref().map(|c| c.id)
    }

    /// Transactions waiting for the next candidate
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    fn emit(&self, event: MiningEvent) {
        if let Some(events) = &self.events {
            // The reporter may already be gone at shutdown.
            let _ = events.send(event);
        }
    }

    /// Starts a search on the client tip
    ///
    /// Any older search is cancelled. `carry` and the whole pool go into the
    /// new candidate.
    ///
    /// # Errors
    /// `MinerError::ChannelError` if the worker has exited
    pub fn start_new_search(&mut self, carry: HashSet<Transaction>) -> Result<(), MinerError> {
        let id = self.live_search.fetch_add(1, Ordering::AcqRel) + 1;
        let tip = self.client.last_block();

        let mut block = Block::new(self.client.address().clone(), &tip);
        let puzzle = self.client.params().puzzle_for(&tip).serialize();
        block.puzzle = Some(puzzle.clone());
        for tx in carry.into_iter().chain(self.pool.drain()) {
            block.add_transaction(tx);
        }

        log::debug!(
            "{}: search {} for block {} with {} transaction(s)",
            self.client.name(),
            id,
            block.chain_length,
            block.transactions.len()
        );

        self.candidate = Some(Candidate {
            id,
            block,
            started: Instant::now(),
        });

        self.worker.submit(SolveJob {
            token: CancelToken::new(id, self.live_search.clone()),
            puzzle,
        })
    }

    /// Handles a result from the solve worker
    ///
    /// Results for anything but the live search are discarded.
    pub fn on_solve_finished(&mut self, outcome: SolveOutcome) -> Result<(), MinerError> {
        if self.search_id() != Some(outcome.search_id) {
            log::debug!(
                "{}: discarding stale result for search {}",
                self.client.name(),
                outcome.search_id
            );
            self.emit(MiningEvent::StaleResult);
            return Ok(());
        }
        let Some(mut candidate) = self.candidate.take() else {
            return Ok(());
        };

        let stamped = match outcome.result {
            Ok(solution) => Self::stamp(&mut candidate, solution),
            Err(e) => Err(e),
        };

        if let Err(e) = stamped {
            log::warn!(
                "{}: solve failed for block {}: {}",
                self.client.name(),
                candidate.block.chain_length,
                e
            );
            self.emit(MiningEvent::SolveFailed);
            let carry = candidate.block.transactions.into_values().collect();
            return self.start_new_search(carry);
        }

        let block = Arc::new(candidate.block.clone());
        log::info!(
            "{}: found proof for block {} in {} ms",
            self.client.name(),
            block.chain_length,
            block.solve_duration_ms
        );
        self.emit(MiningEvent::BlockFound {
            solve_ms: block.solve_duration_ms,
        });
        self.client
            .net()
            .broadcast(NetEvent::ProofFound(block.clone()));

        self.candidate = Some(candidate);
        self.receive_block(block)?;
        Ok(())
    }

    /// Fills in the proof fields and checks them the way peers will
    fn stamp(candidate: &mut Candidate, solution: Solution) -> Result<(), MinerError> {
        let block = &mut candidate.block;
        block.commitment = Some(hash_grid(&solution.solved.digits()));
        block.moves = Some(solution.moves.encode()?);
        block.solve_duration_ms = candidate.started.elapsed().as_millis() as u64;

        if block.has_valid_proof() {
            Ok(())
        } else {
            Err(MinerError::SolverError(format!(
                "proof for block {} failed self-verification",
                block.chain_length
            )))
        }
    }

    /// Accepts a block through the client and switches to it if it is at
    /// least as long as the candidate
    ///
    /// # Returns
    /// Blocks the client accepted
    ///
    /// # Errors
    /// Block validation errors from the client; `ConsistencyError` if the
    /// store cannot walk back to a common ancestor
    pub fn receive_block(&mut self, block: Arc<Block>) -> Result<Vec<Arc<Block>>, MinerError> {
        let accepted = self.client.receive_block(block)?;
        for _ in &accepted {
            self.emit(MiningEvent::BlockAccepted);
        }

        let Some(candidate) = &self.candidate else {
            return Ok(accepted);
        };
        if !accepted
            .iter()
            .any(|b| b.chain_length >= candidate.block.chain_length)
        {
            return Ok(accepted);
        }

        // A released batch of parked blocks moves the tip several times; only
        // the final tip decides what the next candidate may hold.
        let tip = self.client.last_block();
        let diff = ChainReconciler::new(self.client.blocks()).diff(&tip, &candidate.block)?;
        self.pool.retain(|tx| !diff.new_chain_txs.contains(tx));

        if tip.reward_addr.as_ref() != Some(self.client.address()) {
            log::info!(
                "{}: cutting over to block {} from another miner ({} block(s) rolled back, {} transaction(s) carried)",
                self.client.name(),
                tip.chain_length,
                diff.rolled_back,
                diff.carry_forward().len()
            );
        }
        // Walking back past the candidate itself means stored blocks were abandoned.
        if diff.rolled_back > 1 {
            self.emit(MiningEvent::Reorg);
        }

        self.start_new_search(diff.carry_forward())?;
        Ok(accepted)
    }

    /// Adds a transaction to the pool
    ///
    /// # Returns
    /// `false` if the transaction is already pending or in the candidate
    ///
    /// # Errors
    /// Validation errors from the client
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<bool, MinerError> {
        self.client.validate_transaction(&tx)?;
        if self
            .candidate
            .as_ref()
            .is_some_and(|c| c.block.contains(&tx))
        {
            return Ok(false);
        }
        Ok(self.pool.insert(tx))
    }

    /// Signs and broadcasts a transaction, adding it to the own pool
    pub fn post_transaction(
        &mut self,
        outputs: Vec<Output>,
        fee: u64,
    ) -> Result<Transaction, MinerError> {
        let tx = self.client.post_transaction(outputs, fee)?;
        self.add_transaction(tx.clone())?;
        Ok(tx)
    }

    /// Cancels the live search and goes idle
    pub fn stop(&mut self) {
        self.live_search.fetch_add(1, Ordering::AcqRel);
        self.candidate = None;
    }

    /// Dispatches one inbox message
    pub fn handle(&mut self, message: Message) -> Result<(), MinerError> {
        match message {
            Message::StartMining => {
                if self.state() == SearchState::Idle {
                    log::info!("{}: starting to mine", self.client.name());
                    self.start_new_search(HashSet::new())?;
                }
            }
            Message::Event(NetEvent::ProofFound(block)) => {
                self.receive_block(block)?;
            }
            Message::Event(NetEvent::PostTransaction(tx)) => {
                self.add_transaction(tx)?;
            }
            Message::Event(NetEvent::MissingBlock { requester, hash }) => {
                self.client.provide_missing_block(&requester, &hash);
            }
            Message::SolveFinished(outcome) => self.on_solve_finished(outcome)?,
            Message::Transfer { to, amount, fee } => {
                self.post_transaction(
                    vec![Output {
                        amount,
                        address: to,
                    }],
                    fee,
                )?;
            }
            Message::Shutdown => self.stop(),
        }
        Ok(())
    }
}

impl Drop for MiningEngine {
    fn drop(&mut self) {
        // Cancel before the worker field is dropped and joined.
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::client::tests::{client_on, solved_child};
    use crate::chain::transaction::tests::signed_tx;
    use crate::miner::solver::{BacktrackSolver, PacedSolver};
    use crate::network::fake_net::FakeNet;
    use crossbeam_channel::{Receiver, unbounded};
    use std::time::Duration;

    fn engine(solver: Arc<dyn ProofSolver>) -> (MiningEngine, Receiver<Message>, Arc<Block>) {
        let genesis = Arc::new(Block::genesis());
        let client = client_on(Arc::new(FakeNet::new()), genesis.clone());
        let (inbox, rx) = unbounded();
        let engine = MiningEngine::new(client, solver, inbox, None).unwrap();
        (engine, rx, genesis)
    }

    fn fast() -> Arc<dyn ProofSolver> {
        Arc::new(BacktrackSolver::new())
    }

    fn slow() -> Arc<dyn ProofSolver> {
        Arc::new(PacedSolver::new(
            BacktrackSolver::new(),
            Duration::from_secs(1),
        ))
    }

    fn next_outcome(rx: &Receiver<Message>) -> Message {
        match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(m @ Message::SolveFinished(_)) => m,
            other => panic!("expected a solve result, got {:?}", other),
        }
    }

    #[test]
    fn pool_is_idempotent() {
        let (mut engine, _rx, _) = engine(fast());
        let tx = signed_tx(5, 0);
        assert!(engine.add_transaction(tx.clone()).unwrap());
        assert!(!engine.add_transaction(tx).unwrap());
        assert_eq!(engine.pool_len(), 1);
    }

    #[test]
    fn invalid_transactions_are_rejected() {
        let (mut engine, _rx, _) = engine(fast());
        let mut tx = signed_tx(5, 0);
        tx.fee += 1;
        assert!(matches!(
            engine.add_transaction(tx),
            Err(MinerError::TransactionError(_))
        ));
        assert_eq!(engine.pool_len(), 0);
    }

    #[test]
    fn found_proof_extends_the_chain_and_restarts() {
        let (mut engine, rx, genesis) = engine(fast());
        let tx = signed_tx(5, 0);
        engine.add_transaction(tx.clone()).unwrap();
        engine.handle(Message::StartMining).unwrap();
        assert_eq!(engine.state(), SearchState::Searching);
        assert_eq!(engine.pool_len(), 0);

        engine.handle(next_outcome(&rx)).unwrap();

        let tip = engine.client().last_block();
        assert_eq!(tip.chain_length, 1);
        assert_eq!(tip.prev_block_hash, Some(genesis.hash()));
        assert!(tip.contains(&tx));
        assert!(tip.has_valid_proof());
        assert_eq!(engine.candidate().map(|c| c.chain_length), Some(2));
        assert!(engine.candidate().is_some_and(|c| c.transactions.is_empty()));
    }

    #[test]
    fn stale_results_are_discarded() {
        let (mut engine, _rx, _) = engine(slow());
        engine.handle(Message::StartMining).unwrap();
        let live = engine.search_id().unwrap();

        let puzzle = engine.candidate().and_then(|c| c.puzzle.clone()).unwrap();
        let solution = BacktrackSolver::new()
            .solve(&puzzle, &CancelToken::detached())
            .unwrap();
        engine
            .on_solve_finished(SolveOutcome {
                search_id: live + 7,
                result: Ok(solution),
            })
            .unwrap();

        assert_eq!(engine.client().last_block().chain_length, 0);
        assert_eq!(engine.search_id(), Some(live));
    }

    #[test]
    fn foreign_block_supersedes_and_carries_transactions() {
        let (mut engine, _rx, genesis) = engine(slow());
        let (a, b) = (signed_tx(1, 0), signed_tx(2, 0));
        engine.add_transaction(a.clone()).unwrap();
        engine.add_transaction(b.clone()).unwrap();
        engine.handle(Message::StartMining).unwrap();
        let before = engine.search_id().unwrap();

        let mut foreign = solved_child(engine.client().params(), &genesis, "rival");
        foreign.add_transaction(b.clone());
        engine.receive_block(Arc::new(foreign)).unwrap();

        let candidate = engine.candidate().unwrap();
        assert_eq!(candidate.chain_length, 2);
        assert!(candidate.contains(&a));
        assert!(!candidate.contains(&b));
        assert!(engine.search_id().unwrap() > before);
    }

    #[test]
    fn released_orphans_are_reconciled_against_the_final_tip() {
        let (mut engine, _rx, genesis) = engine(slow());
        let (a, b) = (signed_tx(1, 0), signed_tx(2, 0));
        engine.add_transaction(a.clone()).unwrap();
        engine.handle(Message::StartMining).unwrap();
        engine.add_transaction(b.clone()).unwrap();
        assert_eq!(engine.pool_len(), 1);

        let x1 = Arc::new(solved_child(engine.client().params(), &genesis, "rival"));
        let mut x2 = solved_child(engine.client().params(), &x1, "rival");
        x2.add_transaction(a.clone());
        x2.add_transaction(b.clone());

        assert!(engine.receive_block(Arc::new(x2)).unwrap().is_empty());
        assert_eq!(engine.candidate().map(|c| c.chain_length), Some(1));

        let accepted = engine.receive_block(x1).unwrap();
        assert_eq!(
            accepted.iter().map(|b| b.chain_length).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let tip = engine.client().last_block();
        assert_eq!(tip.chain_length, 2);
        assert!(tip.contains(&a));
        let candidate = engine.candidate().unwrap();
        assert_eq!(candidate.chain_length, 3);
        assert!(!candidate.contains(&a));
        assert!(!candidate.contains(&b));
        assert_eq!(engine.pool_len(), 0);
    }

    #[test]
    fn reorg_is_counted_only_when_stored_blocks_are_abandoned() {
        let genesis = Arc::new(Block::genesis());
        let client = client_on(Arc::new(FakeNet::new()), genesis.clone());
        let (inbox, rx) = unbounded();
        let (events, counted) = unbounded();
        let mut engine = MiningEngine::new(client, fast(), inbox, Some(events)).unwrap();
        let params = engine.client().params().clone();
        let reorgs = |counted: &Receiver<MiningEvent>| {
            counted
                .try_iter()
                .filter(|e| *e == MiningEvent::Reorg)
                .count()
        };

        // A rival block on the same parent only replaces the unsolved candidate.
        engine.handle(Message::StartMining).unwrap();
        let r1 = Arc::new(solved_child(&params, &genesis, "rival"));
        engine.receive_block(r1.clone()).unwrap();
        assert_eq!(reorgs(&counted), 0);

        // Mine on r1, then let a longer branch from genesis replace it.
        while engine.client().last_block().chain_length < 2 {
            engine.handle(next_outcome(&rx)).unwrap();
        }
        assert_eq!(reorgs(&counted), 0);

        let s1 = Arc::new(solved_child(&params, &genesis, "other"));
        let s2 = Arc::new(solved_child(&params, &s1, "other"));
        let s3 = Arc::new(solved_child(&params, &s2, "other"));
        engine.receive_block(s1).unwrap();
        engine.receive_block(s2).unwrap();
        engine.receive_block(s3.clone()).unwrap();

        assert_eq!(engine.client().last_block().hash(), s3.hash());
        assert_eq!(reorgs(&counted), 1);
    }

    #[test]
    fn equal_length_block_also_switches() {
        let (mut engine, _rx, genesis) = engine(slow());
        engine.handle(Message::StartMining).unwrap();
        assert_eq!(engine.candidate().map(|c| c.chain_length), Some(1));

        let rival = Arc::new(solved_child(engine.client().params(), &genesis, "rival"));
        engine.receive_block(rival.clone()).unwrap();

        let candidate = engine.candidate().unwrap();
        assert_eq!(candidate.prev_block_hash, Some(rival.hash()));
    }

    #[test]
    fn solve_failure_restarts_with_the_same_transactions() {
        let (mut engine, _rx, _) = engine(slow());
        let tx = signed_tx(3, 0);
        engine.add_transaction(tx.clone()).unwrap();
        engine.handle(Message::StartMining).unwrap();
        let failed = engine.search_id().unwrap();

        engine
            .on_solve_finished(SolveOutcome {
                search_id: failed,
                result: Err(MinerError::SolverError("no solution".into())),
            })
            .unwrap();

        assert_eq!(engine.state(), SearchState::Searching);
        assert!(engine.search_id().unwrap() > failed);
        assert!(engine.candidate().unwrap().contains(&tx));
    }

    #[test]
    fn posted_transactions_land_in_the_own_pool() {
        let (mut engine, _rx, _) = engine(fast());
        engine
            .handle(Message::Transfer {
                to: "bob".into(),
                amount: 4,
                fee: 1,
            })
            .unwrap();
        assert_eq!(engine.pool_len(), 1);
    }

    #[test]
    fn stop_returns_to_idle() {
        let (mut engine, _rx, _) = engine(slow());
        engine.handle(Message::StartMining).unwrap();
        engine.stop();
        assert_eq!(engine.state(), SearchState::Idle);
    }
}
