// src/network/participant.rs
//! Participant threads
//!
//! Each simulated participant runs a single-consumer loop over its inbox on
//! its own OS thread. Wallets only follow the chain and post transfers;
//! miners additionally drive a [`MiningEngine`].

use crate::chain::{Block, ChainParams, Client, Output};
use crate::miner::engine::MiningEngine;
use crate::miner::solver::ProofSolver;
use crate::network::fake_net::FakeNet;
use crate::network::message::Message;
use crate::stats::MiningEvent;
use crate::types::{Address, BlockHash, Role};
use crate::utils::error::MinerError;
use crossbeam_channel::{Receiver, Sender, unbounded};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Everything a joining participant shares with the rest of the network
#[derive(Clone)]
pub struct JoinContext {
    /// Genesis block every participant starts from
    pub genesis: Arc<Block>,
    /// Puzzle rules
    pub params: ChainParams,
    /// The simulated network
    pub net: Arc<FakeNet>,
    /// Optional statistics sink for miners
    pub events: Option<Sender<MiningEvent>>,
}

/// What a participant does with its messages
enum Behaviour {
    Wallet(Client),
    Miner(MiningEngine),
}

/// State of a participant when its loop ended
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantReport {
    /// Display name
    pub name: String,
    /// Network address
    pub address: Address,
    /// Wallet or miner
    pub role: Role,
    /// Hash of the final tip
    pub tip: BlockHash,
    /// Length of the final chain
    pub chain_length: u64,
    /// Main chain, genesis first
    pub chain: Vec<Arc<Block>>,
    /// Transactions still waiting in the pool
    pub pending: usize,
    /// Blocks parked because their parent never arrived
    pub orphans: usize,
}

impl ParticipantReport {
    /// Blocks on the main chain credited to `address`
    pub fn blocks_mined_by(&self, address: &str) -> usize {
        self.chain
            .iter()
            .filter(|b| b.reward_addr.as_deref() == Some(address))
            .count()
    }
}

/// A participant and its inbox
pub struct Participant {
    behaviour: Behaviour,
    inbox: Receiver<Message>,
}

impl Participant {
    /// Creates a participant with a fresh key pair and registers it on the
    /// network
    ///
    /// # Arguments
    /// * `name` - Display name
    /// * `role` - Wallet or miner
    /// * `solver` - Solver for a miner; ignored for wallets
    /// * `ctx` - Shared network state
    ///
    /// # Returns
    /// The participant and the sender feeding its inbox
    ///
    /// # Errors
    /// `MinerError::ConfigError` for a miner without a solver;
    /// `MinerError::IoError` if the solve worker cannot be spawned
    pub fn join(
        name: &str,
        role: Role,
        solver: Option<Arc<dyn ProofSolver>>,
        ctx: &JoinContext,
    ) -> Result<(Self, Sender<Message>), MinerError> {
        let (sender, inbox) = unbounded();
        let client = Client::new(
            name,
            SigningKey::generate(&mut OsRng),
            ctx.genesis.clone(),
            ctx.params.clone(),
            ctx.net.clone(),
        );
        let address = client.address().clone();

        let behaviour = match role {
            Role::Client => Behaviour::Wallet(client),
            Role::Miner => {
                let solver = solver.ok_or_else(|| {
                    MinerError::ConfigError(format!("miner {} has no solver", name))
                })?;
                Behaviour::Miner(MiningEngine::new(
                    client,
                    solver,
                    sender.clone(),
                    ctx.events.clone(),
                )?)
            }
        };

        ctx.net.register(address.clone(), sender.clone());
        log::info!("{} joined as {} ({})", name, role, address);

        Ok((Participant { behaviour, inbox }, sender))
    }

    fn client(&self) -> &Client {
        match &self.behaviour {
            Behaviour::Wallet(client) => client,
            Behaviour::Miner(engine) => engine.client(),
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        self.client().name()
    }

    /// Network address
    pub fn address(&self) -> &Address {
        self.client().address()
    }

    /// Handles one message
    fn handle(&mut self, message: Message) -> Result<(), MinerError> {
        match &mut self.behaviour {
            Behaviour::Miner(engine) => engine.handle(message),
            Behaviour::Wallet(client) => match message {
                Message::Event(event) => client.handle_event(event),
                Message::Transfer { to, amount, fee } => {
                    client.post_transaction(
                        vec![Output {
                            amount,
                            address: to,
                        }],
                        fee,
                    )?;
                    Ok(())
                }
                Message::StartMining | Message::SolveFinished(_) | Message::Shutdown => Ok(()),
            },
        }
    }

    /// Processes messages until `Shutdown`
    ///
    /// Recoverable errors are logged and the loop continues; a fatal error
    /// ends the loop and is returned.
    pub fn run(mut self) -> Result<ParticipantReport, MinerError> {
        while let Ok(message) = self.inbox.recv() {
            if matches!(message, Message::Shutdown) {
                if let Behaviour::Miner(engine) = &mut self.behaviour {
                    engine.stop();
                }
                break;
            }
            if let Err(e) = self.handle(message) {
                if e.is_fatal() {
                    log::error!("{}: {}", self.name(), e);
                    return Err(e);
                }
                log::warn!("{}: {}", self.name(), e);
            }
        }
        self.report()
    }

    /// Snapshot of the participant's chain and pool
    pub fn report(&self) -> Result<ParticipantReport, MinerError> {
        let client = self.client();
        let tip = client.last_block();
        let (role, pending) = match &self.behaviour {
            Behaviour::Wallet(_) => (Role::Client, 0),
            Behaviour::Miner(engine) => (Role::Miner, engine.pool_len()),
        };

        Ok(ParticipantReport {
            name: client.name().to_string(),
            address: client.address().clone(),
            role,
            tip: tip.hash(),
            chain_length: tip.chain_length,
            chain: client.main_chain()?,
            pending,
            orphans: client.orphan_count(),
        })
    }

    /// Runs the loop on a named thread
    ///
    /// # Errors
    /// `MinerError::IoError` if the thread cannot be spawned
    pub fn spawn(self) -> Result<JoinHandle<Result<ParticipantReport, MinerError>>, MinerError> {
        let handle = thread::Builder::new()
            .name(self.name().to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }
}
