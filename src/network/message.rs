// src/network/message.rs
//! Messages exchanged between participants and delivered to their inboxes.

use crate::chain::{Block, Transaction};
use crate::miner::worker::SolveOutcome;
use crate::types::{Address, BlockHash};
use std::sync::Arc;

/// Events carried by the simulated network
#[derive(Debug, Clone)]
pub enum NetEvent {
    /// A block with a completed proof
    ProofFound(Arc<Block>),

    /// A transaction offered for inclusion
    PostTransaction(Transaction),

    /// Request for a block the requester cannot connect to its chain
    MissingBlock {
        /// Participant asking for the block
        requester: Address,
        /// Hash of the missing block
        hash: BlockHash,
    },
}

/// Everything a participant's loop reacts to
#[derive(Debug)]
pub enum Message {
    /// Delivered by the network
    Event(NetEvent),

    /// Begin searching if idle
    StartMining,

    /// Result from the participant's solve worker
    SolveFinished(SolveOutcome),

    /// Driver request to pay another participant
    Transfer {
        /// Recipient address
        to: Address,
        /// Amount paid
        amount: u64,
        /// Fee offered
        fee: u64,
    },

    /// Stop the loop and report
    Shutdown,
}

impl From<NetEvent> for Message {
    fn from(event: NetEvent) -> Self {
        Message::Event(event)
    }
}
