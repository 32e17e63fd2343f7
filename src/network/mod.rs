// src/network/mod.rs
//! Simulated network
//!
//! This module connects participants running on their own threads:
//! - `FakeNet`: in-process broadcast network with shuffled delivery order
//! - `Message`/`NetEvent`: what travels between and into participants
//! - `Participant`: the per-participant message loop for wallets and miners

/// In-process network implementation
///
/// Keeps a copy-on-write registry of participant inboxes and delivers
/// broadcasts and directed replies.
pub mod fake_net;

/// Network events and inbox messages
pub mod message;

/// Participant loop
///
/// Runs a wallet or a miner on its own thread until it is told to shut down.
pub mod participant;

// Re-export main components for cleaner imports
pub use fake_net::FakeNet;
pub use message::{Message, NetEvent};
pub use participant::{JoinContext, Participant, ParticipantReport};
