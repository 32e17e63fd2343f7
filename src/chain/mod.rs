// src/chain/mod.rs
//! Chain-side collaborators of the mining engine
//!
//! - Blocks and their identity
//! - Signed transactions
//! - The append-only block store
//! - Deployment parameters deciding which puzzle a block must solve
//! - The wallet client that validates and follows the chain
//! - Offline audit of a dumped chain

/// Chain dumps and their offline audit
pub mod audit;

/// Block type and hashing
pub mod block;

/// Participant client: identity, store and tip
pub mod client;

/// Deployment-wide puzzle rules
pub mod params;

/// Append-only block storage
pub mod store;

/// Signed transactions
pub mod transaction;

pub use audit::ChainDump;
pub use block::Block;
pub use client::Client;
pub use params::ChainParams;
pub use store::BlockStore;
pub use transaction::{Output, Transaction};
