// src/utils/error.rs
use crate::miner::worker::SolveJob;
use crate::network::message::Message;
use serde_json;
use std::io;
use thiserror::Error;

/// Main error type for the mining simulation
///
/// This enum represents all possible error conditions that can occur
/// while generating, solving and verifying puzzles, accepting blocks,
/// and coordinating participants.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Malformed puzzle strings or move lists
    #[error("Puzzle error: {0}")]
    PuzzleError(String),

    /// The solver failed to produce a solution (no solution, bad output)
    #[error("Solver error: {0}")]
    SolverError(String),

    /// The search was abandoned because a newer search replaced it
    #[error("Search cancelled")]
    SearchCancelled,

    /// A transaction failed validation
    #[error("Invalid transaction: {0}")]
    TransactionError(String),

    /// A received block failed validation
    #[error("Invalid block: {0}")]
    BlockError(String),

    /// The block store is missing an ancestor of an accepted block
    #[error("Chain consistency error: {0}")]
    ConsistencyError(String),

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Thread communication channel errors
    #[error("Thread communication error: {0}")]
    ChannelError(String),

    /// Cryptographic operation errors
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// Async task or thread execution errors
    #[error("Task execution error: {0}")]
    TaskError(String),
}

impl MinerError {
    /// Whether the error breaks a participant invariant and must stop it.
    ///
    /// Everything else (bad blocks, bad transactions, solver trouble) is
    /// local and recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MinerError::ConsistencyError(_))
    }
}

/// Converts crossbeam channel send errors for participant messages into MinerError
impl From<crossbeam_channel::SendError<Message>> for MinerError {
    fn from(e: crossbeam_channel::SendError<Message>) -> Self {
        MinerError::ChannelError(format!("Message send failed: {}", e))
    }
}

/// Converts crossbeam channel send errors for solve jobs into MinerError
///
/// Happens when the solve worker thread has exited.
impl From<crossbeam_channel::SendError<SolveJob>> for MinerError {
    fn from(e: crossbeam_channel::SendError<SolveJob>) -> Self {
        MinerError::ChannelError(format!("Solve job send failed: {}", e))
    }
}

/// Converts hex decoding errors into MinerError
///
/// Used when public keys or signatures carried by transactions are not
/// valid hex.
impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::CryptoError(format!("Hex conversion failed: {}", e))
    }
}

/// Converts base64 decoding errors (encoded move lists) into MinerError
impl From<base64::DecodeError> for MinerError {
    fn from(e: base64::DecodeError) -> Self {
        MinerError::PuzzleError(format!("Base64 decoding failed: {}", e))
    }
}

/// Converts ed25519 key and signature errors into MinerError
impl From<ed25519_dalek::SignatureError> for MinerError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        MinerError::CryptoError(format!("Signature error: {}", e))
    }
}

/// Converts async task join errors into MinerError
///
/// Used when a blocking join of a participant thread fails inside the
/// simulation runtime.
impl From<tokio::task::JoinError> for MinerError {
    fn from(e: tokio::task::JoinError) -> Self {
        MinerError::TaskError(format!("Async task failed: {}", e))
    }
}
