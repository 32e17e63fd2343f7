// src/puzzle/mod.rs
//! Puzzle proof-of-work primitives
//!
//! This module contains everything needed to issue and check a proof:
//! - Deterministic puzzle generation and the puzzle wire format
//! - Move lists and their base64 JSON encoding
//! - Seed derivation from the parent block hash
//! - Difficulty retargeting from the previous solve time

/// Puzzle generation, serialization and proof verification
pub mod codec;

/// Difficulty policy mapping solve times to blank density
pub mod difficulty;

/// Move lists accompanying a solution commitment
pub mod moves;

/// Seed derivation from block hashes
pub mod seed;

pub use codec::{Puzzle, hash_grid, verify_encoded, verify_solution};
pub use difficulty::{DifficultyPolicy, PuzzleParams};
pub use moves::{Move, MoveList};
pub use seed::seed_from_hash;
