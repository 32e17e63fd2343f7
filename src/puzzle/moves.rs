// src/puzzle/moves.rs
//! Move lists: the fill instructions that accompany a solution commitment.
//!
//! On the wire a move list is a JSON array of `{row, col, num}` objects
//! (1-indexed), base64 encoded.

use crate::utils::error::MinerError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// A single cell fill, 1-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// Row, starting at 1
    pub row: usize,
    /// Column, starting at 1
    pub col: usize,
    /// Value written into the cell
    pub num: u8,
}

/// Ordered moves transforming a puzzle into its claimed solution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveList(Vec<Move>);

impl MoveList {
    /// Wraps an ordered list of moves
    pub fn new(moves: Vec<Move>) -> Self {
        MoveList(moves)
    }

    /// Number of moves
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if there are no moves
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the moves in order
    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.0.iter()
    }

    /// Unwraps into the underlying vector
    pub fn into_inner(self) -> Vec<Move> {
        self.0
    }

    /// Base64 of the JSON array form
    pub fn encode(&self) -> Result<String, MinerError> {
        let json = serde_json::to_vec(&self.0)?;
        Ok(STANDARD.encode(json))
    }

    /// Parses the base64 JSON form produced by [`MoveList::encode`]
    pub fn decode(encoded: &str) -> Result<Self, MinerError> {
        let json = STANDARD.decode(encoded.trim())?;
        Ok(MoveList(serde_json::from_slice(&json)?))
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Move>> for MoveList {
    fn from(moves: Vec<Move>) -> Self {
        MoveList(moves)
    }
}
