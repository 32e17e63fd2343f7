// src/puzzle/codec.rs
//! Puzzle generation, wire format and proof verification
//!
//! A puzzle is a Sudoku grid of side `base²` derived from a seed. Its wire
//! form is `"<side>_<row-major digits>"` with `0` for blanks. A proof is the
//! SHA-256 commitment of the solved digit string together with the move list
//! that fills the blanks, so checking a proof never requires solving.

use crate::puzzle::moves::{Move, MoveList};
use crate::utils::error::MinerError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::fmt;

/// Largest supported box size; every symbol must fit in one ASCII digit.
pub const MAX_BASE: usize = 3;

/// A (possibly partially blank) Sudoku grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    /// Box size; the grid side is `base * base`
    base: usize,
    /// Row-major cells, `0` marks a blank
    cells: Vec<u8>,
}

impl Puzzle {
    /// Generates the puzzle for `seed`.
    ///
    /// The draw order is fixed: row bands, then the rows of each band, column
    /// bands, the columns of each band, the symbol alphabet, and finally the
    /// order in which cells are blanked. The first
    /// `⌊side² · emptiness⌋` cells of that order are cleared.
    ///
    /// # Arguments
    /// * `seed` - Seed derived from the parent block (0 for the genesis parent)
    /// * `base` - Box size, `1..=MAX_BASE`
    /// * `emptiness` - Fraction of cells to blank, clamped to `[0, 1]`
    pub fn generate(seed: u64, base: usize, emptiness: f64) -> Self {
        let base = base.clamp(1, MAX_BASE);
        let side = base * base;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let rows = shuffled_lines(&mut rng, base);
        let cols = shuffled_lines(&mut rng, base);
        let nums = shuffled(&mut rng, (1..=side as u8).collect());

        let pattern = |r: usize, c: usize| (base * (r % base) + r / base + c) % side;

        let mut cells = Vec::with_capacity(side * side);
        for &r in &rows {
            for &c in &cols {
                cells.push(nums[pattern(r, c)]);
            }
        }

        let squares = side * side;
        let emptiness = if emptiness.is_nan() {
            0.0
        } else {
            emptiness.clamp(0.0, 1.0)
        };
        let empties = ((squares as f64 * emptiness).floor() as usize).min(squares);
        let order = shuffled(&mut rng, (0..squares).collect());
        for &idx in order.iter().take(empties) {
            cells[idx] = 0;
        }

        Puzzle { base, cells }
    }

    /// Parses the `"<side>_<digits>"` wire format.
    ///
    /// # Errors
    /// `MinerError::PuzzleError` if the side is not a perfect square in
    /// `1..=9`, the digit count is not `side²`, or a cell is not a digit in
    /// `0..=side`.
    pub fn deserialize(s: &str) -> Result<Self, MinerError> {
        let (dimension, digits) = s
            .trim()
            .split_once('_')
            .ok_or_else(|| MinerError::PuzzleError(format!("missing '_' separator in {:?}", s)))?;

        let side: usize = dimension
            .parse()
            .map_err(|_| MinerError::PuzzleError(format!("invalid dimension {:?}", dimension)))?;

        let base = (1..=MAX_BASE)
            .find(|b| b * b == side)
            .ok_or_else(|| MinerError::PuzzleError(format!("unsupported side {}", side)))?;

        if digits.len() != side * side {
            return Err(MinerError::PuzzleError(format!(
                "expected {} cells for side {}, got {}",
                side * side,
                side,
                digits.len()
            )));
        }

        let cells = digits
            .chars()
            .map(|ch| match ch.to_digit(10) {
                Some(d) if d as usize <= side => Ok(d as u8),
                _ => Err(MinerError::PuzzleError(format!(
                    "invalid cell {:?} for side {}",
                    ch, side
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Puzzle { base, cells })
    }

    /// Serializes to the `"<side>_<digits>"` wire format
    pub fn serialize(&self) -> String {
        format!("{}_{}", self.side(), self.digits())
    }

    /// Row-major digit string without the dimension prefix
    pub fn digits(&self) -> String {
        self.cells.iter().map(|&v| char::from(b'0' + v)).collect()
    }

    /// Box size
    pub fn base(&self) -> usize {
        self.base
    }

    /// Grid side (`base²`)
    pub fn side(&self) -> usize {
        self.base * self.base
    }

    /// Row-major cell values, `0` for blanks
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Value at a 0-indexed position
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row < self.side() && col < self.side() {
            Some(self.cells[row * self.side() + col])
        } else {
            None
        }
    }

    /// Number of blank cells
    pub fn blanks(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 0).count()
    }

    /// Writes one move into a blank cell.
    ///
    /// # Errors
    /// `MinerError::PuzzleError` when the position or value is out of range
    /// or the target cell is not blank.
    pub fn apply(&mut self, mv: &Move) -> Result<(), MinerError> {
        let side = self.side();
        if mv.row == 0 || mv.row > side || mv.col == 0 || mv.col > side {
            return Err(MinerError::PuzzleError(format!(
                "move ({}, {}) outside a {}x{} grid",
                mv.row, mv.col, side, side
            )));
        }
        if mv.num == 0 || mv.num as usize > side {
            return Err(MinerError::PuzzleError(format!(
                "value {} outside 1..={}",
                mv.num, side
            )));
        }

        let idx = (mv.row - 1) * side + (mv.col - 1);
        if self.cells[idx] != 0 {
            return Err(MinerError::PuzzleError(format!(
                "cell ({}, {}) is already filled",
                mv.row, mv.col
            )));
        }
        self.cells[idx] = mv.num;
        Ok(())
    }

    /// Whether the grid is complete and every row, column and box holds each
    /// symbol exactly once
    pub fn is_valid_solution(&self) -> bool {
        let base = self.base;
        let side = self.side();
        let full: u16 = (1u16 << side) - 1;

        let mut rows = vec![0u16; side];
        let mut cols = vec![0u16; side];
        let mut boxes = vec![0u16; side];

        for (idx, &v) in self.cells.iter().enumerate() {
            if v == 0 || v as usize > side {
                return false;
            }
            let (r, c) = (idx / side, idx % side);
            let bit = 1u16 << (v - 1);
            let b = (r / base) * base + c / base;
            if rows[r] & bit != 0 || cols[c] & bit != 0 || boxes[b] & bit != 0 {
                return false;
            }
            rows[r] |= bit;
            cols[c] |= bit;
            boxes[b] |= bit;
        }

        rows.iter().chain(&cols).chain(&boxes).all(|&m| m == full)
    }
}

impl fmt::Display for Puzzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = self.side();
        for r in 0..side {
            if r > 0 && r % self.base == 0 {
                writeln!(f, "{}", "-".repeat(side * 2 + (self.base - 1) * 2 - 1))?;
            }
            for c in 0..side {
                if c > 0 && c % self.base == 0 {
                    write!(f, "| ")?;
                }
                match self.cells[r * side + c] {
                    0 => write!(f, ".")?,
                    v => write!(f, "{}", v)?,
                }
                if c + 1 < side {
                    write!(f, " ")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Shuffled line order: bands in random order, lines inside each band in
/// random order, one shuffle per band.
fn shuffled_lines(rng: &mut ChaCha8Rng, base: usize) -> Vec<usize> {
    let bands = shuffled(rng, (0..base).collect());
    let mut lines = Vec::with_capacity(base * base);
    for g in bands {
        for offset in shuffled(rng, (0..base).collect()) {
            lines.push(g * base + offset);
        }
    }
    lines
}

/// Fisher-Yates from the top; the exact sequence of draws is part of the
/// puzzle format.
fn shuffled<T>(rng: &mut ChaCha8Rng, mut items: Vec<T>) -> Vec<T> {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
    items
}

/// Commitment over a solved grid's row-major digit string (lowercase hex SHA-256)
pub fn hash_grid(digits: &str) -> String {
    hex::encode(Sha256::digest(digits.as_bytes()))
}

/// Checks a claimed solution without solving the puzzle.
///
/// Applies every move to the puzzle, requires the result to be a complete
/// valid grid, and compares its commitment. Malformed input of any kind
/// yields `false`.
pub fn verify_solution(puzzle: &str, commitment: &str, moves: &MoveList) -> bool {
    let Ok(mut grid) = Puzzle::deserialize(puzzle) else {
        return false;
    };
    if moves.iter().any(|mv| grid.apply(mv).is_err()) {
        return false;
    }
    if !grid.is_valid_solution() {
        return false;
    }
    hash_grid(&grid.digits()) == commitment
}

/// [`verify_solution`] for the base64 move encoding carried by blocks
pub fn verify_encoded(puzzle: &str, commitment: &str, encoded_moves: &str) -> bool {
    match MoveList::decode(encoded_moves) {
        Ok(moves) => verify_solution(puzzle, commitment, &moves),
        Err(_) => false,
    }
}
