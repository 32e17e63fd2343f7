// src/miner/solver/backtrack.rs
//! Depth-first Sudoku solver.
//!
//! Candidate sets are kept as bitmasks per row, column and box; each step
//! fills the blank cell with the fewest candidates.

use crate::miner::solver::{CancelToken, ProofSolver, Solution};
use crate::puzzle::{Move, MoveList, Puzzle};
use crate::utils::error::MinerError;

/// Nodes visited between cancellation checks
const CANCEL_CHECK_INTERVAL: u64 = 256;

/// Backtracking solver with minimum-remaining-values cell ordering
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktrackSolver;

impl BacktrackSolver {
    /// Creates a solver
    pub fn new() -> Self {
        BacktrackSolver
    }
}

impl ProofSolver for BacktrackSolver {
    fn solve(&self, puzzle: &str, token: &CancelToken) -> Result<Solution, MinerError> {
        let puzzle = Puzzle::deserialize(puzzle)?;
        let mut board = Board::new(&puzzle)?;
        let mut moves = Vec::with_capacity(puzzle.blanks());
        let mut nodes = 0u64;

        if !board.search(&mut moves, &mut nodes, token)? {
            return Err(MinerError::SolverError(format!(
                "no solution exists after {} nodes",
                nodes
            )));
        }

        let moves = MoveList::new(moves);
        let mut solved = puzzle;
        for mv in &moves {
            solved.apply(mv)?;
        }
        Ok(Solution { solved, moves })
    }

    fn name(&self) -> &'static str {
        "backtrack"
    }
}

/// Working grid with per-unit used-symbol masks
struct Board {
    base: usize,
    side: usize,
    cells: Vec<u8>,
    rows: Vec<u16>,
    cols: Vec<u16>,
    boxes: Vec<u16>,
}

impl Board {
    fn new(puzzle: &Puzzle) -> Result<Self, MinerError> {
        let base = puzzle.base();
        let side = puzzle.side();
        let mut board = Board {
            base,
            side,
            cells: puzzle.cells().to_vec(),
            rows: vec![0; side],
            cols: vec![0; side],
            boxes: vec![0; side],
        };

        for idx in 0..side * side {
            let v = board.cells[idx];
            if v == 0 {
                continue;
            }
            let bit = 1u16 << (v - 1);
            let (r, c, b) = board.units(idx);
            if (board.rows[r] | board.cols[c] | board.boxes[b]) & bit != 0 {
                return Err(MinerError::SolverError(format!(
                    "contradictory clue {} at ({}, {})",
                    v,
                    r + 1,
                    c + 1
                )));
            }
            board.mark(idx, bit);
        }
        Ok(board)
    }

    fn units(&self, idx: usize) -> (usize, usize, usize) {
        let (r, c) = (idx / self.side, idx % self.side);
        (r, c, (r / self.base) * self.base + c / self.base)
    }

    fn mark(&mut self, idx: usize, bit: u16) {
        let (r, c, b) = self.units(idx);
        self.rows[r] |= bit;
        self.cols[c] |= bit;
        self.boxes[b] |= bit;
    }

    fn unmark(&mut self, idx: usize, bit: u16) {
        let (r, c, b) = self.units(idx);
        self.rows[r] &= !bit;
        self.cols[c] &= !bit;
        self.boxes[b] &= !bit;
    }

    fn candidates(&self, idx: usize) -> u16 {
        let (r, c, b) = self.units(idx);
        let full = (1u16 << self.side) - 1;
        !(self.rows[r] | self.cols[c] | self.boxes[b]) & full
    }

    /// Blank cell with the fewest candidates; `Some((idx, 0))` means a dead end
    fn most_constrained(&self) -> Option<(usize, u16)> {
        let mut best: Option<(usize, u16)> = None;
        for idx in 0..self.cells.len() {
            if self.cells[idx] != 0 {
                continue;
            }
            let cands = self.candidates(idx);
            if cands == 0 {
                return Some((idx, 0));
            }
            match best {
                Some((_, b)) if b.count_ones() <= cands.count_ones() => {}
                _ => best = Some((idx, cands)),
            }
        }
        best
    }

    fn search(
        &mut self,
        moves: &mut Vec<Move>,
        nodes: &mut u64,
        token: &CancelToken,
    ) -> Result<bool, MinerError> {
        *nodes += 1;
        if *nodes % CANCEL_CHECK_INTERVAL == 0 && token.is_cancelled() {
            return Err(MinerError::SearchCancelled);
        }

        let Some((idx, cands)) = self.most_constrained() else {
            return Ok(true);
        };

        for v in 1..=self.side as u8 {
            let bit = 1u16 << (v - 1);
            if cands & bit == 0 {
                continue;
            }
            self.cells[idx] = v;
            self.mark(idx, bit);
            moves.push(Move {
                row: idx / self.side + 1,
                col: idx % self.side + 1,
                num: v,
            });

            if self.search(moves, nodes, token)? {
                return Ok(true);
            }

            moves.pop();
            self.unmark(idx, bit);
            self.cells[idx] = 0;
        }
        Ok(false)
    }
}
