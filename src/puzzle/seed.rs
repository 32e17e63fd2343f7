// src/puzzle/seed.rs
//! Puzzle seeds derived from the parent block hash.

/// Seed used for the block built directly on genesis
pub const GENESIS_SEED: u64 = 0;

/// Seeds are folded into `1..=SEED_MODULUS`
pub const SEED_MODULUS: u64 = 100_000;

/// `(uint(hash) mod 100000) + 1` over a hex block hash.
///
/// Non-hex characters are skipped, so any string maps to some seed; block
/// hashes produced by this crate are always plain lowercase hex.
pub fn seed_from_hash(hash: &str) -> u64 {
    let rem = hash
        .trim_start_matches("0x")
        .chars()
        .filter_map(|ch| ch.to_digit(16))
        .fold(0u64, |acc, d| (acc * 16 + d as u64) % SEED_MODULUS);
    rem + 1
}
