// src/config/mod.rs
//! Configuration management for the simulation
//!
//! This module handles all configuration-related functionality including:
//! - Loading, parsing and validating configuration files
//! - Generating configuration templates
//! - Participant and scheduled transfer settings
//!
//! The configuration uses TOML format; every field has a default, so an
//! empty file describes the stock six-participant simulation.

/// Core configuration implementation
///
/// Contains the [`Config`] struct and related types that define
/// the simulated network and its deployment rules.
pub mod config;

// Re-export key items for easy access
pub use config::{Config, ParticipantConfig, TransferConfig};

use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Loads and validates configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the configuration file (anything convertible to PathBuf)
///
/// # Returns
/// * `Ok(Config)` - Successfully loaded configuration
/// * `Err(MinerError)` - If the file couldn't be read, parsed or validated
pub fn load(path: impl Into<PathBuf>) -> Result<Config, MinerError> {
    Config::load(path)
}

/// Generates a commented configuration template
///
/// # Arguments
/// * `late_joiner` - Whether to include a miner joining after the start
///
/// # Returns
/// String containing a ready-to-use TOML configuration template
pub fn generate_template(late_joiner: bool) -> String {
    Config::generate_template(late_joiner)
}
