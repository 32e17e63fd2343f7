// src/config/config.rs
use crate::puzzle::{DifficultyPolicy, codec::MAX_BASE};
use crate::types::Role;
use crate::utils::error::MinerError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Main configuration structure for a simulation run
///
/// Contains the deployment rules every participant shares, the
/// participants themselves and the transfers the driver schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Sudoku box size; the grid side is `base²`
    /// (default: 3)
    #[serde(default = "default_base")]
    pub base: usize,

    /// How long the simulation runs before shutdown (milliseconds)
    /// (default: 5000)
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    /// Interval between statistics log lines, 0 disables them
    /// (default: 5)
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,

    /// Difficulty thresholds and blank factors
    #[serde(default)]
    pub difficulty: DifficultyPolicy,

    /// Simulated participants
    #[serde(default = "default_participants")]
    pub participants: Vec<ParticipantConfig>,

    /// Payments the driver requests during the run
    #[serde(default = "default_transfers")]
    pub transfers: Vec<TransferConfig>,
}

/// One simulated participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantConfig {
    /// Unique display name
    pub name: String,

    /// Wallet ("client") or miner
    #[serde(default)]
    pub role: Role,

    /// Simulated solve time per blank cell; lower means more mining power
    /// (default: 2)
    #[serde(default = "default_ms_per_blank")]
    pub ms_per_blank: u64,

    /// Delay before the participant joins the network (milliseconds)
    #[serde(default)]
    pub join_after_ms: u64,
}

/// A scheduled payment between two participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Paying participant
    pub from: String,
    /// Receiving participant
    pub to: String,
    /// Amount paid
    pub amount: u64,
    /// Fee offered
    #[serde(default)]
    pub fee: u64,
    /// Time after start at which the payment is requested (milliseconds)
    #[serde(default)]
    pub at_ms: u64,
}

fn default_base() -> usize {
    3
}

fn default_duration_ms() -> u64 {
    5000
}

fn default_report_interval() -> u64 {
    5
}

fn default_ms_per_blank() -> u64 {
    2
}

fn participant(name: &str, role: Role, ms_per_blank: u64, join_after_ms: u64) -> ParticipantConfig {
    ParticipantConfig {
        name: name.into(),
        role,
        ms_per_blank,
        join_after_ms,
    }
}

fn default_participants() -> Vec<ParticipantConfig> {
    vec![
        participant("Alice", Role::Client, 0, 0),
        participant("Bob", Role::Client, 0, 0),
        participant("Charlie", Role::Client, 0, 0),
        participant("Minnie", Role::Miner, 2, 0),
        participant("Mickey", Role::Miner, 3, 0),
        participant("Donald", Role::Miner, 2, 1000),
    ]
}

fn default_transfers() -> Vec<TransferConfig> {
    vec![
        TransferConfig {
            from: "Alice".into(),
            to: "Bob".into(),
            amount: 40,
            fee: 1,
            at_ms: 200,
        },
        TransferConfig {
            from: "Alice".into(),
            to: "Charlie".into(),
            amount: 30,
            fee: 1,
            at_ms: 400,
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base: default_base(),
            duration_ms: default_duration_ms(),
            report_interval_secs: default_report_interval(),
            difficulty: DifficultyPolicy::default(),
            participants: default_participants(),
            transfers: default_transfers(),
        }
    }
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded and validated configuration
    /// * `Err(MinerError)` - If file couldn't be read, parsed or validated
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::parse(&config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from TOML text without validating it
    pub fn parse(text: &str) -> Result<Self, MinerError> {
        toml::from_str(text)
            .map_err(|e| MinerError::ConfigError(format!("Invalid config format: {}", e)))
    }

    /// Checks cross-field constraints
    ///
    /// # Errors
    /// `MinerError::ConfigError` describing the first violation found
    pub fn validate(&self) -> Result<(), MinerError> {
        if !(2..=MAX_BASE).contains(&self.base) {
            return Err(MinerError::ConfigError(format!(
                "base must be between 2 and {}, got {}",
                MAX_BASE, self.base
            )));
        }
        self.difficulty.validate()?;

        let mut names = HashSet::new();
        for p in &self.participants {
            if p.name.is_empty() {
                return Err(MinerError::ConfigError("participant without a name".into()));
            }
            if !names.insert(p.name.as_str()) {
                return Err(MinerError::ConfigError(format!(
                    "duplicate participant name: {}",
                    p.name
                )));
            }
        }
        if !self.participants.iter().any(|p| p.role == Role::Miner) {
            return Err(MinerError::ConfigError("at least one miner is required".into()));
        }

        for t in &self.transfers {
            for name in [&t.from, &t.to] {
                if !names.contains(name.as_str()) {
                    return Err(MinerError::ConfigError(format!(
                        "transfer references unknown participant: {}",
                        name
                    )));
                }
            }
            if t.amount == 0 {
                return Err(MinerError::ConfigError(format!(
                    "transfer from {} to {} has a zero amount",
                    t.from, t.to
                )));
            }
        }

        Ok(())
    }

    /// Generates a configuration template string
    ///
    /// # Arguments
    /// * `late_joiner` - Include a miner that joins after the start
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template(late_joiner: bool) -> String {
        let mut template = String::new();
        template.push_str("# Sudoku Miner Simulation Configuration\n\n");
        template.push_str("# Sudoku box size (grid side = base * base), 2 or 3\n");
        template.push_str("base = 3\n");
        template.push_str("# Simulation length in milliseconds\n");
        template.push_str("duration_ms = 5000\n");
        template.push_str("# Seconds between statistics lines (0 = off)\n");
        template.push_str("report_interval_secs = 5\n\n");

        template.push_str("# Blank factor chosen from the parent's solve time\n");
        template.push_str("[difficulty]\n");
        template.push_str("fast_threshold_ms = 60\n");
        template.push_str("slow_threshold_ms = 100\n");
        template.push_str("default_emptiness = 0.5\n");
        template.push_str("fast_emptiness = 0.75\n");
        template.push_str("slow_emptiness = 0.25\n\n");

        for (name, role, ms) in [
            ("Alice", "client", None),
            ("Bob", "client", None),
            ("Minnie", "miner", Some(2)),
            ("Mickey", "miner", Some(3)),
        ] {
            template.push_str("[[participants]]\n");
            template.push_str(&format!("name = \"{}\"\nrole = \"{}\"\n", name, role));
            if let Some(ms) = ms {
                template.push_str(&format!("ms_per_blank = {}\n", ms));
            }
            template.push('\n');
        }

        if late_joiner {
            template.push_str("# Joins the network after one second\n");
            template.push_str("[[participants]]\n");
            template.push_str("name = \"Donald\"\nrole = \"miner\"\n");
            template.push_str("ms_per_blank = 2\njoin_after_ms = 1000\n\n");
        }

        template.push_str("[[transfers]]\n");
        template.push_str("from = \"Alice\"\nto = \"Bob\"\namount = 40\nfee = 1\nat_ms = 200\n");

        template
    }
}
