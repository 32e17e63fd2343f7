// src/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hex SHA-256 block identifier
pub type BlockHash = String;

/// Base64 SHA-256 of a participant's public key
pub type Address = String;

/// Hex SHA-256 of a transaction's unsigned fields
pub type TxId = String;

/// Role a simulated participant plays on the network
///
/// Every participant keeps a full client (key pair, block store, tip);
/// miners additionally run a mining engine on top of it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Wallet only: posts transactions and follows the chain
    #[default]
    Client,

    /// Wallet plus a mining engine searching for puzzle proofs
    Miner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Miner => write!(f, "miner"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "client" | "wallet" => Ok(Role::Client),
            "miner" => Ok(Role::Miner),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}
