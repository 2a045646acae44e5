//! Per-instance contract configuration.
//!
//! Both structs deserialize from JSON so a deployment harness can keep them
//! next to its other settings. Validation here mirrors the checks the
//! contract constructors perform, letting a harness fail before it deploys
//! anything.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use custodia_protocol::config::{
    DEFAULT_DECIMALS, DEFAULT_TOKEN_NAME, DEFAULT_TOKEN_SYMBOL, MAX_OWNERS, MIN_THRESHOLD,
};
use custodia_protocol::Address;

/// Largest decimal precision a `u128` amount can meaningfully carry.
const MAX_DECIMALS: u8 = 38;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required text field is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// The decimal precision is too large.
    #[error("decimals {got} exceeds the maximum of {max}")]
    Decimals {
        /// Configured value.
        got: u8,
        /// Largest accepted value.
        max: u8,
    },

    /// The owner list is empty or too long.
    #[error("owner count {got} outside 1..={max}")]
    OwnerCount {
        /// Configured owner count.
        got: usize,
        /// Largest accepted count.
        max: usize,
    },

    /// An owner is the null account.
    #[error("owner list contains the zero address")]
    ZeroOwner,

    /// An owner appears twice.
    #[error("duplicate owner {0}")]
    DuplicateOwner(Address),

    /// The threshold is zero or larger than the owner count.
    #[error("threshold {threshold} outside 1..={owners}")]
    Threshold {
        /// Configured threshold.
        threshold: u32,
        /// Configured owner count.
        owners: usize,
    },
}

/// Token metadata for a [`RegulatedLedger`](crate::regulated_ledger::RegulatedLedger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Human-readable token name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Number of decimal places.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_TOKEN_NAME.to_string(),
            symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            decimals: DEFAULT_DECIMALS,
        }
    }
}

impl LedgerConfig {
    /// Parses and validates a JSON document.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the metadata is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Empty("name"));
        }
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Empty("symbol"));
        }
        if self.decimals > MAX_DECIMALS {
            return Err(ConfigError::Decimals {
                got: self.decimals,
                max: MAX_DECIMALS,
            });
        }
        Ok(())
    }
}

/// Owner set and quorum for an [`AuthorizationVault`](crate::authorization_vault::AuthorizationVault).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Initial owners, in order.
    pub owners: Vec<Address>,
    /// Confirmations required to execute a proposal.
    pub threshold: u32,
}

impl VaultConfig {
    /// Parses and validates a JSON document.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the owner set and threshold satisfy the vault invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owners.is_empty() || self.owners.len() > MAX_OWNERS {
            return Err(ConfigError::OwnerCount {
                got: self.owners.len(),
                max: MAX_OWNERS,
            });
        }
        let mut seen = HashSet::with_capacity(self.owners.len());
        for owner in &self.owners {
            if owner.is_zero() {
                return Err(ConfigError::ZeroOwner);
            }
            if !seen.insert(*owner) {
                return Err(ConfigError::DuplicateOwner(*owner));
            }
        }
        if self.threshold < MIN_THRESHOLD || self.threshold as usize > self.owners.len() {
            return Err(ConfigError::Threshold {
                threshold: self.threshold,
                owners: self.owners.len(),
            });
        }
        Ok(())
    }
}
