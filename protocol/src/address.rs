//! # Account Addresses
//!
//! An [`Address`] identifies every participant the contracts know about:
//! vault owners, ledger holders, the administrator, and the contracts
//! themselves. It is a plain 20-byte identifier rendered as `0x`-prefixed
//! lowercase hex.
//!
//! The all-zero address is the null account. It can never hold a role,
//! appear in an owner set, or receive tokens directly; mints and burns are
//! recorded as transfers from and to it.
//!
//! ```text
//! label ("alice")
//!     -> BLAKE3(label) -> 32 bytes
//!     -> first 20 bytes -> 0x5c1f...
//! ```
//!
//! Derivation from a label exists so harnesses and tests can name stable
//! identities without managing key material.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of bytes in an address.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while parsing or validating an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The string contained non-hex characters.
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    /// The decoded address has an unexpected length.
    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected number of bytes.
        expected: usize,
        /// Actual number of bytes.
        got: usize,
    },

    /// The null account was supplied where a real account is required.
    #[error("the zero address is not a valid account here")]
    Zero,
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The null account.
    pub const ZERO: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw bytes as an address.
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derives a deterministic address from a human-readable label.
    ///
    /// The same label always yields the same address, and distinct labels
    /// collide only if BLAKE3 does.
    pub fn derive(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&digest.as_bytes()[..ADDRESS_LENGTH]);
        Self(bytes)
    }

    /// Parses a hex address, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, AddressError> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(trimmed).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        if raw.len() != ADDRESS_LENGTH {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_LENGTH,
                got: raw.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }

    /// Renders the address as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Returns `true` for the null account.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LENGTH]
    }

    /// Rejects the null account.
    pub fn ensure_nonzero(&self) -> Result<(), AddressError> {
        if self.is_zero() {
            return Err(AddressError::Zero);
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Address::from_hex(&s).map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            if bytes.len() != ADDRESS_LENGTH {
                return Err(serde::de::Error::custom(format!(
                    "expected {ADDRESS_LENGTH}-byte address, got {}",
                    bytes.len()
                )));
            }
            let mut raw = [0u8; ADDRESS_LENGTH];
            raw.copy_from_slice(&bytes);
            Ok(Address(raw))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        assert_eq!(Address::derive("alice"), Address::derive("alice"));
        assert_ne!(Address::derive("alice"), Address::derive("bob"));
        assert!(!Address::derive("alice").is_zero());
    }

    #[test]
    fn hex_roundtrip_with_and_without_prefix() {
        let addr = Address::derive("vault");
        let rendered = addr.to_hex();
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 42);
        assert_eq!(Address::from_hex(&rendered).unwrap(), addr);
        assert_eq!(Address::from_hex(&rendered[2..]).unwrap(), addr);
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(
            Address::from_hex("0xzz"),
            Err(AddressError::InvalidHex(_))
        ));
        assert_eq!(
            Address::from_hex("0x0102"),
            Err(AddressError::InvalidLength {
                expected: 20,
                got: 2
            })
        );
    }

    #[test]
    fn zero_address_is_rejected() {
        assert!(Address::ZERO.is_zero());
        assert_eq!(Address::ZERO.ensure_nonzero(), Err(AddressError::Zero));
        assert!(Address::derive("x").ensure_nonzero().is_ok());
    }

    #[test]
    fn json_serializes_as_hex_string() {
        let addr = Address::derive("carol");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
