//! # Protocol Constants
//!
//! Every fixed parameter the contracts share lives here. Contract-level
//! settings (token metadata, owner sets, thresholds) are configured per
//! instance in the contracts crate; these are the values that stay the same
//! across every deployment.

// ---------------------------------------------------------------------------
// Token Defaults
// ---------------------------------------------------------------------------

/// Default decimal precision for ledger tokens.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Default token name when a ledger is created without explicit metadata.
pub const DEFAULT_TOKEN_NAME: &str = "Custodia Dollar";

/// Default ticker symbol.
pub const DEFAULT_TOKEN_SYMBOL: &str = "CUSD";

// ---------------------------------------------------------------------------
// Vault Limits
// ---------------------------------------------------------------------------

/// Upper bound on the owner set. Owner removal and confirmation listing
/// walk the whole set.
pub const MAX_OWNERS: usize = 50;

/// Smallest permissible confirmation threshold.
pub const MIN_THRESHOLD: u32 = 1;

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// `tracing` target for audit event records.
pub const AUDIT_LOG_TARGET: &str = "custodia::audit";

/// Default log directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";
