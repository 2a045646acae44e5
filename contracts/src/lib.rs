// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Custodia Contracts
//!
//! Two independent, access-controlled ledgers that compose through a single
//! capability: the vault can hold the ledger's administrator role.
//!
//! - **Authorization Vault**: N-of-M owner approval of arbitrary forwarded
//!   calls. Proposals are submitted, confirmed, and executed once quorum is
//!   met; execution is all-or-nothing.
//! - **Regulated Ledger**: a pausable token ledger with a single
//!   administrator who can mint, burn on behalf, blacklist, pause, and hand
//!   the role on.
//! - **Host**: the synchronous substrate that routes forwarded calls
//!   between deployed contracts, with a mutex-guarded shared handle for
//!   multi-threaded embedders.
//!
//! ## Design Principles
//!
//! 1. All monetary operations are checked. Debits compare before they
//!    subtract.
//! 2. Every guard runs before the first write, so a rejected call changes
//!    nothing and emits nothing.
//! 3. The caller is always explicit. Contracts never read ambient identity.
//! 4. Contract state and events are serializable (serde) for snapshots and
//!    indexers.

pub mod authorization_vault;
pub mod config;
pub mod host;
pub mod regulated_ledger;
pub mod shared;

pub use authorization_vault::{
    AuthorizationVault, Proposal, ProposalId, ProposalStatus, VaultCall, VaultError, VaultEvent,
};
pub use config::{ConfigError, LedgerConfig, VaultConfig};
pub use host::{Host, HostError};
pub use regulated_ledger::{LedgerCall, LedgerError, LedgerEvent, RegulatedLedger, TokenMetadata};
pub use shared::SharedHost;
