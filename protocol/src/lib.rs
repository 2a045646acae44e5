// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Custodia Protocol
//!
//! The pieces every Custodia contract is built from. Nothing in this crate
//! knows about vaults or tokens; it only knows how accounts are named, how
//! amounts move without wrapping, how history is recorded, and how one
//! contract hands a call to another.
//!
//! ## Modules
//!
//! - **address**: 20-byte account identifiers and the null account.
//! - **amount**: Checked credit/debit helpers and the unlimited sentinel.
//! - **events**: Append-only audit logs mirrored to `tracing`.
//! - **error**: The coarse error taxonomy every contract maps onto.
//! - **call**: The `Contract` / `Dispatcher` seam for forwarded calls.
//! - **config**: Fixed protocol parameters.
//! - **logging**: Subscriber setup for binaries and tests.
//!
//! ## Design Philosophy
//!
//! 1. A failed call leaves no trace: no state change, no event.
//! 2. Arithmetic never wraps. Debits compare before they subtract.
//! 3. Every instance owns its state. Nothing here is global.

pub mod address;
pub mod amount;
pub mod call;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use address::{Address, AddressError};
pub use amount::{Amount, ArithmeticError, UNLIMITED};
pub use call::{CallError, Contract, Dispatcher};
pub use error::ErrorKind;
pub use events::{EventLog, EventRecord};
