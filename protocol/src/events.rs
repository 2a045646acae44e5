//! # Audit Events
//!
//! Every successful state-changing call appends one or more events to the
//! emitting contract's [`EventLog`]. The log is the only externally
//! observable history of a contract, so two rules hold throughout the
//! codebase:
//!
//! 1. Events are emitted only after every guard of the call has passed.
//! 2. A rejected call appends nothing.
//!
//! Each record is also written to `tracing` at `info` level under the
//! [`AUDIT_LOG_TARGET`](crate::config::AUDIT_LOG_TARGET) target, so an
//! operator gets the same stream from the process logs.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::address::Address;
use crate::config::AUDIT_LOG_TARGET;

/// A single entry in an [`EventLog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord<E> {
    /// Position in the log, starting at zero. Dense and strictly increasing.
    pub sequence: u64,
    /// Address of the contract that emitted the event.
    pub emitter: Address,
    /// Wall-clock time the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    pub event: E,
}

/// Append-only audit log owned by a single contract instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog<E> {
    emitter: Address,
    records: Vec<EventRecord<E>>,
}

impl<E: Debug> EventLog<E> {
    /// Creates an empty log for the contract at `emitter`.
    pub fn new(emitter: Address) -> Self {
        Self {
            emitter,
            records: Vec::new(),
        }
    }

    /// Appends an event and mirrors it to the tracing subscriber.
    pub fn emit(&mut self, event: E) {
        let sequence = self.records.len() as u64;
        info!(
            target: AUDIT_LOG_TARGET,
            emitter = %self.emitter,
            sequence,
            event = ?event,
            "audit event"
        );
        self.records.push(EventRecord {
            sequence,
            emitter: self.emitter,
            timestamp: Utc::now(),
            event,
        });
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[EventRecord<E>] {
        &self.records
    }

    /// Iterates over event payloads, oldest first.
    pub fn events(&self) -> impl Iterator<Item = &E> {
        self.records.iter().map(|r| &r.event)
    }

    /// The most recent event, if any.
    pub fn last(&self) -> Option<&E> {
        self.records.last().map(|r| &r.event)
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been emitted yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Address of the emitting contract.
    pub fn emitter(&self) -> Address {
        self.emitter
    }
}

impl<E: Debug + Serialize> EventLog<E> {
    /// Renders the log as a JSON array for off-ledger indexers.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.records)
    }
}
