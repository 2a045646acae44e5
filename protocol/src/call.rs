//! # Call Substrate
//!
//! Contracts talk to each other only through forwarded calls: a caller
//! address, a target address, an amount of native value, and an opaque
//! payload that only the target knows how to interpret.
//!
//! - A [`Dispatcher`] routes a call to whatever lives at the target.
//! - A [`Contract`] receives a call, decodes the payload, and runs the
//!   named operation with the forwarded caller as its authenticated actor.
//!
//! The dispatcher is passed back into [`Contract::invoke`] so a contract can
//! make nested calls of its own. Nested calls are synchronous; nothing here
//! schedules or interleaves work.

use std::any::Any;

use thiserror::Error;

use crate::address::Address;
use crate::amount::Amount;
use crate::error::ErrorKind;

/// Reasons a forwarded call can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// A payload was sent to an address with no contract behind it.
    #[error("no contract deployed at {target}")]
    NoContract {
        /// The address that was called.
        target: Address,
    },

    /// The target is already executing further up the call stack.
    #[error("reentrant call into {target} rejected")]
    Reentrant {
        /// The contract that was re-entered.
        target: Address,
    },

    /// Native value was sent to a contract that does not accept it.
    #[error("contract {target} does not accept native value")]
    NotPayable {
        /// The contract that refused the value.
        target: Address,
    },

    /// The payload could not be decoded by the target.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The sender cannot cover the native value attached to the call.
    #[error("insufficient native value: available {available}, requested {requested}")]
    InsufficientValue {
        /// Native balance of the sender.
        available: Amount,
        /// Value attached to the call.
        requested: Amount,
    },

    /// The target ran the operation and rejected it.
    #[error("call to {target} reverted ({kind}): {reason}")]
    Reverted {
        /// The contract that rejected the call.
        target: Address,
        /// Category of the rejection.
        kind: ErrorKind,
        /// Rendered error from the target.
        reason: String,
    },
}

/// Routes a forwarded call to its target.
pub trait Dispatcher {
    /// Delivers `(value, payload)` from `caller` to `target`.
    ///
    /// Either the whole call takes effect or none of it does.
    fn dispatch(
        &mut self,
        caller: Address,
        target: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), CallError>;
}

/// A contract instance that can be the target of a forwarded call.
pub trait Contract: Any + Send {
    /// Runs the operation encoded in `payload` on behalf of `caller`.
    ///
    /// `env` routes any nested calls the operation makes.
    fn invoke(
        &mut self,
        env: &mut dyn Dispatcher,
        caller: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), CallError>;

    /// Native value held by the contract.
    fn native_balance(&self) -> Amount {
        0
    }

    /// Upcast for typed read access.
    fn as_any(&self) -> &dyn Any;

    /// Upcast for typed write access.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
