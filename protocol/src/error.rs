//! Error taxonomy shared by every contract.
//!
//! Each contract keeps its own detailed error enum. [`ErrorKind`] is the
//! coarse classification callers match on when they only care about the
//! category of a rejection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a rejected call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The caller lacks the required role, ownership, or standing.
    Unauthorized,
    /// An index or account reference does not exist.
    NotFound,
    /// The target is not in a state that permits the call.
    InvalidState,
    /// An argument is malformed, self-referential, or out of range.
    InvalidArgument,
    /// A balance or allowance does not cover the requested amount.
    InsufficientFunds,
    /// A forwarded call reported failure.
    CallFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Unauthorized => write!(f, "Unauthorized"),
            ErrorKind::NotFound => write!(f, "NotFound"),
            ErrorKind::InvalidState => write!(f, "InvalidState"),
            ErrorKind::InvalidArgument => write!(f, "InvalidArgument"),
            ErrorKind::InsufficientFunds => write!(f, "InsufficientFunds"),
            ErrorKind::CallFailed => write!(f, "CallFailed"),
        }
    }
}
