//! Checked amount arithmetic.
//!
//! Every balance, allowance, and supply figure is an unsigned [`Amount`].
//! Credits use checked addition. Debits compare first and only subtract
//! once the comparison has passed, so wraparound can never surface.

use thiserror::Error;

/// Token and native-value quantities, in the smallest unit.
pub type Amount = u128;

/// Allowance sentinel meaning "no cap". Spending never decrements it.
pub const UNLIMITED: Amount = Amount::MAX;

/// Errors produced by the arithmetic helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    /// Addition would exceed [`Amount::MAX`].
    #[error("amount overflow: {current} + {credit} exceeds the representable maximum")]
    Overflow {
        /// Value before the failed credit.
        current: Amount,
        /// Amount that caused the overflow.
        credit: Amount,
    },

    /// Subtraction would go below zero.
    #[error("amount underflow: available {available}, requested {requested}")]
    Underflow {
        /// Value before the failed debit.
        available: Amount,
        /// Amount that was requested.
        requested: Amount,
    },
}

/// Adds `amount` to `current`.
pub fn credit(current: Amount, amount: Amount) -> Result<Amount, ArithmeticError> {
    current.checked_add(amount).ok_or(ArithmeticError::Overflow {
        current,
        credit: amount,
    })
}

/// Subtracts `amount` from `current`.
pub fn debit(current: Amount, amount: Amount) -> Result<Amount, ArithmeticError> {
    if current < amount {
        return Err(ArithmeticError::Underflow {
            available: current,
            requested: amount,
        });
    }
    // Sufficiency was established above.
    Ok(current - amount)
}
