//! # Contract Host
//!
//! A minimal execution substrate for forwarded calls. The host keeps a
//! registry of deployed contracts and the native balances of plain accounts,
//! and routes every call synchronously to completion.
//!
//! While a contract is running it is checked out of the registry, so a
//! nested call that would land on it again fails with
//! [`CallError::Reentrant`]. Contracts that need to call themselves (the
//! vault executing a self-targeted proposal) do so internally rather than
//! through the host.
//!
//! This rule is stricter than a flag check inside the callee. A target that
//! calls back into the contract that called it is always rejected, even for
//! a plain value refund, so the vault's own `AlreadyExecuted` guard is only
//! ever reached through its internal self-call path.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use custodia_protocol::amount::{self, Amount};
use custodia_protocol::{Address, CallError, Contract, Dispatcher, ErrorKind};

/// Errors from host administration (not from calls).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// Contracts cannot live at the null account.
    #[error("cannot deploy at the zero address")]
    ZeroAddress,

    /// Something is already deployed at this address.
    #[error("address {0} already hosts a contract")]
    AddressInUse(Address),

    /// Contracts hold their own native value; the host only funds plain accounts.
    #[error("address {0} is a contract and cannot be funded directly")]
    FundContract(Address),

    /// Funding would overflow the account's native balance.
    #[error("native balance overflow for {0}")]
    Overflow(Address),
}

/// Registry of deployed contracts plus native balances of plain accounts.
#[derive(Default)]
pub struct Host {
    contracts: HashMap<Address, Box<dyn Contract>>,
    /// Contracts currently checked out for a call.
    active: HashSet<Address>,
    native: HashMap<Address, Amount>,
}

impl Host {
    /// Creates an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys `contract` at `address`.
    pub fn deploy<C: Contract>(&mut self, address: Address, contract: C) -> Result<(), HostError> {
        if address.is_zero() {
            return Err(HostError::ZeroAddress);
        }
        if self.contracts.contains_key(&address) || self.active.contains(&address) {
            return Err(HostError::AddressInUse(address));
        }
        self.contracts.insert(address, Box::new(contract));
        debug!(%address, "contract deployed");
        Ok(())
    }

    /// Typed read access to a deployed contract.
    pub fn contract<C: Contract>(&self, address: Address) -> Option<&C> {
        self.contracts
            .get(&address)
            .and_then(|c| c.as_any().downcast_ref::<C>())
    }

    /// Typed write access to a deployed contract.
    pub fn contract_mut<C: Contract>(&mut self, address: Address) -> Option<&mut C> {
        self.contracts
            .get_mut(&address)
            .and_then(|c| c.as_any_mut().downcast_mut::<C>())
    }

    /// Whether a contract is deployed at `address`.
    pub fn is_contract(&self, address: Address) -> bool {
        self.contracts.contains_key(&address) || self.active.contains(&address)
    }

    /// Credits native value to a plain account.
    pub fn fund(&mut self, account: Address, value: Amount) -> Result<(), HostError> {
        if self.is_contract(account) {
            return Err(HostError::FundContract(account));
        }
        let current = self.native.get(&account).copied().unwrap_or(0);
        let updated = amount::credit(current, value).map_err(|_| HostError::Overflow(account))?;
        self.native.insert(account, updated);
        Ok(())
    }

    /// Native value held by `account`, contract or not.
    pub fn native_balance(&self, account: Address) -> Amount {
        match self.contracts.get(&account) {
            Some(contract) => contract.native_balance(),
            None => self.native.get(&account).copied().unwrap_or(0),
        }
    }

    /// Entry point for a call made by a plain account.
    ///
    /// The attached value is taken from the caller's native balance and
    /// returned if the call fails.
    pub fn call(
        &mut self,
        caller: Address,
        target: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), CallError> {
        let available = self.native.get(&caller).copied().unwrap_or(0);
        let remaining = amount::debit(available, value).map_err(|_| {
            CallError::InsufficientValue {
                available,
                requested: value,
            }
        })?;
        self.native.insert(caller, remaining);

        let outcome = self.dispatch(caller, target, value, payload);
        if let Err(e) = &outcome {
            self.native.insert(caller, available);
            warn!(%caller, %target, error = %e, "call failed");
        }
        outcome
    }
}

impl Dispatcher for Host {
    fn dispatch(
        &mut self,
        caller: Address,
        target: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), CallError> {
        if self.active.contains(&target) {
            return Err(CallError::Reentrant { target });
        }

        let Some(mut contract) = self.contracts.remove(&target) else {
            if !payload.is_empty() {
                return Err(CallError::NoContract { target });
            }
            let current = self.native.get(&target).copied().unwrap_or(0);
            let updated = amount::credit(current, value).map_err(|e| CallError::Reverted {
                target,
                kind: ErrorKind::InvalidArgument,
                reason: e.to_string(),
            })?;
            self.native.insert(target, updated);
            debug!(%caller, %target, value, "native value transferred");
            return Ok(());
        };

        self.active.insert(target);
        let outcome = contract.invoke(self, caller, value, payload);
        self.active.remove(&target);
        self.contracts.insert(target, contract);

        debug!(%caller, %target, value, ok = outcome.is_ok(), "call dispatched");
        outcome
    }
}
