//! Thread-safe handle to a [`Host`].
//!
//! Each call holds the host's lock for its whole duration, nested calls
//! included. All mutating operations on every hosted contract are therefore
//! serialized, and no thread ever observes a half-applied call.

use std::sync::Arc;

use parking_lot::Mutex;

use custodia_protocol::{Address, Amount, CallError, Contract};

use crate::host::{Host, HostError};

/// Cloneable, shareable handle to a single [`Host`].
#[derive(Clone, Default)]
pub struct SharedHost {
    inner: Arc<Mutex<Host>>,
}

impl SharedHost {
    /// Wraps an existing host.
    pub fn new(host: Host) -> Self {
        Self {
            inner: Arc::new(Mutex::new(host)),
        }
    }

    /// See [`Host::call`].
    pub fn call(
        &self,
        caller: Address,
        target: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), CallError> {
        self.inner.lock().call(caller, target, value, payload)
    }

    /// See [`Host::deploy`].
    pub fn deploy<C: Contract>(&self, address: Address, contract: C) -> Result<(), HostError> {
        self.inner.lock().deploy(address, contract)
    }

    /// See [`Host::fund`].
    pub fn fund(&self, account: Address, value: Amount) -> Result<(), HostError> {
        self.inner.lock().fund(account, value)
    }

    /// See [`Host::native_balance`].
    pub fn native_balance(&self, account: Address) -> Amount {
        self.inner.lock().native_balance(account)
    }

    /// Runs `f` against a hosted contract under the lock.
    ///
    /// Returns `None` if nothing of type `C` lives at `address`.
    pub fn with_contract<C: Contract, R>(
        &self,
        address: Address,
        f: impl FnOnce(&C) -> R,
    ) -> Option<R> {
        let host = self.inner.lock();
        host.contract::<C>(address).map(f)
    }

    /// Runs `f` with exclusive access to the whole host.
    pub fn with_host<R>(&self, f: impl FnOnce(&mut Host) -> R) -> R {
        let mut host = self.inner.lock();
        f(&mut host)
    }
}
