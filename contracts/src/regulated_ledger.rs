//! # Regulated Ledger Contract
//!
//! A fungible token ledger with a single privileged administrator (the
//! "governor"). Holders move value with the familiar transfer / approve /
//! transfer-from trio; the administrator can mint, burn on behalf of any
//! holder, blacklist accounts, pause all value movement, and hand the role
//! to someone else.
//!
//! ## Guard Order
//!
//! Value-moving calls check their guards in a fixed order so the reported
//! error is deterministic when several would fail at once:
//!
//! 1. pause flag
//! 2. sender blacklist
//! 3. counterparty blacklist
//! 4. zero-address arguments
//! 5. balance / allowance sufficiency
//!
//! Administrator calls check authorization first and then validate their
//! arguments. They are *not* gated by the pause flag, so the administrator
//! can still remediate (blacklist, burn, rotate the role) while transfers
//! are frozen.
//!
//! ## Supply Invariant
//!
//! The sum of all balances always equals `total_supply`. Mints are recorded
//! as transfers from the null account and burns as transfers to it, so an
//! indexer replaying `Transfer` events reconstructs every balance.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use custodia_protocol::amount::{self, Amount, UNLIMITED};
use custodia_protocol::{Address, CallError, Contract, Dispatcher, ErrorKind, EventLog};

use crate::config::LedgerConfig;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The caller is not the administrator.
    #[error("unauthorized: {caller} is not the administrator")]
    Unauthorized {
        /// The address that attempted the operation.
        caller: Address,
    },

    /// A party to a value-moving call is blacklisted.
    #[error("account {account} is blacklisted")]
    Blacklisted {
        /// The blacklisted party.
        account: Address,
    },

    /// Value movement is paused.
    #[error("ledger is paused")]
    Paused,

    /// `pause` was called while already paused.
    #[error("ledger is already paused")]
    AlreadyPaused,

    /// `unpause` was called while not paused.
    #[error("ledger is not paused")]
    NotPaused,

    /// The account is already blacklisted.
    #[error("account {account} is already blacklisted")]
    AlreadyBlacklisted {
        /// The account in question.
        account: Address,
    },

    /// The account is not blacklisted.
    #[error("account {account} is not blacklisted")]
    NotBlacklisted {
        /// The account in question.
        account: Address,
    },

    /// The null account was passed where a real account is required.
    #[error("the zero address is not a valid {role}")]
    ZeroAddress {
        /// What the argument was for (e.g. "recipient").
        role: &'static str,
    },

    /// The proposed administrator already holds the role.
    #[error("{administrator} is already the administrator")]
    SameAdministrator {
        /// The current administrator.
        administrator: Address,
    },

    /// The proposed administrator is blacklisted and must be cleared first.
    #[error("cannot hand the administrator role to blacklisted account {candidate}")]
    BlacklistedAdministrator {
        /// The rejected candidate.
        candidate: Address,
    },

    /// The account balance does not cover the amount.
    #[error("insufficient balance: {account} has {balance}, requested {requested}")]
    InsufficientBalance {
        /// The account being debited.
        account: Address,
        /// Its current balance.
        balance: Amount,
        /// The amount requested.
        requested: Amount,
    },

    /// The spender's allowance does not cover the amount.
    #[error(
        "insufficient allowance: {spender} may spend {allowance} of {owner}'s tokens, requested {requested}"
    )]
    InsufficientAllowance {
        /// The token holder.
        owner: Address,
        /// The spender.
        spender: Address,
        /// The spender's current allowance.
        allowance: Amount,
        /// The amount requested.
        requested: Amount,
    },

    /// Minting would push the total supply past the representable maximum.
    #[error("supply overflow: minting {amount} would exceed the representable maximum")]
    SupplyOverflow {
        /// The amount that was attempted.
        amount: Amount,
    },
}

impl LedgerError {
    /// Coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Unauthorized { .. } | LedgerError::Blacklisted { .. } => {
                ErrorKind::Unauthorized
            }
            LedgerError::Paused
            | LedgerError::AlreadyPaused
            | LedgerError::NotPaused
            | LedgerError::AlreadyBlacklisted { .. }
            | LedgerError::NotBlacklisted { .. } => ErrorKind::InvalidState,
            LedgerError::ZeroAddress { .. }
            | LedgerError::SameAdministrator { .. }
            | LedgerError::BlacklistedAdministrator { .. }
            | LedgerError::SupplyOverflow { .. } => ErrorKind::InvalidArgument,
            LedgerError::InsufficientBalance { .. } | LedgerError::InsufficientAllowance { .. } => {
                ErrorKind::InsufficientFunds
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Audit events emitted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Tokens moved between accounts. `from` is zero for mints, `to` is zero for burns.
    Transfer {
        /// Debited account.
        from: Address,
        /// Credited account.
        to: Address,
        /// Amount moved.
        amount: Amount,
    },
    /// An allowance was set.
    Approval {
        /// Token holder.
        owner: Address,
        /// Authorized spender.
        spender: Address,
        /// New absolute allowance.
        amount: Amount,
    },
    /// New supply was created.
    Mint {
        /// Recipient of the new tokens.
        to: Address,
        /// Amount created.
        amount: Amount,
    },
    /// Supply was destroyed.
    Burn {
        /// Account the tokens were burned from.
        from: Address,
        /// Amount destroyed.
        amount: Amount,
    },
    /// An account was added to the blacklist.
    Blacklisted {
        /// The blacklisted account.
        account: Address,
    },
    /// An account was removed from the blacklist.
    UnBlacklisted {
        /// The cleared account.
        account: Address,
    },
    /// Value movement was paused.
    Paused {
        /// The administrator who paused.
        by: Address,
    },
    /// Value movement was resumed.
    Unpaused {
        /// The administrator who unpaused.
        by: Address,
    },
    /// The administrator role changed hands.
    AdministratorChanged {
        /// Outgoing administrator.
        previous: Address,
        /// Incoming administrator.
        current: Address,
    },
}

// ---------------------------------------------------------------------------
// Call payloads
// ---------------------------------------------------------------------------

/// A ledger operation encoded for delivery through a forwarded call.
///
/// This is what a vault proposal carries as its payload when it targets a
/// ledger. The forwarded caller becomes the operation's actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCall {
    /// [`RegulatedLedger::transfer`].
    Transfer { to: Address, amount: Amount },
    /// [`RegulatedLedger::approve`].
    Approve { spender: Address, amount: Amount },
    /// [`RegulatedLedger::transfer_from`].
    TransferFrom {
        from: Address,
        to: Address,
        amount: Amount,
    },
    /// [`RegulatedLedger::mint`].
    Mint { to: Address, amount: Amount },
    /// [`RegulatedLedger::burn`].
    Burn { amount: Amount },
    /// [`RegulatedLedger::burn_from`].
    BurnFrom { account: Address, amount: Amount },
    /// [`RegulatedLedger::blacklist`].
    Blacklist { account: Address },
    /// [`RegulatedLedger::un_blacklist`].
    UnBlacklist { account: Address },
    /// [`RegulatedLedger::pause`].
    Pause,
    /// [`RegulatedLedger::unpause`].
    Unpause,
    /// [`RegulatedLedger::set_administrator`].
    SetAdministrator { new_administrator: Address },
}

impl LedgerCall {
    /// Encodes the call as an opaque payload.
    pub fn encode(&self) -> Result<Vec<u8>, CallError> {
        bincode::serialize(self).map_err(|e| CallError::MalformedPayload(e.to_string()))
    }

    /// Decodes a payload produced by [`encode`](Self::encode).
    pub fn decode(payload: &[u8]) -> Result<Self, CallError> {
        bincode::deserialize(payload).map_err(|e| CallError::MalformedPayload(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Fixed token metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Human-readable token name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Number of decimal places.
    pub decimals: u8,
}

/// A regulated, pausable token ledger.
///
/// Each instance owns its balances, allowances, blacklist, and audit log;
/// two ledgers never share storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatedLedger {
    /// Address the ledger is deployed at.
    address: Address,
    /// Name, symbol, decimals.
    metadata: TokenMetadata,
    /// The single account allowed to run administrator operations.
    administrator: Address,
    /// When set, transfer / approve / transfer-from are rejected.
    paused: bool,
    /// Sum of all balances.
    total_supply: Amount,
    /// Non-zero balances only.
    balances: HashMap<Address, Amount>,
    /// `owner -> spender -> allowance`.
    allowances: HashMap<Address, HashMap<Address, Amount>>,
    /// Accounts barred from sending or receiving.
    blacklist: HashSet<Address>,
    /// Audit history.
    events: EventLog<LedgerEvent>,
}

impl RegulatedLedger {
    /// Creates an empty, unpaused ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroAddress`] if `address` or `administrator`
    /// is the null account.
    pub fn new(
        address: Address,
        config: LedgerConfig,
        administrator: Address,
    ) -> Result<Self, LedgerError> {
        nonzero(address, "ledger address")?;
        nonzero(administrator, "administrator")?;

        debug!(%address, %administrator, symbol = %config.symbol, "ledger created");

        Ok(Self {
            address,
            metadata: TokenMetadata {
                name: config.name,
                symbol: config.symbol,
                decimals: config.decimals,
            },
            administrator,
            paused: false,
            total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            blacklist: HashSet::new(),
            events: EventLog::new(address),
        })
    }

    // -- value movement -----------------------------------------------------

    /// Moves `amount` from `caller` to `to`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Paused`] while paused.
    /// - [`LedgerError::Blacklisted`] if `caller` or `to` is blacklisted.
    /// - [`LedgerError::ZeroAddress`] if `to` is the null account.
    /// - [`LedgerError::InsufficientBalance`] if `caller` holds less than `amount`.
    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.ensure_not_paused()?;
        self.ensure_not_blacklisted(caller)?;
        self.ensure_not_blacklisted(to)?;
        nonzero(to, "recipient")?;

        self.move_balance(caller, to, amount)?;

        debug!(from = %caller, %to, amount, "transfer");
        self.events.emit(LedgerEvent::Transfer {
            from: caller,
            to,
            amount,
        });
        Ok(())
    }

    /// Sets `spender`'s allowance over `caller`'s tokens to exactly `amount`.
    ///
    /// The new value replaces the old one outright. A spender watching for
    /// the change can spend the old allowance before it lands and then the
    /// new one after, so callers lowering a non-zero allowance should set it
    /// to zero first and confirm that took effect.
    ///
    /// Passing [`UNLIMITED`] grants an allowance that spending never
    /// decrements.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Paused`] while paused.
    /// - [`LedgerError::Blacklisted`] if `caller` or `spender` is blacklisted.
    /// - [`LedgerError::ZeroAddress`] if `spender` is the null account.
    pub fn approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.ensure_not_paused()?;
        self.ensure_not_blacklisted(caller)?;
        self.ensure_not_blacklisted(spender)?;
        nonzero(spender, "spender")?;

        self.set_allowance(caller, spender, amount);

        debug!(owner = %caller, %spender, amount, "approve");
        self.events.emit(LedgerEvent::Approval {
            owner: caller,
            spender,
            amount,
        });
        Ok(())
    }

    /// Moves `amount` from `from` to `to` using `caller`'s allowance.
    ///
    /// The allowance is reduced by `amount` unless it is [`UNLIMITED`].
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Paused`] while paused.
    /// - [`LedgerError::Blacklisted`] if `caller`, `from`, or `to` is blacklisted.
    /// - [`LedgerError::ZeroAddress`] if `from` or `to` is the null account.
    /// - [`LedgerError::InsufficientAllowance`] if the allowance is short.
    /// - [`LedgerError::InsufficientBalance`] if `from` holds less than `amount`.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.ensure_not_paused()?;
        self.ensure_not_blacklisted(caller)?;
        self.ensure_not_blacklisted(from)?;
        self.ensure_not_blacklisted(to)?;
        nonzero(from, "sender")?;
        nonzero(to, "recipient")?;

        let allowance = self.allowance(from, caller);
        let remaining = if allowance == UNLIMITED {
            UNLIMITED
        } else {
            amount::debit(allowance, amount).map_err(|_| LedgerError::InsufficientAllowance {
                owner: from,
                spender: caller,
                allowance,
                requested: amount,
            })?
        };

        // Balance is validated inside move_balance before anything is written,
        // so the allowance update below only happens if the move succeeded.
        self.move_balance(from, to, amount)?;
        if allowance != UNLIMITED {
            self.set_allowance(from, caller, remaining);
        }

        debug!(spender = %caller, %from, %to, amount, "transfer_from");
        self.events.emit(LedgerEvent::Transfer { from, to, amount });
        Ok(())
    }

    // -- administrator operations ------------------------------------------

    /// Creates `amount` new tokens for `to`.
    ///
    /// Allowed while paused.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the administrator.
    /// - [`LedgerError::ZeroAddress`] if `to` is the null account.
    /// - [`LedgerError::Blacklisted`] if `to` is blacklisted.
    /// - [`LedgerError::SupplyOverflow`] if the supply would overflow.
    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        self.ensure_administrator(caller)?;
        nonzero(to, "recipient")?;
        self.ensure_not_blacklisted(to)?;

        let new_supply = amount::credit(self.total_supply, amount)
            .map_err(|_| LedgerError::SupplyOverflow { amount })?;
        // Every balance is bounded by the supply, so this cannot overflow
        // once the supply credit succeeded.
        let new_balance = amount::credit(self.balance_of(to), amount)
            .map_err(|_| LedgerError::SupplyOverflow { amount })?;

        self.total_supply = new_supply;
        self.set_balance(to, new_balance);

        debug!(%to, amount, total_supply = self.total_supply, "mint");
        self.events.emit(LedgerEvent::Mint { to, amount });
        self.events.emit(LedgerEvent::Transfer {
            from: Address::ZERO,
            to,
            amount,
        });
        Ok(())
    }

    /// Burns `amount` of the administrator's own tokens.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the administrator.
    /// - [`LedgerError::InsufficientBalance`] if the administrator holds less than `amount`.
    pub fn burn(&mut self, caller: Address, amount: Amount) -> Result<(), LedgerError> {
        self.burn_from(caller, caller, amount)
    }

    /// Burns `amount` of `account`'s tokens on its behalf.
    ///
    /// Blacklisted accounts can be burned from; that is one of the
    /// remediation paths the administrator has.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the administrator.
    /// - [`LedgerError::ZeroAddress`] if `account` is the null account.
    /// - [`LedgerError::InsufficientBalance`] if `account` holds less than `amount`.
    pub fn burn_from(
        &mut self,
        caller: Address,
        account: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.ensure_administrator(caller)?;
        nonzero(account, "burn account")?;

        let balance = self.balance_of(account);
        let new_balance =
            amount::debit(balance, amount).map_err(|_| LedgerError::InsufficientBalance {
                account,
                balance,
                requested: amount,
            })?;

        self.set_balance(account, new_balance);
        // Supply is at least any single balance.
        self.total_supply -= amount;

        debug!(%account, amount, total_supply = self.total_supply, "burn");
        self.events.emit(LedgerEvent::Burn {
            from: account,
            amount,
        });
        self.events.emit(LedgerEvent::Transfer {
            from: account,
            to: Address::ZERO,
            amount,
        });
        Ok(())
    }

    /// Adds `account` to the blacklist.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the administrator.
    /// - [`LedgerError::ZeroAddress`] if `account` is the null account.
    /// - [`LedgerError::AlreadyBlacklisted`] if it is already listed.
    pub fn blacklist(&mut self, caller: Address, account: Address) -> Result<(), LedgerError> {
        self.ensure_administrator(caller)?;
        nonzero(account, "blacklist target")?;
        if self.blacklist.contains(&account) {
            return Err(LedgerError::AlreadyBlacklisted { account });
        }

        self.blacklist.insert(account);

        debug!(%account, "blacklisted");
        self.events.emit(LedgerEvent::Blacklisted { account });
        Ok(())
    }

    /// Removes `account` from the blacklist.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the administrator.
    /// - [`LedgerError::NotBlacklisted`] if it is not listed.
    pub fn un_blacklist(&mut self, caller: Address, account: Address) -> Result<(), LedgerError> {
        self.ensure_administrator(caller)?;
        if !self.blacklist.remove(&account) {
            return Err(LedgerError::NotBlacklisted { account });
        }

        debug!(%account, "removed from blacklist");
        self.events.emit(LedgerEvent::UnBlacklisted { account });
        Ok(())
    }

    /// Freezes transfer, approve, and transfer-from.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the administrator.
    /// - [`LedgerError::AlreadyPaused`] if already paused.
    pub fn pause(&mut self, caller: Address) -> Result<(), LedgerError> {
        self.ensure_administrator(caller)?;
        if self.paused {
            return Err(LedgerError::AlreadyPaused);
        }

        self.paused = true;

        debug!(by = %caller, "ledger paused");
        self.events.emit(LedgerEvent::Paused { by: caller });
        Ok(())
    }

    /// Resumes value movement.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the administrator.
    /// - [`LedgerError::NotPaused`] if not paused.
    pub fn unpause(&mut self, caller: Address) -> Result<(), LedgerError> {
        self.ensure_administrator(caller)?;
        if !self.paused {
            return Err(LedgerError::NotPaused);
        }

        self.paused = false;

        debug!(by = %caller, "ledger unpaused");
        self.events.emit(LedgerEvent::Unpaused { by: caller });
        Ok(())
    }

    /// Hands the administrator role to `new_administrator`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the administrator.
    /// - [`LedgerError::ZeroAddress`] if `new_administrator` is the null account.
    /// - [`LedgerError::SameAdministrator`] if it already holds the role.
    /// - [`LedgerError::BlacklistedAdministrator`] if it is blacklisted.
    pub fn set_administrator(
        &mut self,
        caller: Address,
        new_administrator: Address,
    ) -> Result<(), LedgerError> {
        self.ensure_administrator(caller)?;
        nonzero(new_administrator, "administrator")?;
        if new_administrator == self.administrator {
            return Err(LedgerError::SameAdministrator {
                administrator: self.administrator,
            });
        }
        if self.blacklist.contains(&new_administrator) {
            return Err(LedgerError::BlacklistedAdministrator {
                candidate: new_administrator,
            });
        }

        let previous = std::mem::replace(&mut self.administrator, new_administrator);

        debug!(%previous, current = %new_administrator, "administrator changed");
        self.events.emit(LedgerEvent::AdministratorChanged {
            previous,
            current: new_administrator,
        });
        Ok(())
    }

    /// Runs a decoded [`LedgerCall`] on behalf of `caller`.
    pub fn apply(&mut self, caller: Address, call: LedgerCall) -> Result<(), LedgerError> {
        match call {
            LedgerCall::Transfer { to, amount } => self.transfer(caller, to, amount),
            LedgerCall::Approve { spender, amount } => self.approve(caller, spender, amount),
            LedgerCall::TransferFrom { from, to, amount } => {
                self.transfer_from(caller, from, to, amount)
            }
            LedgerCall::Mint { to, amount } => self.mint(caller, to, amount),
            LedgerCall::Burn { amount } => self.burn(caller, amount),
            LedgerCall::BurnFrom { account, amount } => self.burn_from(caller, account, amount),
            LedgerCall::Blacklist { account } => self.blacklist(caller, account),
            LedgerCall::UnBlacklist { account } => self.un_blacklist(caller, account),
            LedgerCall::Pause => self.pause(caller),
            LedgerCall::Unpause => self.unpause(caller),
            LedgerCall::SetAdministrator { new_administrator } => {
                self.set_administrator(caller, new_administrator)
            }
        }
    }

    // -- views --------------------------------------------------------------

    /// Address the ledger is deployed at.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Token name.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Token symbol.
    pub fn symbol(&self) -> &str {
        &self.metadata.symbol
    }

    /// Token decimal places.
    pub fn decimals(&self) -> u8 {
        self.metadata.decimals
    }

    /// All fixed metadata at once.
    pub fn metadata(&self) -> &TokenMetadata {
        &self.metadata
    }

    /// Total tokens in existence.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of `account`, zero if it never held tokens.
    pub fn balance_of(&self, account: Address) -> Amount {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    /// How much `spender` may still move out of `owner`'s balance.
    pub fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.allowances
            .get(&owner)
            .and_then(|m| m.get(&spender))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `account` is blacklisted.
    pub fn is_blacklisted(&self, account: Address) -> bool {
        self.blacklist.contains(&account)
    }

    /// Whether value movement is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current administrator.
    pub fn administrator(&self) -> Address {
        self.administrator
    }

    /// Number of accounts with a non-zero balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Checked sum of every balance. Equal to [`total_supply`](Self::total_supply)
    /// in every reachable state.
    pub fn sum_of_balances(&self) -> Option<Amount> {
        self.balances
            .values()
            .try_fold(0 as Amount, |acc, b| acc.checked_add(*b))
    }

    /// Audit history.
    pub fn events(&self) -> &EventLog<LedgerEvent> {
        &self.events
    }

    // -- internals ----------------------------------------------------------

    fn ensure_not_paused(&self) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::Paused);
        }
        Ok(())
    }

    fn ensure_not_blacklisted(&self, account: Address) -> Result<(), LedgerError> {
        if self.blacklist.contains(&account) {
            return Err(LedgerError::Blacklisted { account });
        }
        Ok(())
    }

    fn ensure_administrator(&self, caller: Address) -> Result<(), LedgerError> {
        if caller != self.administrator {
            return Err(LedgerError::Unauthorized { caller });
        }
        Ok(())
    }

    /// Validates then applies a balance move. Writes nothing on error.
    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        let from_balance = self.balance_of(from);
        let new_from =
            amount::debit(from_balance, amount).map_err(|_| LedgerError::InsufficientBalance {
                account: from,
                balance: from_balance,
                requested: amount,
            })?;

        if from == to {
            return Ok(());
        }

        // Bounded by total supply, see mint.
        let new_to = amount::credit(self.balance_of(to), amount)
            .map_err(|_| LedgerError::SupplyOverflow { amount })?;

        self.set_balance(from, new_from);
        self.set_balance(to, new_to);
        Ok(())
    }

    fn set_balance(&mut self, account: Address, balance: Amount) {
        if balance == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, amount: Amount) {
        let per_owner = self.allowances.entry(owner).or_default();
        if amount == 0 {
            per_owner.remove(&spender);
            if per_owner.is_empty() {
                self.allowances.remove(&owner);
            }
        } else {
            per_owner.insert(spender, amount);
        }
    }
}

fn nonzero(account: Address, role: &'static str) -> Result<(), LedgerError> {
    account
        .ensure_nonzero()
        .map_err(|_| LedgerError::ZeroAddress { role })
}

impl Contract for RegulatedLedger {
    fn invoke(
        &mut self,
        _env: &mut dyn Dispatcher,
        caller: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), CallError> {
        if value > 0 {
            return Err(CallError::NotPayable {
                target: self.address,
            });
        }
        let call = LedgerCall::decode(payload)?;
        self.apply(caller, call).map_err(|e| CallError::Reverted {
            target: self.address,
            kind: e.kind(),
            reason: e.to_string(),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Address {
        Address::derive("admin")
    }

    fn alice() -> Address {
        Address::derive("alice")
    }

    fn bob() -> Address {
        Address::derive("bob")
    }

    fn ledger() -> RegulatedLedger {
        RegulatedLedger::new(Address::derive("ledger"), LedgerConfig::default(), admin()).unwrap()
    }

    fn funded(amount: Amount) -> RegulatedLedger {
        let mut l = ledger();
        l.mint(admin(), alice(), amount).unwrap();
        l
    }

    #[test]
    fn new_ledger_is_empty_and_unpaused() {
        let l = ledger();
        assert_eq!(l.total_supply(), 0);
        assert!(!l.is_paused());
        assert_eq!(l.administrator(), admin());
        assert_eq!(l.decimals(), custodia_protocol::config::DEFAULT_DECIMALS);
        assert!(l.events().is_empty());
    }

    #[test]
    fn zero_administrator_rejected() {
        let result = RegulatedLedger::new(
            Address::derive("ledger"),
            LedgerConfig::default(),
            Address::ZERO,
        );
        assert!(matches!(result, Err(LedgerError::ZeroAddress { .. })));
    }

    #[test]
    fn mint_emits_mint_then_transfer_from_zero() {
        let l = funded(100);
        let events: Vec<_> = l.events().events().cloned().collect();
        assert_eq!(
            events,
            vec![
                LedgerEvent::Mint {
                    to: alice(),
                    amount: 100
                },
                LedgerEvent::Transfer {
                    from: Address::ZERO,
                    to: alice(),
                    amount: 100
                },
            ]
        );
    }

    #[test]
    fn self_transfer_keeps_balance() {
        let mut l = funded(100);
        l.transfer(alice(), alice(), 40).unwrap();
        assert_eq!(l.balance_of(alice()), 100);
        assert_eq!(l.sum_of_balances(), Some(100));
    }

    #[test]
    fn self_transfer_still_checks_balance() {
        let mut l = funded(10);
        let err = l.transfer(alice(), alice(), 11).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    }

    #[test]
    fn zero_balances_are_pruned() {
        let mut l = funded(50);
        l.transfer(alice(), bob(), 50).unwrap();
        assert_eq!(l.holder_count(), 1);
        assert_eq!(l.balance_of(alice()), 0);
    }

    #[test]
    fn supply_overflow_rejected_without_side_effects() {
        let mut l = funded(Amount::MAX);
        let before = l.events().len();
        let err = l.mint(admin(), bob(), 1).unwrap_err();
        assert_eq!(err, LedgerError::SupplyOverflow { amount: 1 });
        assert_eq!(l.total_supply(), Amount::MAX);
        assert_eq!(l.events().len(), before);
    }

    #[test]
    fn call_payload_roundtrip_dispatches() {
        let mut l = ledger();
        let payload = LedgerCall::Mint {
            to: bob(),
            amount: 9,
        }
        .encode()
        .unwrap();
        let call = LedgerCall::decode(&payload).unwrap();
        l.apply(admin(), call).unwrap();
        assert_eq!(l.balance_of(bob()), 9);
    }

    #[test]
    fn garbage_payload_is_malformed() {
        assert!(matches!(
            LedgerCall::decode(&[0xff, 0xff, 0xff, 0xff, 0x01]),
            Err(CallError::MalformedPayload(_))
        ));
    }

    #[test]
    fn json_snapshot_roundtrip() {
        let mut l = funded(1_000);
        l.transfer(alice(), bob(), 250).unwrap();
        l.approve(alice(), bob(), UNLIMITED).unwrap();
        l.blacklist(admin(), Address::derive("mallory")).unwrap();
        l.pause(admin()).unwrap();

        let json = serde_json::to_string(&l).unwrap();
        // Balance and allowance maps are keyed by hex address.
        assert!(json.contains(&format!("\"{}\"", alice().to_hex())));
        let restored: RegulatedLedger = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.metadata(), l.metadata());
        assert_eq!(restored.administrator(), admin());
        assert_eq!(restored.total_supply(), 1_000);
        assert_eq!(restored.balance_of(alice()), 750);
        assert_eq!(restored.balance_of(bob()), 250);
        assert_eq!(restored.allowance(alice(), bob()), UNLIMITED);
        assert!(restored.is_blacklisted(Address::derive("mallory")));
        assert!(restored.is_paused());
        assert_eq!(restored.sum_of_balances(), Some(1_000));
        assert_eq!(restored.events().records(), l.events().records());
    }
}
