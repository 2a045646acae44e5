//! # Authorization Vault Contract
//!
//! An N-of-M approval engine. A fixed set of owners submits proposals, each
//! naming a target address, an amount of native value, and an opaque
//! payload. Owners confirm (or revoke their confirmation); once a proposal
//! has at least `threshold` confirmations any owner can execute it, which
//! forwards the call to the target.
//!
//! ```text
//! Proposed --(confirm | revoke)*--> Proposed --execute--> Executed
//! ```
//!
//! `Executed` is terminal. Proposals are never deleted and their index is
//! their permanent identifier.
//!
//! ## Execution Ordering
//!
//! `execute` marks the proposal executed *before* it forwards the call, so
//! anything the target does that routes back into `execute` for the same
//! index sees `AlreadyExecuted`. If the forwarded call fails, the flag and
//! the forwarded value are restored and the whole execute fails with
//! `CallFailed`.
//!
//! ## Self-Governance
//!
//! Owner-set changes can be made by a single owner directly, or by the
//! quorum: a proposal targeting the vault's own address is dispatched
//! internally with the vault as the caller. The vault address is authorized
//! for submit, execute, and the owner-set and threshold operations. It can
//! never confirm or revoke, since it is not an owner.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use custodia_protocol::amount::{self, Amount};
use custodia_protocol::config::MAX_OWNERS;
use custodia_protocol::{Address, CallError, Contract, Dispatcher, ErrorKind, EventLog};

use crate::config::VaultConfig;

/// Permanent index of a proposal.
pub type ProposalId = u64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// The caller is neither an owner nor the vault itself.
    #[error("unauthorized: {caller} is not an owner")]
    Unauthorized {
        /// The address that attempted the operation.
        caller: Address,
    },

    /// No proposal exists at this index.
    #[error("proposal {index} not found")]
    NotFound {
        /// The requested index.
        index: ProposalId,
    },

    /// The proposal has already been executed.
    #[error("proposal {index} already executed")]
    AlreadyExecuted {
        /// The proposal index.
        index: ProposalId,
    },

    /// The owner has already confirmed this proposal.
    #[error("{owner} already confirmed proposal {index}")]
    AlreadyConfirmed {
        /// The proposal index.
        index: ProposalId,
        /// The confirming owner.
        owner: Address,
    },

    /// The owner has not confirmed this proposal.
    #[error("{owner} has not confirmed proposal {index}")]
    NotConfirmed {
        /// The proposal index.
        index: ProposalId,
        /// The revoking owner.
        owner: Address,
    },

    /// The proposal lacks enough confirmations to execute.
    #[error("proposal {index} has {confirmations} confirmations, {required} required")]
    QuorumNotMet {
        /// The proposal index.
        index: ProposalId,
        /// Confirmations collected so far.
        confirmations: u32,
        /// Current threshold.
        required: u32,
    },

    /// The forwarded call failed; the execute was rolled back.
    #[error("proposal {index} call failed: {source}")]
    CallFailed {
        /// The proposal index.
        index: ProposalId,
        /// Why the forwarded call failed.
        #[source]
        source: CallError,
    },

    /// Removing the owner would leave fewer owners than the threshold.
    #[error("removing an owner would leave {remaining} owners, below threshold {threshold}")]
    BelowThreshold {
        /// Owner count after the removal.
        remaining: usize,
        /// Current threshold.
        threshold: u32,
    },

    /// The threshold is zero or exceeds the owner count.
    #[error("invalid threshold {threshold} for {owners} owners")]
    InvalidThreshold {
        /// Requested threshold.
        threshold: u32,
        /// Current owner count.
        owners: usize,
    },

    /// The address is already an owner.
    #[error("{owner} is already an owner")]
    AlreadyOwner {
        /// The duplicate owner.
        owner: Address,
    },

    /// The address is not an owner.
    #[error("{owner} is not an owner")]
    NotOwner {
        /// The missing owner.
        owner: Address,
    },

    /// The null account was supplied.
    #[error("the zero address is not a valid {role}")]
    ZeroAddress {
        /// What the argument was for.
        role: &'static str,
    },

    /// The owner set is empty or would grow past the limit.
    #[error("owner count {count} outside 1..={max}")]
    OwnerCount {
        /// Offending owner count.
        count: usize,
        /// Largest accepted count.
        max: usize,
    },

    /// Crediting native value would overflow the vault balance.
    #[error("native balance overflow")]
    ValueOverflow,
}

impl VaultError {
    /// Coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Unauthorized { .. } => ErrorKind::Unauthorized,
            VaultError::NotFound { .. } | VaultError::NotOwner { .. } => ErrorKind::NotFound,
            VaultError::AlreadyExecuted { .. }
            | VaultError::AlreadyConfirmed { .. }
            | VaultError::NotConfirmed { .. }
            | VaultError::QuorumNotMet { .. }
            | VaultError::BelowThreshold { .. } => ErrorKind::InvalidState,
            VaultError::InvalidThreshold { .. }
            | VaultError::AlreadyOwner { .. }
            | VaultError::ZeroAddress { .. }
            | VaultError::OwnerCount { .. }
            | VaultError::ValueOverflow => ErrorKind::InvalidArgument,
            VaultError::CallFailed { .. } => ErrorKind::CallFailed,
        }
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle state of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    /// Collecting confirmations.
    Proposed,
    /// Forwarded to its target. Terminal.
    Executed,
}

impl std::fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalStatus::Proposed => write!(f, "Proposed"),
            ProposalStatus::Executed => write!(f, "Executed"),
        }
    }
}

/// An action awaiting (or past) quorum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Address the call is forwarded to.
    pub target: Address,
    /// Native value sent with the call.
    pub value: Amount,
    /// Opaque call data, interpreted only by the target.
    pub payload: Vec<u8>,
    /// Set once the proposal has been forwarded successfully.
    pub executed: bool,
    /// Number of owners currently confirming.
    pub confirmation_count: u32,
}

impl Proposal {
    /// Current lifecycle state.
    pub fn status(&self) -> ProposalStatus {
        if self.executed {
            ProposalStatus::Executed
        } else {
            ProposalStatus::Proposed
        }
    }
}

/// Audit events emitted by the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    /// Native value was received.
    Deposit {
        /// Account the value came from.
        sender: Address,
        /// Amount received.
        value: Amount,
    },
    /// A proposal was created.
    Submission {
        /// Index of the new proposal.
        index: ProposalId,
        /// Owner (or the vault itself) that submitted it.
        proposer: Address,
        /// Address the call will be forwarded to.
        target: Address,
        /// Native value attached to the call.
        value: Amount,
    },
    /// An owner confirmed a proposal.
    Confirmation {
        /// The confirmed proposal.
        index: ProposalId,
        /// The confirming owner.
        owner: Address,
    },
    /// An owner withdrew a confirmation.
    Revocation {
        /// The affected proposal.
        index: ProposalId,
        /// The revoking owner.
        owner: Address,
    },
    /// A proposal was forwarded to its target.
    Execution {
        /// The executed proposal.
        index: ProposalId,
        /// Who triggered the execution.
        executor: Address,
    },
    /// An owner joined the set.
    OwnerAdded {
        /// The new owner.
        owner: Address,
    },
    /// An owner left the set.
    OwnerRemoved {
        /// The departing owner.
        owner: Address,
    },
    /// The confirmation threshold changed.
    ThresholdChanged {
        /// New number of confirmations required.
        threshold: u32,
    },
}

/// A vault operation encoded for delivery through a forwarded call.
///
/// Proposals targeting the vault's own address carry one of these as their
/// payload. The forwarded caller becomes the operation's actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultCall {
    /// [`AuthorizationVault::submit`].
    Submit {
        target: Address,
        value: Amount,
        payload: Vec<u8>,
    },
    /// [`AuthorizationVault::confirm`].
    Confirm { index: ProposalId },
    /// [`AuthorizationVault::revoke`].
    Revoke { index: ProposalId },
    /// [`AuthorizationVault::execute`].
    Execute { index: ProposalId },
    /// [`AuthorizationVault::add_owner`].
    AddOwner { owner: Address },
    /// [`AuthorizationVault::remove_owner`].
    RemoveOwner { owner: Address },
    /// [`AuthorizationVault::replace_owner`].
    ReplaceOwner { owner: Address, new_owner: Address },
    /// [`AuthorizationVault::change_threshold`].
    ChangeThreshold { threshold: u32 },
}

impl VaultCall {
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
// Vault
// ---------------------------------------------------------------------------

/// A quorum-gated authorization vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationVault {
    /// Address the vault is deployed at. Also its identity as a caller.
    address: Address,
    /// Owners, dense. Order is not stable across removals.
    owners: Vec<Address>,
    /// Owner -> position in `owners`.
    owner_index: HashMap<Address, usize>,
    /// Confirmations required to execute.
    threshold: u32,
    /// Append-only; the position is the proposal id.
    proposals: Vec<Proposal>,
    /// `(proposal, owner)` pairs that are currently confirmed.
    confirmations: HashSet<(ProposalId, Address)>,
    /// Native value held by the vault.
    native_balance: Amount,
    /// Audit history.
    events: EventLog<VaultEvent>,
}

impl AuthorizationVault {
    /// Creates a vault with the given owners and threshold.
    ///
    /// # Errors
    ///
    /// - [`VaultError::ZeroAddress`] if `address` or any owner is the null account.
    /// - [`VaultError::OwnerCount`] if `owners` is empty or longer than `MAX_OWNERS`.
    /// - [`VaultError::AlreadyOwner`] if an owner is listed twice.
    /// - [`VaultError::InvalidThreshold`] unless `1 <= threshold <= owners.len()`.
    pub fn new(
        address: Address,
        owners: Vec<Address>,
        threshold: u32,
    ) -> Result<Self, VaultError> {
        nonzero(address, "vault address")?;
        if owners.is_empty() || owners.len() > MAX_OWNERS {
            return Err(VaultError::OwnerCount {
                count: owners.len(),
                max: MAX_OWNERS,
            });
        }

        let mut owner_index = HashMap::with_capacity(owners.len());
        for (position, owner) in owners.iter().enumerate() {
            nonzero(*owner, "owner")?;
            if owner_index.insert(*owner, position).is_some() {
                return Err(VaultError::AlreadyOwner { owner: *owner });
            }
        }
        validate_threshold(threshold, owners.len())?;

        debug!(%address, owners = owners.len(), threshold, "vault created");

        Ok(Self {
            address,
            owners,
            owner_index,
            threshold,
            proposals: Vec::new(),
            confirmations: HashSet::new(),
            native_balance: 0,
            events: EventLog::new(address),
        })
    }

    /// Creates a vault from a validated [`VaultConfig`].
    pub fn from_config(address: Address, config: &VaultConfig) -> Result<Self, VaultError> {
        Self::new(address, config.owners.clone(), config.threshold)
    }

    // -- proposal lifecycle --------------------------------------------------

    /// Records a new proposal and returns its index.
    ///
    /// `value` and `payload` are not inspected.
    pub fn submit(
        &mut self,
        caller: Address,
        target: Address,
        value: Amount,
        payload: Vec<u8>,
    ) -> Result<ProposalId, VaultError> {
        self.ensure_authorized(caller)?;
        nonzero(target, "proposal target")?;

        let index = self.proposals.len() as ProposalId;
        self.proposals.push(Proposal {
            target,
            value,
            payload,
            executed: false,
            confirmation_count: 0,
        });

        debug!(index, proposer = %caller, %target, value, "proposal submitted");
        self.events.emit(VaultEvent::Submission {
            index,
            proposer: caller,
            target,
            value,
        });
        Ok(index)
    }

    /// Adds the caller's confirmation to a pending proposal.
    ///
    /// Only owners confirm. The vault's own address is rejected here so that
    /// `confirmation_count` only ever counts owner flags.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, `AlreadyExecuted`, or `AlreadyConfirmed`.
    pub fn confirm(&mut self, caller: Address, index: ProposalId) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        self.pending(index)?;
        if self.confirmations.contains(&(index, caller)) {
            return Err(VaultError::AlreadyConfirmed {
                index,
                owner: caller,
            });
        }

        let proposal = self.proposal_mut(index)?;
        proposal.confirmation_count += 1;
        let count = proposal.confirmation_count;
        self.confirmations.insert((index, caller));

        debug!(index, owner = %caller, confirmations = count, "proposal confirmed");
        self.events.emit(VaultEvent::Confirmation {
            index,
            owner: caller,
        });
        Ok(())
    }

    /// Withdraws the caller's confirmation from a pending proposal. Owners only.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, `AlreadyExecuted`, or `NotConfirmed`.
    pub fn revoke(&mut self, caller: Address, index: ProposalId) -> Result<(), VaultError> {
        self.ensure_owner(caller)?;
        self.pending(index)?;
        if !self.confirmations.remove(&(index, caller)) {
            return Err(VaultError::NotConfirmed {
                index,
                owner: caller,
            });
        }

        let proposal = self.proposal_mut(index)?;
        proposal.confirmation_count -= 1;
        let count = proposal.confirmation_count;

        debug!(index, owner = %caller, confirmations = count, "confirmation revoked");
        self.events.emit(VaultEvent::Revocation {
            index,
            owner: caller,
        });
        Ok(())
    }

    /// Forwards a proposal that has reached quorum.
    ///
    /// `env` routes the call to the target. A proposal targeting this vault
    /// is handled internally instead.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`, `NotFound`, or `AlreadyExecuted`.
    /// - [`VaultError::QuorumNotMet`] below threshold. Exactly `threshold`
    ///   confirmations is enough.
    /// - [`VaultError::CallFailed`] if the forwarded call fails. Nothing is
    ///   changed in that case: the proposal stays pending and the vault
    ///   keeps its value.
    pub fn execute(
        &mut self,
        caller: Address,
        index: ProposalId,
        env: &mut dyn Dispatcher,
    ) -> Result<(), VaultError> {
        self.ensure_authorized(caller)?;
        let proposal = self.pending(index)?;
        if proposal.confirmation_count < self.threshold {
            return Err(VaultError::QuorumNotMet {
                index,
                confirmations: proposal.confirmation_count,
                required: self.threshold,
            });
        }
        let target = proposal.target;
        let value = proposal.value;
        let payload = proposal.payload.clone();

        // Committed before control leaves the vault.
        self.proposal_mut(index)?.executed = true;

        if let Err(source) = self.forward(env, target, value, &payload) {
            self.proposal_mut(index)?.executed = false;
            warn!(index, %target, error = %source, "proposal execution failed, rolled back");
            return Err(VaultError::CallFailed { index, source });
        }

        debug!(index, executor = %caller, %target, value, "proposal executed");
        self.events.emit(VaultEvent::Execution {
            index,
            executor: caller,
        });
        Ok(())
    }

    // -- owner management ---------------------------------------------------

    /// Adds `owner` to the set.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `ZeroAddress`, `AlreadyOwner`, or `OwnerCount` if the
    /// set is full.
    pub fn add_owner(&mut self, caller: Address, owner: Address) -> Result<(), VaultError> {
        self.ensure_authorized(caller)?;
        nonzero(owner, "owner")?;
        if self.is_owner(owner) {
            return Err(VaultError::AlreadyOwner { owner });
        }
        if self.owners.len() >= MAX_OWNERS {
            return Err(VaultError::OwnerCount {
                count: self.owners.len() + 1,
                max: MAX_OWNERS,
            });
        }

        self.owner_index.insert(owner, self.owners.len());
        self.owners.push(owner);

        debug!(%owner, by = %caller, owners = self.owners.len(), "owner added");
        self.events.emit(VaultEvent::OwnerAdded { owner });
        Ok(())
    }

    /// Removes `owner` from the set.
    ///
    /// The last owner takes the removed owner's slot. The removed owner's
    /// confirmations on pending proposals are withdrawn.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotOwner`, or `BelowThreshold`.
    pub fn remove_owner(&mut self, caller: Address, owner: Address) -> Result<(), VaultError> {
        self.ensure_authorized(caller)?;
        let position = *self
            .owner_index
            .get(&owner)
            .ok_or(VaultError::NotOwner { owner })?;
        let remaining = self.owners.len() - 1;
        if remaining < self.threshold as usize {
            return Err(VaultError::BelowThreshold {
                remaining,
                threshold: self.threshold,
            });
        }

        self.owners.swap_remove(position);
        self.owner_index.remove(&owner);
        if let Some(moved) = self.owners.get(position) {
            self.owner_index.insert(*moved, position);
        }
        self.withdraw_pending_confirmations(owner);

        debug!(%owner, by = %caller, owners = self.owners.len(), "owner removed");
        self.events.emit(VaultEvent::OwnerRemoved { owner });
        Ok(())
    }

    /// Replaces `owner` with `new_owner` in the same slot.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotOwner`, `ZeroAddress`, or `AlreadyOwner`.
    pub fn replace_owner(
        &mut self,
        caller: Address,
        owner: Address,
        new_owner: Address,
    ) -> Result<(), VaultError> {
        self.ensure_authorized(caller)?;
        let position = *self
            .owner_index
            .get(&owner)
            .ok_or(VaultError::NotOwner { owner })?;
        nonzero(new_owner, "owner")?;
        if self.is_owner(new_owner) {
            return Err(VaultError::AlreadyOwner { owner: new_owner });
        }

        self.owners[position] = new_owner;
        self.owner_index.remove(&owner);
        self.owner_index.insert(new_owner, position);
        self.withdraw_pending_confirmations(owner);

        debug!(%owner, %new_owner, by = %caller, "owner replaced");
        self.events.emit(VaultEvent::OwnerRemoved { owner });
        self.events.emit(VaultEvent::OwnerAdded { owner: new_owner });
        Ok(())
    }

    /// Sets the number of confirmations required to execute.
    ///
    /// Applies to pending proposals too.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, or `InvalidThreshold` unless `1 <= threshold <= owners`.
    pub fn change_threshold(&mut self, caller: Address, threshold: u32) -> Result<(), VaultError> {
        self.ensure_authorized(caller)?;
        validate_threshold(threshold, self.owners.len())?;

        self.threshold = threshold;

        debug!(threshold, by = %caller, "threshold changed");
        self.events.emit(VaultEvent::ThresholdChanged { threshold });
        Ok(())
    }

    // -- native value -------------------------------------------------------

    /// Accepts native value. Any sender, any amount.
    ///
    /// Non-zero deposits are recorded as [`VaultEvent::Deposit`]. A zero-value
    /// receipt changes nothing and is only traced.
    pub fn deposit(&mut self, sender: Address, value: Amount) -> Result<(), VaultError> {
        self.native_balance =
            amount::credit(self.native_balance, value).map_err(|_| VaultError::ValueOverflow)?;
        if value == 0 {
            debug!(%sender, "empty call received, nothing deposited");
            return Ok(());
        }
        debug!(%sender, value, balance = self.native_balance, "deposit received");
        self.events.emit(VaultEvent::Deposit { sender, value });
        Ok(())
    }

    /// Runs a decoded [`VaultCall`] on behalf of `caller`.
    pub fn apply(
        &mut self,
        caller: Address,
        call: VaultCall,
        env: &mut dyn Dispatcher,
    ) -> Result<(), VaultError> {
        match call {
            VaultCall::Submit {
                target,
                value,
                payload,
            } => self.submit(caller, target, value, payload).map(|_| ()),
            VaultCall::Confirm { index } => self.confirm(caller, index),
            VaultCall::Revoke { index } => self.revoke(caller, index),
            VaultCall::Execute { index } => self.execute(caller, index, env),
            VaultCall::AddOwner { owner } => self.add_owner(caller, owner),
            VaultCall::RemoveOwner { owner } => self.remove_owner(caller, owner),
            VaultCall::ReplaceOwner { owner, new_owner } => {
                self.replace_owner(caller, owner, new_owner)
            }
            VaultCall::ChangeThreshold { threshold } => self.change_threshold(caller, threshold),
        }
    }

    // -- views --------------------------------------------------------------

    /// Address the vault is deployed at.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Current owners. Order changes when owners are removed.
    pub fn owners(&self) -> &[Address] {
        &self.owners
    }

    /// Whether `account` is an owner.
    pub fn is_owner(&self, account: Address) -> bool {
        self.owner_index.contains_key(&account)
    }

    /// Confirmations required to execute.
    pub fn required_confirmations(&self) -> u32 {
        self.threshold
    }

    /// Number of proposals ever submitted.
    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    /// The proposal at `index`, if any.
    pub fn proposal(&self, index: ProposalId) -> Option<&Proposal> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.proposals.get(i))
    }

    /// Whether `owner` currently confirms `index`.
    pub fn is_confirmed(&self, index: ProposalId, owner: Address) -> bool {
        self.confirmations.contains(&(index, owner))
    }

    /// Current owners confirming `index`, in owner order.
    pub fn confirmations(&self, index: ProposalId) -> Vec<Address> {
        self.owners
            .iter()
            .copied()
            .filter(|owner| self.is_confirmed(index, *owner))
            .collect()
    }

    /// Whether `index` is pending with at least `threshold` confirmations.
    pub fn is_executable(&self, index: ProposalId) -> bool {
        self.proposal(index)
            .map(|p| !p.executed && p.confirmation_count >= self.threshold)
            .unwrap_or(false)
    }

    /// Indices of proposals matching the filter, ascending.
    pub fn proposal_ids(&self, include_pending: bool, include_executed: bool) -> Vec<ProposalId> {
        self.proposals
            .iter()
            .enumerate()
            .filter(|(_, p)| (include_pending && !p.executed) || (include_executed && p.executed))
            .map(|(i, _)| i as ProposalId)
            .collect()
    }

    /// Number of proposals matching the filter.
    pub fn count_proposals(&self, include_pending: bool, include_executed: bool) -> usize {
        self.proposals
            .iter()
            .filter(|p| (include_pending && !p.executed) || (include_executed && p.executed))
            .count()
    }

    /// Native value held by the vault.
    pub fn native_balance(&self) -> Amount {
        self.native_balance
    }

    /// Audit history.
    pub fn events(&self) -> &EventLog<VaultEvent> {
        &self.events
    }

    // -- internals ----------------------------------------------------------

    /// Owners, or the vault itself acting on a quorum-approved proposal.
    fn ensure_authorized(&self, caller: Address) -> Result<(), VaultError> {
        if caller == self.address || self.is_owner(caller) {
            return Ok(());
        }
        Err(VaultError::Unauthorized { caller })
    }

    /// Owners only.
    fn ensure_owner(&self, caller: Address) -> Result<(), VaultError> {
        if self.is_owner(caller) {
            return Ok(());
        }
        Err(VaultError::Unauthorized { caller })
    }

    /// Looks up a proposal that exists and has not been executed.
    fn pending(&self, index: ProposalId) -> Result<&Proposal, VaultError> {
        let proposal = self.proposal(index).ok_or(VaultError::NotFound { index })?;
        if proposal.executed {
            return Err(VaultError::AlreadyExecuted { index });
        }
        Ok(proposal)
    }

    fn proposal_mut(&mut self, index: ProposalId) -> Result<&mut Proposal, VaultError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.proposals.get_mut(i))
            .ok_or(VaultError::NotFound { index })
    }

    /// Sends `value` and `payload` to `target`. On error the native balance
    /// is exactly what it was before the call.
    fn forward(
        &mut self,
        env: &mut dyn Dispatcher,
        target: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), CallError> {
        let before = self.native_balance;
        self.native_balance =
            amount::debit(before, value).map_err(|_| CallError::InsufficientValue {
                available: before,
                requested: value,
            })?;

        let outcome = if target == self.address {
            self.self_call(env, value, payload)
        } else {
            env.dispatch(self.address, target, value, payload)
        };

        if outcome.is_err() {
            self.native_balance = before;
        }
        outcome
    }

    fn self_call(
        &mut self,
        env: &mut dyn Dispatcher,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), CallError> {
        let caller = self.address;
        self.receive(env, caller, value, payload)
    }

    /// Shared entry for value and payloads arriving from any caller.
    fn receive(
        &mut self,
        env: &mut dyn Dispatcher,
        caller: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), CallError> {
        let address = self.address;
        let revert = |e: VaultError| CallError::Reverted {
            target: address,
            kind: e.kind(),
            reason: e.to_string(),
        };

        if payload.is_empty() {
            return self.deposit(caller, value).map_err(revert);
        }

        let call = VaultCall::decode(payload)?;
        let before = self.native_balance;
        self.native_balance =
            amount::credit(before, value).map_err(|_| revert(VaultError::ValueOverflow))?;

        if let Err(e) = self.apply(caller, call, env) {
            self.native_balance = before;
            return Err(revert(e));
        }
        if value > 0 {
            self.events.emit(VaultEvent::Deposit {
                sender: caller,
                value,
            });
        }
        Ok(())
    }

    fn withdraw_pending_confirmations(&mut self, owner: Address) {
        for (position, proposal) in self.proposals.iter_mut().enumerate() {
            let index = position as ProposalId;
            if !proposal.executed && self.confirmations.remove(&(index, owner)) {
                proposal.confirmation_count -= 1;
            }
        }
    }
}

impl Contract for AuthorizationVault {
    fn invoke(
        &mut self,
        env: &mut dyn Dispatcher,
        caller: Address,
        value: Amount,
        payload: &[u8],
    ) -> Result<(), CallError> {
        self.receive(env, caller, value, payload)
    }

    fn native_balance(&self) -> Amount {
        self.native_balance
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

fn nonzero(account: Address, role: &'static str) -> Result<(), VaultError> {
    account
        .ensure_nonzero()
        .map_err(|_| VaultError::ZeroAddress { role })
}

fn validate_threshold(threshold: u32, owners: usize) -> Result<(), VaultError> {
    if threshold == 0 || threshold as usize > owners {
        return Err(VaultError::InvalidThreshold { threshold, owners });
    }
    Ok(())
}
