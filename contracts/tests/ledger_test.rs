//! Integration tests for the regulated ledger.
//!
//! These cover the guard composition of every value-moving call, the
//! administrator surface, and the supply invariant across mixed sequences
//! of operations.

use custodia_contracts::regulated_ledger::{LedgerError, LedgerEvent, RegulatedLedger};
use custodia_contracts::LedgerConfig;
use custodia_protocol::{Address, Amount, ErrorKind, UNLIMITED};

/// Helper: a fresh ledger administered by `admin`.
fn setup() -> (RegulatedLedger, Address) {
    let admin = Address::derive("governor");
    let ledger = RegulatedLedger::new(
        Address::derive("ledger"),
        LedgerConfig {
            name: "Test Dollar".into(),
            symbol: "TUSD".into(),
            decimals: 6,
        },
        admin,
    )
    .unwrap();
    (ledger, admin)
}

fn user(name: &str) -> Address {
    Address::derive(name)
}

fn assert_supply_invariant(ledger: &RegulatedLedger) {
    assert_eq!(ledger.sum_of_balances(), Some(ledger.total_supply()));
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[test]
fn metadata_is_fixed_at_construction() {
    let (ledger, admin) = setup();
    assert_eq!(ledger.name(), "Test Dollar");
    assert_eq!(ledger.symbol(), "TUSD");
    assert_eq!(ledger.decimals(), 6);
    assert_eq!(ledger.administrator(), admin);
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

#[test]
fn transfer_moves_balance_and_emits_event() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 500).unwrap();

    ledger.transfer(user("alice"), user("bob"), 200).unwrap();

    assert_eq!(ledger.balance_of(user("alice")), 300);
    assert_eq!(ledger.balance_of(user("bob")), 200);
    assert_eq!(
        ledger.events().last(),
        Some(&LedgerEvent::Transfer {
            from: user("alice"),
            to: user("bob"),
            amount: 200
        })
    );
    assert_supply_invariant(&ledger);
}

#[test]
fn transfer_of_entire_balance_succeeds() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 77).unwrap();
    ledger.transfer(user("alice"), user("bob"), 77).unwrap();
    assert_eq!(ledger.balance_of(user("alice")), 0);
}

#[test]
fn transfer_beyond_balance_rejected_without_side_effects() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 10).unwrap();
    let events = ledger.events().len();

    let err = ledger.transfer(user("alice"), user("bob"), 11).unwrap_err();

    assert_eq!(
        err,
        LedgerError::InsufficientBalance {
            account: user("alice"),
            balance: 10,
            requested: 11
        }
    );
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(ledger.balance_of(user("alice")), 10);
    assert_eq!(ledger.events().len(), events);
}

#[test]
fn transfer_to_zero_address_rejected() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 10).unwrap();
    let err = ledger.transfer(user("alice"), Address::ZERO, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn blacklisted_sender_or_recipient_blocks_transfer() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 10).unwrap();
    ledger.mint(admin, user("mallory"), 10).unwrap();
    ledger.blacklist(admin, user("mallory")).unwrap();

    let outgoing = ledger
        .transfer(user("mallory"), user("alice"), 1)
        .unwrap_err();
    assert_eq!(
        outgoing,
        LedgerError::Blacklisted {
            account: user("mallory")
        }
    );

    let incoming = ledger
        .transfer(user("alice"), user("mallory"), 1)
        .unwrap_err();
    assert_eq!(
        incoming,
        LedgerError::Blacklisted {
            account: user("mallory")
        }
    );
}

// ---------------------------------------------------------------------------
// Pause
// ---------------------------------------------------------------------------

#[test]
fn paused_ledger_rejects_transfer_but_allows_mint() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 1_000).unwrap();
    ledger.pause(admin).unwrap();

    // Sufficient balance does not matter while paused.
    let err = ledger.transfer(user("alice"), user("bob"), 1).unwrap_err();
    assert_eq!(err, LedgerError::Paused);
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    ledger.mint(admin, user("bob"), 5).unwrap();
    assert_eq!(ledger.balance_of(user("bob")), 5);
    assert_supply_invariant(&ledger);
}

#[test]
fn pause_check_precedes_blacklist_and_balance() {
    let (mut ledger, admin) = setup();
    ledger.blacklist(admin, user("mallory")).unwrap();
    ledger.pause(admin).unwrap();

    let err = ledger
        .transfer(user("mallory"), user("bob"), 1_000_000)
        .unwrap_err();
    assert_eq!(err, LedgerError::Paused);
}

#[test]
fn paused_ledger_rejects_approve_and_transfer_from() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 100).unwrap();
    ledger.approve(user("alice"), user("spender"), 50).unwrap();
    ledger.pause(admin).unwrap();

    assert_eq!(
        ledger.approve(user("alice"), user("spender"), 10),
        Err(LedgerError::Paused)
    );
    assert_eq!(
        ledger.transfer_from(user("spender"), user("alice"), user("bob"), 10),
        Err(LedgerError::Paused)
    );
}

#[test]
fn administrator_remediates_while_paused() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("mallory"), 40).unwrap();
    ledger.pause(admin).unwrap();

    ledger.blacklist(admin, user("mallory")).unwrap();
    ledger.burn_from(admin, user("mallory"), 40).unwrap();
    ledger.set_administrator(admin, user("new-governor")).unwrap();

    assert_eq!(ledger.total_supply(), 0);
    assert_eq!(ledger.administrator(), user("new-governor"));
    assert!(ledger.is_paused());
}

#[test]
fn pause_and_unpause_must_alternate() {
    let (mut ledger, admin) = setup();
    assert_eq!(ledger.unpause(admin), Err(LedgerError::NotPaused));
    ledger.pause(admin).unwrap();
    assert_eq!(ledger.pause(admin), Err(LedgerError::AlreadyPaused));
    ledger.unpause(admin).unwrap();
    assert!(!ledger.is_paused());
}

// ---------------------------------------------------------------------------
// Allowances
// ---------------------------------------------------------------------------

#[test]
fn allowance_is_spent_down_then_exhausted() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 100).unwrap();
    ledger.approve(user("alice"), user("spender"), 50).unwrap();

    ledger
        .transfer_from(user("spender"), user("alice"), user("bob"), 30)
        .unwrap();
    assert_eq!(ledger.allowance(user("alice"), user("spender")), 20);

    let err = ledger
        .transfer_from(user("spender"), user("alice"), user("bob"), 30)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert!(matches!(err, LedgerError::InsufficientAllowance { allowance: 20, .. }));
    assert_eq!(ledger.balance_of(user("bob")), 30);
    assert_eq!(ledger.allowance(user("alice"), user("spender")), 20);
}

#[test]
fn approve_overwrites_rather_than_adds() {
    let (mut ledger, _) = setup();
    ledger.approve(user("alice"), user("spender"), 50).unwrap();
    ledger.approve(user("alice"), user("spender"), 5).unwrap();
    assert_eq!(ledger.allowance(user("alice"), user("spender")), 5);
}

#[test]
fn unlimited_allowance_is_never_decremented() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 1_000).unwrap();
    ledger
        .approve(user("alice"), user("spender"), UNLIMITED)
        .unwrap();

    ledger
        .transfer_from(user("spender"), user("alice"), user("bob"), 400)
        .unwrap();
    ledger
        .transfer_from(user("spender"), user("alice"), user("bob"), 600)
        .unwrap();

    assert_eq!(ledger.allowance(user("alice"), user("spender")), UNLIMITED);
    assert_eq!(ledger.balance_of(user("bob")), 1_000);
}

#[test]
fn transfer_from_with_short_balance_keeps_allowance() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 10).unwrap();
    ledger.approve(user("alice"), user("spender"), 50).unwrap();

    let err = ledger
        .transfer_from(user("spender"), user("alice"), user("bob"), 20)
        .unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    assert_eq!(ledger.allowance(user("alice"), user("spender")), 50);
}

#[test]
fn transfer_from_checks_spender_blacklist() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 10).unwrap();
    ledger.approve(user("alice"), user("spender"), 10).unwrap();
    ledger.blacklist(admin, user("spender")).unwrap();

    let err = ledger
        .transfer_from(user("spender"), user("alice"), user("bob"), 1)
        .unwrap_err();
    assert_eq!(
        err,
        LedgerError::Blacklisted {
            account: user("spender")
        }
    );
}

#[test]
fn approve_rejects_blacklisted_spender() {
    let (mut ledger, admin) = setup();
    ledger.blacklist(admin, user("spender")).unwrap();
    let err = ledger
        .approve(user("alice"), user("spender"), 1)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

// ---------------------------------------------------------------------------
// Administrator surface
// ---------------------------------------------------------------------------

#[test]
fn only_administrator_may_run_privileged_operations() {
    let (mut ledger, _) = setup();
    let outsider = user("outsider");
    let unauthorized = LedgerError::Unauthorized { caller: outsider };

    assert_eq!(ledger.mint(outsider, outsider, 1), Err(unauthorized.clone()));
    assert_eq!(ledger.burn(outsider, 1), Err(unauthorized.clone()));
    assert_eq!(
        ledger.burn_from(outsider, user("alice"), 1),
        Err(unauthorized.clone())
    );
    assert_eq!(
        ledger.blacklist(outsider, user("alice")),
        Err(unauthorized.clone())
    );
    assert_eq!(
        ledger.un_blacklist(outsider, user("alice")),
        Err(unauthorized.clone())
    );
    assert_eq!(ledger.pause(outsider), Err(unauthorized.clone()));
    assert_eq!(ledger.unpause(outsider), Err(unauthorized.clone()));
    assert_eq!(
        ledger.set_administrator(outsider, outsider),
        Err(unauthorized)
    );
    assert!(ledger.events().is_empty());
}

#[test]
fn mint_rejects_zero_and_blacklisted_recipients() {
    let (mut ledger, admin) = setup();
    assert!(matches!(
        ledger.mint(admin, Address::ZERO, 1),
        Err(LedgerError::ZeroAddress { .. })
    ));
    ledger.blacklist(admin, user("mallory")).unwrap();
    assert_eq!(
        ledger.mint(admin, user("mallory"), 1),
        Err(LedgerError::Blacklisted {
            account: user("mallory")
        })
    );
    assert_eq!(ledger.total_supply(), 0);
}

#[test]
fn burn_emits_burn_and_transfer_to_zero() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, admin, 100).unwrap();

    ledger.burn(admin, 40).unwrap();

    assert_eq!(ledger.total_supply(), 60);
    let tail: Vec<_> = ledger
        .events()
        .records()
        .iter()
        .rev()
        .take(2)
        .map(|r| r.event.clone())
        .collect();
    assert_eq!(
        tail,
        vec![
            LedgerEvent::Transfer {
                from: admin,
                to: Address::ZERO,
                amount: 40
            },
            LedgerEvent::Burn {
                from: admin,
                amount: 40
            },
        ]
    );
}

#[test]
fn burn_from_beyond_balance_rejected() {
    let (mut ledger, admin) = setup();
    ledger.mint(admin, user("alice"), 5).unwrap();
    let err = ledger.burn_from(admin, user("alice"), 6).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(ledger.total_supply(), 5);
}

#[test]
fn blacklist_toggle_is_validated_each_way() {
    let (mut ledger, admin) = setup();
    let target = user("suspect");

    ledger.blacklist(admin, target).unwrap();
    assert!(ledger.is_blacklisted(target));
    let again = ledger.blacklist(admin, target).unwrap_err();
    assert_eq!(again, LedgerError::AlreadyBlacklisted { account: target });
    assert_eq!(again.kind(), ErrorKind::InvalidState);

    ledger.un_blacklist(admin, target).unwrap();
    assert!(!ledger.is_blacklisted(target));
    let again = ledger.un_blacklist(admin, target).unwrap_err();
    assert_eq!(again, LedgerError::NotBlacklisted { account: target });
}

#[test]
fn zero_address_cannot_be_blacklisted() {
    let (mut ledger, admin) = setup();
    let err = ledger.blacklist(admin, Address::ZERO).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn set_administrator_validates_candidate() {
    let (mut ledger, admin) = setup();
    let candidate = user("candidate");

    assert!(matches!(
        ledger.set_administrator(admin, Address::ZERO),
        Err(LedgerError::ZeroAddress { .. })
    ));
    assert_eq!(
        ledger.set_administrator(admin, admin),
        Err(LedgerError::SameAdministrator {
            administrator: admin
        })
    );

    ledger.blacklist(admin, candidate).unwrap();
    let err = ledger.set_administrator(admin, candidate).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    ledger.un_blacklist(admin, candidate).unwrap();
    ledger.set_administrator(admin, candidate).unwrap();

    assert_eq!(ledger.administrator(), candidate);
    assert_eq!(
        ledger.events().last(),
        Some(&LedgerEvent::AdministratorChanged {
            previous: admin,
            current: candidate
        })
    );
    // The old administrator lost every privilege.
    assert!(ledger.pause(admin).is_err());
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[test]
fn supply_invariant_holds_across_mixed_operations() {
    let (mut ledger, admin) = setup();
    let holders: Vec<Address> = (0..5).map(|i| user(&format!("holder-{i}"))).collect();

    for (i, holder) in holders.iter().enumerate() {
        ledger
            .mint(admin, *holder, 1_000 * (i as Amount + 1))
            .unwrap();
        assert_supply_invariant(&ledger);
    }

    for window in holders.windows(2) {
        ledger.transfer(window[1], window[0], 500).unwrap();
        assert_supply_invariant(&ledger);
    }

    ledger.approve(holders[4], holders[0], 300).unwrap();
    ledger
        .transfer_from(holders[0], holders[4], holders[2], 300)
        .unwrap();
    assert_supply_invariant(&ledger);

    ledger.burn_from(admin, holders[3], 250).unwrap();
    assert_supply_invariant(&ledger);

    // Failed calls leave the invariant (and everything else) untouched.
    let _ = ledger.transfer(holders[1], holders[2], Amount::MAX);
    let _ = ledger.burn_from(admin, holders[1], Amount::MAX);
    assert_supply_invariant(&ledger);

    assert_eq!(ledger.total_supply(), 15_000 - 250);
}
