//! Concurrent access through [`SharedHost`].
//!
//! Calls from many threads are serialized by the host lock, so the ledger's
//! supply invariant and the vault's confirmation accounting hold no matter
//! how the calls interleave.

use std::thread;

use custodia_contracts::{
    AuthorizationVault, LedgerCall, LedgerConfig, RegulatedLedger, SharedHost, VaultCall,
};
use custodia_protocol::{Address, Amount};

const THREADS: usize = 8;
const ROUNDS: usize = 200;

fn holder(i: usize) -> Address {
    Address::derive(&format!("holder-{i}"))
}

#[test]
fn parallel_transfers_preserve_supply() {
    let admin = Address::derive("admin");
    let ledger = Address::derive("ledger");
    let shared = SharedHost::default();
    shared
        .deploy(
            ledger,
            RegulatedLedger::new(ledger, LedgerConfig::default(), admin).unwrap(),
        )
        .unwrap();

    for i in 0..THREADS {
        let mint = LedgerCall::Mint {
            to: holder(i),
            amount: 10_000,
        }
        .encode()
        .unwrap();
        shared.call(admin, ledger, 0, &mint).unwrap();
    }

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let shared = shared.clone();
            thread::spawn(move || {
                let me = holder(i);
                let mut moved: Amount = 0;
                for round in 0..ROUNDS {
                    let to = holder((i + round + 1) % THREADS);
                    let transfer = LedgerCall::Transfer {
                        to,
                        amount: (round % 7) as Amount + 1,
                    }
                    .encode()
                    .unwrap();
                    // Some transfers may fail once a holder runs low; that is fine.
                    if shared.call(me, ledger, 0, &transfer).is_ok() {
                        moved += 1;
                    }
                }
                moved
            })
        })
        .collect();

    let successes: Amount = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(successes > 0);

    shared
        .with_contract::<RegulatedLedger, _>(ledger, |l| {
            assert_eq!(l.total_supply(), 10_000 * THREADS as Amount);
            assert_eq!(l.sum_of_balances(), Some(l.total_supply()));
        })
        .expect("ledger deployed");
}

#[test]
fn concurrent_confirmations_are_counted_once() {
    let vault = Address::derive("vault");
    let owners: Vec<Address> = (0..THREADS)
        .map(|i| Address::derive(&format!("owner-{i}")))
        .collect();
    let shared = SharedHost::default();
    shared
        .deploy(
            vault,
            AuthorizationVault::new(vault, owners.clone(), THREADS as u32).unwrap(),
        )
        .unwrap();

    let submit = VaultCall::Submit {
        target: Address::derive("target"),
        value: 0,
        payload: vec![],
    }
    .encode()
    .unwrap();
    shared.call(owners[0], vault, 0, &submit).unwrap();

    // Every owner tries to confirm twice; only the first attempt may land.
    let handles: Vec<_> = owners
        .iter()
        .copied()
        .map(|owner| {
            let shared = shared.clone();
            thread::spawn(move || {
                let confirm = VaultCall::Confirm { index: 0 }.encode().unwrap();
                let first = shared.call(owner, vault, 0, &confirm).is_ok();
                let second = shared.call(owner, vault, 0, &confirm).is_ok();
                (first, second)
            })
        })
        .collect();

    for handle in handles {
        let (first, second) = handle.join().unwrap();
        assert!(first);
        assert!(!second);
    }

    let count = shared
        .with_contract::<AuthorizationVault, _>(vault, |v| {
            v.proposal(0).map(|p| p.confirmation_count)
        })
        .flatten();
    assert_eq!(count, Some(THREADS as u32));

    let execute = VaultCall::Execute { index: 0 }.encode().unwrap();
    shared.call(owners[3], vault, 0, &execute).unwrap();
}
