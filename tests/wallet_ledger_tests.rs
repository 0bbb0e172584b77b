//! Wallet Ledger Tests
//!
//! Balances, the append-only audit trail, and the non-negative-balance
//! invariant under both sequential and concurrent access.


use fairdraw::{CoreError, LedgerEntryKind, LedgerEntryStatus};
use test_helpers::{fund, test_engine};

// ============================================================================
// BASIC WALLET OPERATIONS
// ============================================================================

#[test]
fn test_new_wallet_has_zero_balance() {
    let (engine, _dir) = test_engine();

    let wallet = engine.create_wallet("alice").unwrap();
    assert_eq!(wallet.balance, 0);
    assert_eq!(wallet.pending_withdrawal, 0);
    assert_eq!(engine.get_balance("alice"), 0);
}

#[test]
fn test_create_wallet_is_idempotent() {
    let (engine, _dir) = test_engine();

    engine.create_wallet("alice").unwrap();
    engine.deposit("alice", 500).unwrap();

    // A second create must not reset the balance
    let wallet = engine.create_wallet("alice").unwrap();
    assert_eq!(wallet.balance, 500);
}

#[test]
fn test_deposit_credits_balance() {
    let (engine, _dir) = test_engine();

    fund(&engine, "alice", 250);
    assert_eq!(engine.get_balance("alice"), 250);

    engine.deposit("alice", 100).unwrap();
    assert_eq!(engine.get_balance("alice"), 350);
}

#[test]
fn test_zero_deposit_rejected() {
    let (engine, _dir) = test_engine();
    engine.create_wallet("alice").unwrap();

    assert!(matches!(
        engine.deposit("alice", 0),
        Err(CoreError::InvalidAmount(_))
    ));
}

#[test]
fn test_unknown_wallet_reads_as_zero() {
    let (engine, _dir) = test_engine();
    assert_eq!(engine.get_balance("nobody"), 0);
    assert!(engine.get_wallet("nobody").unwrap().is_none());
}

// ============================================================================
// WITHDRAWALS
// ============================================================================

#[test]
fn test_withdrawal_moves_balance_to_pending() {
    let (engine, _dir) = test_engine();
    fund(&engine, "alice", 1000);

    let balance = engine.request_withdrawal("alice", 400).unwrap();
    assert_eq!(balance, 600);

    let wallet = engine.get_wallet("alice").unwrap().unwrap();
    assert_eq!(wallet.balance, 600);
    assert_eq!(wallet.pending_withdrawal, 400);
}

#[test]
fn test_withdrawal_rejects_overdraft() {
    let (engine, _dir) = test_engine();
    fund(&engine, "alice", 100);

    let err = engine.request_withdrawal("alice", 500).unwrap_err();
    assert!(matches!(
        err,
        CoreError::InsufficientBalance {
            available: 100,
            required: 500
        }
    ));
    // Nothing moved
    let wallet = engine.get_wallet("alice").unwrap().unwrap();
    assert_eq!(wallet.balance, 100);
    assert_eq!(wallet.pending_withdrawal, 0);
}

#[test]
fn test_cancel_withdrawal_restores_balance() {
    let (engine, _dir) = test_engine();
    fund(&engine, "alice", 1000);

    engine.request_withdrawal("alice", 400).unwrap();
    let balance = engine.cancel_withdrawal("alice", 400).unwrap();
    assert_eq!(balance, 1000);

    let wallet = engine.get_wallet("alice").unwrap().unwrap();
    assert_eq!(wallet.pending_withdrawal, 0);
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

#[test]
fn test_every_mutation_appends_an_entry() {
    let (engine, _dir) = test_engine();
    fund(&engine, "alice", 1000);
    engine.request_withdrawal("alice", 300).unwrap();
    engine.cancel_withdrawal("alice", 300).unwrap();

    let entries = engine.ledger_for_user("alice", 100).unwrap();
    assert_eq!(entries.len(), 3);

    // Newest first; resulting_balance tracks the wallet after each step
    assert_eq!(entries[0].kind, LedgerEntryKind::Withdrawal);
    assert_eq!(entries[0].status, LedgerEntryStatus::Rejected);
    assert_eq!(entries[0].amount, 300);
    assert_eq!(entries[0].resulting_balance, 1000);

    assert_eq!(entries[1].kind, LedgerEntryKind::Withdrawal);
    assert_eq!(entries[1].status, LedgerEntryStatus::Pending);
    assert_eq!(entries[1].amount, -300);
    assert_eq!(entries[1].resulting_balance, 700);

    assert_eq!(entries[2].kind, LedgerEntryKind::Deposit);
    assert_eq!(entries[2].amount, 1000);
    assert_eq!(entries[2].resulting_balance, 1000);
}

#[test]
fn test_ledger_is_scoped_per_user() {
    let (engine, _dir) = test_engine();
    fund(&engine, "alice", 100);
    fund(&engine, "bob", 200);

    let alice_entries = engine.ledger_for_user("alice", 100).unwrap();
    assert_eq!(alice_entries.len(), 1);
    assert!(alice_entries.iter().all(|e| e.owner == "alice"));
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_concurrent_deposits_serialize() {
    let (engine, _dir) = test_engine();
    engine.create_wallet("alice").unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..10 {
                engine.deposit("alice", 5).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // 8 threads x 10 deposits x 5 cents, no lost updates
    assert_eq!(engine.get_balance("alice"), 400);
    assert_eq!(engine.ledger_for_user("alice", 1000).unwrap().len(), 80);
}

#[test]
fn test_concurrent_withdrawals_never_overdraw() {
    let (engine, _dir) = test_engine();
    fund(&engine, "alice", 100);

    // Ten racing requests for the full balance: exactly one can win
    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = engine.clone();
        handles.push(std::thread::spawn(move || {
            engine.request_withdrawal("alice", 100).is_ok()
        }));
    }
    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    let wallet = engine.get_wallet("alice").unwrap().unwrap();
    assert_eq!(wallet.balance, 0);
    assert_eq!(wallet.pending_withdrawal, 100);
}
