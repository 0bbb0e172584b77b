//! Wallet ledger.
//!
//! Balances plus an append-only movement log. The transaction-scoped
//! `debit_tx`/`credit_tx` are the ONLY code paths that mutate a wallet;
//! every mutation appends a `LedgerEntry` carrying the signed delta and
//! the resulting balance in the same transaction, so the audit trail can
//! never drift from the balances.
//!
//! Debit enforces the non-negative invariant itself: a short wallet gets
//! `InsufficientBalance` and the caller's transaction aborts with no
//! partial effect.

use serde_json::json;
use tracing::info;

use crate::engine::{current_timestamp, DrawEngine};
use crate::error::{CoreError, CoreResult};
use crate::money::Cents;
use crate::store::{self, LEDGER, WALLETS};
use crate::types::{LedgerEntry, LedgerEntryKind, LedgerEntryStatus, Wallet};

// ============================================================================
// TRANSACTION-SCOPED OPERATIONS
// ============================================================================

pub(crate) fn load_wallet_tx(
    txn: &redb::WriteTransaction,
    owner: &str,
) -> CoreResult<Option<Wallet>> {
    store::get_json(txn, WALLETS, owner)
}

pub(crate) fn save_wallet_tx(txn: &redb::WriteTransaction, wallet: &Wallet) -> CoreResult<()> {
    store::put_json(txn, WALLETS, &wallet.owner, wallet)
}

fn append_entry_tx(
    txn: &redb::WriteTransaction,
    owner: &str,
    amount: i64,
    resulting_balance: Cents,
    kind: LedgerEntryKind,
    status: LedgerEntryStatus,
    metadata: serde_json::Value,
) -> CoreResult<LedgerEntry> {
    let seq = store::next_seq(txn, "ledger_seq")?;
    let entry = LedgerEntry {
        id: uuid::Uuid::new_v4().to_string(),
        seq,
        owner: owner.to_string(),
        kind,
        amount,
        resulting_balance,
        status,
        metadata,
        timestamp: current_timestamp(),
    };
    // Zero-padded sequence key: table order is append order
    store::put_json(txn, LEDGER, &format!("{:020}", seq), &entry)?;
    Ok(entry)
}

/// Debit a wallet inside the caller's transaction.
///
/// Fails with `InsufficientBalance` when the balance cannot cover the
/// amount; the caller aborts, so no partial debit is ever observable.
/// Returns the balance after the debit.
pub(crate) fn debit_tx(
    txn: &redb::WriteTransaction,
    owner: &str,
    amount: Cents,
    kind: LedgerEntryKind,
    metadata: serde_json::Value,
) -> CoreResult<Cents> {
    let mut wallet =
        load_wallet_tx(txn, owner)?.ok_or_else(|| CoreError::WalletNotFound(owner.to_string()))?;

    if wallet.balance < amount {
        return Err(CoreError::InsufficientBalance {
            available: wallet.balance,
            required: amount,
        });
    }

    wallet.balance -= amount;
    wallet.updated_at = current_timestamp();
    save_wallet_tx(txn, &wallet)?;
    append_entry_tx(
        txn,
        owner,
        -(amount as i64),
        wallet.balance,
        kind,
        LedgerEntryStatus::Completed,
        metadata,
    )?;
    Ok(wallet.balance)
}

/// Credit a wallet inside the caller's transaction, creating the wallet
/// lazily if it does not exist yet. Returns the balance after the credit.
pub(crate) fn credit_tx(
    txn: &redb::WriteTransaction,
    owner: &str,
    amount: Cents,
    kind: LedgerEntryKind,
    metadata: serde_json::Value,
) -> CoreResult<Cents> {
    let now = current_timestamp();
    let mut wallet = load_wallet_tx(txn, owner)?.unwrap_or_else(|| Wallet {
        owner: owner.to_string(),
        balance: 0,
        pending_withdrawal: 0,
        created_at: now,
        updated_at: now,
    });

    wallet.balance += amount;
    wallet.updated_at = now;
    save_wallet_tx(txn, &wallet)?;
    append_entry_tx(
        txn,
        owner,
        amount as i64,
        wallet.balance,
        kind,
        LedgerEntryStatus::Completed,
        metadata,
    )?;
    Ok(wallet.balance)
}

// ============================================================================
// ENGINE WALLET SURFACE
// ============================================================================

impl DrawEngine {
    /// Get or create a wallet for a user.
    pub fn create_wallet(&self, owner: &str) -> CoreResult<Wallet> {
        let txn = self.store.begin_write()?;
        let wallet = match load_wallet_tx(&txn, owner)? {
            Some(existing) => {
                // Nothing to write; drop the transaction untouched
                return Ok(existing);
            }
            None => {
                let now = current_timestamp();
                let wallet = Wallet {
                    owner: owner.to_string(),
                    balance: 0,
                    pending_withdrawal: 0,
                    created_at: now,
                    updated_at: now,
                };
                save_wallet_tx(&txn, &wallet)?;
                wallet
            }
        };
        txn.commit()?;
        self.store.cache_balance(owner, wallet.balance);
        info!(owner = %owner, "Wallet created");
        Ok(wallet)
    }

    /// Credit external funds into a wallet (`deposit` ledger entry).
    pub fn deposit(&self, owner: &str, amount: Cents) -> CoreResult<Cents> {
        if amount == 0 {
            return Err(CoreError::InvalidAmount("deposit of zero".to_string()));
        }
        let txn = self.store.begin_write()?;
        let balance = credit_tx(&txn, owner, amount, LedgerEntryKind::Deposit, json!({}))?;
        txn.commit()?;
        self.store.cache_balance(owner, balance);
        info!(owner = %owner, amount = amount, balance = balance, "Deposit credited");
        Ok(balance)
    }

    /// Earmark funds for withdrawal: balance moves to pending, the
    /// payment-provider integration (external) takes it from there.
    pub fn request_withdrawal(&self, owner: &str, amount: Cents) -> CoreResult<Cents> {
        if amount == 0 {
            return Err(CoreError::InvalidAmount("withdrawal of zero".to_string()));
        }
        let txn = self.store.begin_write()?;
        let mut wallet = load_wallet_tx(&txn, owner)?
            .ok_or_else(|| CoreError::WalletNotFound(owner.to_string()))?;

        if wallet.balance < amount {
            return Err(CoreError::InsufficientBalance {
                available: wallet.balance,
                required: amount,
            });
        }

        wallet.balance -= amount;
        wallet.pending_withdrawal += amount;
        wallet.updated_at = current_timestamp();
        save_wallet_tx(&txn, &wallet)?;
        append_entry_tx(
            &txn,
            owner,
            -(amount as i64),
            wallet.balance,
            LedgerEntryKind::Withdrawal,
            LedgerEntryStatus::Pending,
            json!({}),
        )?;
        let balance = wallet.balance;
        txn.commit()?;
        self.store.cache_balance(owner, balance);
        info!(owner = %owner, amount = amount, "Withdrawal requested");
        Ok(balance)
    }

    /// Return earmarked funds to the balance (withdrawal rejected or
    /// cancelled upstream). Appends a correcting entry; the original
    /// pending entry is never rewritten.
    pub fn cancel_withdrawal(&self, owner: &str, amount: Cents) -> CoreResult<Cents> {
        let txn = self.store.begin_write()?;
        let mut wallet = load_wallet_tx(&txn, owner)?
            .ok_or_else(|| CoreError::WalletNotFound(owner.to_string()))?;

        if wallet.pending_withdrawal < amount {
            return Err(CoreError::InvalidAmount(format!(
                "pending withdrawal is {}, cannot cancel {}",
                wallet.pending_withdrawal, amount
            )));
        }

        wallet.pending_withdrawal -= amount;
        wallet.balance += amount;
        wallet.updated_at = current_timestamp();
        save_wallet_tx(&txn, &wallet)?;
        append_entry_tx(
            &txn,
            owner,
            amount as i64,
            wallet.balance,
            LedgerEntryKind::Withdrawal,
            LedgerEntryStatus::Rejected,
            json!({ "reason": "cancelled" }),
        )?;
        let balance = wallet.balance;
        txn.commit()?;
        self.store.cache_balance(owner, balance);
        info!(owner = %owner, amount = amount, "Withdrawal cancelled");
        Ok(balance)
    }

    /// Balance lookup: lock-free cache fast path, store fallback.
    /// Unknown wallets read as zero.
    pub fn get_balance(&self, owner: &str) -> Cents {
        if let Some(balance) = self.store.cached_balance(owner) {
            return balance;
        }
        match self.store.read_json::<Wallet>(WALLETS, owner) {
            Ok(Some(wallet)) => {
                self.store.cache_balance(owner, wallet.balance);
                wallet.balance
            }
            _ => 0,
        }
    }

    pub fn get_wallet(&self, owner: &str) -> CoreResult<Option<Wallet>> {
        self.store.read_json(WALLETS, owner)
    }

    /// Movement history for a user, newest first.
    pub fn ledger_for_user(&self, owner: &str, limit: usize) -> CoreResult<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> =
            self.store.scan_json(LEDGER, |e: &LedgerEntry| e.owner == owner)?;
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        entries.truncate(limit);
        Ok(entries)
    }
}
