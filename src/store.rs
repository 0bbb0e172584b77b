//! Transactional storage layer.
//!
//! ReDB (ACID embedded database) + DashMap (lock-free balance cache).
//!
//! ## Concurrency model
//! - Reads: lock-free via the DashMap cache, disk fallback on miss
//! - Writes: one ReDB write transaction per state-changing operation;
//!   the single-writer MVCC serializes contending operations the way
//!   row-level `FOR UPDATE` locks do in a relational store
//! - Uniqueness: keyed index tables written inside the same transaction
//!   act as the constraints that close concurrent-request race windows
//!
//! The cache is only ever refreshed after a successful commit, so a
//! rolled-back transaction can never leak a phantom balance.

use std::sync::Arc;

use dashmap::DashMap;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::CoreResult;
use crate::money::Cents;

// ============================================================================
// TABLE DEFINITIONS
// ============================================================================

/// Wallets: owner id → Wallet (JSON)
pub(crate) const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// Ledger entries: zero-padded sequence number → LedgerEntry (JSON).
/// Keys sort in append order, so iteration is the audit trail.
pub(crate) const LEDGER: TableDefinition<&str, &[u8]> = TableDefinition::new("ledger");

/// Store-wide counters (ledger sequence)
pub(crate) const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

/// Draws: draw id → Draw (JSON)
pub(crate) const DRAWS: TableDefinition<&str, &[u8]> = TableDefinition::new("draws");

/// Draw date index: date (YYYY-MM-DD) → draw id. One draw per date.
pub(crate) const DRAW_DATES: TableDefinition<&str, &str> = TableDefinition::new("draw_dates");

/// Tickets: ticket id → Ticket (JSON)
pub(crate) const TICKETS: TableDefinition<&str, &[u8]> = TableDefinition::new("tickets");

/// Ticket uniqueness constraint: "draw_id:user_id" → ticket id.
/// One active ticket per (user, draw), enforced at insert time.
pub(crate) const TICKET_SLOTS: TableDefinition<&str, &str> = TableDefinition::new("ticket_slots");

/// Position index: "draw_id:zero-padded position" → ticket id
pub(crate) const TICKET_POSITIONS: TableDefinition<&str, &str> =
    TableDefinition::new("ticket_positions");

/// Lobbies: lobby id → Lobby (JSON)
pub(crate) const LOBBIES: TableDefinition<&str, &[u8]> = TableDefinition::new("lobbies");

/// Join-code index: code → lobby id
pub(crate) const LOBBY_CODES: TableDefinition<&str, &str> = TableDefinition::new("lobby_codes");

/// Lobby membership: "lobby_id:user_id" → LobbyMember (JSON)
pub(crate) const LOBBY_MEMBERS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("lobby_members");

/// Composite key for the slot / membership index tables
pub(crate) fn slot_key(scope_id: &str, user_id: &str) -> String {
    format!("{}:{}", scope_id, user_id)
}

/// Composite key for the position index (zero-padded so keys sort)
pub(crate) fn position_key(draw_id: &str, position: u64) -> String {
    format!("{}:{:08}", draw_id, position)
}

// ============================================================================
// STORE HANDLE
// ============================================================================

/// Storage handle shared by every engine clone.
///
/// `Clone` is cheap (Arc handles); all methods are `&self`.
#[derive(Clone)]
pub struct LotteryStore {
    db: Arc<Database>,
    /// owner id → balance in cents, refreshed after successful commits
    balances: Arc<DashMap<String, Cents>>,
}

impl LotteryStore {
    /// Create or open the store at the given directory.
    pub fn open(path: &str) -> CoreResult<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| crate::error::CoreError::Storage(e.to_string()))?;
            }
        }
        std::fs::create_dir_all(path)
            .map_err(|e| crate::error::CoreError::Storage(e.to_string()))?;

        let db = Database::create(format!("{}/fairdraw.redb", path))?;

        // Initialize tables so later read transactions never miss
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(LEDGER)?;
            let _ = write_txn.open_table(META)?;
            let _ = write_txn.open_table(DRAWS)?;
            let _ = write_txn.open_table(DRAW_DATES)?;
            let _ = write_txn.open_table(TICKETS)?;
            let _ = write_txn.open_table(TICKET_SLOTS)?;
            let _ = write_txn.open_table(TICKET_POSITIONS)?;
            let _ = write_txn.open_table(LOBBIES)?;
            let _ = write_txn.open_table(LOBBY_CODES)?;
            let _ = write_txn.open_table(LOBBY_MEMBERS)?;
        }
        write_txn.commit()?;

        // Warm the balance cache from persisted wallets
        let balances = Arc::new(DashMap::new());
        {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(WALLETS)?;
            for item in table.iter()? {
                let (key, value) = item?;
                if let Ok(wallet) = serde_json::from_slice::<crate::types::Wallet>(value.value()) {
                    balances.insert(key.value().to_string(), wallet.balance);
                }
            }
        }

        info!(path = %path, wallets = balances.len(), "Store opened");

        Ok(Self {
            db: Arc::new(db),
            balances,
        })
    }

    pub(crate) fn begin_write(&self) -> CoreResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    pub(crate) fn begin_read(&self) -> CoreResult<redb::ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    /// Cache fast path for balance reads (lock-free)
    pub(crate) fn cached_balance(&self, owner: &str) -> Option<Cents> {
        self.balances.get(owner).map(|b| *b)
    }

    /// Refresh the cache after a successful commit
    pub(crate) fn cache_balance(&self, owner: &str, balance: Cents) {
        self.balances.insert(owner.to_string(), balance);
    }

    /// Read one JSON row outside any write transaction
    pub(crate) fn read_json<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&'static str, &'static [u8]>,
        key: &str,
    ) -> CoreResult<Option<T>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(table)?;
        let bytes = match table.get(key)? {
            Some(guard) => guard.value().to_vec(),
            None => return Ok(None),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Read one index row (string value) outside any write transaction
    pub(crate) fn read_index(
        &self,
        table: TableDefinition<&'static str, &'static str>,
        key: &str,
    ) -> CoreResult<Option<String>> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(table)?;
        Ok(table.get(key)?.map(|guard| guard.value().to_string()))
    }

    /// Collect every JSON row of a table that matches a filter.
    ///
    /// Full-scan-and-filter is fine at this scale and keeps the storage
    /// schema free of secondary indexes that can drift.
    pub(crate) fn scan_json<T, F>(
        &self,
        table: TableDefinition<&'static str, &'static [u8]>,
        mut keep: F,
    ) -> CoreResult<Vec<T>>
    where
        T: DeserializeOwned,
        F: FnMut(&T) -> bool,
    {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(table)?;
        let mut out = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            let row: T = serde_json::from_slice(value.value())?;
            if keep(&row) {
                out.push(row);
            }
        }
        Ok(out)
    }
}

// ============================================================================
// TRANSACTION-SCOPED HELPERS
// ============================================================================
//
// Each helper opens its table in a scope and drops it before returning,
// so callers can compose several helpers inside one write transaction.

/// Insert or overwrite a JSON row
pub(crate) fn put_json<T: Serialize>(
    txn: &WriteTransaction,
    table: TableDefinition<&'static str, &'static [u8]>,
    key: &str,
    value: &T,
) -> CoreResult<()> {
    let bytes = serde_json::to_vec(value)?;
    let mut table = txn.open_table(table)?;
    table.insert(key, bytes.as_slice())?;
    Ok(())
}

/// Read a JSON row inside a write transaction
pub(crate) fn get_json<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: TableDefinition<&'static str, &'static [u8]>,
    key: &str,
) -> CoreResult<Option<T>> {
    let bytes = {
        let table = txn.open_table(table)?;
        let value = match table.get(key)? {
            Some(guard) => Some(guard.value().to_vec()),
            None => None,
        };
        value
    };
    match bytes {
        Some(b) => Ok(Some(serde_json::from_slice(&b)?)),
        None => Ok(None),
    }
}

/// Insert into an index table, reporting whether the key was free.
///
/// Returns `false` when a row already existed; the caller surfaces its
/// own constraint-violation error and aborts the transaction, so the
/// overwritten value never becomes visible.
pub(crate) fn insert_unique(
    txn: &WriteTransaction,
    table: TableDefinition<&'static str, &'static str>,
    key: &str,
    value: &str,
) -> CoreResult<bool> {
    let mut table = txn.open_table(table)?;
    let previous = table.insert(key, value)?;
    Ok(previous.is_none())
}

/// Read an index row inside a write transaction
pub(crate) fn get_index(
    txn: &WriteTransaction,
    table: TableDefinition<&'static str, &'static str>,
    key: &str,
) -> CoreResult<Option<String>> {
    let table = txn.open_table(table)?;
    let value = table.get(key)?.map(|guard| guard.value().to_string());
    Ok(value)
}

/// Advance and return a named monotonic counter, inside the caller's
/// transaction. Starts at 1.
pub(crate) fn next_seq(txn: &WriteTransaction, counter: &str) -> CoreResult<u64> {
    let mut table = txn.open_table(META)?;
    let next = table.get(counter)?.map(|g| g.value()).unwrap_or(0) + 1;
    table.insert(counter, next)?;
    Ok(next)
}

/// Collect matching JSON rows inside a write transaction
pub(crate) fn scan_json_tx<T, F>(
    txn: &WriteTransaction,
    table: TableDefinition<&'static str, &'static [u8]>,
    mut keep: F,
) -> CoreResult<Vec<T>>
where
    T: DeserializeOwned,
    F: FnMut(&T) -> bool,
{
    let table = txn.open_table(table)?;
    let mut out = Vec::new();
    for item in table.iter()? {
        let (_, value) = item?;
        let row: T = serde_json::from_slice(value.value())?;
        if keep(&row) {
            out.push(row);
        }
    }
    Ok(out)
}
