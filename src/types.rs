//! Persisted data model.
//!
//! Records are stored as serde_json rows in the ReDB tables defined in
//! `store`. Wallets and ledger entries are mutated exclusively through
//! ledger operations inside a store transaction; draws, tickets, lobbies
//! and lobby members are owned and mutated exclusively by this crate.

use serde::{Deserialize, Serialize};

use crate::money::Cents;

// ============================================================================
// WALLET & LEDGER
// ============================================================================

/// Per-user wallet. Balance is integer cents and can never go negative:
/// the debit operation rejects before it underflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Owning user id (also the storage key)
    pub owner: String,
    /// Spendable balance in cents
    pub balance: Cents,
    /// Amount moved out of balance by a pending withdrawal request
    pub pending_withdrawal: Cents,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Kind of a ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Deposit,
    Withdrawal,
    TicketPurchase,
    PrizeWin,
    AdminFee,
    /// Host funding a lobby pot (wallet-to-pool transfer, not a sale)
    PotSeed,
}

/// Status of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryStatus {
    Completed,
    Pending,
    Rejected,
}

/// Append-only audit record for every wallet mutation. Never mutated
/// after creation; a withdrawal that comes back is recorded as a new
/// correcting entry, not a rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    /// Store-wide append sequence; total order over all movements
    pub seq: u64,
    pub owner: String,
    pub kind: LedgerEntryKind,
    /// Signed amount in cents: negative for debits, positive for credits
    pub amount: i64,
    /// Wallet balance immediately after this movement
    pub resulting_balance: Cents,
    pub status: LedgerEntryStatus,
    /// Free-form context (draw id, lobby id, ...)
    pub metadata: serde_json::Value,
    pub timestamp: u64,
}

// ============================================================================
// DRAWS & TICKETS
// ============================================================================

/// Draw lifecycle. Transitions strictly forward; `Drawn` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawStatus {
    Open,
    Locked,
    Drawn,
}

/// A shared daily prize pool.
///
/// The seed is generated and its commitment computed at creation time,
/// before any entry is accepted; the commitment is what binds the
/// operator to an outcome it cannot later steer. The seed itself is
/// never exposed while the draw is open; external callers see
/// [`DrawSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draw {
    pub id: String,
    /// Calendar date of the draw, `YYYY-MM-DD`, unique per draw
    pub date: String,
    /// Accumulated prize pool in cents
    pub prize_pool: Cents,
    pub total_entries: u64,
    /// Published commitment hash (64 lowercase hex chars)
    pub commitment: String,
    /// Secret seed (64 lowercase hex chars); revealed via settlement
    pub seed: String,
    pub status: DrawStatus,
    /// 0-based winning entry index, set at settlement
    pub winning_index: Option<u64>,
    /// Destination draw id if a zero-entry pool was rolled forward
    pub rolled_over_to: Option<String>,
    pub created_at: u64,
    pub drawn_at: Option<u64>,
}

impl Draw {
    /// Client-safe view: everything public, seed withheld until drawn.
    pub fn summary(&self) -> DrawSummary {
        DrawSummary {
            id: self.id.clone(),
            date: self.date.clone(),
            prize_pool: self.prize_pool,
            total_entries: self.total_entries,
            commitment: self.commitment.clone(),
            status: self.status,
            winning_index: self.winning_index,
            seed: match self.status {
                DrawStatus::Drawn => Some(self.seed.clone()),
                _ => None,
            },
        }
    }
}

/// Public projection of a draw. The seed appears only once the draw is
/// terminal, at which point it is exactly what an auditor needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawSummary {
    pub id: String,
    pub date: String,
    pub prize_pool: Cents,
    pub total_entries: u64,
    pub commitment: String,
    pub status: DrawStatus,
    pub winning_index: Option<u64>,
    pub seed: Option<String>,
}

/// Ticket status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Active,
    Won,
    Lost,
}

/// One entry in a draw. Created atomically with the wallet debit and
/// mutated exactly once, at settlement (status + prize amount).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub draw_id: String,
    pub user_id: String,
    /// 1-based index among the draw's entries, assigned at purchase
    pub position: u64,
    /// Draw entry count immediately after this purchase
    pub entries_at_purchase: u64,
    /// Keyed tamper seal over the immutable fields
    pub seal: String,
    pub status: TicketStatus,
    pub prize_amount: Option<Cents>,
    pub purchased_at: u64,
}

// ============================================================================
// LOBBIES
// ============================================================================

/// Lobby lifecycle, same shape as [`DrawStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyStatus {
    Open,
    Locked,
    Drawn,
}

/// A private, host-funded draw. Entries are the member list rather than
/// purchased tickets; commitment-reveal and fee split are identical to
/// the shared draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lobby {
    pub id: String,
    pub join_code: String,
    pub host_id: String,
    /// Host-funded pot in cents
    pub prize_pool: Cents,
    pub status: LobbyStatus,
    pub commitment: String,
    pub seed: String,
    pub winning_index: Option<u64>,
    pub max_participants: u64,
    pub created_at: u64,
    pub drawn_at: Option<u64>,
}

/// Lobby membership row. `join_seq` is the monotonically assigned join
/// order; winner selection sorts by `(joined_at, user_id)` so the entry
/// list is reproducible no matter how storage iterates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyMember {
    pub lobby_id: String,
    pub user_id: String,
    pub joined_at: u64,
    pub join_seq: u64,
}

// ============================================================================
// SETTLEMENT
// ============================================================================

/// Result of settling a draw or lobby: everything a caller (and any
/// third-party verifier) needs to reproduce the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementOutcome {
    /// Draw or lobby id
    pub pool_id: String,
    pub winner_id: String,
    pub winner_amount: Cents,
    pub admin_fee: Cents,
    /// Revealed seed
    pub seed: String,
    /// Commitment that was published before entries were accepted
    pub commitment: String,
    pub winning_index: u64,
    pub total_entries: u64,
}

/// Independent recomputation of a settled draw from stored data
#[derive(Debug, Clone, Serialize)]
pub struct DrawAudit {
    pub draw_id: String,
    pub commitment_valid: bool,
    /// Stored winning index vs recomputed, when the draw is settled
    pub winning_index_valid: Option<bool>,
}
