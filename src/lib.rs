//! FairDraw - Provably Fair Draw Engine & Wallet Ledger
//!
//! Recurring-lottery core: fixed-price entries into a shared daily pool,
//! a single winner per draw, and a private host-funded lobby variant.
//!
//! ## Architecture
//!
//! - **Storage**: ReDB (ACID) + DashMap (lock-free balance cache)
//! - **Fairness**: commitment-reveal; every outcome is independently
//!   recomputable from published data
//! - **Money**: integer cents end to end, no floating point
//! - **Atomicity**: one write transaction per state-changing operation;
//!   errors abort with no partial effect
//!
//! Authentication, HTTP transport, payment providers and scheduling are
//! external collaborators: callers hand this crate authenticated user
//! ids and decide when draws lock and settle.

pub mod commitment;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod money;
pub mod types;

mod draws;
mod ledger;
mod lobby;
mod store;
mod tickets;

// ============================================================================
// PUBLIC API
// ============================================================================

pub use config::EngineConfig;
pub use engine::DrawEngine;
pub use error::{CoreError, CoreResult};
pub use events::{DrawEvent, EventBus};
pub use money::{format_cents, parse_amount, Cents};
pub use types::{
    Draw, DrawAudit, DrawStatus, DrawSummary, LedgerEntry, LedgerEntryKind, LedgerEntryStatus,
    Lobby, LobbyMember, LobbyStatus, SettlementOutcome, Ticket, TicketStatus, Wallet,
};

pub use lobby::MIN_LOBBY_PARTICIPANTS;
