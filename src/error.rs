//! Core error taxonomy.
//!
//! Every financial operation returns a specific variant, never a generic
//! failure, so callers can distinguish "add funds and retry" from "this
//! draw is already closed". Any error raised inside a store transaction
//! aborts the whole transaction.

use crate::money::Cents;

/// Result type for all core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Core errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: Cents, required: Cents },

    #[error("user {user_id} already holds a ticket for draw {draw_id}")]
    DuplicateTicket { user_id: String, draw_id: String },

    #[error("draw {0} is closed to purchases")]
    DrawClosed(String),

    #[error("draw {0} is already locked")]
    AlreadyLocked(String),

    #[error("draw {0} is not locked for settlement")]
    DrawNotLocked(String),

    #[error("draw {0} has already been drawn")]
    AlreadyDrawn(String),

    #[error("draw {0} has no entries")]
    NoEntries(String),

    #[error("a draw already exists for date {0}")]
    DrawAlreadyExists(String),

    #[error("lobby {0} is locked")]
    LobbyLocked(String),

    #[error("lobby {0} is full")]
    LobbyFull(String),

    #[error("user {user_id} is already a member of lobby {lobby_id}")]
    AlreadyMember { user_id: String, lobby_id: String },

    #[error("lobby {lobby_id} needs at least {required} participants, has {actual}")]
    MinParticipantsNotMet {
        lobby_id: String,
        required: u64,
        actual: u64,
    },

    #[error("lobby {0} pot is not funded")]
    PotNotFunded(String),

    #[error("caller {caller} is not the host of lobby {lobby_id}")]
    NotHost { caller: String, lobby_id: String },

    /// Fatal integrity failure: the stored seed no longer matches its
    /// published commitment. Settlement halts and the draw is surfaced
    /// for manual audit.
    #[error("commitment mismatch for {0}: stored seed does not match published hash")]
    CommitmentMismatch(String),

    #[error("wallet not found: {0}")]
    WalletNotFound(String),

    #[error("draw not found: {0}")]
    DrawNotFound(String),

    #[error("lobby not found: {0}")]
    LobbyNotFound(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid draw date: {0}")]
    InvalidDate(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("codec error: {0}")]
    Codec(String),
}

impl From<redb::DatabaseError> for CoreError {
    fn from(e: redb::DatabaseError) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<redb::TransactionError> for CoreError {
    fn from(e: redb::TransactionError) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<redb::TableError> for CoreError {
    fn from(e: redb::TableError) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<redb::StorageError> for CoreError {
    fn from(e: redb::StorageError) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<redb::CommitError> for CoreError {
    fn from(e: redb::CommitError) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Codec(e.to_string())
    }
}
