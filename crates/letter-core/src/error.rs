//! Error types for the game core.

use crate::cards::DeckError;
use crate::protocol::{PlayerId, RoomId};
use crate::secrecy::SecrecyError;
use letter_ledger::LedgerError;
use thiserror::Error;

/// Every fallible game operation returns this error and leaves state unchanged
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    // Validation
    #[error("It is not {0}'s turn")]
    NotYourTurn(PlayerId),

    #[error("Card is not held by the player")]
    CardNotHeld,

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("A pending action must be resolved first")]
    ActionPending,

    #[error("No pending action expects a response")]
    NoPendingActionExpected,

    #[error("Invalid guess: {0}")]
    InvalidGuess(String),

    #[error("A proof of the kept card is required")]
    MissingProof,

    #[error("Countess must be played while holding King or Prince")]
    CountessRequired,

    #[error("Response deadline has passed")]
    DeadlinePassed,

    // Lifecycle
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    #[error("Room is not accepting players")]
    NotInLobby,

    #[error("No match is in progress")]
    NotActive,

    #[error("Room is full")]
    RoomFull,

    #[error("Player {0} already seated")]
    AlreadyJoined(PlayerId),

    #[error("Player {0} is not seated in this room")]
    NotSeated(PlayerId),

    #[error("Only the host may do this")]
    NotHost,

    #[error("At least {0} players are required")]
    NotEnoughPlayers(usize),

    #[error("Invalid room settings: {0}")]
    InvalidSettings(String),

    // Concurrency
    #[error("Stale state: expected version {expected}, current {current}")]
    StaleState { expected: u64, current: u64 },

    // Collaborators
    #[error("Secrecy error: {0}")]
    Secrecy(#[from] SecrecyError),

    #[error("Deck error: {0}")]
    Deck(#[from] DeckError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

pub type Result<T> = std::result::Result<T, GameError>;
