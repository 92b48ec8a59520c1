//! Ledger trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from ledger operations
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Escrow not found for room {0}")]
    EscrowNotFound(Uuid),

    #[error("Player {0} has no stake in this escrow")]
    NotStaked(String),

    #[error("Escrow already settled")]
    AlreadySettled,

    #[error("Escrow already refunded")]
    AlreadyRefunded,

    #[error("Insufficient funds for {0}")]
    InsufficientFunds(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Lifecycle of a room's escrow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Stakes are locked, match in progress
    Locked,
    /// Pot paid out to the winner
    Settled,
    /// Stakes returned to every staker
    Refunded,
}

/// Confirmation that a player's stake is held in escrow
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeReceipt {
    pub room: Uuid,
    pub player: String,
    pub amount: u64,
}

/// Result of paying out an escrow
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub room: Uuid,
    pub winner: String,
    pub payout: u64,
}

/// Trait for the settlement layer that holds room stakes
///
/// The game core calls it only at room activation (`lock_stake`) and
/// match termination (`settle`, or `refund` when activation aborts).
/// Implementations can be:
/// - MockLedger for testing
/// - RpcLedger for a real settlement node
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Lock `amount` from `player` into the room's escrow
    async fn lock_stake(
        &self,
        room: Uuid,
        player: &str,
        amount: u64,
    ) -> Result<StakeReceipt, LedgerError>;

    /// Pay the whole escrow to the match winner
    async fn settle(&self, room: Uuid, winner: &str) -> Result<SettlementReceipt, LedgerError>;

    /// Return every locked stake; yields the total refunded
    async fn refund(&self, room: Uuid) -> Result<u64, LedgerError>;
}
