//! Pending-response sub-machine.

use crate::cards::Rank;
use crate::protocol::PlayerId;
use crate::secrecy::HandleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingKind {
    Guess,
    Compare,
    ForcedDiscard,
    ExchangeOffer,
}

/// Outcome applied when a pending action's deadline passes unanswered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// The silent target is eliminated; the initiator wins by default
    #[default]
    ForfeitTarget,
    /// The action has no effect and the turn passes
    VoidAction,
}

impl std::str::FromStr for TimeoutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forfeit_target" | "forfeit" => Ok(TimeoutPolicy::ForfeitTarget),
            "void_action" | "void" => Ok(TimeoutPolicy::VoidAction),
            other => Err(format!("unknown timeout policy: {}", other)),
        }
    }
}

/// What the referee already verified about the initiator's side
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PendingPayload {
    Guess { guess: Rank },
    /// Initiator's kept card, proven at play time
    Compare { initiator_card: Rank },
    ForcedDiscard,
    /// Initiator's kept card, proven at play time
    Exchange {
        initiator_handle: HandleId,
        initiator_card: Rank,
    },
}

/// The single open secret-dependent action of a round
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: PendingKind,
    pub initiator: PlayerId,
    pub target: PlayerId,
    pub opened_turn: u32,
    pub opened_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub(crate) payload: PendingPayload,
}

impl PendingAction {
    pub(crate) fn open(
        initiator: PlayerId,
        target: PlayerId,
        payload: PendingPayload,
        turn: u32,
        now: DateTime<Utc>,
        timeout: chrono::Duration,
    ) -> Self {
        let kind = match payload {
            PendingPayload::Guess { .. } => PendingKind::Guess,
            PendingPayload::Compare { .. } => PendingKind::Compare,
            PendingPayload::ForcedDiscard => PendingKind::ForcedDiscard,
            PendingPayload::Exchange { .. } => PendingKind::ExchangeOffer,
        };
        Self {
            kind,
            initiator,
            target,
            opened_turn: turn,
            opened_at: now,
            deadline: now + timeout,
            payload,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Guess named by the initiator; only the target is told
    pub(crate) fn guess(&self) -> Option<Rank> {
        match self.payload {
            PendingPayload::Guess { guess } => Some(guess),
            _ => None,
        }
    }

    pub fn view(&self) -> PendingView {
        PendingView {
            kind: self.kind,
            initiator: self.initiator.clone(),
            target: self.target.clone(),
            deadline: self.deadline,
        }
    }
}

/// Public projection of a pending action
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingView {
    pub kind: PendingKind,
    pub initiator: PlayerId,
    pub target: PlayerId,
    pub deadline: DateTime<Utc>,
}
