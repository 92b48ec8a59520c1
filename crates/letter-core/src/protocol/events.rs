//! Public fact stream.
//!
//! Every accepted transition appends one or more [`GameEvent`]s to the
//! room's [`EventLog`]. Events carry enough to rebuild the public state of
//! a room and never carry hidden card values that the rules keep secret.

use super::{MatchId, PlayerId, RoomId};
use crate::cards::Rank;
use crate::engine::{PendingKind, ProtectionSpan, TimeoutPolicy};
use crate::secrecy::RevealPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A card in the public discard pile
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardEntry {
    pub owner: PlayerId,
    pub face: DiscardFace,
    pub cause: DiscardCause,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "face", rename_all = "snake_case")]
pub enum DiscardFace {
    Revealed { rank: Rank },
    /// Face down; the rules never publish this value
    Concealed,
}

impl DiscardFace {
    pub fn rank(&self) -> Option<Rank> {
        match self {
            DiscardFace::Revealed { rank } => Some(*rank),
            DiscardFace::Concealed => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardCause {
    Played,
    Forced,
    Eliminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationCause {
    GuessedCorrectly,
    LostComparison,
    DiscardedPrincess,
    ResponseTimeout,
    TurnTimeout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    LastStanding,
    DeckExhausted,
}

/// The only information a resolved pending action publishes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PublicOutcome {
    GuessCorrect,
    GuessIncorrect,
    CompareLoser { loser: PlayerId },
    CompareTie,
    Discarded { rank: Rank },
    Exchanged,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    RoomCreated {
        name: String,
        host: PlayerId,
        capacity: usize,
        stake: u64,
        /// Unset means the seat-count default, fixed when the match starts
        token_target: Option<u32>,
        reveal_policy: RevealPolicy,
        timeout_policy: TimeoutPolicy,
        protection: ProtectionSpan,
    },
    PlayerJoined {
        player: PlayerId,
        seat: usize,
    },
    PlayerLeft {
        player: PlayerId,
        new_host: Option<PlayerId>,
    },
    RoomClosed,
    MatchStarted {
        match_id: MatchId,
        players: Vec<PlayerId>,
        token_target: u32,
    },
    RoundStarted {
        round: u32,
        turn_order: Vec<PlayerId>,
        /// Set-aside cards dealt face up (two-player rounds only)
        face_up: Vec<Rank>,
        deck_remaining: usize,
    },
    CardDrawn {
        player: PlayerId,
        turn: u32,
        deck_remaining: usize,
    },
    CardPlayed {
        player: PlayerId,
        rank: Rank,
        target: Option<PlayerId>,
    },
    AccessGranted {
        viewer: PlayerId,
        owner: PlayerId,
        valid_until_turn: u32,
    },
    PendingOpened {
        kind: PendingKind,
        initiator: PlayerId,
        target: PlayerId,
        deadline: DateTime<Utc>,
    },
    PendingResolved {
        kind: PendingKind,
        initiator: PlayerId,
        target: PlayerId,
        outcome: PublicOutcome,
    },
    PendingExpired {
        kind: PendingKind,
        initiator: PlayerId,
        target: PlayerId,
        policy: TimeoutPolicy,
    },
    TurnForfeited {
        player: PlayerId,
        turn: u32,
    },
    PlayerProtected {
        player: PlayerId,
    },
    PlayerEliminated {
        player: PlayerId,
        cause: EliminationCause,
    },
    CardDiscarded {
        entry: DiscardEntry,
    },
    HandsExchanged {
        initiator: PlayerId,
        target: PlayerId,
    },
    ShowdownReveal {
        player: PlayerId,
        rank: Rank,
    },
    RoundEnded {
        round: u32,
        winner: PlayerId,
        reason: EndReason,
    },
    TokenAwarded {
        player: PlayerId,
        awarded: u32,
        total: u32,
    },
    MatchEnded {
        match_id: MatchId,
        winner: PlayerId,
        tokens: BTreeMap<PlayerId, u32>,
    },
    LeaderboardUpdated {
        match_id: MatchId,
        winner: PlayerId,
        participants: Vec<PlayerId>,
    },
    /// The escrow was paid out to the winner
    StakeSettled {
        match_id: MatchId,
        winner: PlayerId,
        payout: u64,
    },
    /// The ledger refused the payout; the escrow stays locked until a retry succeeds
    SettlementFailed {
        match_id: MatchId,
        reason: String,
    },
}

/// One immutable entry of a room's fact stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub room_id: RoomId,
    pub at: DateTime<Utc>,
    pub event: GameEvent,
}

/// Append-only, ordered log of a room's public facts
#[derive(Clone, Debug)]
pub struct EventLog {
    room_id: RoomId,
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            records: Vec::new(),
        }
    }

    pub fn append(&mut self, at: DateTime<Utc>, event: GameEvent) -> &EventRecord {
        let seq = self.records.len() as u64 + 1;
        self.records.push(EventRecord {
            seq,
            room_id: self.room_id,
            at,
            event,
        });
        &self.records[self.records.len() - 1]
    }

    /// Records with `seq > after`
    pub fn since(&self, after: u64) -> &[EventRecord] {
        let start = (after as usize).min(self.records.len());
        &self.records[start..]
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn last_seq(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
