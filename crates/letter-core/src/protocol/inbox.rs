//! Per-player private notices.

use super::PlayerId;
use crate::cards::Rank;
use crate::engine::PendingKind;
use crate::secrecy::{AccessGrant, OwnerDelivery};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Material only one player may see
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A card dealt, drawn, replaced or received in an exchange
    Dealt { round: u32, delivery: OwnerDelivery },
    /// Inspection rights over another player's card
    Grant { grant: AccessGrant },
    /// The player must answer a pending action before `deadline`
    ResponseRequested {
        kind: PendingKind,
        initiator: PlayerId,
        /// Named rank a guess must be answered against
        guess: Option<Rank>,
        deadline: DateTime<Utc>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PrivateNotice {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub notice: Notice,
}

#[derive(Clone, Debug, Default)]
pub struct Inbox {
    notices: HashMap<PlayerId, Vec<PrivateNotice>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, player: &PlayerId, at: DateTime<Utc>, notice: Notice) {
        let queue = self.notices.entry(player.clone()).or_default();
        let seq = queue.len() as u64 + 1;
        queue.push(PrivateNotice { seq, at, notice });
    }

    /// Notices for `player` with `seq > after`
    pub fn since(&self, player: &PlayerId, after: u64) -> Vec<PrivateNotice> {
        self.notices
            .get(player)
            .map(|queue| queue.iter().skip(after as usize).cloned().collect())
            .unwrap_or_default()
    }
}
