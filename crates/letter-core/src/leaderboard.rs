//! Cross-room win/game counters.

use crate::protocol::{MatchId, PlayerId};
use crate::room::MatchSummary;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player: PlayerId,
    pub wins: u64,
    pub games: u64,
}

/// Shared by every room. Counters only ever increase and each match id is
/// counted at most once.
#[derive(Debug, Default)]
pub struct Leaderboard {
    inner: Mutex<LeaderboardInner>,
}

#[derive(Debug, Default)]
struct LeaderboardInner {
    entries: HashMap<PlayerId, LeaderboardEntry>,
    recorded: HashSet<MatchId>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a finished match. Returns `false` if it was already counted.
    pub fn record_match(&self, summary: &MatchSummary) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if !inner.recorded.insert(summary.match_id) {
            return false;
        }
        for player in &summary.participants {
            let entry = inner
                .entries
                .entry(player.clone())
                .or_insert_with(|| LeaderboardEntry {
                    player: player.clone(),
                    wins: 0,
                    games: 0,
                });
            entry.games += 1;
            if *player == summary.winner {
                entry.wins += 1;
            }
        }
        true
    }

    pub fn entry(&self, player: &PlayerId) -> Option<LeaderboardEntry> {
        self.inner.lock().unwrap().entries.get(player).cloned()
    }

    /// Best `n` players: most wins, then most games, then by id
    pub fn top(&self, n: usize) -> Vec<LeaderboardEntry> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<LeaderboardEntry> = inner.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(b.games.cmp(&a.games))
                .then(a.player.cmp(&b.player))
        });
        entries.truncate(n);
        entries
    }

    pub fn matches_recorded(&self) -> usize {
        self.inner.lock().unwrap().recorded.len()
    }
}
