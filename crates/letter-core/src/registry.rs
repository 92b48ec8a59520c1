//! Room registry: serializes commands per room and runs the match-end
//! collaborators (settlement, leaderboard).
//!
//! Ended rooms move to an archive once nothing is owed on them. Archived
//! rooms still answer views, event and inbox reads, but drop out of the
//! listing and the deadline sweep.

use crate::cards::{DeckSeed, DeckSource, SeededDecks};
use crate::config::EngineConfig;
use crate::engine::PlayCard;
use crate::error::{GameError, Result};
use crate::leaderboard::Leaderboard;
use crate::protocol::{EventRecord, GameEvent, PlayerId, PrivateNotice, RoomId};
use crate::room::{MatchSummary, Room, RoomSettings, RoomState, RoomView};
use crate::secrecy::HandProof;
use chrono::{DateTime, Utc};
use letter_ledger::Ledger;
use secp256k1::PublicKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

const FEED_CAPACITY: usize = 1024;

pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<Mutex<Room>>>>,
    archive: RwLock<HashMap<RoomId, Arc<Mutex<Room>>>>,
    config: EngineConfig,
    ledger: Arc<dyn Ledger>,
    leaderboard: Arc<Leaderboard>,
    feed: broadcast::Sender<EventRecord>,
    deck_source: Option<Arc<dyn DeckSource>>,
    /// Simulated current time (for deadline testing)
    clock: StdMutex<Option<DateTime<Utc>>>,
}

impl RoomRegistry {
    pub fn new(config: EngineConfig, ledger: Arc<dyn Ledger>) -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            rooms: RwLock::new(HashMap::new()),
            archive: RwLock::new(HashMap::new()),
            config,
            ledger,
            leaderboard: Arc::new(Leaderboard::new()),
            feed,
            deck_source: None,
            clock: StdMutex::new(None),
        }
    }

    /// Use one deck source for every room instead of a fresh seed per room
    pub fn with_deck_source(mut self, decks: Arc<dyn DeckSource>) -> Self {
        self.deck_source = Some(decks);
        self
    }

    pub fn with_leaderboard(mut self, leaderboard: Arc<Leaderboard>) -> Self {
        self.leaderboard = leaderboard;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn leaderboard(&self) -> &Arc<Leaderboard> {
        &self.leaderboard
    }

    /// Live feed of every room's public facts
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.feed.subscribe()
    }

    /// Get current time (real or simulated)
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.lock().unwrap().unwrap_or_else(Utc::now)
    }

    /// Advance simulated time by seconds
    pub fn advance_time(&self, seconds: i64) {
        let mut clock = self.clock.lock().unwrap();
        let current = clock.unwrap_or_else(Utc::now);
        *clock = Some(current + chrono::Duration::seconds(seconds));
    }

    fn room(&self, id: RoomId) -> Result<Arc<Mutex<Room>>> {
        if let Some(room) = self.rooms.read().unwrap().get(&id) {
            return Ok(room.clone());
        }
        self.archive
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(GameError::RoomNotFound(id))
    }

    /// Move an ended room with nothing left to settle out of the live set
    fn archive_if_done(&self, room: &Room) {
        if room.state() != RoomState::Ended || room.unsettled().is_some() {
            return;
        }
        let id = room.id();
        let moved = self.rooms.write().unwrap().remove(&id);
        if let Some(handle) = moved {
            self.archive.write().unwrap().insert(id, handle);
            debug!("Archived room {}", id);
        }
    }

    fn publish(&self, records: &[EventRecord]) {
        for record in records {
            // No subscribers is fine.
            let _ = self.feed.send(record.clone());
        }
    }

    pub async fn create_room(
        &self,
        host: PlayerId,
        host_key: PublicKey,
        settings: RoomSettings,
    ) -> Result<RoomView> {
        let decks = match &self.deck_source {
            Some(decks) => decks.clone(),
            None => Arc::new(SeededDecks::new(DeckSeed::random())) as Arc<dyn DeckSource>,
        };
        let room = Room::create(host, host_key, settings, &self.config, decks, self.now())?;
        let view = room.view();
        self.publish(room.events().records());

        info!(
            "Room {} created by {} ({:?}, capacity {})",
            view.id, view.host, view.reveal_policy, view.capacity
        );
        self.rooms
            .write()
            .unwrap()
            .insert(view.id, Arc::new(Mutex::new(room)));
        Ok(view)
    }

    pub async fn join_room(
        &self,
        id: RoomId,
        player: PlayerId,
        viewing_key: PublicKey,
        expected_version: Option<u64>,
    ) -> Result<RoomView> {
        let room = self.room(id)?;
        let mut room = room.lock().await;
        room.check_version(expected_version)?;
        let records = room.join(player.clone(), viewing_key, self.now())?;
        self.publish(&records);
        info!("Player {} joined room {}", player, id);
        Ok(room.view())
    }

    pub async fn leave_room(
        &self,
        id: RoomId,
        player: &PlayerId,
        expected_version: Option<u64>,
    ) -> Result<RoomView> {
        let room = self.room(id)?;
        let mut room = room.lock().await;
        room.check_version(expected_version)?;
        let records = room.leave(player, self.now())?;
        self.publish(&records);
        info!("Player {} left room {}", player, id);
        if room.state() == RoomState::Ended {
            info!("Room {} closed", id);
            self.archive_if_done(&room);
        }
        Ok(room.view())
    }

    /// Lock every seat's stake, then activate. If any lock fails the
    /// escrow is refunded and the room stays in the lobby.
    pub async fn start_match(
        &self,
        id: RoomId,
        requester: &PlayerId,
        expected_version: Option<u64>,
    ) -> Result<RoomView> {
        let room = self.room(id)?;
        let mut room = room.lock().await;
        room.check_version(expected_version)?;
        room.ensure_can_start(requester)?;

        let stake = room.stake();
        if stake > 0 {
            for player in room.players() {
                if let Err(e) = self
                    .ledger
                    .lock_stake(*id.as_uuid(), player.as_str(), stake)
                    .await
                {
                    warn!("Stake lock failed for {} in room {}: {}", player, id, e);
                    if let Err(refund_err) = self.ledger.refund(*id.as_uuid()).await {
                        warn!("Refund failed for room {}: {}", id, refund_err);
                    }
                    return Err(e.into());
                }
            }
            debug!("Locked stake {} for every seat in room {}", stake, id);
        }

        let records = match room.start_match(requester, self.now()) {
            Ok(records) => records,
            Err(e) => {
                if stake > 0 {
                    if let Err(refund_err) = self.ledger.refund(*id.as_uuid()).await {
                        warn!("Refund failed for room {}: {}", id, refund_err);
                    }
                }
                return Err(e);
            }
        };
        self.publish(&records);
        info!("Match started in room {} with {} players", id, room.players().len());
        Ok(room.view())
    }

    pub async fn play_card(
        &self,
        id: RoomId,
        player: &PlayerId,
        cmd: PlayCard,
        expected_version: Option<u64>,
    ) -> Result<RoomView> {
        let room = self.room(id)?;
        let mut room = room.lock().await;
        room.check_version(expected_version)?;
        let records = room.play_card(player, cmd, self.now())?;
        debug!("{} played in room {} ({} events)", player, id, records.len());
        self.after_commit(&mut room, records).await;
        Ok(room.view())
    }

    pub async fn respond(
        &self,
        id: RoomId,
        player: &PlayerId,
        proof: HandProof,
        expected_version: Option<u64>,
    ) -> Result<RoomView> {
        let room = self.room(id)?;
        let mut room = room.lock().await;
        room.check_version(expected_version)?;
        let records = room.respond(player, proof, self.now())?;
        debug!("{} responded in room {}", player, id);
        self.after_commit(&mut room, records).await;
        Ok(room.view())
    }

    /// Forfeit overdue responses and idle turns in one room, or retry a
    /// payout the ledger refused earlier. Returns whether anything changed.
    pub async fn expire(&self, id: RoomId) -> Result<bool> {
        let room = self.room(id)?;
        let mut room = room.lock().await;
        if let Some(summary) = room.unsettled().cloned() {
            let settled = self.settle_stake(&mut room, &summary).await;
            self.archive_if_done(&room);
            return Ok(settled);
        }
        let records = room.expire(self.now())?;
        let changed = !records.is_empty();
        if changed {
            info!("Deadline expired in room {}", id);
        }
        self.after_commit(&mut room, records).await;
        Ok(changed)
    }

    /// Watchdog sweep over every live room; returns rooms changed
    pub async fn expire_all(&self) -> usize {
        let ids: Vec<RoomId> = self.rooms.read().unwrap().keys().copied().collect();
        let mut changed = 0;
        for id in ids {
            match self.expire(id).await {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => warn!("Expire failed for room {}: {}", id, e),
            }
        }
        changed
    }

    pub async fn room_view(&self, id: RoomId) -> Result<RoomView> {
        let room = self.room(id)?;
        let room = room.lock().await;
        Ok(room.view())
    }

    pub async fn list_rooms(&self) -> Vec<RoomView> {
        let rooms: Vec<Arc<Mutex<Room>>> = self.rooms.read().unwrap().values().cloned().collect();
        let mut views = Vec::with_capacity(rooms.len());
        for room in rooms {
            views.push(room.lock().await.view());
        }
        views.sort_by_key(|v| v.created_at);
        views
    }

    pub async fn events_since(&self, id: RoomId, after: u64) -> Result<Vec<EventRecord>> {
        let room = self.room(id)?;
        let room = room.lock().await;
        Ok(room.events().since(after).to_vec())
    }

    pub async fn inbox(
        &self,
        id: RoomId,
        player: &PlayerId,
        after: u64,
    ) -> Result<Vec<PrivateNotice>> {
        let room = self.room(id)?;
        let room = room.lock().await;
        if !room.is_seated(player) {
            return Err(GameError::NotSeated(player.clone()));
        }
        Ok(room.inbox(player, after))
    }

    /// Publish, and on match end settle the escrow and count the result once
    async fn after_commit(&self, room: &mut Room, records: Vec<EventRecord>) {
        self.publish(&records);

        if let Some(summary) = room.take_finished() {
            self.finish_match(room, summary).await;
        }
        self.archive_if_done(room);
    }

    async fn finish_match(&self, room: &mut Room, summary: MatchSummary) {
        info!(
            "Match {} in room {} won by {} after {} rounds",
            summary.match_id, summary.room_id, summary.winner, summary.rounds
        );

        if summary.stake > 0 {
            self.settle_stake(room, &summary).await;
        }

        if self.leaderboard.record_match(&summary) {
            let record = room.record_event(
                self.now(),
                GameEvent::LeaderboardUpdated {
                    match_id: summary.match_id,
                    winner: summary.winner.clone(),
                    participants: summary.participants.clone(),
                },
            );
            self.publish(&[record]);
        }
    }

    /// Pay the escrow to the winner. A refusal is published once and the
    /// summary held on the room so the sweep can retry it.
    async fn settle_stake(&self, room: &mut Room, summary: &MatchSummary) -> bool {
        let result = self
            .ledger
            .settle(*summary.room_id.as_uuid(), summary.winner.as_str())
            .await;

        let event = match result {
            Ok(receipt) => {
                info!(
                    "Settled room {}: {} paid {}",
                    summary.room_id, receipt.winner, receipt.payout
                );
                room.clear_settlement();
                GameEvent::StakeSettled {
                    match_id: summary.match_id,
                    winner: summary.winner.clone(),
                    payout: receipt.payout,
                }
            }
            Err(e) => {
                warn!("Settlement failed for room {}: {}", summary.room_id, e);
                if room.unsettled().is_some() {
                    return false;
                }
                room.hold_settlement(summary.clone());
                GameEvent::SettlementFailed {
                    match_id: summary.match_id,
                    reason: e.to_string(),
                }
            }
        };

        let settled = matches!(event, GameEvent::StakeSettled { .. });
        let record = room.record_event(self.now(), event);
        self.publish(&[record]);
        settled
    }
}
