//! Room and match lifecycle.
//!
//! A room is the single owner of its mutable state. Every command
//! validates, applies to a copy, and only then commits: events are
//! appended to the log, private notices delivered, retired card material
//! dropped from the secrecy backend, and the version bumped.

mod game;
pub mod scoring;

pub use game::{Match, MatchSummary, MatchView};
pub use scoring::{default_token_target, tokens_for, BONUS_TABLE};

use crate::cards::DeckSource;
use crate::config::EngineConfig;
use crate::engine::{Effects, PlayCard, ProtectionSpan, TimeoutPolicy, TurnContext};
use crate::error::{GameError, Result};
use crate::protocol::{EventLog, EventRecord, GameEvent, Inbox, PlayerId, PrivateNotice, RoomId};
use crate::secrecy::{pubkey_serde, HandProof, HandSecrecy, RevealPolicy};
use chrono::{DateTime, Utc};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const MIN_SEATS: usize = 2;
const MAX_SEATS: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomState {
    Lobby,
    Active,
    Ended,
}

/// Host-chosen room parameters; unset policies fall back to the engine config
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomSettings {
    pub name: String,
    pub capacity: usize,
    #[serde(default)]
    pub stake: u64,
    #[serde(default)]
    pub token_target: Option<u32>,
    #[serde(default)]
    pub reveal_policy: Option<RevealPolicy>,
    #[serde(default)]
    pub timeout_policy: Option<TimeoutPolicy>,
    #[serde(default)]
    pub protection: Option<ProtectionSpan>,
}

impl RoomSettings {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity,
            stake: 0,
            token_target: None,
            reveal_policy: None,
            timeout_policy: None,
            protection: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if !(MIN_SEATS..=MAX_SEATS).contains(&self.capacity) {
            return Err(GameError::InvalidSettings(format!(
                "capacity must be between {} and {}",
                MIN_SEATS, MAX_SEATS
            )));
        }
        if self.token_target == Some(0) {
            return Err(GameError::InvalidSettings(
                "token target must be positive".into(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(GameError::InvalidSettings("name must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Seat {
    pub player: PlayerId,
    #[serde(with = "pubkey_serde")]
    pub viewing_key: PublicKey,
    pub joined_at: DateTime<Utc>,
}

pub struct Room {
    id: RoomId,
    name: String,
    capacity: usize,
    stake: u64,
    token_target: Option<u32>,
    reveal_policy: RevealPolicy,
    timeout_policy: TimeoutPolicy,
    protection: ProtectionSpan,
    config: EngineConfig,
    state: RoomState,
    host: PlayerId,
    seats: Vec<Seat>,
    keys: HashMap<PlayerId, PublicKey>,
    version: u64,
    log: EventLog,
    inbox: Inbox,
    secrecy: Arc<dyn HandSecrecy>,
    decks: Arc<dyn DeckSource>,
    current: Option<Match>,
    finished: Option<MatchSummary>,
    /// Ended match whose escrow the ledger has not paid out yet
    unsettled: Option<MatchSummary>,
    created_at: DateTime<Utc>,
}

impl Room {
    /// Create a room in the lobby with its host in the first seat
    pub fn create(
        host: PlayerId,
        host_key: PublicKey,
        settings: RoomSettings,
        config: &EngineConfig,
        decks: Arc<dyn DeckSource>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        settings.validate()?;
        let id = RoomId::new();
        let reveal_policy = settings
            .reveal_policy
            .unwrap_or(config.default_reveal_policy);
        let timeout_policy = settings
            .timeout_policy
            .unwrap_or(config.default_timeout_policy);
        let protection = settings.protection.unwrap_or(config.default_protection);

        let mut room = Self {
            id,
            name: settings.name.clone(),
            capacity: settings.capacity,
            stake: settings.stake,
            token_target: settings.token_target,
            reveal_policy,
            timeout_policy,
            protection,
            config: config.clone(),
            state: RoomState::Lobby,
            host: host.clone(),
            seats: Vec::new(),
            keys: HashMap::new(),
            version: 0,
            log: EventLog::new(id),
            inbox: Inbox::new(),
            secrecy: reveal_policy.backend(),
            decks,
            current: None,
            finished: None,
            unsettled: None,
            created_at: now,
        };

        let mut fx = Effects::new();
        fx.event(GameEvent::RoomCreated {
            name: settings.name,
            host: host.clone(),
            capacity: settings.capacity,
            stake: settings.stake,
            token_target: settings.token_target,
            reveal_policy,
            timeout_policy,
            protection,
        });
        room.seat(host, host_key, now, &mut fx);
        room.commit(now, fx);
        Ok(room)
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn host(&self) -> &PlayerId {
        &self.host
    }

    pub fn stake(&self) -> u64 {
        self.stake
    }

    pub fn players(&self) -> Vec<PlayerId> {
        self.seats.iter().map(|s| s.player.clone()).collect()
    }

    pub fn is_seated(&self, player: &PlayerId) -> bool {
        self.keys.contains_key(player)
    }

    pub fn current_match(&self) -> Option<&Match> {
        self.current.as_ref()
    }

    pub fn secrecy(&self) -> &Arc<dyn HandSecrecy> {
        &self.secrecy
    }

    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub fn inbox(&self, player: &PlayerId, after: u64) -> Vec<PrivateNotice> {
        self.inbox.since(player, after)
    }

    /// Fails with `StaleState` unless `expected` is absent or current
    pub fn check_version(&self, expected: Option<u64>) -> Result<()> {
        match expected {
            Some(expected) if expected != self.version => Err(GameError::StaleState {
                expected,
                current: self.version,
            }),
            _ => Ok(()),
        }
    }

    pub fn join(
        &mut self,
        player: PlayerId,
        viewing_key: PublicKey,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        if self.state != RoomState::Lobby {
            return Err(GameError::NotInLobby);
        }
        if self.is_seated(&player) {
            return Err(GameError::AlreadyJoined(player));
        }
        if self.seats.len() >= self.capacity {
            return Err(GameError::RoomFull);
        }

        let mut fx = Effects::new();
        self.seat(player, viewing_key, now, &mut fx);
        Ok(self.commit(now, fx))
    }

    /// Leave the lobby. The host role passes to the next seat; the last
    /// player out closes the room.
    pub fn leave(&mut self, player: &PlayerId, now: DateTime<Utc>) -> Result<Vec<EventRecord>> {
        if self.state != RoomState::Lobby {
            return Err(GameError::NotInLobby);
        }
        let position = self
            .seats
            .iter()
            .position(|s| &s.player == player)
            .ok_or_else(|| GameError::NotSeated(player.clone()))?;

        self.seats.remove(position);
        self.keys.remove(player);

        let mut fx = Effects::new();
        let new_host = if &self.host == player {
            self.seats.first().map(|s| s.player.clone())
        } else {
            None
        };
        if let Some(next) = &new_host {
            self.host = next.clone();
        }
        fx.event(GameEvent::PlayerLeft {
            player: player.clone(),
            new_host,
        });
        if self.seats.is_empty() {
            self.state = RoomState::Ended;
            fx.event(GameEvent::RoomClosed);
        }
        Ok(self.commit(now, fx))
    }

    /// Check that `requester` may start the match now, without changing anything
    pub fn ensure_can_start(&self, requester: &PlayerId) -> Result<()> {
        if self.state != RoomState::Lobby {
            return Err(GameError::NotInLobby);
        }
        if !self.is_seated(requester) {
            return Err(GameError::NotSeated(requester.clone()));
        }
        if self.seats.len() >= self.capacity {
            return Ok(());
        }
        if requester != &self.host {
            return Err(GameError::NotHost);
        }
        if self.seats.len() < MIN_SEATS {
            return Err(GameError::NotEnoughPlayers(MIN_SEATS));
        }
        Ok(())
    }

    /// Activate the room: once full, or early by the host with two or more seats
    pub fn start_match(
        &mut self,
        requester: &PlayerId,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        self.ensure_can_start(requester)?;

        let players = self.players();
        let token_target = self
            .token_target
            .unwrap_or_else(|| default_token_target(players.len()));

        let mut fx = Effects::new();
        let started = {
            let ctx = self.turn_context();
            Match::begin(&ctx, self.decks.as_ref(), players, token_target, now, &mut fx)?
        };
        self.current = Some(started);
        self.state = RoomState::Active;
        Ok(self.commit(now, fx))
    }

    pub fn play_card(
        &mut self,
        player: &PlayerId,
        cmd: PlayCard,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        self.transition(now, |game, ctx, decks, fx| {
            game.play(ctx, decks, player, cmd, now, fx)
        })
        .map(|(_, records)| records)
    }

    pub fn respond(
        &mut self,
        player: &PlayerId,
        proof: HandProof,
        now: DateTime<Utc>,
    ) -> Result<Vec<EventRecord>> {
        self.transition(now, |game, ctx, decks, fx| {
            game.respond(ctx, decks, player, proof, now, fx)
        })
        .map(|(_, records)| records)
    }

    /// Idempotent deadline sweep; a room with nothing overdue is untouched
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<Vec<EventRecord>> {
        if self.state != RoomState::Active {
            return Ok(Vec::new());
        }
        self.transition(now, |game, ctx, decks, fx| game.expire(ctx, decks, now, fx))
            .map(|(_, records)| records)
    }

    /// Summary of a match that just ended, handed out once
    pub fn take_finished(&mut self) -> Option<MatchSummary> {
        self.finished.take()
    }

    /// Keep an ended match's summary until its payout goes through
    pub fn hold_settlement(&mut self, summary: MatchSummary) {
        self.unsettled = Some(summary);
    }

    pub fn unsettled(&self) -> Option<&MatchSummary> {
        self.unsettled.as_ref()
    }

    pub fn clear_settlement(&mut self) -> Option<MatchSummary> {
        self.unsettled.take()
    }

    /// Append a fact that does not change room state
    pub fn record_event(&mut self, now: DateTime<Utc>, event: GameEvent) -> EventRecord {
        self.log.append(now, event).clone()
    }

    pub fn view(&self) -> RoomView {
        RoomView {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            host: self.host.clone(),
            capacity: self.capacity,
            stake: self.stake,
            token_target: self.token_target,
            reveal_policy: self.reveal_policy,
            timeout_policy: self.timeout_policy,
            protection: self.protection,
            seats: self.seats.clone(),
            version: self.version,
            last_event: self.log.last_seq(),
            created_at: self.created_at,
            current_match: self.current.as_ref().map(Match::view),
            settlement_pending: self.unsettled.is_some(),
        }
    }

    fn seat(
        &mut self,
        player: PlayerId,
        viewing_key: PublicKey,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) {
        fx.event(GameEvent::PlayerJoined {
            player: player.clone(),
            seat: self.seats.len(),
        });
        self.keys.insert(player.clone(), viewing_key);
        self.seats.push(Seat {
            player,
            viewing_key,
            joined_at: now,
        });
    }

    fn turn_context(&self) -> TurnContext<'_> {
        TurnContext {
            secrecy: self.secrecy.as_ref(),
            keys: &self.keys,
            response_timeout: self.config.response_timeout,
            turn_timeout: self.config.turn_timeout,
            timeout_policy: self.timeout_policy,
            protection: self.protection,
        }
    }

    fn transition<T>(
        &mut self,
        now: DateTime<Utc>,
        apply: impl FnOnce(&mut Match, &TurnContext<'_>, &dyn DeckSource, &mut Effects) -> Result<T>,
    ) -> Result<(T, Vec<EventRecord>)> {
        if self.state != RoomState::Active {
            return Err(GameError::NotActive);
        }
        let mut next = self.current.clone().ok_or(GameError::NotActive)?;
        let mut fx = Effects::new();
        let value = {
            let ctx = self.turn_context();
            apply(&mut next, &ctx, self.decks.as_ref(), &mut fx)?
        };

        if let Some(summary) = next.summary(self.id, self.stake) {
            self.state = RoomState::Ended;
            self.finished = Some(summary);
        }
        self.current = Some(next);
        Ok((value, self.commit(now, fx)))
    }

    fn commit(&mut self, now: DateTime<Utc>, fx: Effects) -> Vec<EventRecord> {
        if fx.events.is_empty() && fx.notices.is_empty() {
            return Vec::new();
        }
        for handle in &fx.retired {
            self.secrecy.forget(handle);
        }
        for (player, notice) in fx.notices {
            self.inbox.push(&player, now, notice);
        }
        let records = fx
            .events
            .into_iter()
            .map(|event| self.log.append(now, event).clone())
            .collect();
        self.version += 1;
        records
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomView {
    pub id: RoomId,
    pub name: String,
    pub state: RoomState,
    pub host: PlayerId,
    pub capacity: usize,
    pub stake: u64,
    pub token_target: Option<u32>,
    pub reveal_policy: RevealPolicy,
    pub timeout_policy: TimeoutPolicy,
    pub protection: ProtectionSpan,
    pub seats: Vec<Seat>,
    pub version: u64,
    pub last_event: u64,
    pub created_at: DateTime<Utc>,
    pub current_match: Option<MatchView>,
    pub settlement_pending: bool,
}
