//! A match: rounds until someone reaches the token target.

use super::scoring::tokens_for;
use crate::cards::DeckSource;
use crate::engine::{Effects, PlayCard, Round, RoundOutcome, RoundView, TurnContext};
use crate::error::{GameError, Result};
use crate::protocol::{GameEvent, MatchId, PlayerId, RoomId};
use crate::secrecy::HandProof;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct Match {
    id: MatchId,
    players: Vec<PlayerId>,
    token_target: u32,
    tokens: BTreeMap<PlayerId, u32>,
    round: Round,
    history: Vec<RoundOutcome>,
    winner: Option<PlayerId>,
}

impl Match {
    /// Start a match and its first round; the first seat moves first
    pub(crate) fn begin(
        ctx: &TurnContext<'_>,
        decks: &dyn DeckSource,
        players: Vec<PlayerId>,
        token_target: u32,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<Self> {
        let id = MatchId::new();
        fx.event(GameEvent::MatchStarted {
            match_id: id,
            players: players.clone(),
            token_target,
        });

        let deck = decks.deck_for(&id, 1, players.len())?;
        let round = Round::start(ctx, 1, deck, players.clone(), now, fx)?;

        Ok(Self {
            id,
            tokens: players.iter().map(|p| (p.clone(), 0)).collect(),
            players,
            token_target,
            round,
            history: Vec::new(),
            winner: None,
        })
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn tokens(&self, player: &PlayerId) -> u32 {
        self.tokens.get(player).copied().unwrap_or(0)
    }

    pub fn token_target(&self) -> u32 {
        self.token_target
    }

    pub fn winner(&self) -> Option<&PlayerId> {
        self.winner.as_ref()
    }

    pub fn history(&self) -> &[RoundOutcome] {
        &self.history
    }

    pub(crate) fn play(
        &mut self,
        ctx: &TurnContext<'_>,
        decks: &dyn DeckSource,
        player: &PlayerId,
        cmd: PlayCard,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<()> {
        self.ensure_running()?;
        self.round.play_card(ctx, player, cmd, now, fx)?;
        self.settle_round(ctx, decks, now, fx)
    }

    pub(crate) fn respond(
        &mut self,
        ctx: &TurnContext<'_>,
        decks: &dyn DeckSource,
        player: &PlayerId,
        proof: HandProof,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<()> {
        self.ensure_running()?;
        self.round.respond(ctx, player, proof, now, fx)?;
        self.settle_round(ctx, decks, now, fx)
    }

    pub(crate) fn expire(
        &mut self,
        ctx: &TurnContext<'_>,
        decks: &dyn DeckSource,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<bool> {
        if self.winner.is_some() {
            return Ok(false);
        }
        if !self.round.expire(ctx, now, fx)? {
            return Ok(false);
        }
        self.settle_round(ctx, decks, now, fx)?;
        Ok(true)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.winner.is_some() {
            Err(GameError::NotActive)
        } else {
            Ok(())
        }
    }

    /// Award the finished round and either end the match or deal the next
    /// round, rotated to start with the round winner
    fn settle_round(
        &mut self,
        ctx: &TurnContext<'_>,
        decks: &dyn DeckSource,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<()> {
        let outcome = match self.round.outcome() {
            Some(outcome) => outcome.clone(),
            None => return Ok(()),
        };

        let awarded = tokens_for(&outcome);
        let total = {
            let tokens = self.tokens.entry(outcome.winner.clone()).or_insert(0);
            *tokens += awarded;
            *tokens
        };
        fx.event(GameEvent::TokenAwarded {
            player: outcome.winner.clone(),
            awarded,
            total,
        });
        self.history.push(outcome.clone());

        if total >= self.token_target {
            self.winner = Some(outcome.winner.clone());
            fx.event(GameEvent::MatchEnded {
                match_id: self.id,
                winner: outcome.winner,
                tokens: self.tokens.clone(),
            });
            return Ok(());
        }

        let mut order = self.players.clone();
        if let Some(position) = order.iter().position(|p| *p == outcome.winner) {
            order.rotate_left(position);
        }
        let number = self.round.number() + 1;
        let deck = decks.deck_for(&self.id, number, order.len())?;
        self.round = Round::start(ctx, number, deck, order, now, fx)?;
        Ok(())
    }

    pub fn view(&self) -> MatchView {
        MatchView {
            id: self.id,
            token_target: self.token_target,
            tokens: self.tokens.clone(),
            rounds_played: self.history.len() as u32,
            round: self.round.view(),
            winner: self.winner.clone(),
        }
    }

    pub(crate) fn summary(&self, room_id: RoomId, stake: u64) -> Option<MatchSummary> {
        let winner = self.winner.clone()?;
        Some(MatchSummary {
            match_id: self.id,
            room_id,
            winner,
            participants: self.players.clone(),
            tokens: self.tokens.clone(),
            rounds: self.history.len() as u32,
            stake,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchView {
    pub id: MatchId,
    pub token_target: u32,
    pub tokens: BTreeMap<PlayerId, u32>,
    pub rounds_played: u32,
    pub round: RoundView,
    pub winner: Option<PlayerId>,
}

/// Final result of a match, consumed by settlement and the leaderboard
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: MatchId,
    pub room_id: RoomId,
    pub winner: PlayerId,
    pub participants: Vec<PlayerId>,
    pub tokens: BTreeMap<PlayerId, u32>,
    pub rounds: u32,
    pub stake: u64,
}
