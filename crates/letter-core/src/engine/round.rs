//! One round: deal, turns, pending responses, showdown.

use super::disclosure::{DisclosureLog, DisclosureReason, Viewer};
use super::pending::{PendingAction, PendingPayload, PendingView, TimeoutPolicy};
use super::{Effects, TurnContext};
use crate::cards::{Deck, DeckError, Rank};
use crate::error::{GameError, Result};
use crate::protocol::{
    DiscardCause, DiscardEntry, DiscardFace, EliminationCause, EndReason, GameEvent, Notice,
    PlayerId, PublicOutcome,
};
use crate::secrecy::{HandProof, HandleId, Predicate, SealedCard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Face-up set-aside cards in a two-player round
const TWO_PLAYER_FACE_UP: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    AwaitingTurn,
    AwaitingResponse,
    Finished,
}

/// How long Handmaid protection lasts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionSpan {
    /// Until the round ends
    #[default]
    Round,
    /// Until the protected player's next turn begins
    NextTurn,
}

impl std::str::FromStr for ProtectionSpan {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "round" => Ok(ProtectionSpan::Round),
            "next_turn" => Ok(ProtectionSpan::NextTurn),
            other => Err(format!("unknown protection span: {}", other)),
        }
    }
}

/// A card play by the turn holder
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayCard {
    /// Handle of the card being played
    pub card: HandleId,
    pub proof: HandProof,
    /// Proof of the card kept in hand; required by Baron, Prince and King
    #[serde(default)]
    pub kept_proof: Option<HandProof>,
    #[serde(default)]
    pub target: Option<PlayerId>,
    #[serde(default)]
    pub guess: Option<Rank>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub winner: PlayerId,
    pub reason: EndReason,
    /// Winner's card when it was revealed at showdown
    pub winning_card: Option<Rank>,
}

#[derive(Clone)]
pub struct Round {
    number: u32,
    deck: Deck,
    set_aside: Option<Rank>,
    face_up: Vec<Rank>,
    turn_order: Vec<PlayerId>,
    current: usize,
    hands: BTreeMap<PlayerId, Vec<SealedCard>>,
    eliminated: Vec<PlayerId>,
    protected: BTreeSet<PlayerId>,
    discards: Vec<DiscardEntry>,
    turn: u32,
    turn_deadline: DateTime<Utc>,
    pending: Option<PendingAction>,
    phase: RoundPhase,
    outcome: Option<RoundOutcome>,
    disclosures: DisclosureLog,
}

impl Round {
    /// Set aside, deal one card per player and begin the first turn.
    /// `turn_order[0]` moves first.
    pub fn start(
        ctx: &TurnContext<'_>,
        number: u32,
        mut deck: Deck,
        turn_order: Vec<PlayerId>,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<Self> {
        if !(2..=4).contains(&turn_order.len()) {
            return Err(DeckError::UnsupportedPlayerCount(turn_order.len()).into());
        }

        let set_aside = deck.draw()?;
        let mut face_up = Vec::new();
        if turn_order.len() == 2 {
            for _ in 0..TWO_PLAYER_FACE_UP {
                face_up.push(deck.draw()?);
            }
        }

        let mut round = Self {
            number,
            deck,
            set_aside: Some(set_aside),
            face_up,
            hands: turn_order.iter().map(|p| (p.clone(), Vec::new())).collect(),
            turn_order,
            current: 0,
            eliminated: Vec::new(),
            protected: BTreeSet::new(),
            discards: Vec::new(),
            turn: 0,
            turn_deadline: now,
            pending: None,
            phase: RoundPhase::AwaitingTurn,
            outcome: None,
            disclosures: DisclosureLog::default(),
        };

        for player in round.turn_order.clone() {
            let card = round.deck.draw()?;
            round.deal(ctx, &player, card, fx)?;
        }

        fx.event(GameEvent::RoundStarted {
            round: number,
            turn_order: round.turn_order.clone(),
            face_up: round.face_up.clone(),
            deck_remaining: round.deck.remaining(),
        });

        round.begin_turn(ctx, 0, now, fx)?;
        Ok(round)
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn turn_deadline(&self) -> DateTime<Utc> {
        self.turn_deadline
    }

    pub fn current_player(&self) -> &PlayerId {
        &self.turn_order[self.current]
    }

    pub fn turn_order(&self) -> &[PlayerId] {
        &self.turn_order
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    pub fn hand(&self, player: &PlayerId) -> &[SealedCard] {
        self.hands.get(player).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn deck_remaining(&self) -> usize {
        self.deck.remaining()
    }

    pub fn discards(&self) -> &[DiscardEntry] {
        &self.discards
    }

    pub fn is_eliminated(&self, player: &PlayerId) -> bool {
        self.eliminated.contains(player)
    }

    pub fn is_protected(&self, player: &PlayerId) -> bool {
        self.protected.contains(player)
    }

    pub fn outcome(&self) -> Option<&RoundOutcome> {
        self.outcome.as_ref()
    }

    pub fn disclosures(&self) -> &DisclosureLog {
        &self.disclosures
    }

    /// Players still in the round, in turn order
    pub fn survivors(&self) -> Vec<PlayerId> {
        self.turn_order
            .iter()
            .filter(|p| !self.eliminated.contains(p))
            .cloned()
            .collect()
    }

    fn is_active(&self, player: &PlayerId) -> bool {
        self.turn_order.contains(player) && !self.eliminated.contains(player)
    }

    /// Sum of a player's face-up discards
    pub fn discard_total(&self, player: &PlayerId) -> u32 {
        self.discards
            .iter()
            .filter(|entry| &entry.owner == player)
            .filter_map(|entry| entry.face.rank())
            .map(|rank| u32::from(rank.value()))
            .sum()
    }

    /// Play a card from the turn holder's hand
    pub fn play_card(
        &mut self,
        ctx: &TurnContext<'_>,
        player: &PlayerId,
        cmd: PlayCard,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<()> {
        match self.phase {
            RoundPhase::Finished => return Err(GameError::NotActive),
            RoundPhase::AwaitingResponse => return Err(GameError::ActionPending),
            RoundPhase::AwaitingTurn => {}
        }
        if player != self.current_player() {
            return Err(GameError::NotYourTurn(player.clone()));
        }

        let hand = self.hand(player);
        let played = hand
            .iter()
            .find(|card| card.handle == cmd.card)
            .cloned()
            .ok_or(GameError::CardNotHeld)?;
        let kept = hand.iter().find(|card| card.handle != cmd.card).cloned();

        let rank = ctx.secrecy.verify(&played, &cmd.proof)?;
        let kept_rank = match (&cmd.kept_proof, &kept) {
            (Some(proof), Some(card)) => Some(ctx.secrecy.verify(card, proof)?),
            (Some(_), None) => return Err(GameError::CardNotHeld),
            (None, _) => None,
        };
        if rank.needs_kept_card() && kept_rank.is_none() {
            return Err(GameError::MissingProof);
        }
        if matches!(rank, Rank::King | Rank::Prince) && kept_rank == Some(Rank::Countess) {
            return Err(GameError::CountessRequired);
        }

        let target = self.validate_target(player, rank, cmd.target.as_ref())?;
        let payload = match (rank, &target) {
            (Rank::Guard, Some(_)) => {
                let guess = cmd
                    .guess
                    .ok_or_else(|| GameError::InvalidGuess("a guess is required".into()))?;
                if guess == Rank::Guard {
                    return Err(GameError::InvalidGuess("Guard cannot be named".into()));
                }
                Some(PendingPayload::Guess { guess })
            }
            (Rank::Baron, Some(_)) => Some(PendingPayload::Compare {
                initiator_card: kept_rank.ok_or(GameError::MissingProof)?,
            }),
            (Rank::Prince, Some(_)) => Some(PendingPayload::ForcedDiscard),
            (Rank::King, Some(_)) => Some(PendingPayload::Exchange {
                initiator_handle: kept.as_ref().ok_or(GameError::CardNotHeld)?.handle,
                initiator_card: kept_rank.ok_or(GameError::MissingProof)?,
            }),
            _ => None,
        };

        // Validated; apply.
        if let (Some(card), Some(_)) = (&kept, kept_rank) {
            self.disclosures.record(
                self.turn,
                Viewer::Referee,
                player,
                card.handle,
                DisclosureReason::KeptCardProof,
            );
        }
        self.take_card(player, &played.handle);
        fx.retire(played.handle);
        fx.event(GameEvent::CardPlayed {
            player: player.clone(),
            rank,
            target: target.clone(),
        });
        self.discards.push(DiscardEntry {
            owner: player.clone(),
            face: DiscardFace::Revealed { rank },
            cause: DiscardCause::Played,
        });

        match rank {
            Rank::Princess => {
                self.eliminate(player, EliminationCause::DiscardedPrincess, fx);
            }
            Rank::Handmaid => {
                self.protected.insert(player.clone());
                fx.event(GameEvent::PlayerProtected {
                    player: player.clone(),
                });
            }
            Rank::Priest => {
                if let Some(owner) = &target {
                    self.inspect(ctx, player, owner, fx)?;
                }
            }
            _ => {}
        }

        if let (Some(payload), Some(target)) = (payload, target) {
            let pending = PendingAction::open(
                player.clone(),
                target.clone(),
                payload,
                self.turn,
                now,
                ctx.response_timeout,
            );
            fx.notice(
                &target,
                Notice::ResponseRequested {
                    kind: pending.kind,
                    initiator: player.clone(),
                    guess: pending.guess(),
                    deadline: pending.deadline,
                },
            );
            fx.event(GameEvent::PendingOpened {
                kind: pending.kind,
                initiator: player.clone(),
                target,
                deadline: pending.deadline,
            });
            self.pending = Some(pending);
            self.phase = RoundPhase::AwaitingResponse;
            return Ok(());
        }

        self.finish_turn(ctx, now, fx)
    }

    /// Answer the open pending action with a proof of the held card
    pub fn respond(
        &mut self,
        ctx: &TurnContext<'_>,
        player: &PlayerId,
        proof: HandProof,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<()> {
        let pending = match (&self.phase, &self.pending) {
            (RoundPhase::AwaitingResponse, Some(pending)) => pending.clone(),
            _ => return Err(GameError::NoPendingActionExpected),
        };
        if player != &pending.target {
            return Err(GameError::NotYourTurn(player.clone()));
        }
        if pending.is_expired(now) {
            return Err(GameError::DeadlinePassed);
        }
        let card = self
            .hand(player)
            .first()
            .cloned()
            .ok_or(GameError::CardNotHeld)?;
        if proof.handle != card.handle {
            return Err(GameError::CardNotHeld);
        }
        let target_card = ctx.secrecy.verify(&card, &proof)?;

        self.disclosures.record(
            self.turn,
            Viewer::Referee,
            player,
            card.handle,
            DisclosureReason::Response(pending.kind),
        );
        self.pending = None;
        self.phase = RoundPhase::AwaitingTurn;

        let initiator = &pending.initiator;
        let target = &pending.target;
        let outcome = match &pending.payload {
            PendingPayload::Guess { guess } => {
                if Predicate::Equals(*guess).holds(target_card) {
                    PublicOutcome::GuessCorrect
                } else {
                    PublicOutcome::GuessIncorrect
                }
            }
            PendingPayload::Compare { initiator_card } => {
                if Predicate::GreaterThan(target_card).holds(*initiator_card) {
                    PublicOutcome::CompareLoser {
                        loser: target.clone(),
                    }
                } else if Predicate::GreaterThan(*initiator_card).holds(target_card) {
                    PublicOutcome::CompareLoser {
                        loser: initiator.clone(),
                    }
                } else {
                    PublicOutcome::CompareTie
                }
            }
            PendingPayload::ForcedDiscard => PublicOutcome::Discarded { rank: target_card },
            PendingPayload::Exchange { .. } => PublicOutcome::Exchanged,
        };
        fx.event(GameEvent::PendingResolved {
            kind: pending.kind,
            initiator: initiator.clone(),
            target: target.clone(),
            outcome: outcome.clone(),
        });

        match (&pending.payload, &outcome) {
            (_, PublicOutcome::GuessCorrect) => {
                self.eliminate(target, EliminationCause::GuessedCorrectly, fx);
            }
            (_, PublicOutcome::CompareLoser { loser }) => {
                self.eliminate(loser, EliminationCause::LostComparison, fx);
            }
            (PendingPayload::ForcedDiscard, _) => {
                self.forced_discard(ctx, target, &card, target_card, fx)?;
            }
            (
                PendingPayload::Exchange {
                    initiator_handle,
                    initiator_card,
                },
                _,
            ) => {
                self.take_card(initiator, initiator_handle);
                self.take_card(target, &card.handle);
                fx.retire(*initiator_handle);
                fx.retire(card.handle);
                self.deal(ctx, initiator, target_card, fx)?;
                self.deal(ctx, target, *initiator_card, fx)?;
                fx.event(GameEvent::HandsExchanged {
                    initiator: initiator.clone(),
                    target: target.clone(),
                });
            }
            _ => {}
        }

        self.finish_turn(ctx, now, fx)
    }

    /// Forfeit an overdue pending action or an idle turn holder.
    /// Returns whether anything changed; calling it again is a no-op.
    pub fn expire(
        &mut self,
        ctx: &TurnContext<'_>,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<bool> {
        match self.phase {
            RoundPhase::Finished => Ok(false),
            RoundPhase::AwaitingResponse => {
                let pending = match &self.pending {
                    Some(pending) if pending.is_expired(now) => pending.clone(),
                    _ => return Ok(false),
                };
                self.pending = None;
                self.phase = RoundPhase::AwaitingTurn;
                fx.event(GameEvent::PendingExpired {
                    kind: pending.kind,
                    initiator: pending.initiator.clone(),
                    target: pending.target.clone(),
                    policy: ctx.timeout_policy,
                });
                if ctx.timeout_policy == TimeoutPolicy::ForfeitTarget {
                    self.eliminate(&pending.target, EliminationCause::ResponseTimeout, fx);
                }
                self.finish_turn(ctx, now, fx)?;
                Ok(true)
            }
            RoundPhase::AwaitingTurn => {
                if now <= self.turn_deadline {
                    return Ok(false);
                }
                let idle = self.current_player().clone();
                fx.event(GameEvent::TurnForfeited {
                    player: idle.clone(),
                    turn: self.turn,
                });
                self.eliminate(&idle, EliminationCause::TurnTimeout, fx);
                self.finish_turn(ctx, now, fx)?;
                Ok(true)
            }
        }
    }

    pub fn view(&self) -> RoundView {
        RoundView {
            number: self.number,
            phase: self.phase,
            turn: self.turn,
            current_player: self.current_player().clone(),
            turn_deadline: self.turn_deadline,
            turn_order: self.turn_order.clone(),
            deck_remaining: self.deck.remaining(),
            face_up: self.face_up.clone(),
            hands: self.hands.clone(),
            discards: self.discards.clone(),
            eliminated: self.eliminated.clone(),
            protected: self.protected.iter().cloned().collect(),
            pending: self.pending.as_ref().map(PendingAction::view),
            outcome: self.outcome.clone(),
        }
    }

    fn validate_target(
        &self,
        player: &PlayerId,
        rank: Rank,
        target: Option<&PlayerId>,
    ) -> Result<Option<PlayerId>> {
        if !rank.takes_target() {
            return match target {
                None => Ok(None),
                Some(_) => Err(GameError::InvalidTarget(format!("{} takes no target", rank))),
            };
        }

        let anyone_targetable = self
            .turn_order
            .iter()
            .any(|p| p != player && self.is_active(p) && !self.protected.contains(p));

        match target {
            None if rank.may_target_self() => Err(GameError::InvalidTarget(format!(
                "{} must name a player, itself if no one else",
                rank
            ))),
            None if anyone_targetable => {
                Err(GameError::InvalidTarget(format!("{} requires a target", rank)))
            }
            None => Ok(None),
            Some(t) if t == player => {
                if rank.may_target_self() {
                    Ok(Some(t.clone()))
                } else {
                    Err(GameError::InvalidTarget(format!(
                        "{} cannot target its own player",
                        rank
                    )))
                }
            }
            Some(t) if !self.turn_order.contains(t) => {
                Err(GameError::InvalidTarget(format!("{} is not in this round", t)))
            }
            Some(t) if self.eliminated.contains(t) => {
                Err(GameError::InvalidTarget(format!("{} is eliminated", t)))
            }
            Some(t) if self.protected.contains(t) => {
                Err(GameError::InvalidTarget(format!("{} is protected", t)))
            }
            Some(t) => Ok(Some(t.clone())),
        }
    }

    /// Priest: the initiator may open the target's card through next turn
    fn inspect(
        &mut self,
        ctx: &TurnContext<'_>,
        viewer: &PlayerId,
        owner: &PlayerId,
        fx: &mut Effects,
    ) -> Result<()> {
        let card = self
            .hand(owner)
            .first()
            .cloned()
            .ok_or(GameError::CardNotHeld)?;
        let viewer_key = ctx
            .keys
            .get(viewer)
            .ok_or_else(|| GameError::NotSeated(viewer.clone()))?;
        let valid_until_turn = self.turn + 1;
        let grant = ctx
            .secrecy
            .grant_access(&card, viewer, viewer_key, valid_until_turn)?;

        self.disclosures.record(
            self.turn,
            Viewer::Player(viewer.clone()),
            owner,
            card.handle,
            DisclosureReason::InspectGrant,
        );
        fx.notice(viewer, Notice::Grant { grant });
        fx.event(GameEvent::AccessGranted {
            viewer: viewer.clone(),
            owner: owner.clone(),
            valid_until_turn,
        });
        Ok(())
    }

    fn forced_discard(
        &mut self,
        ctx: &TurnContext<'_>,
        target: &PlayerId,
        card: &SealedCard,
        rank: Rank,
        fx: &mut Effects,
    ) -> Result<()> {
        self.take_card(target, &card.handle);
        fx.retire(card.handle);
        self.push_discard(
            DiscardEntry {
                owner: target.clone(),
                face: DiscardFace::Revealed { rank },
                cause: DiscardCause::Forced,
            },
            fx,
        );

        if rank == Rank::Princess {
            self.eliminate(target, EliminationCause::DiscardedPrincess, fx);
            return Ok(());
        }

        let replacement = match self.deck.draw() {
            Ok(card) => card,
            Err(_) => self.set_aside.take().ok_or(DeckError::Exhausted)?,
        };
        self.deal(ctx, target, replacement, fx)?;
        fx.event(GameEvent::CardDrawn {
            player: target.clone(),
            turn: self.turn,
            deck_remaining: self.deck.remaining(),
        });
        Ok(())
    }

    fn eliminate(&mut self, player: &PlayerId, cause: EliminationCause, fx: &mut Effects) {
        if self.eliminated.contains(player) {
            return;
        }
        self.eliminated.push(player.clone());
        self.protected.remove(player);
        fx.event(GameEvent::PlayerEliminated {
            player: player.clone(),
            cause,
        });

        let cards = self
            .hands
            .get_mut(player)
            .map(std::mem::take)
            .unwrap_or_default();
        for card in cards {
            fx.retire(card.handle);
            self.push_discard(
                DiscardEntry {
                    owner: player.clone(),
                    face: DiscardFace::Concealed,
                    cause: DiscardCause::Eliminated,
                },
                fx,
            );
        }
    }

    fn push_discard(&mut self, entry: DiscardEntry, fx: &mut Effects) {
        fx.event(GameEvent::CardDiscarded {
            entry: entry.clone(),
        });
        self.discards.push(entry);
    }

    fn take_card(&mut self, player: &PlayerId, handle: &HandleId) {
        if let Some(hand) = self.hands.get_mut(player) {
            hand.retain(|card| &card.handle != handle);
        }
    }

    fn deal(
        &mut self,
        ctx: &TurnContext<'_>,
        player: &PlayerId,
        card: Rank,
        fx: &mut Effects,
    ) -> Result<()> {
        let key = ctx
            .keys
            .get(player)
            .ok_or_else(|| GameError::NotSeated(player.clone()))?;
        let delivery = ctx.secrecy.seal(player, key, card)?;
        self.hands
            .entry(player.clone())
            .or_default()
            .push(delivery.sealed.clone());
        fx.notice(
            player,
            Notice::Dealt {
                round: self.number,
                delivery,
            },
        );
        Ok(())
    }

    fn begin_turn(
        &mut self,
        ctx: &TurnContext<'_>,
        index: usize,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<()> {
        self.current = index;
        self.turn += 1;
        self.phase = RoundPhase::AwaitingTurn;
        self.turn_deadline = now + ctx.turn_timeout;

        let player = self.turn_order[index].clone();
        if ctx.protection == ProtectionSpan::NextTurn {
            self.protected.remove(&player);
        }
        let card = self.deck.draw()?;
        self.deal(ctx, &player, card, fx)?;
        fx.event(GameEvent::CardDrawn {
            player,
            turn: self.turn,
            deck_remaining: self.deck.remaining(),
        });
        Ok(())
    }

    fn finish_turn(
        &mut self,
        ctx: &TurnContext<'_>,
        now: DateTime<Utc>,
        fx: &mut Effects,
    ) -> Result<()> {
        let survivors = self.survivors();
        if survivors.len() <= 1 {
            let winner = match survivors.into_iter().next() {
                Some(winner) => winner,
                None => self.eliminated.last().cloned().ok_or(GameError::NotActive)?,
            };
            self.end(winner, EndReason::LastStanding, None, fx);
            return Ok(());
        }
        if self.deck.is_empty() {
            return self.showdown(ctx, fx);
        }

        let n = self.turn_order.len();
        let next = (1..=n)
            .map(|step| (self.current + step) % n)
            .find(|i| self.is_active(&self.turn_order[*i]))
            .ok_or(GameError::NotActive)?;
        self.begin_turn(ctx, next, now, fx)
    }

    /// Reveal every survivor's card; highest rank wins, then highest
    /// discard total, then earliest turn-order position.
    fn showdown(&mut self, ctx: &TurnContext<'_>, fx: &mut Effects) -> Result<()> {
        let mut best: Option<((Rank, u32, Reverse<usize>), PlayerId)> = None;

        for (position, player) in self.turn_order.iter().enumerate() {
            if self.eliminated.contains(player) {
                continue;
            }
            let card = self
                .hand(player)
                .first()
                .ok_or(GameError::CardNotHeld)?;
            let rank = ctx.secrecy.reveal(card)?;
            fx.event(GameEvent::ShowdownReveal {
                player: player.clone(),
                rank,
            });

            let key = (rank, self.discard_total(player), Reverse(position));
            if best.as_ref().map_or(true, |(best_key, _)| key > *best_key) {
                best = Some((key, player.clone()));
            }
        }

        let ((rank, _, _), winner) = best.ok_or(GameError::NotActive)?;
        self.end(winner, EndReason::DeckExhausted, Some(rank), fx);
        Ok(())
    }

    fn end(
        &mut self,
        winner: PlayerId,
        reason: EndReason,
        winning_card: Option<Rank>,
        fx: &mut Effects,
    ) {
        self.phase = RoundPhase::Finished;
        self.pending = None;
        for card in self.hands.values().flatten() {
            fx.retire(card.handle);
        }
        fx.event(GameEvent::RoundEnded {
            round: self.number,
            winner: winner.clone(),
            reason,
        });
        self.outcome = Some(RoundOutcome {
            winner,
            reason,
            winning_card,
        });
    }
}

// Deck order and the set-aside card stay out of logs.
impl fmt::Debug for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Round")
            .field("number", &self.number)
            .field("phase", &self.phase)
            .field("turn", &self.turn)
            .field("current", &self.current_player())
            .field("deck", &self.deck)
            .field("eliminated", &self.eliminated)
            .field("pending", &self.pending.as_ref().map(|p| p.kind))
            .finish_non_exhaustive()
    }
}

/// Public projection of a round
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundView {
    pub number: u32,
    pub phase: RoundPhase,
    pub turn: u32,
    pub current_player: PlayerId,
    pub turn_deadline: DateTime<Utc>,
    pub turn_order: Vec<PlayerId>,
    pub deck_remaining: usize,
    pub face_up: Vec<Rank>,
    pub hands: BTreeMap<PlayerId, Vec<SealedCard>>,
    pub discards: Vec<DiscardEntry>,
    pub eliminated: Vec<PlayerId>,
    pub protected: Vec<PlayerId>,
    pub pending: Option<PendingView>,
    pub outcome: Option<RoundOutcome>,
}
