//! Turn & action engine.
//!
//! A [`Round`] is a value: every transition takes the round by `&mut`
//! together with a [`TurnContext`] (secrecy backend, viewing keys, timing)
//! and pushes what it publishes into [`Effects`]. Callers apply a
//! transition to a clone and keep it only on success, so a failed command
//! never leaves a half-applied round behind.

mod disclosure;
mod pending;
mod round;

pub use disclosure::{Disclosure, DisclosureLog, DisclosureReason, Viewer};
pub use pending::{PendingAction, PendingKind, PendingView, TimeoutPolicy};
pub use round::{PlayCard, ProtectionSpan, Round, RoundOutcome, RoundPhase, RoundView};

use crate::protocol::{GameEvent, Notice, PlayerId};
use crate::secrecy::{HandSecrecy, HandleId};
use chrono::Duration;
use secp256k1::PublicKey;
use std::collections::HashMap;

/// Everything a round transition needs from its room
pub struct TurnContext<'a> {
    pub secrecy: &'a dyn HandSecrecy,
    pub keys: &'a HashMap<PlayerId, PublicKey>,
    pub response_timeout: Duration,
    pub turn_timeout: Duration,
    pub timeout_policy: TimeoutPolicy,
    pub protection: ProtectionSpan,
}

/// Output of a transition, applied by the caller only when it succeeds
#[derive(Debug, Default)]
pub struct Effects {
    pub events: Vec<GameEvent>,
    pub notices: Vec<(PlayerId, Notice)>,
    /// Handles whose dealer-side material can be dropped
    pub retired: Vec<HandleId>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub(crate) fn notice(&mut self, player: &PlayerId, notice: Notice) {
        self.notices.push((player.clone(), notice));
    }

    pub(crate) fn retire(&mut self, handle: HandleId) {
        self.retired.push(handle);
    }
}
