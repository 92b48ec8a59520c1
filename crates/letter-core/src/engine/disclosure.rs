//! Private audit trail of every hidden value that left its owner.

use super::PendingKind;
use crate::protocol::PlayerId;
use crate::secrecy::HandleId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "player", rename_all = "snake_case")]
pub enum Viewer {
    Player(PlayerId),
    Referee,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureReason {
    InspectGrant,
    KeptCardProof,
    Response(PendingKind),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disclosure {
    pub turn: u32,
    pub viewer: Viewer,
    pub owner: PlayerId,
    pub handle: HandleId,
    pub reason: DisclosureReason,
}

/// Not part of the public fact stream
#[derive(Clone, Debug, Default)]
pub struct DisclosureLog {
    entries: Vec<Disclosure>,
}

impl DisclosureLog {
    pub(crate) fn record(
        &mut self,
        turn: u32,
        viewer: Viewer,
        owner: &PlayerId,
        handle: HandleId,
        reason: DisclosureReason,
    ) {
        self.entries.push(Disclosure {
            turn,
            viewer,
            owner: owner.clone(),
            handle,
            reason,
        });
    }

    pub fn entries(&self) -> &[Disclosure] {
        &self.entries
    }

    /// Disclosures of `owner`'s cards to anyone but the referee
    pub fn shown_to_players(&self, owner: &PlayerId) -> impl Iterator<Item = &Disclosure> {
        let owner = owner.clone();
        self.entries
            .iter()
            .filter(move |d| d.owner == owner && matches!(d.viewer, Viewer::Player(_)))
    }
}
