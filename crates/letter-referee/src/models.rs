//! Request and response bodies.

use letter_core::engine::{PlayCard, ProtectionSpan, TimeoutPolicy};
use letter_core::protocol::{EventRecord, PrivateNotice};
use letter_core::room::RoomSettings;
use letter_core::secrecy::{HandProof, RevealPolicy};
use letter_core::LeaderboardEntry;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub capacity: usize,
    /// Hex-encoded compressed secp256k1 key the host's cards are sealed to
    pub viewing_key: String,
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

impl CreateRoomRequest {
    pub fn settings(&self) -> RoomSettings {
        RoomSettings {
            name: self.name.clone(),
            capacity: self.capacity,
            stake: self.stake,
            token_target: self.token_target,
            reveal_policy: self.reveal_policy,
            timeout_policy: self.timeout_policy,
            protection: self.protection,
        }
    }
}

#[derive(Deserialize)]
pub struct JoinRoomRequest {
    pub viewing_key: String,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

/// Body for commands that carry nothing but the optimistic version
#[derive(Deserialize, Default)]
pub struct VersionedRequest {
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Deserialize)]
pub struct PlayRequest {
    #[serde(flatten)]
    pub play: PlayCard,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub proof: HandProof,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Deserialize)]
pub struct SinceQuery {
    #[serde(default)]
    pub since: u64,
}

#[derive(Deserialize)]
pub struct TopQuery {
    #[serde(default = "default_top")]
    pub limit: usize,
}

fn default_top() -> usize {
    10
}

#[derive(Deserialize)]
pub struct TickRequest {
    pub seconds: i64,
}

#[derive(Serialize)]
pub struct TickResponse {
    pub rooms_changed: usize,
}

#[derive(Serialize)]
pub struct ExpireResponse {
    pub changed: bool,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct InboxResponse {
    pub notices: Vec<PrivateNotice>,
}

#[derive(Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    pub matches_recorded: usize,
}
