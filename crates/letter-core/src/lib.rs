//! Letter Core Library
//!
//! Rules engine and room lifecycle for the sealed-hand elimination game:
//! - Cards and the 16-card deck (`cards`)
//! - Hand secrecy backends: plaintext vault, commit-reveal, threshold (`secrecy`)
//! - Turn engine with pending responses and deadlines (`engine`)
//! - Rooms, matches, token scoring (`room`)
//! - Public event log and private inboxes (`protocol`)
//! - Registry wiring rooms to the ledger and leaderboard (`registry`)

pub mod cards;
pub mod config;
pub mod engine;
pub mod error;
pub mod leaderboard;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod secrecy;

pub use cards::{Deck, DeckSeed, DeckSource, Rank, SeededDecks};
pub use config::EngineConfig;
pub use engine::{PendingKind, PlayCard, TimeoutPolicy};
pub use error::{GameError, Result};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use protocol::{EventRecord, GameEvent, MatchId, Notice, PlayerId, PrivateNotice, RoomId};
pub use registry::RoomRegistry;
pub use room::{MatchSummary, Room, RoomSettings, RoomState, RoomView};
pub use secrecy::{HandProof, HandSecrecy, RevealPolicy, ViewingKeypair};
