//! Protocol identifiers, public events and private notices.

mod events;
mod inbox;
mod types;

pub use events::{
    DiscardCause, DiscardEntry, DiscardFace, EliminationCause, EndReason, EventLog, EventRecord,
    GameEvent, PublicOutcome,
};
pub use inbox::{Inbox, Notice, PrivateNotice};
pub use types::{MatchId, PlayerId, RoomId};
