//! Card ranks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Card rank. The discriminant is the printed value and defines the
/// strict total order used for every comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rank {
    Guard = 1,
    Priest = 2,
    Baron = 3,
    Handmaid = 4,
    Prince = 5,
    King = 6,
    Countess = 7,
    Princess = 8,
}

impl Rank {
    /// All ranks, lowest first
    pub const ALL: [Rank; 8] = [
        Rank::Guard,
        Rank::Priest,
        Rank::Baron,
        Rank::Handmaid,
        Rank::Prince,
        Rank::King,
        Rank::Countess,
        Rank::Princess,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Rank> {
        Rank::ALL.get(usize::from(value).checked_sub(1)?).copied()
    }

    /// Convert to bytes for commitment
    pub fn to_bytes(self) -> [u8; 1] {
        [self.value()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Guard => "Guard",
            Rank::Priest => "Priest",
            Rank::Baron => "Baron",
            Rank::Handmaid => "Handmaid",
            Rank::Prince => "Prince",
            Rank::King => "King",
            Rank::Countess => "Countess",
            Rank::Princess => "Princess",
        }
    }

    /// Does playing this card name another player?
    pub fn takes_target(self) -> bool {
        matches!(
            self,
            Rank::Guard | Rank::Priest | Rank::Baron | Rank::Prince | Rank::King
        )
    }

    /// Prince is the only card that may name its own player.
    pub fn may_target_self(self) -> bool {
        self == Rank::Prince
    }

    /// Playing this card requires proving the card kept in hand.
    pub fn needs_kept_card(self) -> bool {
        matches!(self, Rank::Baron | Rank::Prince | Rank::King)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
