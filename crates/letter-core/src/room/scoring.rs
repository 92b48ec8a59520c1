//! Token awards and match targets.

use crate::cards::Rank;
use crate::engine::RoundOutcome;

/// Extra tokens for winning a showdown while holding the listed card
pub const BONUS_TABLE: [(Rank, u32); 1] = [(Rank::Guard, 1)];

/// Tokens awarded to the winner of a round: one, plus any bonus
pub fn tokens_for(outcome: &RoundOutcome) -> u32 {
    let bonus = outcome
        .winning_card
        .and_then(|card| BONUS_TABLE.iter().find(|(rank, _)| *rank == card))
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0);
    1 + bonus
}

/// Tokens needed to win a match at this table size
pub fn default_token_target(seats: usize) -> u32 {
    match seats {
        0..=2 => 7,
        3 => 5,
        _ => 4,
    }
}
