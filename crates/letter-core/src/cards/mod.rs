//! Card and deck model.

mod deck;
mod rank;

pub use deck::{Deck, DeckError, DeckSeed, DeckSource, SeededDecks, DECK_SIZE, DECK_TABLE};
pub use rank::Rank;
