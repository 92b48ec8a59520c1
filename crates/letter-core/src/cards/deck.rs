//! Deck composition, shuffling and drawing.

use super::Rank;
use crate::protocol::MatchId;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Fixed multiplicity of every rank in the 16-card deck
pub const DECK_TABLE: [(Rank, usize); 8] = [
    (Rank::Guard, 5),
    (Rank::Priest, 2),
    (Rank::Baron, 2),
    (Rank::Handmaid, 2),
    (Rank::Prince, 2),
    (Rank::King, 1),
    (Rank::Countess, 1),
    (Rank::Princess, 1),
];

pub const DECK_SIZE: usize = 16;

const MIN_PLAYERS: usize = 2;
const MAX_PLAYERS: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DeckError {
    #[error("Deck exhausted")]
    Exhausted,

    #[error("Unsupported player count: {0}")]
    UnsupportedPlayerCount(usize),
}

/// Seed for a shuffle, supplied by the ledger/VRF collaborator or drawn
/// from OS entropy
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckSeed([u8; 32]);

impl DeckSeed {
    /// Create a new random seed
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive the seed for one round of one match: H(seed || match_id || round)
    pub fn derive(&self, match_id: &MatchId, round: u32) -> DeckSeed {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(match_id.as_bytes());
        hasher.update(round.to_be_bytes());
        Self(hasher.finalize().into())
    }

    pub fn rng(&self) -> ChaCha20Rng {
        ChaCha20Rng::from_seed(self.0)
    }
}

impl fmt::Debug for DeckSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeckSeed({})", hex::encode(&self.0[..8]))
    }
}

/// Draw pile. The top of the pile is the end of the vector.
#[derive(Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Rank>,
}

impl Deck {
    /// Build the unshuffled 16-card deck for `player_count` seats
    pub fn new(player_count: usize) -> Result<Self, DeckError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&player_count) {
            return Err(DeckError::UnsupportedPlayerCount(player_count));
        }
        let cards = DECK_TABLE
            .iter()
            .flat_map(|(rank, count)| std::iter::repeat(*rank).take(*count))
            .collect();
        Ok(Self { cards })
    }

    /// Build a deck whose draw order is exactly `cards`, first element on top
    pub fn from_top(cards: Vec<Rank>) -> Self {
        let mut cards = cards;
        cards.reverse();
        Self { cards }
    }

    /// Shuffled deck for `player_count` seats
    pub fn shuffled(player_count: usize, seed: &DeckSeed) -> Result<Self, DeckError> {
        let mut deck = Self::new(player_count)?;
        deck.shuffle(&mut seed.rng());
        Ok(deck)
    }

    /// Unbiased in-place Fisher-Yates shuffle
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for i in (1..self.cards.len()).rev() {
            let j = rng.gen_range(0..=i);
            self.cards.swap(i, j);
        }
    }

    pub fn draw(&mut self) -> Result<Rank, DeckError> {
        self.cards.pop().ok_or(DeckError::Exhausted)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Count of each rank still in the pile
    pub fn composition(&self) -> BTreeMap<Rank, usize> {
        let mut counts = BTreeMap::new();
        for rank in &self.cards {
            *counts.entry(*rank).or_insert(0) += 1;
        }
        counts
    }
}

// The draw order is secret, so Debug only shows the size.
impl fmt::Debug for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deck({} cards)", self.cards.len())
    }
}

/// Source of the deck for every round of a match
pub trait DeckSource: Send + Sync {
    fn deck_for(&self, match_id: &MatchId, round: u32, players: usize) -> Result<Deck, DeckError>;
}

/// Decks shuffled from a room seed; every round gets an independent seed
#[derive(Clone, Debug)]
pub struct SeededDecks {
    seed: DeckSeed,
}

impl SeededDecks {
    pub fn new(seed: DeckSeed) -> Self {
        Self { seed }
    }
}

impl DeckSource for SeededDecks {
    fn deck_for(&self, match_id: &MatchId, round: u32, players: usize) -> Result<Deck, DeckError> {
        Deck::shuffled(players, &self.seed.derive(match_id, round))
    }
}
