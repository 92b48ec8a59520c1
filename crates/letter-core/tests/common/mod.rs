//! Shared harness for the integration tests: a registry with scripted
//! decks and a client per seat that keeps its own private material.

#![allow(dead_code)]

use letter_core::cards::{Deck, DeckError, DeckSource, Rank};
use letter_core::engine::PlayCard;
use letter_core::protocol::{EventRecord, MatchId, Notice, PlayerId, RoomId};
use letter_core::room::{RoomSettings, RoomView};
use letter_core::secrecy::{AccessGrant, HandProof, HandleId, OwnerDelivery, RevealPolicy, ViewingKeypair};
use letter_core::{EngineConfig, Result, RoomRegistry};
use letter_ledger::MockLedger;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const STARTING_BALANCE: u64 = 1_000;

/// Hands out scripted decks in order, then unshuffled full decks
pub struct FixedDecks {
    queued: Mutex<VecDeque<Vec<Rank>>>,
}

impl FixedDecks {
    pub fn new(decks: Vec<Vec<Rank>>) -> Self {
        Self {
            queued: Mutex::new(decks.into()),
        }
    }
}

impl DeckSource for FixedDecks {
    fn deck_for(&self, _: &MatchId, _: u32, players: usize) -> std::result::Result<Deck, DeckError> {
        match self.queued.lock().unwrap().pop_front() {
            Some(top) => Ok(Deck::from_top(top)),
            None => Deck::new(players),
        }
    }
}

/// One player's side of the table
pub struct Client {
    pub id: PlayerId,
    pub keys: ViewingKeypair,
    cursor: u64,
    deliveries: HashMap<HandleId, OwnerDelivery>,
    pub grants: Vec<AccessGrant>,
    pub requests: Vec<Notice>,
}

impl Client {
    pub fn new(name: &str) -> Self {
        Self {
            id: PlayerId::from(name),
            keys: ViewingKeypair::generate(),
            cursor: 0,
            deliveries: HashMap::new(),
            grants: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Pull new private notices
    pub async fn sync(&mut self, registry: &RoomRegistry, room: RoomId) {
        let notices = registry.inbox(room, &self.id, self.cursor).await.unwrap();
        for notice in notices {
            self.cursor = notice.seq;
            match notice.notice {
                Notice::Dealt { delivery, .. } => {
                    self.deliveries.insert(delivery.handle(), delivery);
                }
                Notice::Grant { grant } => self.grants.push(grant),
                other => self.requests.push(other),
            }
        }
    }

    /// Cards currently held, decrypted with this client's own key
    pub fn held(&self, view: &RoomView) -> Vec<(HandleId, Rank)> {
        let round = &view.current_match.as_ref().unwrap().round;
        round
            .hands
            .get(&self.id)
            .map(|cards| {
                cards
                    .iter()
                    .map(|c| {
                        let rank = self.deliveries[&c.handle].card(self.keys.secret()).unwrap();
                        (c.handle, rank)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn proof(&self, handle: HandleId) -> HandProof {
        self.deliveries[&handle].proof(self.keys.secret()).unwrap()
    }

    /// Play `rank` from hand, always proving the kept card
    pub fn command(
        &self,
        view: &RoomView,
        rank: Rank,
        target: Option<&str>,
        guess: Option<Rank>,
    ) -> PlayCard {
        let held = self.held(view);
        let card = held
            .iter()
            .find(|(_, r)| *r == rank)
            .map(|(h, _)| *h)
            .unwrap_or_else(|| panic!("{} does not hold {:?}", self.id, rank));
        let kept = held.iter().find(|(h, _)| *h != card).map(|(h, _)| *h);
        PlayCard {
            card,
            proof: self.proof(card),
            kept_proof: kept.map(|h| self.proof(h)),
            target: target.map(PlayerId::from),
            guess,
        }
    }
}

pub struct Table {
    pub registry: Arc<RoomRegistry>,
    pub ledger: Arc<MockLedger>,
    pub room: RoomId,
    pub clients: HashMap<String, Client>,
}

impl Table {
    /// Open a room hosted by the first player and seat the rest
    pub async fn seat(players: &[&str], settings: RoomSettings, decks: Vec<Vec<Rank>>) -> Self {
        let ledger = Arc::new(MockLedger::new(STARTING_BALANCE));
        let registry = RoomRegistry::new(EngineConfig::default(), ledger.clone())
            .with_deck_source(Arc::new(FixedDecks::new(decks)));

        let mut clients: HashMap<String, Client> =
            players.iter().map(|p| (p.to_string(), Client::new(p))).collect();

        let host = &clients[players[0]];
        let view = registry
            .create_room(host.id.clone(), host.keys.public(), settings)
            .await
            .unwrap();
        for name in &players[1..] {
            let client = &clients[*name];
            registry
                .join_room(view.id, client.id.clone(), client.keys.public(), None)
                .await
                .unwrap();
        }
        for client in clients.values_mut() {
            client.sync(&registry, view.id).await;
        }

        Self {
            registry: Arc::new(registry),
            ledger,
            room: view.id,
            clients,
        }
    }

    /// Seat everyone and start right away
    pub async fn start(
        players: &[&str],
        policy: RevealPolicy,
        decks: Vec<Vec<Rank>>,
    ) -> Self {
        let mut settings = RoomSettings::new("table", players.len());
        settings.reveal_policy = Some(policy);
        let mut table = Self::seat(players, settings, decks).await;
        table
            .registry
            .start_match(table.room, &PlayerId::from(players[0]), None)
            .await
            .unwrap();
        table.sync_all().await;
        table
    }

    pub async fn sync_all(&mut self) {
        for client in self.clients.values_mut() {
            client.sync(&self.registry, self.room).await;
        }
    }

    pub async fn view(&self) -> RoomView {
        self.registry.room_view(self.room).await.unwrap()
    }

    pub async fn play(
        &mut self,
        player: &str,
        rank: Rank,
        target: Option<&str>,
        guess: Option<Rank>,
    ) -> Result<RoomView> {
        let view = self.view().await;
        let client = self.clients.get_mut(player).unwrap();
        client.sync(&self.registry, self.room).await;
        let cmd = client.command(&view, rank, target, guess);
        let result = self
            .registry
            .play_card(self.room, &client.id, cmd, None)
            .await;
        self.sync_all().await;
        result
    }

    /// Answer the open pending action with a proof of the single held card
    pub async fn answer(&mut self, player: &str) -> Result<RoomView> {
        let view = self.view().await;
        let client = self.clients.get_mut(player).unwrap();
        client.sync(&self.registry, self.room).await;
        let (handle, _) = client.held(&view)[0];
        let proof = client.proof(handle);
        let result = self
            .registry
            .respond(self.room, &client.id, proof, None)
            .await;
        self.sync_all().await;
        result
    }

    pub async fn held(&self, player: &str) -> Vec<Rank> {
        let view = self.view().await;
        self.clients[player]
            .held(&view)
            .into_iter()
            .map(|(_, rank)| rank)
            .collect()
    }

    pub async fn events(&self) -> Vec<EventRecord> {
        self.registry.events_since(self.room, 0).await.unwrap()
    }
}

/// Full 16-card composition minus `used`, in table order
pub fn rest_of_deck(used: &[Rank]) -> Vec<Rank> {
    let mut remaining: Vec<Rank> = letter_core::cards::DECK_TABLE
        .iter()
        .flat_map(|(rank, count)| std::iter::repeat(*rank).take(*count))
        .collect();
    for card in used {
        if let Some(i) = remaining.iter().position(|r| r == card) {
            remaining.remove(i);
        }
    }
    remaining
}

/// Scripted prefix followed by the rest of a legal deck
pub fn deck(prefix: &[Rank]) -> Vec<Rank> {
    let mut cards = prefix.to_vec();
    cards.extend(rest_of_deck(prefix));
    cards
}
