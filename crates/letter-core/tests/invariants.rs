//! Randomized play against a single room.
//!
//! Run with: cargo test -p letter-core --test invariants

use chrono::{Duration, Utc};
use letter_core::cards::{DeckSeed, Rank, SeededDecks};
use letter_core::engine::{PlayCard, RoundPhase};
use letter_core::protocol::{Notice, PlayerId};
use letter_core::room::{Room, RoomSettings, RoomState};
use letter_core::secrecy::{HandleId, OwnerDelivery, RevealPolicy, ViewingKeypair};
use letter_core::EngineConfig;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

struct Harness {
    room: Room,
    keys: HashMap<PlayerId, ViewingKeypair>,
}

impl Harness {
    fn new(seed: [u8; 32], players: usize, policy: RevealPolicy) -> Self {
        let keys: HashMap<PlayerId, ViewingKeypair> = NAMES[..players]
            .iter()
            .map(|n| (PlayerId::from(*n), ViewingKeypair::generate()))
            .collect();
        let mut settings = RoomSettings::new("prop", players);
        settings.reveal_policy = Some(policy);
        settings.token_target = Some(2);

        let now = Utc::now();
        let host = PlayerId::from(NAMES[0]);
        let mut room = Room::create(
            host.clone(),
            keys[&host].public(),
            settings,
            &EngineConfig::default(),
            Arc::new(SeededDecks::new(DeckSeed::from_bytes(seed))),
            now,
        )
        .unwrap();
        for name in &NAMES[1..players] {
            let player = PlayerId::from(*name);
            room.join(player.clone(), keys[&player].public(), now).unwrap();
        }
        room.start_match(&host, now).unwrap();
        Self { room, keys }
    }

    fn deliveries(&self) -> HashMap<HandleId, OwnerDelivery> {
        let mut all = HashMap::new();
        for player in self.keys.keys() {
            for notice in self.room.inbox(player, 0) {
                if let Notice::Dealt { delivery, .. } = notice.notice {
                    all.insert(delivery.handle(), delivery);
                }
            }
        }
        all
    }

    fn proof(&self, deliveries: &HashMap<HandleId, OwnerDelivery>, player: &PlayerId, handle: HandleId) -> letter_core::HandProof {
        deliveries[&handle].proof(self.keys[player].secret()).unwrap()
    }

    fn check(&self) {
        let game = self.room.current_match().unwrap();
        let round = game.round();
        let order = round.turn_order();

        // A pending action exists exactly while a response is awaited.
        assert_eq!(
            round.pending().is_some(),
            round.phase() == RoundPhase::AwaitingResponse
        );
        if round.phase() == RoundPhase::Finished {
            return;
        }

        for player in order {
            let held = round.hand(player).len();
            if round.is_eliminated(player) {
                assert_eq!(held, 0, "{} eliminated but holds cards", player);
            } else if player == round.current_player() && round.phase() == RoundPhase::AwaitingTurn {
                assert_eq!(held, 2);
            } else {
                assert_eq!(held, 1);
            }
        }
        assert!(!round.is_eliminated(round.current_player()));

        let seqs: Vec<u64> = self.room.events().records().iter().map(|r| r.seq).collect();
        assert!(seqs.windows(2).all(|w| w[1] == w[0] + 1));
    }
}

#[derive(Clone, Debug)]
enum Move {
    Play { card: usize, target: usize, guess: u8 },
    Respond,
    Wait,
}

fn moves() -> impl Strategy<Value = Move> {
    prop_oneof![
        6 => (0usize..2, 0usize..4, 1u8..=8).prop_map(|(card, target, guess)| Move::Play { card, target, guess }),
        3 => Just(Move::Respond),
        1 => Just(Move::Wait),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_commands_are_atomic(
        seed in any::<[u8; 32]>(),
        players in 2usize..=4,
        script in prop::collection::vec(moves(), 1..80),
    ) {
        let mut h = Harness::new(seed, players, RevealPolicy::CommitReveal);
        let mut now = Utc::now();

        for step in script {
            if h.room.state() != RoomState::Active {
                break;
            }
            let before_version = h.room.version();
            let before_events = h.room.events().len();
            let deliveries = h.deliveries();

            let result = {
                let round = h.room.current_match().unwrap().round();
                match step {
                    Move::Wait => {
                        now = now + Duration::seconds(200);
                        h.room.expire(now).map(|_| ())
                    }
                    Move::Respond => match round.pending() {
                        Some(pending) => {
                            let target = pending.target.clone();
                            let handle = round.hand(&target)[0].handle;
                            let proof = h.proof(&deliveries, &target, handle);
                            h.room.respond(&target, proof, now).map(|_| ())
                        }
                        None => continue,
                    },
                    Move::Play { card, target, guess } => {
                        let player = round.current_player().clone();
                        let hand = round.hand(&player).to_vec();
                        let played = hand[card % hand.len()].handle;
                        let kept = hand.iter().find(|c| c.handle != played).map(|c| c.handle);
                        let cmd = PlayCard {
                            card: played,
                            proof: h.proof(&deliveries, &player, played),
                            kept_proof: kept.map(|k| h.proof(&deliveries, &player, k)),
                            target: Some(PlayerId::from(NAMES[target % players])),
                            guess: Rank::from_value(guess),
                        };
                        h.room.play_card(&player, cmd, now).map(|_| ())
                    }
                }
            };

            match result {
                Ok(()) => prop_assert!(h.room.version() >= before_version),
                Err(_) => {
                    prop_assert_eq!(h.room.version(), before_version);
                    prop_assert_eq!(h.room.events().len(), before_events);
                }
            }
            if h.room.state() == RoomState::Active {
                h.check();
            }
        }
    }
}
