//! What each participant can and cannot learn under every reveal policy.
//!
//! Run with: cargo test -p letter-core --test secrecy_flow

mod common;

use common::{deck, Table};
use letter_core::cards::Rank;
use letter_core::protocol::{GameEvent, Notice, PlayerId};
use letter_core::secrecy::{RevealPolicy, SecrecyError};

const POLICIES: [RevealPolicy; 3] = [
    RevealPolicy::Plaintext,
    RevealPolicy::CommitReveal,
    RevealPolicy::ThresholdEncrypted,
];

fn pid(s: &str) -> PlayerId {
    PlayerId::from(s)
}

// Three players: a holds Priest and draws Handmaid, b holds Baron, c holds Guard.
fn priest_deck() -> Vec<Rank> {
    deck(&[
        Rank::Princess,
        Rank::Priest,
        Rank::Baron,
        Rank::Guard,
        Rank::Handmaid,
    ])
}

#[tokio::test]
async fn test_priest_grant_opens_for_viewer_only() {
    for policy in POLICIES {
        let mut table = Table::start(&["a", "b", "c"], policy, vec![priest_deck()]).await;
        let view = table.play("a", Rank::Priest, Some("b"), None).await.unwrap();
        let round = &view.current_match.as_ref().unwrap().round;
        let sealed = &round.hands[&pid("b")][0];

        let viewer = &table.clients["a"];
        assert_eq!(viewer.grants.len(), 1);
        let grant = &viewer.grants[0];
        assert_eq!(grant.owner, pid("b"));
        assert_eq!(grant.valid_until_turn, round.turn);

        // Opening happens client side; any backend instance of the policy will do.
        let backend = policy.backend();
        assert_eq!(
            backend
                .open(sealed, grant, Some(viewer.keys.secret()), round.turn)
                .unwrap(),
            Rank::Baron,
            "{:?}",
            policy
        );
        assert!(matches!(
            backend.open(sealed, grant, Some(viewer.keys.secret()), round.turn + 1),
            Err(SecrecyError::AccessExpired { .. })
        ));

        if policy == RevealPolicy::ThresholdEncrypted {
            let bystander = &table.clients["c"];
            assert_eq!(
                backend.open(sealed, grant, Some(bystander.keys.secret()), round.turn),
                Err(SecrecyError::WrongViewer)
            );
            assert_eq!(
                backend.open(sealed, grant, None, round.turn),
                Err(SecrecyError::MissingKey)
            );
        }

        // Nobody else was handed anything.
        assert!(table.clients["b"].grants.is_empty());
        assert!(table.clients["c"].grants.is_empty());

        let events = table.events().await;
        assert!(events.iter().any(|r| r.event
            == GameEvent::AccessGranted {
                viewer: pid("a"),
                owner: pid("b"),
                valid_until_turn: 2,
            }));
        let json = serde_json::to_string(&events).unwrap();
        assert!(!json.contains("Baron"), "{:?} leaked the inspected card", policy);
    }
}

/// Public state never carries the value of a card still in play
#[tokio::test]
async fn test_public_state_hides_held_cards() {
    for policy in POLICIES {
        let table = Table::start(&["a", "b", "c", "d"], policy, vec![]).await;
        let view = table.view().await;
        let events = table.events().await;

        let public = format!(
            "{}{}",
            serde_json::to_string(&view).unwrap(),
            serde_json::to_string(&events).unwrap()
        );
        for rank in Rank::ALL {
            assert!(
                !public.contains(&format!("\"{:?}\"", rank)),
                "{:?} exposed {:?}",
                policy,
                rank
            );
        }
    }
}

#[tokio::test]
async fn test_inbox_holds_only_own_cards() {
    for policy in POLICIES {
        let table = Table::start(&["a", "b", "c"], policy, vec![]).await;
        let view = table.view().await;
        let round = view.current_match.unwrap().round;

        for name in ["a", "b", "c"] {
            let player = pid(name);
            let notices = table.registry.inbox(table.room, &player, 0).await.unwrap();
            let own: Vec<_> = round.hands[&player].iter().map(|c| c.handle).collect();
            for notice in notices {
                match notice.notice {
                    Notice::Dealt { delivery, .. } => {
                        assert_eq!(delivery.sealed.owner, player);
                        assert!(own.contains(&delivery.handle()));
                    }
                    other => panic!("unexpected notice {:?}", other),
                }
            }
        }

        let err = table
            .registry
            .inbox(table.room, &pid("mallory"), 0)
            .await
            .unwrap_err();
        assert_eq!(err, letter_core::GameError::NotSeated(pid("mallory")));
    }
}

/// A proof of the kept card rather than the played one is refused
#[tokio::test]
async fn test_swapped_proof_rejected() {
    for policy in POLICIES {
        let table = Table::start(&["a", "b", "c"], policy, vec![priest_deck()]).await;
        let view = table.view().await;
        let client = &table.clients["a"];
        let mut cmd = client.command(&view, Rank::Priest, Some("b"), None);
        let kept = cmd.kept_proof.take().unwrap();
        cmd.proof = kept;

        let err = table
            .registry
            .play_card(table.room, &client.id, cmd, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            letter_core::GameError::Secrecy(SecrecyError::HandleMismatch)
        );
    }
}
