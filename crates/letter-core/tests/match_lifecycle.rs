//! Room activation, deadlines, match end, settlement and the leaderboard.
//!
//! Run with: cargo test -p letter-core --test match_lifecycle

mod common;

use common::{deck, Table, STARTING_BALANCE};
use letter_core::cards::Rank;
use letter_core::engine::TimeoutPolicy;
use letter_core::protocol::{EliminationCause, GameEvent, PlayerId};
use letter_core::room::{RoomSettings, RoomState};
use letter_core::secrecy::RevealPolicy;
use letter_core::GameError;
use letter_ledger::{EscrowStatus, LedgerError};

fn pid(s: &str) -> PlayerId {
    PlayerId::from(s)
}

fn staked(capacity: usize, stake: u64) -> RoomSettings {
    let mut settings = RoomSettings::new("staked", capacity);
    settings.stake = stake;
    settings.token_target = Some(1);
    settings.reveal_policy = Some(RevealPolicy::CommitReveal);
    settings
}

// Two players: a holds Guard and draws Baron, b holds Priest.
fn guard_deck() -> Vec<Rank> {
    deck(&[
        Rank::Princess,
        Rank::Guard,
        Rank::Guard,
        Rank::Guard,
        Rank::Guard,
        Rank::Priest,
        Rank::Baron,
    ])
}

// Three players: a holds Guard and draws Handmaid.
fn three_seat_deck() -> Vec<Rank> {
    deck(&[
        Rank::Princess,
        Rank::Guard,
        Rank::Priest,
        Rank::Baron,
        Rank::Handmaid,
    ])
}

#[tokio::test]
async fn test_match_end_settles_and_counts_once() {
    let mut table = Table::seat(&["a", "b"], staked(2, 100), vec![guard_deck()]).await;
    let mut feed = table.registry.subscribe();
    let room = table.room;

    table
        .registry
        .start_match(room, &pid("a"), None)
        .await
        .unwrap();
    table.sync_all().await;
    assert_eq!(table.ledger.escrow_pot(*room.as_uuid()), 200);
    assert_eq!(table.ledger.balance_of("a"), STARTING_BALANCE - 100);

    table
        .play("a", Rank::Guard, Some("b"), Some(Rank::Priest))
        .await
        .unwrap();
    let view = table.answer("b").await.unwrap();

    assert_eq!(view.state, RoomState::Ended);
    let game = view.current_match.unwrap();
    assert_eq!(game.winner, Some(pid("a")));

    assert_eq!(table.ledger.balance_of("a"), STARTING_BALANCE + 100);
    assert_eq!(table.ledger.balance_of("b"), STARTING_BALANCE - 100);
    assert_eq!(
        table.ledger.escrow_status(*room.as_uuid()),
        Some(EscrowStatus::Settled)
    );

    let board = table.registry.leaderboard().clone();
    assert_eq!(board.matches_recorded(), 1);
    let a = board.entry(&pid("a")).unwrap();
    assert_eq!((a.wins, a.games), (1, 1));
    let b = board.entry(&pid("b")).unwrap();
    assert_eq!((b.wins, b.games), (0, 1));

    let events = table.events().await;
    assert!(matches!(
        events.last().unwrap().event,
        GameEvent::LeaderboardUpdated { ref winner, .. } if *winner == pid("a")
    ));
    assert!(events.iter().any(|r| matches!(
        r.event,
        GameEvent::StakeSettled { payout: 200, .. }
    )));
    assert!(!view_pending(&table).await);

    // The live feed saw the same facts in order.
    let mut seen = Vec::new();
    while let Ok(record) = feed.try_recv() {
        seen.push(record.seq);
    }
    assert_eq!(seen.last(), events.last().map(|r| &r.seq));

    // Nothing further happens in an ended room, which has left the listing.
    assert!(table.registry.list_rooms().await.is_empty());
    assert!(!table.registry.expire(room).await.unwrap());
    let err = table.play("a", Rank::Baron, None, None).await.unwrap_err();
    assert_eq!(err, GameError::NotActive);
    assert_eq!(board.matches_recorded(), 1);
}

async fn view_pending(table: &Table) -> bool {
    table.view().await.settlement_pending
}

#[tokio::test]
async fn test_refused_settlement_is_retried_by_the_sweep() {
    let mut table = Table::seat(&["a", "b"], staked(2, 100), vec![guard_deck()]).await;
    let room = table.room;
    let escrow = *room.as_uuid();

    table
        .registry
        .start_match(room, &pid("a"), None)
        .await
        .unwrap();
    table.sync_all().await;
    table.ledger.fail_settlements(2);

    table
        .play("a", Rank::Guard, Some("b"), Some(Rank::Priest))
        .await
        .unwrap();
    let view = table.answer("b").await.unwrap();
    assert_eq!(view.state, RoomState::Ended);
    assert!(view.settlement_pending);

    assert_eq!(table.ledger.escrow_status(escrow), Some(EscrowStatus::Locked));
    assert_eq!(table.ledger.escrow_pot(escrow), 200);
    let failures = |events: &[letter_core::EventRecord]| {
        events
            .iter()
            .filter(|r| matches!(r.event, GameEvent::SettlementFailed { .. }))
            .count()
    };
    assert_eq!(failures(&table.events().await), 1);

    // Still owed, so the room stays live for the sweep; the result counts already.
    assert_eq!(table.registry.list_rooms().await.len(), 1);
    assert_eq!(table.registry.leaderboard().matches_recorded(), 1);

    // Second refusal is not published again.
    assert_eq!(table.registry.expire_all().await, 0);
    assert_eq!(failures(&table.events().await), 1);
    assert!(view_pending(&table).await);

    assert_eq!(table.registry.expire_all().await, 1);
    assert_eq!(table.ledger.escrow_status(escrow), Some(EscrowStatus::Settled));
    assert_eq!(table.ledger.balance_of("a"), STARTING_BALANCE + 100);
    assert_eq!(table.ledger.balance_of("b"), STARTING_BALANCE - 100);
    assert!(!view_pending(&table).await);
    assert!(matches!(
        table.events().await.last().unwrap().event,
        GameEvent::StakeSettled { ref winner, payout: 200, .. } if *winner == pid("a")
    ));

    assert!(table.registry.list_rooms().await.is_empty());
    assert_eq!(table.registry.expire_all().await, 0);
    assert_eq!(table.registry.leaderboard().matches_recorded(), 1);
}

#[tokio::test]
async fn test_failed_stake_lock_refunds_and_stays_in_lobby() {
    let mut table = Table::seat(&["a", "b"], staked(2, 100), vec![guard_deck()]).await;
    let room = table.room;
    table.ledger.set_balance("b", 10);

    let err = table
        .registry
        .start_match(room, &pid("a"), None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GameError::Ledger(LedgerError::InsufficientFunds("b".to_string()))
    );
    assert_eq!(table.view().await.state, RoomState::Lobby);
    assert_eq!(table.ledger.balance_of("a"), STARTING_BALANCE);

    table.ledger.set_balance("b", STARTING_BALANCE);
    table
        .registry
        .start_match(room, &pid("a"), None)
        .await
        .unwrap();
    table.sync_all().await;
    assert_eq!(table.view().await.state, RoomState::Active);
    assert_eq!(table.ledger.escrow_pot(*room.as_uuid()), 200);
}

#[tokio::test]
async fn test_response_timeout_forfeits_target() {
    let mut table = Table::start(&["a", "b", "c"], RevealPolicy::CommitReveal, vec![three_seat_deck()]).await;
    let room = table.room;

    table
        .play("a", Rank::Guard, Some("b"), Some(Rank::King))
        .await
        .unwrap();
    table.registry.advance_time(31);

    let err = table.answer("b").await.unwrap_err();
    assert_eq!(err, GameError::DeadlinePassed);

    assert_eq!(table.registry.expire_all().await, 1);
    let round = table.view().await.current_match.unwrap().round;
    assert_eq!(round.eliminated, vec![pid("b")]);
    assert_eq!(round.current_player, pid("c"));
    assert!(round.pending.is_none());

    let events = table.registry.events_since(room, 0).await.unwrap();
    assert!(events.iter().any(|r| r.event
        == GameEvent::PlayerEliminated {
            player: pid("b"),
            cause: EliminationCause::ResponseTimeout,
        }));

    // The sweep is idempotent.
    let version = table.view().await.version;
    assert_eq!(table.registry.expire_all().await, 0);
    assert_eq!(table.view().await.version, version);
}

#[tokio::test]
async fn test_void_policy_keeps_target_in() {
    let mut settings = RoomSettings::new("void", 3);
    settings.timeout_policy = Some(TimeoutPolicy::VoidAction);
    let mut table = Table::seat(&["a", "b", "c"], settings, vec![three_seat_deck()]).await;
    table
        .registry
        .start_match(table.room, &pid("a"), None)
        .await
        .unwrap();
    table.sync_all().await;

    table
        .play("a", Rank::Guard, Some("b"), Some(Rank::King))
        .await
        .unwrap();
    table.registry.advance_time(31);
    assert!(table.registry.expire(table.room).await.unwrap());

    let round = table.view().await.current_match.unwrap().round;
    assert!(round.eliminated.is_empty());
    assert_eq!(round.current_player, pid("b"));

    let events = table.events().await;
    assert!(events.iter().any(|r| matches!(
        r.event,
        GameEvent::PendingExpired { policy: TimeoutPolicy::VoidAction, .. }
    )));
}

#[tokio::test]
async fn test_idle_turn_holder_is_eliminated() {
    let table = Table::start(&["a", "b", "c"], RevealPolicy::Plaintext, vec![three_seat_deck()]).await;
    table.registry.advance_time(60);
    assert_eq!(table.registry.expire_all().await, 0);

    table.registry.advance_time(61);
    assert_eq!(table.registry.expire_all().await, 1);

    let round = table.view().await.current_match.unwrap().round;
    assert_eq!(round.eliminated, vec![pid("a")]);
    assert_eq!(round.current_player, pid("b"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_plays_commit_once() {
    let table = Table::start(&["a", "b"], RevealPolicy::CommitReveal, vec![guard_deck()]).await;
    let view = table.view().await;
    let version = view.version;
    let cmd = table.clients["a"].command(&view, Rank::Baron, Some("b"), None);

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let registry = table.registry.clone();
        let cmd = cmd.clone();
        let room = table.room;
        tasks.push(tokio::spawn(async move {
            registry.play_card(room, &pid("a"), cmd, Some(version)).await
        }));
    }

    let mut ok = 0;
    let mut stale = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(GameError::StaleState { .. }) => stale += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
    assert_eq!((ok, stale), (1, 1));
    assert_eq!(table.view().await.version, version + 1);
}

#[tokio::test]
async fn test_join_and_leave_through_registry() {
    let mut settings = RoomSettings::new("lobby", 3);
    settings.reveal_policy = Some(RevealPolicy::ThresholdEncrypted);
    let table = Table::seat(&["a", "b"], settings, vec![]).await;
    let room = table.room;

    let stale = table.view().await.version;
    let view = table
        .registry
        .leave_room(room, &pid("a"), Some(stale))
        .await
        .unwrap();
    assert_eq!(view.host, pid("b"));

    let err = table
        .registry
        .leave_room(room, &pid("b"), Some(stale))
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::StaleState { .. }));

    let err = table
        .registry
        .start_match(room, &pid("b"), None)
        .await
        .unwrap_err();
    assert_eq!(err, GameError::NotEnoughPlayers(2));

    let rooms = table.registry.list_rooms().await;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].seats.len(), 1);

    let missing = letter_core::protocol::RoomId::new();
    assert_eq!(
        table.registry.room_view(missing).await.unwrap_err(),
        GameError::RoomNotFound(missing)
    );
}
