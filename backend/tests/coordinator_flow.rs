//! Coordinator flows
//!
//! Drives the coordinator the way the WebSocket layer does and checks what
//! observers receive.

use backend::config::CoordinatorConfig;
use backend::coordinator::{Coordinator, Opponent};
use backend::error::{CoordinatorError, SessionError};
use backend::store::{GameStore, MemoryStore};
use chess_engine::SearchConfig;
use shared::{ClientMessage, GameStatus, ServerMessage, Side};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

// ============================================================================
// Helpers
// ============================================================================

fn config(think_delay_ms: u64) -> CoordinatorConfig {
    CoordinatorConfig {
        search: SearchConfig::with_depth(1),
        think_delay: Duration::from_millis(think_delay_ms),
    }
}

fn setup(think_delay_ms: u64) -> (Arc<Coordinator>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let coordinator = Coordinator::new(store.clone(), config(think_delay_ms));
    (coordinator, store)
}

fn mv(from: &str, to: &str) -> ClientMessage {
    ClientMessage::Move {
        from: from.to_string(),
        to: to.to_string(),
        promotion: None,
    }
}

async fn next_event(events: &mut broadcast::Receiver<ServerMessage>) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn human_game(coordinator: &Arc<Coordinator>) -> uuid::Uuid {
    let id = coordinator
        .create_game("alice", Opponent::Human)
        .await
        .unwrap();
    coordinator.join_game(id, "bob").await.unwrap();
    id
}

// ============================================================================
// Computer opponent
// ============================================================================

#[tokio::test]
async fn computer_replies_after_human_move() {
    let (coordinator, store) = setup(20);
    let id = coordinator
        .create_game("alice", Opponent::Computer)
        .await
        .unwrap();
    let mut events = coordinator.subscribe(id).await.unwrap();

    let reply = coordinator.dispatch(id, "alice", mv("e2", "e4")).await.unwrap();
    assert!(reply.is_none());

    match next_event(&mut events).await {
        ServerMessage::MoveMade {
            from, to, ai_move, ..
        } => {
            assert_eq!((from.as_str(), to.as_str()), ("e2", "e4"));
            assert!(!ai_move);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match next_event(&mut events).await {
        ServerMessage::MoveMade { ai_move, state, .. } => {
            assert!(ai_move);
            assert_eq!(state.turn, Side::White);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let record = store.load_game(id).await.unwrap().unwrap();
    assert_eq!(record.history.len(), 2);
}

#[tokio::test]
async fn resignation_discards_pending_computer_move() {
    let (coordinator, _store) = setup(300);
    let id = coordinator
        .create_game("alice", Opponent::Computer)
        .await
        .unwrap();
    let mut events = coordinator.subscribe(id).await.unwrap();

    coordinator.dispatch(id, "alice", mv("e2", "e4")).await.unwrap();
    let reply = coordinator
        .dispatch(id, "alice", ClientMessage::Resign)
        .await
        .unwrap();
    assert!(reply.is_none());

    assert!(matches!(
        next_event(&mut events).await,
        ServerMessage::MoveMade { ai_move: false, .. }
    ));
    match next_event(&mut events).await {
        ServerMessage::GameEnded { status, winner, .. } => {
            assert_eq!(status, GameStatus::Resigned);
            assert_eq!(winner, Some(Side::Black));
        }
        other => panic!("unexpected event {other:?}"),
    }

    // Well past the think delay: nothing else happens.
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    let snapshot = coordinator.snapshot(id).await.unwrap();
    assert_eq!(snapshot.game_status, GameStatus::Resigned);
    assert_eq!(snapshot.turn, Side::Black);
}

#[tokio::test]
async fn human_cannot_move_for_the_computer() {
    let (coordinator, _store) = setup(500);
    let id = coordinator
        .create_game("alice", Opponent::Computer)
        .await
        .unwrap();
    coordinator.dispatch(id, "alice", mv("e2", "e4")).await.unwrap();

    let reply = coordinator
        .dispatch(id, "alice", mv("e7", "e5"))
        .await
        .unwrap();
    match reply {
        Some(ServerMessage::Error { message, .. }) => assert_eq!(message, "Not your turn"),
        other => panic!("unexpected reply {other:?}"),
    }
}

// ============================================================================
// Human games
// ============================================================================

#[tokio::test]
async fn join_broadcasts_and_fills_the_game() {
    let (coordinator, store) = setup(10);
    let id = coordinator
        .create_game("alice", Opponent::Human)
        .await
        .unwrap();
    let mut events = coordinator.subscribe(id).await.unwrap();

    assert_eq!(coordinator.join_game(id, "bob").await.unwrap(), Side::Black);
    assert!(matches!(
        next_event(&mut events).await,
        ServerMessage::GameState { .. }
    ));

    let err = coordinator.join_game(id, "carol").await.unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::Session(SessionError::GameFull)
    ));

    let record = store.load_game(id).await.unwrap().unwrap();
    assert!(record.black.is_player("bob"));
}

#[tokio::test]
async fn fools_mate_ends_the_game() {
    let (coordinator, store) = setup(10);
    let id = human_game(&coordinator).await;
    let mut events = coordinator.subscribe(id).await.unwrap();

    for (player, from, to) in [
        ("alice", "f2", "f3"),
        ("bob", "e7", "e5"),
        ("alice", "g2", "g4"),
        ("bob", "d8", "h4"),
    ] {
        let reply = coordinator.dispatch(id, player, mv(from, to)).await.unwrap();
        assert!(reply.is_none(), "{from}{to} rejected: {reply:?}");
        assert!(matches!(
            next_event(&mut events).await,
            ServerMessage::MoveMade { .. }
        ));
    }

    match next_event(&mut events).await {
        ServerMessage::GameEnded {
            status,
            winner,
            state,
        } => {
            assert_eq!(status, GameStatus::Checkmate);
            assert_eq!(winner, Some(Side::Black));
            assert!(state.moves.is_empty());
            assert!(state.is_check);
        }
        other => panic!("unexpected event {other:?}"),
    }

    let record = store.load_game(id).await.unwrap().unwrap();
    assert_eq!(record.status, GameStatus::Checkmate);
    assert_eq!(record.winner, Some(Side::Black));
}

#[tokio::test]
async fn rejections_reply_only_to_sender() {
    let (coordinator, _store) = setup(10);
    let id = human_game(&coordinator).await;
    let mut events = coordinator.subscribe(id).await.unwrap();

    let reply = coordinator.dispatch(id, "bob", mv("e7", "e5")).await.unwrap();
    match reply {
        Some(ServerMessage::Error { message, state }) => {
            assert_eq!(message, "Not your turn");
            assert_eq!(state.unwrap().moves.len(), 20);
        }
        other => panic!("unexpected reply {other:?}"),
    }

    let reply = coordinator.dispatch(id, "alice", mv("e2", "e5")).await.unwrap();
    match reply {
        Some(ServerMessage::Error { message, state }) => {
            assert_eq!(message, "Invalid move");
            assert!(!state.unwrap().is_check);
        }
        other => panic!("unexpected reply {other:?}"),
    }

    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn chat_and_draw_offers_are_broadcast() {
    let (coordinator, _store) = setup(10);
    let id = human_game(&coordinator).await;
    let mut events = coordinator.subscribe(id).await.unwrap();

    let reply = coordinator
        .dispatch(
            id,
            "alice",
            ClientMessage::Chat {
                message: "good luck".to_string(),
            },
        )
        .await
        .unwrap();
    assert!(reply.is_none());
    match next_event(&mut events).await {
        ServerMessage::Chat {
            user,
            message,
            timestamp,
        } => {
            assert_eq!(user, "alice");
            assert_eq!(message, "good luck");
            assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());
        }
        other => panic!("unexpected event {other:?}"),
    }

    // Blank chat is dropped silently.
    coordinator
        .dispatch(
            id,
            "bob",
            ClientMessage::Chat {
                message: "   ".to_string(),
            },
        )
        .await
        .unwrap();

    coordinator
        .dispatch(id, "bob", ClientMessage::OfferDraw)
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        ServerMessage::DrawOffered {
            by: "bob".to_string()
        }
    );

    let reply = coordinator
        .dispatch(id, "mallory", ClientMessage::OfferDraw)
        .await
        .unwrap();
    assert!(matches!(reply, Some(ServerMessage::Error { .. })));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn evicted_game_is_restored_from_store() {
    let (coordinator, _store) = setup(10);
    let id = human_game(&coordinator).await;
    coordinator.dispatch(id, "alice", mv("d2", "d4")).await.unwrap();
    let before = coordinator.snapshot(id).await.unwrap();

    assert!(coordinator.remove(id));
    assert!(!coordinator.is_active(id));

    let after = coordinator.snapshot(id).await.unwrap();
    assert_eq!(after, before);

    let reply = coordinator.dispatch(id, "bob", mv("d7", "d5")).await.unwrap();
    assert!(reply.is_none());
}

#[tokio::test]
async fn unknown_game_is_reported() {
    let (coordinator, _store) = setup(10);
    let err = coordinator
        .dispatch(uuid::Uuid::new_v4(), "alice", ClientMessage::Resign)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::GameNotFound(_)));
}
