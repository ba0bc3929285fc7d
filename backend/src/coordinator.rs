//! Session coordinator
//!
//! Owns the registry of live sessions and routes client messages to them.
//! Each session sits behind its own async mutex, so every mutation of one
//! game (human move, computer move, resignation) is serialized while
//! unrelated games proceed independently. State changes fan out to observers
//! over a per-session broadcast channel.
//!
//! ## Computer replies
//!
//! When a move leaves the computer to play, a task is spawned that waits for
//! the configured think delay, searches on the blocking pool and then feeds
//! the chosen move back through [`GameSession::apply_move`]. The task handle
//! is kept with the session and aborted when the game ends early. The number
//! of moves played when the task was scheduled is checked again before the
//! result is applied; a result for a session that moved on is discarded.
//!
//! ## Rules faults
//!
//! A session whose rules state turns out inconsistent is evicted and its
//! record marked faulted in the store. Later requests for that game get
//! [`CoordinatorError::Fault`] instead of a restored copy.

use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, CoordinatorResult, MoveError, SessionError};
use crate::session::{AcceptedMove, GameSession, Mover, Seat};
use crate::store::GameStore;
use chess_engine::select_move;
use parking_lot::{Mutex, RwLock};
use shared::{ClientMessage, GameId, GameSnapshot, PlayerId, ServerMessage, Side};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

/// Who the creator of a game plays against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opponent {
    /// Black stays open until a second player joins
    Human,
    Computer,
}

struct SessionHandle {
    session: tokio::sync::Mutex<GameSession>,
    events: broadcast::Sender<ServerMessage>,
    pending_computer_move: Mutex<Option<JoinHandle<()>>>,
}

impl SessionHandle {
    fn new(session: GameSession) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(SessionHandle {
            session: tokio::sync::Mutex::new(session),
            events,
            pending_computer_move: Mutex::new(None),
        })
    }

    fn publish(&self, message: ServerMessage) {
        // No receivers simply means nobody is watching.
        let _ = self.events.send(message);
    }

    fn cancel_computer_move(&self) {
        if let Some(task) = self.pending_computer_move.lock().take() {
            task.abort();
        }
    }
}

pub struct Coordinator {
    sessions: RwLock<HashMap<GameId, Arc<SessionHandle>>>,
    store: Arc<dyn GameStore>,
    config: CoordinatorConfig,
}

impl Coordinator {
    pub fn new(store: Arc<dyn GameStore>, config: CoordinatorConfig) -> Arc<Self> {
        Arc::new(Coordinator {
            sessions: RwLock::new(HashMap::new()),
            store,
            config,
        })
    }

    /// Number of sessions currently held in memory
    pub fn active_games(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_active(&self, id: GameId) -> bool {
        self.sessions.read().contains_key(&id)
    }

    /// Start a new game with `creator` playing White
    pub async fn create_game(&self, creator: &str, opponent: Opponent) -> CoordinatorResult<GameId> {
        let id = Uuid::new_v4();
        let black = match opponent {
            Opponent::Human => Seat::Open,
            Opponent::Computer => Seat::Computer,
        };
        let session = GameSession::new(id, Seat::Human(creator.to_string()), black);
        self.store.create_game(&session.to_record()).await?;

        self.sessions.write().insert(id, SessionHandle::new(session));
        info!(game_id = %id, creator, ?opponent, "game created");
        Ok(id)
    }

    /// Seat `player` in the open seat of game `id`
    pub async fn join_game(self: &Arc<Self>, id: GameId, player: &str) -> CoordinatorResult<Side> {
        let handle = self.load_or_restore(id).await?;
        let mut session = handle.session.lock().await;
        let side = session.join(player)?;

        if let Err(e) = self
            .store
            .join_game(id, side, session.seat(side))
            .await
        {
            error!(game_id = %id, error = %e, "failed to persist join");
        }
        info!(game_id = %id, player, ?side, "player joined");
        handle.publish(ServerMessage::GameState {
            state: session.snapshot(),
        });
        Ok(side)
    }

    /// Live session for `id`, restoring it from the store if needed
    async fn load_or_restore(self: &Arc<Self>, id: GameId) -> CoordinatorResult<Arc<SessionHandle>> {
        if let Some(handle) = self.sessions.read().get(&id) {
            return Ok(Arc::clone(handle));
        }

        let record = self
            .store
            .load_game(id)
            .await?
            .ok_or(CoordinatorError::GameNotFound(id))?;
        if let Some(message) = record.fault {
            return Err(CoordinatorError::Fault { id, message });
        }
        let session = GameSession::from_record(&record).map_err(|e| CoordinatorError::Fault {
            id,
            message: e.to_string(),
        })?;

        let (handle, restored) = {
            let mut sessions = self.sessions.write();
            match sessions.get(&id) {
                // Another caller restored it while the store was being read.
                Some(existing) => (Arc::clone(existing), false),
                None => {
                    let handle = SessionHandle::new(session);
                    sessions.insert(id, Arc::clone(&handle));
                    (handle, true)
                }
            }
        };

        if restored {
            info!(game_id = %id, moves = record.history.len(), "game restored");
            let session = handle.session.lock().await;
            if session.is_computer_turn() {
                self.schedule_computer_move(&handle, session.history().len());
            }
        }
        Ok(handle)
    }

    /// Observer stream for game `id`
    pub async fn subscribe(
        self: &Arc<Self>,
        id: GameId,
    ) -> CoordinatorResult<broadcast::Receiver<ServerMessage>> {
        Ok(self.load_or_restore(id).await?.events.subscribe())
    }

    pub async fn snapshot(self: &Arc<Self>, id: GameId) -> CoordinatorResult<GameSnapshot> {
        let handle = self.load_or_restore(id).await?;
        let session = handle.session.lock().await;
        Ok(session.snapshot())
    }

    /// Drop a session from memory, cancelling any pending computer move
    pub fn remove(&self, id: GameId) -> bool {
        match self.sessions.write().remove(&id) {
            Some(handle) => {
                handle.cancel_computer_move();
                true
            }
            None => false,
        }
    }

    /// Route one client message. Returns a reply meant only for the sender;
    /// everything else goes out on the session's broadcast channel.
    pub async fn dispatch(
        self: &Arc<Self>,
        id: GameId,
        player: &str,
        message: ClientMessage,
    ) -> CoordinatorResult<Option<ServerMessage>> {
        let handle = self.load_or_restore(id).await?;
        match message {
            ClientMessage::Move {
                from,
                to,
                promotion,
            } => {
                self.handle_move(id, &handle, player, &from, &to, promotion.as_deref())
                    .await
            }
            ClientMessage::Resign => self.handle_resign(id, &handle, player).await,
            ClientMessage::OfferDraw => {
                let session = handle.session.lock().await;
                if session.side_of_player(player).is_none() {
                    return Ok(Some(reply_error(
                        SessionError::NotAParticipant.to_string(),
                        &session,
                    )));
                }
                handle.publish(ServerMessage::DrawOffered {
                    by: player.to_string(),
                });
                Ok(None)
            }
            ClientMessage::Chat { message } => {
                if message.trim().is_empty() {
                    return Ok(None);
                }
                handle.publish(ServerMessage::Chat {
                    user: PlayerId::from(player),
                    message,
                    timestamp: chrono::Utc::now().to_rfc3339(),
                });
                Ok(None)
            }
        }
    }

    async fn handle_move(
        self: &Arc<Self>,
        id: GameId,
        handle: &Arc<SessionHandle>,
        player: &str,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> CoordinatorResult<Option<ServerMessage>> {
        let mut session = handle.session.lock().await;
        match session.apply_move(Mover::Human(player), from, to, promotion) {
            Ok(accepted) => {
                debug!(game_id = %id, player, san = %accepted.san, "move accepted");
                self.publish_move(handle, &session, &accepted, false).await;
                if session.is_computer_turn() {
                    self.schedule_computer_move(handle, session.history().len());
                }
                Ok(None)
            }
            Err(e) if e.is_fatal() => {
                drop(session);
                Err(self.evict(id, handle, e.to_string()).await)
            }
            Err(e) => {
                warn!(game_id = %id, player, from, to, reason = %e, "move rejected");
                Ok(Some(reply_error(e.to_string(), &session)))
            }
        }
    }

    async fn handle_resign(
        &self,
        id: GameId,
        handle: &Arc<SessionHandle>,
        player: &str,
    ) -> CoordinatorResult<Option<ServerMessage>> {
        let mut session = handle.session.lock().await;
        match session.resign(player) {
            Ok(winner) => {
                handle.cancel_computer_move();
                info!(game_id = %id, player, ?winner, "player resigned");
                self.publish_end(handle, &session).await;
                Ok(None)
            }
            Err(e) => Ok(Some(reply_error(e.to_string(), &session))),
        }
    }

    /// Persist and broadcast an accepted move, then the result if it ended the game
    async fn publish_move(
        &self,
        handle: &SessionHandle,
        session: &GameSession,
        accepted: &AcceptedMove,
        ai_move: bool,
    ) {
        let id = session.id();
        if let Err(e) = self
            .store
            .save_progress(id, &session.fen(), session.history())
            .await
        {
            error!(game_id = %id, error = %e, "failed to persist move");
        }

        handle.publish(ServerMessage::MoveMade {
            from: accepted.mv.from.to_string(),
            to: accepted.mv.to.to_string(),
            ai_move,
            state: session.snapshot(),
        });

        if session.is_over() {
            self.publish_end(handle, session).await;
        }
    }

    async fn publish_end(&self, handle: &SessionHandle, session: &GameSession) {
        let id = session.id();
        let status = session.status();
        let winner = session.winner();
        if let Err(e) = self.store.finish_game(id, status, winner).await {
            error!(game_id = %id, error = %e, "failed to persist result");
        }
        info!(game_id = %id, status = status.as_str(), ?winner, "game ended");

        handle.publish(ServerMessage::GameEnded {
            status,
            winner,
            state: session.snapshot(),
        });
    }

    /// Close a session whose rules state can no longer be trusted
    async fn evict(&self, id: GameId, handle: &SessionHandle, message: String) -> CoordinatorError {
        error!(game_id = %id, %message, "rules fault, closing game");
        self.sessions.write().remove(&id);
        handle.cancel_computer_move();
        if let Err(e) = self.store.mark_faulted(id, &message).await {
            error!(game_id = %id, error = %e, "failed to persist fault");
        }
        handle.publish(ServerMessage::error(format!(
            "Game closed after an internal error: {message}"
        )));
        CoordinatorError::Fault { id, message }
    }

    fn schedule_computer_move(self: &Arc<Self>, handle: &Arc<SessionHandle>, moves_played: usize) {
        let coordinator = Arc::clone(self);
        let task_handle = Arc::clone(handle);
        let task = tokio::spawn(async move {
            coordinator
                .run_computer_move(task_handle, moves_played)
                .await;
        });
        if let Some(previous) = handle.pending_computer_move.lock().replace(task) {
            previous.abort();
        }
    }

    async fn run_computer_move(&self, handle: Arc<SessionHandle>, moves_played: usize) {
        tokio::time::sleep(self.config.think_delay).await;

        let (id, board) = {
            let session = handle.session.lock().await;
            if !still_waiting(&session, moves_played) {
                return;
            }
            (session.id(), session.board().clone())
        };

        let search = self.config.search;
        let searched = tokio::task::spawn_blocking(move || {
            let mut board = board;
            select_move(&mut board, &search, &mut rand::rng())
        })
        .await;

        let mut session = handle.session.lock().await;
        // This task is finishing; clear its own slot without aborting itself.
        handle.pending_computer_move.lock().take();

        if !still_waiting(&session, moves_played) {
            info!(game_id = %id, "discarding stale computer move");
            return;
        }

        let found = match searched {
            Ok(Ok(Some(found))) => found,
            Ok(Ok(None)) => {
                warn!(game_id = %id, "computer to move without legal moves");
                return;
            }
            Ok(Err(e)) => {
                drop(session);
                self.evict(id, &handle, e.to_string()).await;
                return;
            }
            Err(e) => {
                drop(session);
                self.evict(id, &handle, format!("search task failed: {e}"))
                    .await;
                return;
            }
        };

        let mv = found.mv;
        let promotion = mv.promotion.map(|role| role.char().to_string());
        let applied = session.apply_move(
            Mover::Computer,
            &mv.from.to_string(),
            &mv.to.to_string(),
            promotion.as_deref(),
        );
        match applied {
            Ok(accepted) => {
                debug!(
                    game_id = %id,
                    san = %accepted.san,
                    score = found.score,
                    nodes = found.nodes,
                    "computer moved"
                );
                self.publish_move(&handle, &session, &accepted, true).await;
            }
            Err(e) => {
                // The engine only proposes legal moves; anything else means
                // the rules state is inconsistent.
                drop(session);
                let message = match e {
                    MoveError::RulesOracleFault(message) => message,
                    other => format!("computer move {mv} rejected: {other}"),
                };
                self.evict(id, &handle, message).await;
            }
        }
    }
}

/// Still the computer's turn with no move played since scheduling
fn still_waiting(session: &GameSession, moves_played: usize) -> bool {
    session.is_computer_turn() && session.history().len() == moves_played
}

fn reply_error(message: String, session: &GameSession) -> ServerMessage {
    ServerMessage::Error {
        message,
        state: Some(session.snapshot()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chess_engine::SearchConfig;
    use std::time::Duration;

    fn coordinator(think_delay: Duration) -> Arc<Coordinator> {
        Coordinator::new(
            Arc::new(MemoryStore::new()),
            CoordinatorConfig {
                search: SearchConfig::with_depth(1),
                think_delay,
            },
        )
    }

    #[tokio::test]
    async fn test_create_and_remove() {
        let coordinator = coordinator(Duration::from_millis(10));
        let id = coordinator
            .create_game("alice", Opponent::Human)
            .await
            .unwrap();
        assert!(coordinator.is_active(id));
        assert_eq!(coordinator.active_games(), 1);

        assert!(coordinator.remove(id));
        assert!(!coordinator.remove(id));
        // Still in the store, so it comes back on demand.
        let snapshot = coordinator.snapshot(id).await.unwrap();
        assert_eq!(snapshot.moves.len(), 20);
        assert!(coordinator.is_active(id));
    }

    #[tokio::test]
    async fn test_unknown_game() {
        let coordinator = coordinator(Duration::from_millis(10));
        let err = coordinator.snapshot(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::GameNotFound(_)));
    }

    #[tokio::test]
    async fn test_evict_broadcasts_error() {
        let coordinator = coordinator(Duration::from_millis(10));
        let id = coordinator
            .create_game("alice", Opponent::Human)
            .await
            .unwrap();
        let mut events = coordinator.subscribe(id).await.unwrap();
        let handle = coordinator.load_or_restore(id).await.unwrap();

        let err = coordinator.evict(id, &handle, "corrupt".to_string()).await;
        assert!(matches!(err, CoordinatorError::Fault { .. }));
        assert!(!coordinator.is_active(id));
        match events.recv().await.unwrap() {
            ServerMessage::Error { message, state } => {
                assert!(message.contains("corrupt"));
                assert!(state.is_none());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_evicted_game_stays_closed() {
        let store = Arc::new(MemoryStore::new());
        let coordinator = Coordinator::new(
            store.clone(),
            CoordinatorConfig {
                search: SearchConfig::with_depth(1),
                think_delay: Duration::from_millis(10),
            },
        );
        let id = coordinator
            .create_game("alice", Opponent::Human)
            .await
            .unwrap();
        let handle = coordinator.load_or_restore(id).await.unwrap();
        coordinator
            .evict(id, &handle, "corrupt".to_string())
            .await;

        let record = store.load_game(id).await.unwrap().unwrap();
        assert_eq!(record.fault.as_deref(), Some("corrupt"));

        match coordinator.snapshot(id).await.unwrap_err() {
            CoordinatorError::Fault { id: faulted, message } => {
                assert_eq!(faulted, id);
                assert_eq!(message, "corrupt");
            }
            other => panic!("unexpected error {other:?}"),
        }
        let err = coordinator
            .dispatch(
                id,
                "alice",
                ClientMessage::Move {
                    from: "e2".to_string(),
                    to: "e4".to_string(),
                    promotion: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::Fault { .. }));
        assert!(!coordinator.is_active(id));
    }

    #[tokio::test]
    async fn test_restored_computer_turn_is_resumed() {
        let store = Arc::new(MemoryStore::new());
        let config = CoordinatorConfig {
            search: SearchConfig::with_depth(1),
            think_delay: Duration::from_millis(10),
        };

        // Human has moved; the process stops before the computer replies.
        let id = Uuid::new_v4();
        let mut session = GameSession::new(id, Seat::Human("alice".to_string()), Seat::Computer);
        session
            .apply_move(Mover::Human("alice"), "e2", "e4", None)
            .unwrap();
        store.create_game(&session.to_record()).await.unwrap();

        let coordinator = Coordinator::new(store, config);
        let mut events = coordinator.subscribe(id).await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .expect("computer should reply")
            .unwrap();
        match event {
            ServerMessage::MoveMade { ai_move, state, .. } => {
                assert!(ai_move);
                assert_eq!(state.turn, Side::White);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
