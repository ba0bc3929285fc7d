//! HTTP and WebSocket routes
//!
//! Player identity arrives with each request (`player_id`); authentication
//! is handled in front of this service.

use crate::coordinator::{Coordinator, Opponent};
use crate::error::{CoordinatorError, SessionError};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Json, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use shared::{ClientMessage, GameId, GameSnapshot, PlayerId, ServerMessage, Side};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OpponentKind {
    #[default]
    Human,
    Computer,
}

#[derive(Deserialize)]
pub struct CreateGameRequest {
    pub player_id: PlayerId,
    #[serde(default)]
    pub opponent: OpponentKind,
}

#[derive(Deserialize)]
pub struct JoinGameRequest {
    pub player_id: PlayerId,
}

#[derive(Serialize)]
pub struct SeatResponse {
    pub game_id: GameId,
    pub color: Side,
    pub state: GameSnapshot,
}

#[derive(Deserialize)]
pub struct WsQuery {
    pub player_id: PlayerId,
}

pub fn router(coordinator: Arc<Coordinator>) -> Router {
    let state = AppState { coordinator };

    Router::new()
        .route("/games", post(create_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/join", post(join_game))
        .route("/ws/{id}", get(ws_handler))
        .with_state(state)
}

/// Coordinator failure rendered as `{ "error": message }` with a fitting status
pub struct ApiError(CoordinatorError);

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoordinatorError::GameNotFound(_) => StatusCode::NOT_FOUND,
            CoordinatorError::Session(SessionError::NotAParticipant) => StatusCode::FORBIDDEN,
            CoordinatorError::Session(_) => StatusCode::CONFLICT,
            CoordinatorError::Store(_) | CoordinatorError::Fault { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

async fn create_game(
    State(state): State<AppState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<SeatResponse>), ApiError> {
    let opponent = match payload.opponent {
        OpponentKind::Human => Opponent::Human,
        OpponentKind::Computer => Opponent::Computer,
    };
    let game_id = state
        .coordinator
        .create_game(&payload.player_id, opponent)
        .await?;
    let snapshot = state.coordinator.snapshot(game_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(SeatResponse {
            game_id,
            color: Side::White,
            state: snapshot,
        }),
    ))
}

async fn join_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
    Json(payload): Json<JoinGameRequest>,
) -> Result<Json<SeatResponse>, ApiError> {
    let color = state
        .coordinator
        .join_game(game_id, &payload.player_id)
        .await?;
    let snapshot = state.coordinator.snapshot(game_id).await?;

    Ok(Json(SeatResponse {
        game_id,
        color,
        state: snapshot,
    }))
}

async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<GameId>,
) -> Result<Json<GameSnapshot>, ApiError> {
    Ok(Json(state.coordinator.snapshot(game_id).await?))
}

// ---- WebSocket ----

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(game_id): Path<GameId>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    // Subscribe before upgrading so no event between the snapshot and the
    // first broadcast is lost.
    let events = match state.coordinator.subscribe(game_id).await {
        Ok(events) => events,
        Err(e) => return ApiError(e).into_response(),
    };
    let coordinator = state.coordinator;
    ws.on_upgrade(move |socket| handle_socket(socket, coordinator, game_id, query.player_id, events))
}

async fn handle_socket(
    socket: WebSocket,
    coordinator: Arc<Coordinator>,
    game_id: GameId,
    player: PlayerId,
    mut events: broadcast::Receiver<ServerMessage>,
) {
    let (mut sender, mut receiver) = socket.split();
    info!(%game_id, %player, "websocket connected");

    let initial = match coordinator.snapshot(game_id).await {
        Ok(state) => ServerMessage::GameState { state },
        Err(e) => ServerMessage::error(e.to_string()),
    };
    if send_msg(&mut sender, &initial).await.is_err() {
        return;
    }

    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let own_id = player.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                Some(direct) = direct_rx.recv() => direct,
                event = events.recv() => match event {
                    Ok(event) if !forwards_event(&event, &own_id) => continue,
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%game_id, skipped, "websocket lagging behind game events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            if send_msg(&mut sender, &message).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(t) => t.to_string(),
                Message::Close(_) => break,
                _ => continue,
            };

            if let Some(reply) = handle_frame(&coordinator, game_id, &player, &text).await {
                if direct_tx.send(reply).is_err() {
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!(%game_id, "websocket closed");
}

/// Parse and dispatch one text frame, returning the reply for its sender only
pub async fn handle_frame(
    coordinator: &Arc<Coordinator>,
    game_id: GameId,
    player: &str,
    text: &str,
) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => match coordinator.dispatch(game_id, player, message).await {
            Ok(reply) => reply,
            Err(e) => Some(ServerMessage::error(e.to_string())),
        },
        Err(e) => {
            debug!(%game_id, error = %e, "unparseable frame");
            Some(ServerMessage::error("Invalid message format"))
        }
    }
}

/// Whether a game event goes out to `player`. A draw offer is not echoed
/// back to the player who made it.
fn forwards_event(event: &ServerMessage, player: &str) -> bool {
    !matches!(event, ServerMessage::DrawOffered { by } if by == player)
}

async fn send_msg(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg)?;
    sender.send(Message::Text(json.into())).await?;
    Ok(())
}
