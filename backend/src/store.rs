//! Persistence seam
//!
//! The coordinator writes through [`GameStore`] after every accepted move and
//! when a game ends. [`MemoryStore`] keeps records in a map; [`SqliteStore`]
//! keeps them in a single `games` table with the move log as a JSON column.
//!
//! A game closed after a rules fault keeps its record with the fault message
//! set; such a record is never played again.

use crate::error::StoreError;
use crate::session::{HistoryEntry, Seat};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use shared::{GameId, GameStatus, Side};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

/// Everything needed to rebuild a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: GameId,
    pub white: Seat,
    pub black: Seat,
    /// Position before the first move
    pub start_fen: String,
    pub fen: String,
    pub history: Vec<HistoryEntry>,
    pub status: GameStatus,
    pub winner: Option<Side>,
    /// Set once the game was closed after a rules fault
    #[serde(default)]
    pub fault: Option<String>,
}

#[async_trait]
pub trait GameStore: Send + Sync {
    async fn create_game(&self, record: &GameRecord) -> Result<(), StoreError>;

    async fn join_game(&self, id: GameId, side: Side, seat: &Seat) -> Result<(), StoreError>;

    async fn load_game(&self, id: GameId) -> Result<Option<GameRecord>, StoreError>;

    async fn save_progress(
        &self,
        id: GameId,
        fen: &str,
        history: &[HistoryEntry],
    ) -> Result<(), StoreError>;

    async fn finish_game(
        &self,
        id: GameId,
        status: GameStatus,
        winner: Option<Side>,
    ) -> Result<(), StoreError>;

    async fn mark_faulted(&self, id: GameId, message: &str) -> Result<(), StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    games: Mutex<HashMap<GameId, GameRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn update(&self, id: GameId, f: impl FnOnce(&mut GameRecord)) {
        if let Some(record) = self.games.lock().get_mut(&id) {
            f(record);
        }
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn create_game(&self, record: &GameRecord) -> Result<(), StoreError> {
        self.games.lock().insert(record.id, record.clone());
        Ok(())
    }

    async fn join_game(&self, id: GameId, side: Side, seat: &Seat) -> Result<(), StoreError> {
        self.update(id, |record| match side {
            Side::White => record.white = seat.clone(),
            Side::Black => record.black = seat.clone(),
        });
        Ok(())
    }

    async fn load_game(&self, id: GameId) -> Result<Option<GameRecord>, StoreError> {
        Ok(self.games.lock().get(&id).cloned())
    }

    async fn save_progress(
        &self,
        id: GameId,
        fen: &str,
        history: &[HistoryEntry],
    ) -> Result<(), StoreError> {
        self.update(id, |record| {
            record.fen = fen.to_string();
            record.history = history.to_vec();
        });
        Ok(())
    }

    async fn finish_game(
        &self,
        id: GameId,
        status: GameStatus,
        winner: Option<Side>,
    ) -> Result<(), StoreError> {
        self.update(id, |record| {
            record.status = status;
            record.winner = winner;
        });
        Ok(())
    }

    async fn mark_faulted(&self, id: GameId, message: &str) -> Result<(), StoreError> {
        self.update(id, |record| record.fault = Some(message.to_string()));
        Ok(())
    }
}

// ============================================================================
// SQLite store
// ============================================================================

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS games (
    id TEXT PRIMARY KEY,
    white_seat TEXT NOT NULL,
    black_seat TEXT NOT NULL,
    start_fen TEXT NOT NULL,
    fen TEXT NOT NULL,
    history TEXT NOT NULL DEFAULT '[]',
    status TEXT NOT NULL DEFAULT 'active',
    winner TEXT,
    fault TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and ensure the schema
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        SqliteStore::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(SqliteStore { pool })
    }
}

fn to_json<T: Serialize>(id: GameId, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
        id,
        message: e.to_string(),
    })
}

fn from_json<T: for<'de> Deserialize<'de>>(id: GameId, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt {
        id,
        message: e.to_string(),
    })
}

/// Bare lowercase word (`active`, `white`) for enums serialized as strings
fn to_word<T: Serialize>(id: GameId, value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(word)) => Ok(word),
        _ => Err(StoreError::Corrupt {
            id,
            message: "expected a string-valued enum".to_string(),
        }),
    }
}

fn from_word<T: for<'de> Deserialize<'de>>(id: GameId, raw: &str) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).map_err(|e| {
        StoreError::Corrupt {
            id,
            message: e.to_string(),
        }
    })
}

#[async_trait]
impl GameStore for SqliteStore {
    async fn create_game(&self, record: &GameRecord) -> Result<(), StoreError> {
        let id = record.id;
        let winner = record.winner.map(|side| to_word(id, &side)).transpose()?;
        sqlx::query(
            "INSERT INTO games
                 (id, white_seat, black_seat, start_fen, fen, history, status, winner, fault)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(id.to_string())
        .bind(to_json(id, &record.white)?)
        .bind(to_json(id, &record.black)?)
        .bind(&record.start_fen)
        .bind(&record.fen)
        .bind(to_json(id, &record.history)?)
        .bind(to_word(id, &record.status)?)
        .bind(winner)
        .bind(&record.fault)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn join_game(&self, id: GameId, side: Side, seat: &Seat) -> Result<(), StoreError> {
        let query = match side {
            Side::White => "UPDATE games SET white_seat = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
            Side::Black => "UPDATE games SET black_seat = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
        };
        sqlx::query(query)
            .bind(to_json(id, seat)?)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn load_game(&self, id: GameId) -> Result<Option<GameRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, white_seat, black_seat, start_fen, fen, history, status, winner, fault
             FROM games WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_id: String = row.try_get("id")?;
        let parsed_id = Uuid::parse_str(&stored_id).map_err(|e| StoreError::Corrupt {
            id,
            message: e.to_string(),
        })?;
        let white: String = row.try_get("white_seat")?;
        let black: String = row.try_get("black_seat")?;
        let history: String = row.try_get("history")?;
        let status: String = row.try_get("status")?;
        let winner: Option<String> = row.try_get("winner")?;

        Ok(Some(GameRecord {
            id: parsed_id,
            white: from_json(id, &white)?,
            black: from_json(id, &black)?,
            start_fen: row.try_get("start_fen")?,
            fen: row.try_get("fen")?,
            history: from_json(id, &history)?,
            status: from_word(id, &status)?,
            winner: winner.map(|raw| from_word(id, &raw)).transpose()?,
            fault: row.try_get("fault")?,
        }))
    }

    async fn save_progress(
        &self,
        id: GameId,
        fen: &str,
        history: &[HistoryEntry],
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE games SET fen = $1, history = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $3",
        )
        .bind(fen)
        .bind(to_json(id, &history)?)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finish_game(
        &self,
        id: GameId,
        status: GameStatus,
        winner: Option<Side>,
    ) -> Result<(), StoreError> {
        let winner = winner.map(|side| to_word(id, &side)).transpose()?;
        sqlx::query(
            "UPDATE games SET status = $1, winner = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $3",
        )
        .bind(to_word(id, &status)?)
        .bind(winner)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_faulted(&self, id: GameId, message: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE games SET fault = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
        )
        .bind(message)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
