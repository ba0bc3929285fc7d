//! WebSocket protocol
//!
//! Every frame is a JSON object whose `type` field names the message kind in
//! snake_case. State-bearing server messages flatten a [`GameSnapshot`] into
//! the same object, so a client can re-render from any of them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type GameId = Uuid;

/// Caller-supplied player identity. Authentication happens upstream.
pub type PlayerId = String;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

/// Game status as clients see it. The last four are terminal.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Check,
    Checkmate,
    Stalemate,
    Draw,
    Resigned,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GameStatus::Checkmate | GameStatus::Stalemate | GameStatus::Draw | GameStatus::Resigned
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Active => "active",
            GameStatus::Check => "check",
            GameStatus::Checkmate => "checkmate",
            GameStatus::Stalemate => "stalemate",
            GameStatus::Draw => "draw",
            GameStatus::Resigned => "resigned",
        }
    }
}

/// A piece on the board: `piece` is the FEN letter (uppercase for white)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PieceView {
    pub piece: String,
    pub color: Side,
}

/// One legal move; `promotion` is a lowercase piece letter
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LegalMove {
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
}

/// Everything a client needs to draw the board and accept input
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct GameSnapshot {
    /// Occupied squares only, keyed by square name (`e4`)
    pub board: BTreeMap<String, PieceView>,
    pub turn: Side,
    pub moves: Vec<LegalMove>,
    pub game_status: GameStatus,
    pub is_check: bool,
}

/// Client → Server messages
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Move {
        from: String,
        to: String,
        #[serde(default)]
        promotion: Option<String>,
    },
    Resign,
    OfferDraw,
    Chat {
        #[serde(default)]
        message: String,
    },
}

/// Server → Client messages
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    GameState {
        #[serde(flatten)]
        state: GameSnapshot,
    },
    MoveMade {
        from: String,
        to: String,
        #[serde(default)]
        ai_move: bool,
        #[serde(flatten)]
        state: GameSnapshot,
    },
    GameEnded {
        status: GameStatus,
        winner: Option<Side>,
        #[serde(flatten)]
        state: GameSnapshot,
    },
    Error {
        message: String,
        #[serde(flatten)]
        state: Option<GameSnapshot>,
    },
    Chat {
        user: PlayerId,
        message: String,
        /// RFC 3339
        timestamp: String,
    },
    DrawOffered {
        by: PlayerId,
    },
}

impl ServerMessage {
    /// Error without board context, for frames that never reached a game
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            state: None,
        }
    }
}
