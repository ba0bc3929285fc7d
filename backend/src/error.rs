//! Error types for the game server
//!
//! Move rejections ([`MoveError`]) are recoverable and go back to the player
//! who sent the move. A [`MoveError::RulesOracleFault`] is not: the
//! coordinator drops the session it came from.

use chess_engine::ChessEngineError;
use shared::GameId;
use thiserror::Error;

/// Why a move was not applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("{}", illegal_move_message(.in_check))]
    IllegalMove { in_check: bool },

    #[error("Game is already over")]
    GameOver,

    #[error("Malformed move: {0}")]
    MalformedInput(String),

    #[error("Rules oracle fault: {0}")]
    RulesOracleFault(String),
}

fn illegal_move_message(in_check: &bool) -> &'static str {
    if *in_check {
        "Your king is in check! You must make a move to get out of check."
    } else {
        "Invalid move"
    }
}

impl MoveError {
    /// True when the session can no longer be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(self, MoveError::RulesOracleFault(_))
    }
}

impl From<ChessEngineError> for MoveError {
    fn from(err: ChessEngineError) -> Self {
        if err.is_malformed_input() {
            MoveError::MalformedInput(err.to_string())
        } else {
            MoveError::RulesOracleFault(err.to_string())
        }
    }
}

/// Seat management failures (join, resign)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Game is full")]
    GameFull,

    #[error("You are already playing in this game")]
    AlreadySeated,

    #[error("You are not playing in this game")]
    NotAParticipant,

    #[error("Game is already over")]
    GameOver,
}

/// Persistence failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt game record {id}: {message}")]
    Corrupt { id: GameId, message: String },
}

/// Failures surfaced by the coordinator to the transport layer
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Game not found: {0}")]
    GameNotFound(GameId),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Game {id} was closed after an internal fault: {message}")]
    Fault { id: GameId, message: String },
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;
