//! Error types for chess engine
//!
//! Provides custom error types for rules queries, move parsing and search.
//! Anything reported as [`ChessEngineError::OracleFault`] means the rules
//! backend contradicted itself; callers treat it as fatal for the game.

use thiserror::Error;

/// Errors that can occur in the chess engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChessEngineError {
    /// Square name could not be parsed (expects `a1`..`h8`)
    #[error("Invalid square: {input:?}")]
    InvalidSquare { input: String },

    /// Promotion token did not name a promotable piece
    #[error("Invalid promotion piece: {input:?}")]
    InvalidPromotion { input: String },

    /// Position string could not be parsed or describes an illegal setup
    #[error("Invalid FEN {fen:?}: {message}")]
    InvalidFen { fen: String, message: String },

    /// Rules backend was inconsistent with itself (e.g. refused a move it listed as legal)
    #[error("Rules oracle fault: {message}")]
    OracleFault { message: String },
}

impl ChessEngineError {
    /// True for input errors a client can correct by resubmitting
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            ChessEngineError::InvalidSquare { .. } | ChessEngineError::InvalidPromotion { .. }
        )
    }

    pub(crate) fn fault(message: impl Into<String>) -> Self {
        ChessEngineError::OracleFault {
            message: message.into(),
        }
    }
}

/// Result type alias for chess engine operations
pub type ChessEngineResult<T> = Result<T, ChessEngineError>;
