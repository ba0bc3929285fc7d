//! # Chess Engine Core Types
//!
//! ## Overview
//!
//! The engine does not own a board representation of its own: positions live
//! inside [`crate::board::Board`], which wraps the `shakmaty` rules crate. What
//! this module defines is the small vocabulary shared by the evaluator, the
//! search and the game server:
//!
//! - [`Move`] - a request-shaped move: origin, destination, optional promotion
//! - [`Score`] - centipawn evaluation, positive favours the side being scored
//!
//! ## Why a separate `Move`?
//!
//! `shakmaty::Move` encodes castling as "king takes own rook" and carries the
//! moving role and captured piece. Clients only ever say "from e1 to g1", so
//! the engine speaks in that shape and matches it against the legal move list.
//! Two `Move` values are equal exactly when their three fields are equal.
//!
//! ```rust,ignore
//! let mv = Move::parse("e7", "e8", Some("q"))?;
//! assert_eq!(mv.to_string(), "e7e8q");
//! ```

use crate::error::{ChessEngineError, ChessEngineResult};
use std::fmt;
use std::str::FromStr;

pub use shakmaty::{Color, Rank, Role, Square};

/// Centipawn evaluation score
pub type Score = i32;

/// A move as a client submits it: origin square, destination square and an
/// optional promotion piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl Move {
    pub fn new(from: Square, to: Square, promotion: Option<Role>) -> Self {
        Move {
            from,
            to,
            promotion,
        }
    }

    /// Build a move from textual squares and an optional promotion token
    pub fn parse(from: &str, to: &str, promotion: Option<&str>) -> ChessEngineResult<Self> {
        let promotion = promotion.map(parse_promotion).transpose()?;
        Ok(Move::new(parse_square(from)?, parse_square(to)?, promotion))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

/// Parse a square name such as `e4` (case-insensitive)
pub fn parse_square(input: &str) -> ChessEngineResult<Square> {
    Square::from_str(&input.trim().to_ascii_lowercase()).map_err(|_| {
        ChessEngineError::InvalidSquare {
            input: input.to_string(),
        }
    })
}

/// Parse a promotion token: a piece letter in either case (`q`, `N`) or a
/// piece name (`queen`). Only knight, bishop, rook and queen are accepted.
pub fn parse_promotion(input: &str) -> ChessEngineResult<Role> {
    let token = input.trim().to_ascii_lowercase();
    let role = match token.as_str() {
        "q" | "queen" => Some(Role::Queen),
        "r" | "rook" => Some(Role::Rook),
        "b" | "bishop" => Some(Role::Bishop),
        "n" | "knight" => Some(Role::Knight),
        _ => None,
    };
    role.ok_or_else(|| ChessEngineError::InvalidPromotion {
        input: input.to_string(),
    })
}

/// Lowercase color name used on the wire and in logs
pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "white",
        Color::Black => "black",
    }
}
