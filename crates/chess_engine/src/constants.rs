//! # Chess Engine Constants - Evaluation Weights & Search Parameters
//!
//! ## Centipawn Valuation System
//!
//! Scores are measured in **centipawns** (1/100th of a pawn):
//!
//! - **Pawn**: 100
//! - **Knight**: 320
//! - **Bishop**: 330
//! - **Rook**: 500
//! - **Queen**: 900
//! - **King**: 20,000
//!
//! The king value doubles as the checkmate sentinel: a mated side scores
//! `-MATE_SCORE` and no positional term is added on top of it.
//!
//! ## Positional Weights
//!
//! Mobility, king safety and pawn structure weights are fixed; they are not
//! tuned at runtime.

use crate::types::{Role, Score};

pub const PAWN_VALUE: Score = 100;
pub const KNIGHT_VALUE: Score = 320;
pub const BISHOP_VALUE: Score = 330;
pub const ROOK_VALUE: Score = 500;
pub const QUEEN_VALUE: Score = 900;
pub const KING_VALUE: Score = 20_000;

/// Terminal score for a mated side
pub const MATE_SCORE: Score = KING_VALUE;

/// Alpha-beta window bound, strictly larger than any evaluation
pub const SCORE_INF: Score = 1_000_000;

/// Score per legal move of difference between the two sides
pub const MOBILITY_WEIGHT: Score = 10;

/// Bonus for a king standing on one of its castled squares
pub const CASTLED_KING_BONUS: Score = 30;

/// Penalty per enemy piece attacking the king square
pub const KING_ATTACKER_PENALTY: Score = 20;

/// Penalty per extra pawn on a file
pub const DOUBLED_PAWN_PENALTY: Score = 20;

/// Penalty per pawn with no friendly pawn on an adjacent file
pub const ISOLATED_PAWN_PENALTY: Score = 25;

/// Bonus per pawn with no enemy pawn ahead on its own or adjacent files
pub const PASSED_PAWN_BONUS: Score = 50;

/// Default search depth in plies
pub const DEFAULT_SEARCH_DEPTH: u32 = 3;

/// Games with fewer plies than this shuffle the root move list
pub const OPENING_SHUFFLE_PLIES: u32 = 4;

/// Half-move clock value at which the 75-move rule ends the game
pub const SEVENTY_FIVE_MOVE_HALFMOVES: u32 = 150;

/// Occurrences of one position that end the game by repetition
pub const FIVEFOLD_REPETITION: usize = 5;

/// Base material value of a piece kind
pub const fn piece_value(role: Role) -> Score {
    match role {
        Role::Pawn => PAWN_VALUE,
        Role::Knight => KNIGHT_VALUE,
        Role::Bishop => BISHOP_VALUE,
        Role::Rook => ROOK_VALUE,
        Role::Queen => QUEEN_VALUE,
        Role::King => KING_VALUE,
    }
}
