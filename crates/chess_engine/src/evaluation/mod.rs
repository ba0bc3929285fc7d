//! Position evaluation
//!
//! Scores a position in centipawns. Every term is summed from White's point
//! of view and the total is negated when scoring for Black:
//!
//! 1. Terminal shortcut - checkmate is worth [`MATE_SCORE`] to the mating
//!    side, stalemate and insufficient material are worth 0. Nothing else is
//!    added to a terminal score.
//! 2. Material - fixed piece values
//! 3. Piece-square tables - per-square bonuses, mirrored for Black
//! 4. Mobility - legal move difference between the two sides
//! 5. King safety - castled bonus, penalty per attacker of the king square
//! 6. Pawn structure - doubled, isolated and passed pawns
//!
//! ## Module Organization
//!
//! - `material` - Material balance
//! - `pst` - Piece-square tables
//! - `mobility` - Legal move counts per side
//! - `king_safety` - Castled position and attackers
//! - `pawns` - Pawn structure
//!
//! Evaluation never mutates the board.

mod king_safety;
mod material;
mod mobility;
mod pawns;
mod pst;

pub use king_safety::evaluate_king_safety;
pub use material::evaluate_material;
pub use mobility::evaluate_mobility;
pub use pawns::{evaluate_pawn_structure, is_passed_pawn};
pub use pst::{evaluate_piece_squares, pst_value};

use crate::board::Board;
use crate::constants::MATE_SCORE;
use crate::types::{Color, Score};

/// Score `board` from `side`'s point of view (higher is better for `side`)
pub fn evaluate(board: &Board, side: Color) -> Score {
    let white = evaluate_white(board);
    match side {
        Color::White => white,
        Color::Black => -white,
    }
}

/// Score `board` from White's point of view
pub fn evaluate_white(board: &Board) -> Score {
    if board.is_checkmate() {
        // The side to move is the one that got mated.
        return match board.turn() {
            Color::White => -MATE_SCORE,
            Color::Black => MATE_SCORE,
        };
    }
    if board.is_stalemate() || board.is_insufficient_material() {
        return 0;
    }

    evaluate_material(board)
        + evaluate_piece_squares(board)
        + evaluate_mobility(board)
        + evaluate_king_safety(board, Color::White)
        - evaluate_king_safety(board, Color::Black)
        + evaluate_pawn_structure(board, Color::White)
        - evaluate_pawn_structure(board, Color::Black)
}
