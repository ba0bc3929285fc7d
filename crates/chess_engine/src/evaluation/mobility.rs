//! Mobility
//!
//! Each color's legal move count is taken with that color to move. The side
//! not on move is measured on a copy of the board with the turn handed over;
//! when that is impossible (the side to move is in check) its count is 0.

use crate::board::Board;
use crate::constants::MOBILITY_WEIGHT;
use crate::types::{Color, Score};

/// Legal move difference (White minus Black) scaled by [`MOBILITY_WEIGHT`]
pub fn evaluate_mobility(board: &Board) -> Score {
    let on_move = board.legal_move_count() as Score;
    let off_move = board
        .with_turn_swapped()
        .map_or(0, |swapped| swapped.legal_move_count() as Score);

    let (white, black) = match board.turn() {
        Color::White => (on_move, off_move),
        Color::Black => (off_move, on_move),
    };
    (white - black) * MOBILITY_WEIGHT
}
