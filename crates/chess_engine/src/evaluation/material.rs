//! Material evaluation
//!
//! Evaluates the material balance of a position by counting piece values.

use crate::board::Board;
use crate::constants::piece_value;
use crate::types::{Color, Score};

/// Material balance from White's point of view
pub fn evaluate_material(board: &Board) -> Score {
    board
        .pieces()
        .map(|(_, piece)| {
            let value = piece_value(piece.role);
            match piece.color {
                Color::White => value,
                Color::Black => -value,
            }
        })
        .sum()
}
