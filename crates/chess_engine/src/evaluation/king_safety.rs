//! King safety
//!
//! A king on its castled square (g- or c-file on its home rank) earns
//! [`CASTLED_KING_BONUS`]. Every distinct enemy piece attacking the king's
//! square costs [`KING_ATTACKER_PENALTY`].

use crate::board::Board;
use crate::constants::{CASTLED_KING_BONUS, KING_ATTACKER_PENALTY};
use crate::types::{Color, Score, Square};

fn castled_squares(color: Color) -> [Square; 2] {
    match color {
        Color::White => [Square::G1, Square::C1],
        Color::Black => [Square::G8, Square::C8],
    }
}

/// King safety of `color`, positive is good for `color`
pub fn evaluate_king_safety(board: &Board, color: Color) -> Score {
    let Some(king) = board.king_of(color) else {
        return 0;
    };

    let mut score = 0;
    if castled_squares(color).contains(&king) {
        score += CASTLED_KING_BONUS;
    }
    score -= board.attackers_of(!color, king) as Score * KING_ATTACKER_PENALTY;
    score
}
