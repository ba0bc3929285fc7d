//! Pawn structure
//!
//! - Doubled: every pawn beyond the first on a file
//! - Isolated: no friendly pawn on either adjacent file
//! - Passed: no enemy pawn ahead on its own or an adjacent file

use crate::board::Board;
use crate::constants::{DOUBLED_PAWN_PENALTY, ISOLATED_PAWN_PENALTY, PASSED_PAWN_BONUS};
use crate::types::{Color, Role, Score, Square};

fn file_index(square: Square) -> i32 {
    square.file() as i32
}

fn rank_index(square: Square) -> i32 {
    square.rank() as i32
}

/// True when no enemy pawn stands ahead of `square` on its file or the two
/// adjacent files. "Ahead" is toward the promotion rank of `color`.
pub fn is_passed_pawn(board: &Board, square: Square, color: Color) -> bool {
    let file = file_index(square);
    let rank = rank_index(square);
    board.squares_of(Role::Pawn, !color).into_iter().all(|enemy| {
        let ahead = match color {
            Color::White => rank_index(enemy) > rank,
            Color::Black => rank_index(enemy) < rank,
        };
        !(ahead && (file_index(enemy) - file).abs() <= 1)
    })
}

/// Pawn structure score of `color`, positive is good for `color`
pub fn evaluate_pawn_structure(board: &Board, color: Color) -> Score {
    let pawns = board.squares_of(Role::Pawn, color);

    let mut per_file = [0 as Score; 8];
    for &pawn in &pawns {
        per_file[file_index(pawn) as usize] += 1;
    }

    let mut score = 0;
    for &count in &per_file {
        if count > 1 {
            score -= (count - 1) * DOUBLED_PAWN_PENALTY;
        }
    }

    for &pawn in &pawns {
        let file = file_index(pawn) as usize;
        let left = file > 0 && per_file[file - 1] > 0;
        let right = file < 7 && per_file[file + 1] > 0;
        if !left && !right {
            score -= ISOLATED_PAWN_PENALTY;
        }
        if is_passed_pawn(board, pawn, color) {
            score += PASSED_PAWN_BONUS;
        }
    }

    score
}
