//! Alpha-beta search
//!
//! Plain recursive minimax with alpha-beta bounds. Depth is small (three
//! plies by default) so recursion depth is never a concern.

use super::Searcher;
use crate::board::Board;
use crate::constants::SCORE_INF;
use crate::error::ChessEngineResult;
use crate::evaluation::evaluate;
use crate::types::{Color, Score};

impl Searcher {
    /// Value of `board` for the root side, searched `depth` plies deep.
    ///
    /// `maximizing` is true on plies where the root side is to move. Siblings
    /// are cut as soon as `beta <= alpha`.
    pub(crate) fn alphabeta(
        &mut self,
        board: &mut Board,
        depth: u32,
        mut alpha: Score,
        mut beta: Score,
        maximizing: bool,
    ) -> ChessEngineResult<Score> {
        self.nodes += 1;
        if depth == 0 || board.is_game_over() {
            return Ok(evaluate(board, self.root_side));
        }

        let moves = board.legal_moves();
        if maximizing {
            let mut best = -SCORE_INF;
            for mv in &moves {
                let score =
                    board.with_move(mv, |b| self.alphabeta(b, depth - 1, alpha, beta, false))?;
                best = best.max(score);
                alpha = alpha.max(score);
                if beta <= alpha {
                    break;
                }
            }
            Ok(best)
        } else {
            let mut best = SCORE_INF;
            for mv in &moves {
                let score =
                    board.with_move(mv, |b| self.alphabeta(b, depth - 1, alpha, beta, true))?;
                best = best.min(score);
                beta = beta.min(score);
                if beta <= alpha {
                    break;
                }
            }
            Ok(best)
        }
    }
}

/// Unpruned minimax value of `board` for `root_side`.
///
/// Visits every node to `depth`; only useful as a reference for checking
/// that pruning never changes the result.
pub fn minimax(
    board: &mut Board,
    depth: u32,
    maximizing: bool,
    root_side: Color,
) -> ChessEngineResult<Score> {
    if depth == 0 || board.is_game_over() {
        return Ok(evaluate(board, root_side));
    }

    let mut best = if maximizing { -SCORE_INF } else { SCORE_INF };
    for mv in board.legal_moves() {
        let score = board.with_move(&mv, |b| minimax(b, depth - 1, !maximizing, root_side))?;
        best = if maximizing {
            best.max(score)
        } else {
            best.min(score)
        };
    }
    Ok(best)
}
