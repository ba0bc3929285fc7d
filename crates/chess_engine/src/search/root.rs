//! Root move selection

use super::{SearchConfig, SearchResult, Searcher};
use crate::board::Board;
use crate::constants::SCORE_INF;
use crate::error::ChessEngineResult;
use crate::types::{color_name, Move, Score};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Pick a move for the side to move, or `None` when it has no legal move.
///
/// Early in the game (fewer than `config.opening_shuffle_plies` plies played)
/// the root moves are shuffled with `rng` so equal-valued openings vary.
/// Ties keep the first move reached. Each root child is searched with a full
/// window.
///
/// # Errors
///
/// Propagates [`crate::ChessEngineError::OracleFault`] from the rules oracle.
pub fn select_move<R: Rng + ?Sized>(
    board: &mut Board,
    config: &SearchConfig,
    rng: &mut R,
) -> ChessEngineResult<Option<SearchResult>> {
    let mut moves = board.legal_moves();
    if moves.is_empty() {
        return Ok(None);
    }
    if board.ply_count() < config.opening_shuffle_plies {
        moves.shuffle(rng);
    }

    let mut searcher = Searcher::new(board);
    let child_depth = config.max_depth.saturating_sub(1);
    let mut best: Option<(Move, Score)> = None;

    for mv in &moves {
        let score = board.with_move(mv, |b| {
            searcher.alphabeta(b, child_depth, -SCORE_INF, SCORE_INF, false)
        })?;
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((*mv, score));
        }
    }

    // The first root move always sets `best`.
    let Some((mv, score)) = best else {
        return Ok(None);
    };

    debug!(
        side = color_name(searcher.root_side),
        depth = config.max_depth,
        nodes = searcher.nodes,
        %mv,
        score,
        "search finished"
    );

    Ok(Some(SearchResult {
        mv,
        score,
        nodes: searcher.nodes,
    }))
}
