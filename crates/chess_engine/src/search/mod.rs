//! Move selection for the computer opponent
//!
//! Fixed-depth minimax with alpha-beta pruning over [`Board`]. Scores are
//! framed from the side to move at the root: the root and every other ply
//! below it maximize, the plies in between minimize.
//!
//! ## Module Organization
//!
//! - `alphabeta` - Pruned tree walk and the plain minimax it must agree with
//! - `root` - Root move loop, opening shuffle and random fallback
//!
//! Move order is whatever the rules oracle lists; there is no ordering
//! heuristic, no quiescence and no transposition table.

mod alphabeta;
mod root;

pub use alphabeta::minimax;
pub use root::select_move;

use crate::board::Board;
use crate::constants::{DEFAULT_SEARCH_DEPTH, OPENING_SHUFFLE_PLIES};
use crate::types::{Color, Move, Score};

/// Search parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Plies searched below the root
    pub max_depth: u32,
    /// Root moves are shuffled while fewer plies than this have been played
    pub opening_shuffle_plies: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_depth: DEFAULT_SEARCH_DEPTH,
            opening_shuffle_plies: OPENING_SHUFFLE_PLIES,
        }
    }
}

impl SearchConfig {
    pub fn with_depth(max_depth: u32) -> Self {
        SearchConfig {
            max_depth,
            ..SearchConfig::default()
        }
    }
}

/// Outcome of a search: the chosen move and what it is worth to the mover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub mv: Move,
    /// Value of `mv` from the side to move's point of view
    pub score: Score,
    /// Positions visited, root children included
    pub nodes: u64,
}

/// Per-search state: whose point of view leaves are scored from, and a node count
pub(crate) struct Searcher {
    pub(crate) root_side: Color,
    pub(crate) nodes: u64,
}

impl Searcher {
    pub(crate) fn new(board: &Board) -> Self {
        Searcher {
            root_side: board.turn(),
            nodes: 0,
        }
    }
}
