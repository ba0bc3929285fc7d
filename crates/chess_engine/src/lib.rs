//! # Chess Engine
//!
//! Rules, evaluation and move search for the game server's computer opponent.
//!
//! - [`board`] - rules oracle over `shakmaty`: legality, game-end predicates,
//!   repetition history
//! - [`evaluation`] - static position score in centipawns
//! - [`search`] - fixed-depth alpha-beta move selection
//! - [`types`] - [`Move`] and square/promotion parsing
//!
//! ```rust,ignore
//! use chess_engine::{select_move, Board, SearchConfig};
//!
//! let mut board = Board::new();
//! let result = select_move(&mut board, &SearchConfig::default(), &mut rand::rng())?;
//! ```

pub mod board;
pub mod constants;
pub mod error;
pub mod evaluation;
pub mod search;
pub mod types;

pub use board::Board;
pub use error::{ChessEngineError, ChessEngineResult};
pub use evaluation::{evaluate, evaluate_white};
pub use search::{minimax, select_move, SearchConfig, SearchResult};
pub use types::{
    color_name, parse_promotion, parse_square, Color, Move, Rank, Role, Score, Square,
};
