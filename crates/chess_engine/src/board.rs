//! Rules oracle: board state, legality and game-end predicates
//!
//! [`Board`] wraps `shakmaty::Chess` and adds what the raw position type does
//! not track: an undo stack for search and the repetition history needed for
//! the fivefold-repetition draw. Nothing in the engine generates moves itself;
//! every legality question is answered here.
//!
//! Search mutates a board in place through [`Board::with_move`], which always
//! restores the previous position before returning, whatever the closure did.

use crate::constants::{FIVEFOLD_REPETITION, SEVENTY_FIVE_MOVE_HALFMOVES};
use crate::error::{ChessEngineError, ChessEngineResult};
use crate::types::{Color, Move, Role, Square};
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{
    CastlingMode, Chess, EnPassantMode, File, FromSetup, Piece, Position,
};

/// A chess position plus the history the rules need around it
#[derive(Clone, Debug)]
pub struct Board {
    pos: Chess,
    undo: Vec<Chess>,
    /// Repetition keys of every position reached, current one last
    seen: Vec<Zobrist64>,
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl Board {
    /// Standard starting position
    pub fn new() -> Self {
        Board::from_position(Chess::default())
    }

    /// Load a position from FEN. Repetition history starts at this position.
    pub fn from_fen(fen: &str) -> ChessEngineResult<Self> {
        Ok(Board::from_position(parse_fen(fen)?))
    }

    /// Rebuild a board from a recorded game: `initial` is the position the
    /// game started from, `history` are the FENs reached after each move
    /// (oldest first) and `current` is the position to play from.
    ///
    /// Recorded FENs that fail to parse are an oracle fault; they were
    /// produced by this module.
    pub fn restore<'a>(
        initial: &str,
        history: impl IntoIterator<Item = &'a str>,
        current: &str,
    ) -> ChessEngineResult<Self> {
        let recorded = |fen: &str| {
            parse_fen(fen)
                .map(|pos| repetition_key(&pos))
                .map_err(|e| ChessEngineError::fault(e.to_string()))
        };

        let mut seen = vec![recorded(initial)?];
        for fen in history {
            seen.push(recorded(fen)?);
        }

        let pos = parse_fen(current)?;
        let key = repetition_key(&pos);
        if seen.last() != Some(&key) {
            seen.push(key);
        }

        Ok(Board {
            pos,
            undo: Vec::new(),
            seen,
        })
    }

    fn from_position(pos: Chess) -> Self {
        let key = repetition_key(&pos);
        Board {
            pos,
            undo: Vec::new(),
            seen: vec![key],
        }
    }

    pub fn turn(&self) -> Color {
        self.pos.turn()
    }

    /// Plies played in the game so far, derived from the move counters
    pub fn ply_count(&self) -> u32 {
        let full = self.pos.fullmoves().get().saturating_sub(1);
        full * 2 + u32::from(self.turn() == Color::Black)
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.pos.halfmoves()
    }

    /// Current position as FEN (en passant square only when capturable)
    pub fn fen(&self) -> String {
        Fen(self.pos.clone().into_setup(EnPassantMode::Legal)).to_string()
    }

    /// All legal moves in the order the rules backend generates them
    pub fn legal_moves(&self) -> Vec<Move> {
        self.pos.legal_moves().iter().map(to_move).collect()
    }

    pub fn legal_move_count(&self) -> usize {
        self.pos.legal_moves().len()
    }

    pub fn is_legal(&self, mv: &Move) -> bool {
        self.find_legal(mv).is_some()
    }

    fn find_legal(&self, mv: &Move) -> Option<shakmaty::Move> {
        self.pos
            .legal_moves()
            .iter()
            .find(|raw| to_move(raw) == *mv)
            .cloned()
    }

    /// Standard algebraic notation (with check/mate suffix) of a legal move,
    /// computed against the current position.
    pub fn san(&self, mv: &Move) -> ChessEngineResult<String> {
        let raw = self
            .find_legal(mv)
            .ok_or_else(|| ChessEngineError::fault(format!("no legal move {mv} for SAN")))?;
        Ok(SanPlus::from_move(self.pos.clone(), &raw).to_string())
    }

    /// Play a legal move. Fails with an oracle fault if `mv` is not legal;
    /// callers validate with [`Board::is_legal`] first.
    pub fn push(&mut self, mv: &Move) -> ChessEngineResult<()> {
        let raw = self.legal_or_fault(mv)?;
        self.undo.push(self.pos.clone());
        self.advance(raw);
        Ok(())
    }

    /// Play a legal move for good. Unlike [`Board::push`] nothing is kept
    /// for undo, and any earlier undo state is dropped.
    pub fn commit(&mut self, mv: &Move) -> ChessEngineResult<()> {
        let raw = self.legal_or_fault(mv)?;
        self.undo.clear();
        self.advance(raw);
        Ok(())
    }

    fn legal_or_fault(&self, mv: &Move) -> ChessEngineResult<shakmaty::Move> {
        self.find_legal(mv)
            .ok_or_else(|| ChessEngineError::fault(format!("move {mv} is not legal here")))
    }

    fn advance(&mut self, raw: shakmaty::Move) {
        self.pos.play_unchecked(&raw);
        self.seen.push(repetition_key(&self.pos));
    }

    /// Take back the last pushed move. Returns false when there is nothing
    /// to undo (restored or freshly loaded boards have no undo stack).
    pub fn pop(&mut self) -> bool {
        match self.undo.pop() {
            Some(previous) => {
                self.pos = previous;
                self.seen.pop();
                true
            }
            None => false,
        }
    }

    /// Apply `mv`, run `f` on the resulting board, then undo the move.
    ///
    /// The undo happens on every path out of `f`, including early returns
    /// through `?`, so a search branch can never leak its move.
    pub fn with_move<R>(
        &mut self,
        mv: &Move,
        f: impl FnOnce(&mut Board) -> ChessEngineResult<R>,
    ) -> ChessEngineResult<R> {
        self.push(mv)?;
        let result = f(self);
        if !self.pop() {
            return Err(ChessEngineError::fault("undo stack empty after move"));
        }
        result
    }

    /// The same position with the other side to move (a null move).
    ///
    /// Returns `None` when the side to move is in check: passing would leave
    /// the opponent to move while able to capture the king.
    pub fn with_turn_swapped(&self) -> Option<Board> {
        if self.pos.is_check() {
            return None;
        }
        let mut setup = self.pos.clone().into_setup(EnPassantMode::Legal);
        setup.turn = !setup.turn;
        setup.ep_square = None;
        let pos = Chess::from_setup(setup, CastlingMode::Standard).ok()?;
        Some(Board::from_position(pos))
    }

    pub fn is_check(&self) -> bool {
        self.pos.is_check()
    }

    pub fn is_checkmate(&self) -> bool {
        self.pos.is_checkmate()
    }

    pub fn is_stalemate(&self) -> bool {
        self.pos.is_stalemate()
    }

    pub fn is_insufficient_material(&self) -> bool {
        self.pos.is_insufficient_material()
    }

    pub fn is_seventyfive_moves(&self) -> bool {
        self.pos.halfmoves() >= SEVENTY_FIVE_MOVE_HALFMOVES && !self.pos.is_checkmate()
    }

    pub fn is_fivefold_repetition(&self) -> bool {
        self.repetitions() >= FIVEFOLD_REPETITION
    }

    /// How many times the current position has occurred, itself included
    pub fn repetitions(&self) -> usize {
        match self.seen.last() {
            Some(current) => self.seen.iter().filter(|key| *key == current).count(),
            None => 0,
        }
    }

    /// Any condition that ends the game without a claim
    pub fn is_game_over(&self) -> bool {
        self.is_checkmate()
            || self.is_stalemate()
            || self.is_insufficient_material()
            || self.is_seventyfive_moves()
            || self.is_fivefold_repetition()
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.pos.board().piece_at(square)
    }

    /// Every occupied square with its piece, a1 first
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::ALL
            .into_iter()
            .filter_map(move |sq| self.piece_at(sq).map(|piece| (sq, piece)))
    }

    /// Squares holding a given piece kind of a given color
    pub fn squares_of(&self, role: Role, color: Color) -> Vec<Square> {
        self.pieces()
            .filter(|(_, piece)| piece.role == role && piece.color == color)
            .map(|(sq, _)| sq)
            .collect()
    }

    pub fn king_of(&self, color: Color) -> Option<Square> {
        self.pos.board().king_of(color)
    }

    pub fn is_attacked_by(&self, attacker: Color, square: Square) -> bool {
        self.attackers_of(attacker, square) > 0
    }

    /// Number of distinct `attacker` pieces attacking `square`
    pub fn attackers_of(&self, attacker: Color, square: Square) -> usize {
        let board = self.pos.board();
        board
            .attacks_to(square, attacker, board.occupied())
            .count()
    }
}

fn parse_fen(fen: &str) -> ChessEngineResult<Chess> {
    let invalid = |message: String| ChessEngineError::InvalidFen {
        fen: fen.to_string(),
        message,
    };
    let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| invalid(format!("{e}")))
}

fn repetition_key(pos: &Chess) -> Zobrist64 {
    pos.zobrist_hash(EnPassantMode::Legal)
}

/// Convert a backend move into the from/to/promotion shape clients use.
/// Castling is reported as the king's two-square step.
fn to_move(raw: &shakmaty::Move) -> Move {
    match raw {
        shakmaty::Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() {
                File::G
            } else {
                File::C
            };
            Move::new(*king, Square::from_coords(file, king.rank()), None)
        }
        _ => Move::new(raw.from().unwrap_or(raw.to()), raw.to(), raw.promotion()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(from: &str, to: &str) -> Move {
        Move::parse(from, to, None).unwrap()
    }

    #[test]
    fn test_starting_position_has_twenty_moves() {
        let board = Board::new();
        assert_eq!(board.legal_moves().len(), 20);
        assert_eq!(board.turn(), Color::White);
        assert_eq!(board.ply_count(), 0);
    }

    #[test]
    fn test_push_pop_restores_fen() {
        let mut board = Board::new();
        let start = board.fen();

        board.push(&mv("e2", "e4")).unwrap();
        assert_eq!(board.turn(), Color::Black);
        assert_eq!(board.ply_count(), 1);
        assert_ne!(board.fen(), start);

        assert!(board.pop());
        assert_eq!(board.fen(), start);
        assert!(!board.pop(), "nothing left to undo");
    }

    #[test]
    fn test_push_illegal_move_is_fault() {
        let mut board = Board::new();
        let err = board.push(&mv("e2", "e5")).unwrap_err();
        assert!(matches!(err, ChessEngineError::OracleFault { .. }));
    }

    #[test]
    fn test_with_move_undoes_on_error() {
        let mut board = Board::new();
        let start = board.fen();

        let result: ChessEngineResult<()> = board.with_move(&mv("g1", "f3"), |b| {
            assert_eq!(b.turn(), Color::Black);
            Err(ChessEngineError::fault("bail out"))
        });

        assert!(result.is_err());
        assert_eq!(board.fen(), start);
    }

    #[test]
    fn test_castling_uses_king_destination() {
        let board =
            Board::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let moves = board.legal_moves();
        assert!(moves.contains(&mv("e1", "g1")));
        assert!(moves.contains(&mv("e1", "c1")));
        assert!(!moves.contains(&mv("e1", "h1")));
    }

    #[test]
    fn test_castling_push_moves_rook() {
        let mut board =
            Board::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        board.push(&mv("e1", "g1")).unwrap();
        assert_eq!(board.piece_at(Square::G1).map(|p| p.role), Some(Role::King));
        assert_eq!(board.piece_at(Square::F1).map(|p| p.role), Some(Role::Rook));
    }

    #[test]
    fn test_san_includes_mate_suffix() {
        let board = Board::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
        assert_eq!(board.san(&mv("a1", "a8")).unwrap(), "Ra8#");
    }

    #[test]
    fn test_terminal_predicates() {
        let mate =
            Board::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        assert!(mate.is_checkmate());
        assert!(mate.is_game_over());

        let stalemate = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(stalemate.is_stalemate());

        let bare_kings = Board::from_fen("8/8/4k3/8/8/4K3/8/8 w - - 0 1").unwrap();
        assert!(bare_kings.is_insufficient_material());

        let clock = Board::from_fen("8/8/4k3/8/8/4K3/4R3/8 w - - 150 120").unwrap();
        assert!(clock.is_seventyfive_moves());
        assert!(!Board::new().is_game_over());
    }

    #[test]
    fn test_fivefold_repetition_by_knight_shuffle() {
        let mut board = Board::new();
        let cycle = [
            mv("g1", "f3"),
            mv("g8", "f6"),
            mv("f3", "g1"),
            mv("f6", "g8"),
        ];
        for _ in 0..3 {
            for m in &cycle {
                board.push(m).unwrap();
            }
        }
        assert_eq!(board.repetitions(), 4);
        assert!(!board.is_fivefold_repetition());

        for m in &cycle {
            board.push(m).unwrap();
        }
        assert_eq!(board.repetitions(), 5);
        assert!(board.is_fivefold_repetition());
        assert!(board.is_game_over());
    }

    #[test]
    fn test_restore_rebuilds_repetition_history() {
        let mut played = Board::new();
        let initial = played.fen();
        let mut fens = Vec::new();
        let cycle = [
            mv("g1", "f3"),
            mv("g8", "f6"),
            mv("f3", "g1"),
            mv("f6", "g8"),
        ];
        for m in cycle.iter().chain(cycle.iter()) {
            played.push(m).unwrap();
            fens.push(played.fen());
        }

        let mut restored =
            Board::restore(&initial, fens.iter().map(String::as_str), &played.fen()).unwrap();
        assert_eq!(restored.fen(), played.fen());
        assert_eq!(restored.legal_moves(), played.legal_moves());
        assert_eq!(restored.repetitions(), 3);
        assert_eq!(played.repetitions(), 3);

        for m in cycle.iter().chain(cycle.iter()) {
            played.push(m).unwrap();
            restored.push(m).unwrap();
            assert_eq!(restored.repetitions(), played.repetitions(), "after {m}");
            assert_eq!(restored.is_game_over(), played.is_game_over(), "after {m}");
        }
        assert!(restored.is_fivefold_repetition());
    }

    #[test]
    fn test_restore_without_moves() {
        let start = Board::new().fen();
        let restored = Board::restore(&start, std::iter::empty(), &start).unwrap();
        assert_eq!(restored.repetitions(), 1);
        assert_eq!(restored.ply_count(), 0);
    }

    #[test]
    fn test_restore_rejects_corrupt_log() {
        let start = Board::new().fen();
        let err = Board::restore(&start, ["garbage"], &start).unwrap_err();
        assert!(matches!(err, ChessEngineError::OracleFault { .. }));
    }

    #[test]
    fn test_commit_keeps_no_undo_state() {
        let mut board = Board::new();
        board.push(&mv("e2", "e4")).unwrap();
        board.commit(&mv("e7", "e5")).unwrap();
        assert!(!board.pop(), "commit drops undo state");
        assert_eq!(board.ply_count(), 2);

        board.commit(&mv("g1", "f3")).unwrap();
        assert!(!board.pop());
        assert_eq!(board.turn(), Color::Black);

        let err = board.commit(&mv("e5", "e4")).unwrap_err();
        assert!(matches!(err, ChessEngineError::OracleFault { .. }));
    }

    #[test]
    fn test_commit_counts_repetitions() {
        let mut board = Board::new();
        for _ in 0..4 {
            for m in [
                mv("g1", "f3"),
                mv("g8", "f6"),
                mv("f3", "g1"),
                mv("f6", "g8"),
            ] {
                board.commit(&m).unwrap();
            }
        }
        assert_eq!(board.repetitions(), 5);
        assert!(board.is_fivefold_repetition());
    }

    #[test]
    fn test_swapped_turn_refused_in_check() {
        let board = Board::from_fen("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
        assert!(board.is_check());
        assert!(board.with_turn_swapped().is_none());

        let quiet = Board::new();
        let swapped = quiet.with_turn_swapped().unwrap();
        assert_eq!(swapped.turn(), Color::Black);
        assert_eq!(swapped.legal_move_count(), 20);
    }

    #[test]
    fn test_attackers_counts_distinct_pieces() {
        // Rook on e8 and knight on d3 both hit the empty e1 square.
        let board = Board::from_fen("k3r3/8/8/8/8/3n4/8/K7 w - - 0 1").unwrap();
        assert_eq!(board.attackers_of(Color::Black, Square::E1), 2);
        assert!(board.is_attacked_by(Color::Black, Square::E1));
        assert!(!board.is_attacked_by(Color::White, Square::A8));
    }

    #[test]
    fn test_invalid_fen() {
        let err = Board::from_fen("not a fen").unwrap_err();
        assert!(matches!(err, ChessEngineError::InvalidFen { .. }));
    }
}
