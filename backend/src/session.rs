//! Game session state machine
//!
//! A [`GameSession`] owns one board and the two seats around it. Moves go
//! through [`GameSession::apply_move`], which validates ownership and
//! legality, records history and recomputes the status:
//!
//! ```text
//! Active <-> Check  ->  Checkmate | Stalemate | Draw | Resigned
//! ```
//!
//! Nothing leaves a terminal status. The session never persists or
//! broadcasts anything itself; that is the coordinator's job.

use crate::error::{MoveError, SessionError};
use crate::store::GameRecord;
use chess_engine::{
    parse_promotion, parse_square, Board, ChessEngineError, Color, Move, Rank, Role,
};
use serde::{Deserialize, Serialize};
use shared::{GameId, GameSnapshot, GameStatus, LegalMove, PieceView, PlayerId, Side};
use std::collections::BTreeMap;
use tracing::debug;

/// Who sits on one side of the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "player", rename_all = "snake_case")]
pub enum Seat {
    Human(PlayerId),
    Computer,
    /// Waiting for a second player to join
    Open,
}

impl Seat {
    pub fn is_player(&self, player: &str) -> bool {
        matches!(self, Seat::Human(id) if id == player)
    }
}

/// Originator of a move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mover<'a> {
    Human(&'a str),
    /// The engine; skips the seat ownership check
    Computer,
}

/// One accepted move as recorded in the game log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub from: String,
    pub to: String,
    pub promotion: Option<String>,
    /// Standard algebraic notation, computed before the move was played
    pub san: String,
    /// Position after the move
    pub fen: String,
}

/// Result of an accepted move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedMove {
    pub mv: Move,
    pub san: String,
    pub status: GameStatus,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    id: GameId,
    white: Seat,
    black: Seat,
    /// Position the game started from
    start_fen: String,
    board: Board,
    history: Vec<HistoryEntry>,
    status: GameStatus,
    winner: Option<Side>,
}

pub fn side_of(color: Color) -> Side {
    match color {
        Color::White => Side::White,
        Color::Black => Side::Black,
    }
}

fn derive_status(board: &Board) -> GameStatus {
    if board.is_checkmate() {
        GameStatus::Checkmate
    } else if board.is_stalemate() {
        GameStatus::Stalemate
    } else if board.is_insufficient_material()
        || board.is_seventyfive_moves()
        || board.is_fivefold_repetition()
    {
        GameStatus::Draw
    } else if board.is_check() {
        GameStatus::Check
    } else {
        GameStatus::Active
    }
}

fn promotion_rank(color: Color) -> Rank {
    match color {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    }
}

impl GameSession {
    /// Fresh game from the starting position
    pub fn new(id: GameId, white: Seat, black: Seat) -> Self {
        GameSession::starting_at(id, white, black, Board::new())
    }

    /// Game starting from an arbitrary position
    pub fn from_fen(
        id: GameId,
        white: Seat,
        black: Seat,
        fen: &str,
    ) -> Result<Self, ChessEngineError> {
        Ok(GameSession::starting_at(id, white, black, Board::from_fen(fen)?))
    }

    /// Rebuild a session from its persisted record. Status is recomputed
    /// from the position; only a resignation is taken from the record.
    pub fn from_record(record: &GameRecord) -> Result<Self, ChessEngineError> {
        let board = Board::restore(
            &record.start_fen,
            record.history.iter().map(|entry| entry.fen.as_str()),
            &record.fen,
        )?;
        let mut session = GameSession::with_board(
            record.id,
            record.white.clone(),
            record.black.clone(),
            record.start_fen.clone(),
            board,
            record.history.clone(),
        );
        if record.status == GameStatus::Resigned {
            session.status = GameStatus::Resigned;
            session.winner = record.winner;
        }
        Ok(session)
    }

    fn starting_at(id: GameId, white: Seat, black: Seat, board: Board) -> Self {
        let start_fen = board.fen();
        GameSession::with_board(id, white, black, start_fen, board, Vec::new())
    }

    fn with_board(
        id: GameId,
        white: Seat,
        black: Seat,
        start_fen: String,
        board: Board,
        history: Vec<HistoryEntry>,
    ) -> Self {
        let status = derive_status(&board);
        let winner = (status == GameStatus::Checkmate).then(|| side_of(!board.turn()));
        GameSession {
            id,
            white,
            black,
            start_fen,
            board,
            history,
            status,
            winner,
        }
    }

    pub fn to_record(&self) -> GameRecord {
        GameRecord {
            id: self.id,
            white: self.white.clone(),
            black: self.black.clone(),
            start_fen: self.start_fen.clone(),
            fen: self.board.fen(),
            history: self.history.clone(),
            status: self.status,
            winner: self.winner,
            fault: None,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status.is_terminal()
    }

    /// Side that won by checkmate or resignation
    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn turn(&self) -> Side {
        side_of(self.board.turn())
    }

    pub fn seat(&self, side: Side) -> &Seat {
        match side {
            Side::White => &self.white,
            Side::Black => &self.black,
        }
    }

    /// Side a player is seated on, if any
    pub fn side_of_player(&self, player: &str) -> Option<Side> {
        if self.white.is_player(player) {
            Some(Side::White)
        } else if self.black.is_player(player) {
            Some(Side::Black)
        } else {
            None
        }
    }

    /// True when the engine should move next
    pub fn is_computer_turn(&self) -> bool {
        !self.is_over() && *self.seat(self.turn()) == Seat::Computer
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn fen(&self) -> String {
        self.board.fen()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Take the open seat
    pub fn join(&mut self, player: &str) -> Result<Side, SessionError> {
        if self.side_of_player(player).is_some() {
            return Err(SessionError::AlreadySeated);
        }
        for side in [Side::White, Side::Black] {
            let seat = match side {
                Side::White => &mut self.white,
                Side::Black => &mut self.black,
            };
            if *seat == Seat::Open {
                *seat = Seat::Human(player.to_string());
                return Ok(side);
            }
        }
        Err(SessionError::GameFull)
    }

    /// End the game in the opponent's favour. Returns the winning side.
    pub fn resign(&mut self, player: &str) -> Result<Side, SessionError> {
        let side = self
            .side_of_player(player)
            .ok_or(SessionError::NotAParticipant)?;
        if self.is_over() {
            return Err(SessionError::GameOver);
        }
        let winner = side.opponent();
        self.status = GameStatus::Resigned;
        self.winner = Some(winner);
        Ok(winner)
    }

    /// Validate and play a move.
    ///
    /// A pawn reaching the last rank without a promotion piece becomes a
    /// queen. A rejected move leaves the session untouched.
    pub fn apply_move(
        &mut self,
        mover: Mover<'_>,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<AcceptedMove, MoveError> {
        if self.is_over() {
            return Err(MoveError::GameOver);
        }
        if let Mover::Human(player) = mover {
            if !self.seat(self.turn()).is_player(player) {
                return Err(MoveError::NotYourTurn);
            }
        }

        let mv = self.resolve_move(from, to, promotion)?;
        if !self.board.is_legal(&mv) {
            debug!(game_id = %self.id, %mv, "illegal move rejected");
            return Err(MoveError::IllegalMove {
                in_check: self.board.is_check(),
            });
        }

        let san = self.board.san(&mv)?;
        self.board.commit(&mv)?;
        self.history.push(HistoryEntry {
            from: mv.from.to_string(),
            to: mv.to.to_string(),
            promotion: mv.promotion.map(|role| role.char().to_string()),
            san: san.clone(),
            fen: self.board.fen(),
        });

        self.status = derive_status(&self.board);
        if self.status == GameStatus::Checkmate {
            self.winner = Some(side_of(!self.board.turn()));
        }

        Ok(AcceptedMove {
            mv,
            san,
            status: self.status,
        })
    }

    fn resolve_move(
        &self,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<Move, MoveError> {
        let from = parse_square(from)?;
        let to = parse_square(to)?;
        let mut promotion = promotion.map(parse_promotion).transpose()?;

        let promoting = self.board.piece_at(from).is_some_and(|piece| {
            piece.role == Role::Pawn && to.rank() == promotion_rank(piece.color)
        });
        if promoting && promotion.is_none() {
            promotion = Some(Role::Queen);
        }
        Ok(Move::new(from, to, promotion))
    }

    pub fn legal_moves(&self) -> Vec<LegalMove> {
        self.board
            .legal_moves()
            .into_iter()
            .map(|mv| LegalMove {
                from: mv.from.to_string(),
                to: mv.to.to_string(),
                promotion: mv.promotion.map(|role| role.char().to_string()),
            })
            .collect()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let board: BTreeMap<String, PieceView> = self
            .board
            .pieces()
            .map(|(square, piece)| {
                (
                    square.to_string(),
                    PieceView {
                        piece: piece.char().to_string(),
                        color: side_of(piece.color),
                    },
                )
            })
            .collect();

        GameSnapshot {
            board,
            turn: self.turn(),
            moves: self.legal_moves(),
            game_status: self.status,
            is_check: self.board.is_check(),
        }
    }
}
