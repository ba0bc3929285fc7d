//! Types shared between the game server and its clients.

pub mod protocol;

pub use protocol::{
    ClientMessage, GameId, GameSnapshot, GameStatus, LegalMove, PieceView, PlayerId,
    ServerMessage, Side,
};
