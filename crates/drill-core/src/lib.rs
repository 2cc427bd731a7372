//! Board model, notation codec and game session for the opening trainer.
//!
//! Nothing in this crate enforces full chess legality. The board is a
//! replay/display model and notation decoding is a geometric heuristic.

pub mod board;
pub mod error;
pub mod moves;
pub mod notation;
pub mod opening;
pub mod pgn;
pub mod piece;
pub mod session;
pub mod square;

pub use board::{Board, STANDARD_START_FEN};
pub use error::CoreError;
pub use moves::{Move, NotatedMove};
pub use opening::{Catalog, Opening, OpeningMove};
pub use piece::{Color, Piece, PieceKind};
pub use session::{GameSession, LineReplay};
pub use square::Square;
