//! Board state: a fixed 64-slot array, `None` meaning empty.
//!
//! This is a display/replay model. Nothing here checks legality, king
//! counts or whose turn it is.

use tracing::{debug, warn};

use crate::moves::Move;
use crate::piece::{Color, Piece, PieceKind};
use crate::square::Square;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    squares: [Option<Piece>; Square::COUNT],
}

impl Board {
    pub fn empty() -> Self {
        Self {
            squares: [None; Square::COUNT],
        }
    }

    /// The standard 32-piece starting layout.
    pub fn standard() -> Self {
        let mut board = Self::empty();
        for (file, kind) in BACK_RANK.iter().enumerate() {
            let file = file as u8;
            board.put_at(file, 0, Piece::new(*kind, Color::White));
            board.put_at(file, 1, Piece::new(PieceKind::Pawn, Color::White));
            board.put_at(file, 6, Piece::new(PieceKind::Pawn, Color::Black));
            board.put_at(file, 7, Piece::new(*kind, Color::Black));
        }
        board
    }

    fn put_at(&mut self, file: u8, rank: u8, piece: Piece) {
        if let Some(sq) = Square::new(file, rank) {
            self.put(sq, piece);
        }
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    pub fn is_occupied(&self, sq: Square) -> bool {
        self.piece_at(sq).is_some()
    }

    /// Place a piece, replacing whatever was there.
    pub fn put(&mut self, sq: Square, piece: Piece) {
        self.squares[sq.index()] = Some(piece);
    }

    pub fn remove(&mut self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()].take()
    }

    /// Move whatever stands on `from` to `to`. A piece on `to` is simply
    /// overwritten; no capture list is kept.
    ///
    /// An empty `from` leaves the board untouched and returns `false`.
    pub fn apply(&mut self, from: Square, to: Square) -> bool {
        match self.remove(from) {
            Some(piece) => {
                self.put(to, piece);
                true
            }
            None => {
                warn!(%from, %to, "apply: origin square is empty, board unchanged");
                false
            }
        }
    }

    /// Replay `moves` from the standard start. A move whose origin is empty
    /// at that point of the replay is skipped, so partially inconsistent
    /// histories still produce a position.
    pub fn reconstruct(moves: &[Move]) -> Board {
        let mut board = Board::standard();
        for (ply, mv) in moves.iter().enumerate() {
            match board.remove(mv.from) {
                Some(piece) => board.put(mv.to, piece),
                None => debug!(ply, mv = %mv, "reconstruct: skipping move from empty square"),
            }
        }
        board
    }

    /// Occupied squares in a1, b1, ... h8 order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    pub fn piece_count(&self) -> usize {
        self.squares.iter().filter(|p| p.is_some()).count()
    }

    /// FEN for this placement. Castling rights are always reported as
    /// `KQkq` and there is never an en-passant square.
    pub fn to_fen(&self, side_to_move: Color, move_number: usize) -> String {
        let mut fen = String::new();
        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match Square::new(file, rank).and_then(|sq| self.piece_at(sq)) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push(piece.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        let side = match side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        };
        fen.push_str(&format!(" {side} KQkq - 0 {move_number}"));
        fen
    }

    /// Text diagram with glyphs, rank 8 on top. Used in prompts and the shell.
    pub fn to_diagram(&self) -> String {
        let mut out = String::from("  a b c d e f g h\n");
        for rank in (0..8u8).rev() {
            let label = (b'1' + rank) as char;
            out.push(label);
            out.push(' ');
            for file in 0..8u8 {
                let glyph = Square::new(file, rank)
                    .and_then(|sq| self.piece_at(sq))
                    .map(Piece::glyph)
                    .unwrap_or('.');
                out.push(glyph);
                out.push(' ');
            }
            out.push(label);
            out.push('\n');
        }
        out.push_str("  a b c d e f g h");
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_standard_layout() {
        let board = Board::standard();
        assert_eq!(board.piece_count(), 32);
        assert_eq!(board.piece_at(sq("e1")).map(Piece::to_char), Some('K'));
        assert_eq!(board.piece_at(sq("d8")).map(Piece::to_char), Some('q'));
        assert_eq!(board.piece_at(sq("g7")).map(Piece::to_char), Some('p'));
        assert!(board.piece_at(sq("e4")).is_none());
        assert_eq!(board.to_fen(Color::White, 1), STANDARD_START_FEN);
    }

    #[test]
    fn test_apply_captures_by_overwrite() {
        let mut board = Board::standard();
        assert!(board.apply(sq("d1"), sq("d7")));
        assert_eq!(board.piece_at(sq("d7")).map(Piece::to_char), Some('Q'));
        assert!(board.piece_at(sq("d1")).is_none());
        assert_eq!(board.piece_count(), 31);
    }

    #[test]
    fn test_apply_from_empty_is_noop() {
        let mut board = Board::standard();
        let before = board.clone();
        assert!(!board.apply(sq("e4"), sq("e5")));
        assert_eq!(board, before);
    }

    #[test]
    fn test_reconstruct_skips_moves_from_empty_squares() {
        let moves = [
            Move::new(sq("e2"), sq("e4")),
            Move::new(sq("e2"), sq("e3")), // e2 is empty by now
            Move::new(sq("e7"), sq("e5")),
        ];
        let board = Board::reconstruct(&moves);
        assert_eq!(board.piece_at(sq("e4")).map(Piece::to_char), Some('P'));
        assert!(board.piece_at(sq("e3")).is_none());
        assert_eq!(board.piece_at(sq("e5")).map(Piece::to_char), Some('p'));
        assert_eq!(board.piece_count(), 32);
    }

    #[test]
    fn test_reconstruct_is_idempotent() {
        let moves = [
            Move::new(sq("d2"), sq("d4")),
            Move::new(sq("g8"), sq("f6")),
            Move::new(sq("c2"), sq("c4")),
        ];
        assert_eq!(Board::reconstruct(&moves), Board::reconstruct(&moves));
    }

    #[test]
    fn test_fen_after_e4() {
        let board = Board::reconstruct(&[Move::new(sq("e2"), sq("e4"))]);
        assert_eq!(
            board.to_fen(Color::Black, 1),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
    }

    #[test]
    fn test_diagram_layout() {
        let diagram = Board::standard().to_diagram();
        let lines: Vec<&str> = diagram.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "  a b c d e f g h");
        assert_eq!(lines[1], "8 ♜ ♞ ♝ ♛ ♚ ♝ ♞ ♜ 8");
        assert_eq!(lines[4], "5 . . . . . . . . 5");
        assert_eq!(lines[8], "1 ♖ ♘ ♗ ♕ ♔ ♗ ♘ ♖ 1");
    }
}
