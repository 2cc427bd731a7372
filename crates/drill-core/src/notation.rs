//! Short algebraic notation to and from `Move`.
//!
//! Encoding never emits disambiguation, castling or promotion. Decoding is a
//! best-effort matcher for untrusted text: it only looks at geometry (no
//! blocking pieces, pins or check) and, when several pieces qualify, takes
//! the first one in board order (a1, b1, ... h8). It never fails loudly;
//! anything it cannot place is `None`.

use tracing::debug;

use crate::board::Board;
use crate::moves::Move;
use crate::piece::{Color, Piece, PieceKind};
use crate::square::{file_index, rank_index, Square};

/// Notation for `from -> to` on `board`, or `None` if `from` is empty.
///
/// Pawns: `e4`, `exd5`. Pieces: `Nf3`, `Bxc6`.
pub fn encode(board: &Board, from: Square, to: Square, is_capture: bool) -> Option<String> {
    let piece = board.piece_at(from)?;
    let notation = match piece.kind {
        PieceKind::Pawn if is_capture => format!("{}x{}", from.file_char(), to),
        PieceKind::Pawn => to.to_string(),
        kind => {
            let capture = if is_capture { "x" } else { "" };
            format!("{}{}{}", kind.letter(), capture, to)
        }
    };
    Some(notation)
}

/// `encode` with the capture flag read from the target square.
pub fn encode_move(board: &Board, mv: Move) -> Option<String> {
    encode(board, mv.from, mv.to, board.is_occupied(mv.to))
}

/// Resolve `notation` for `side` on `board`.
pub fn decode(notation: &str, board: &Board, side: Color) -> Option<Move> {
    let cleaned: String = notation
        .trim()
        .chars()
        .filter(|c| !matches!(c, '+' | '#' | '=' | '!' | '?'))
        .collect();

    if let Some(mv) = castling(&cleaned, side) {
        return Some(mv);
    }

    let mut token: Vec<char> = cleaned.chars().filter(|&c| c != 'x').collect();
    if matches!(token.last(), Some('Q' | 'R' | 'B' | 'N')) {
        token.pop();
    }

    let len = token.len();
    if len < 2 {
        debug!(notation, "decode: token too short");
        return None;
    }
    let target = match (file_index(token[len - 2]), rank_index(token[len - 1])) {
        (Some(file), Some(rank)) => Square::new(file, rank)?,
        _ => {
            debug!(notation, "decode: no destination square");
            return None;
        }
    };

    if len == 2 {
        if let Some(mv) = pawn_push(board, target, side) {
            return Some(mv);
        }
    }

    if len == 3 {
        if let Some(from_file) = file_index(token[0]) {
            if let Some(mv) = pawn_capture(board, from_file, target, side) {
                return Some(mv);
            }
        }
    }

    let resolved = piece_move(&token, board, target, side);
    if resolved.is_none() {
        debug!(notation, %target, ?side, "decode: no candidate found");
    }
    resolved
}

/// Castling tokens map to fixed king squares. Castling rights are not checked.
fn castling(token: &str, side: Color) -> Option<Move> {
    let (from, to) = match (token, side) {
        ("O-O" | "0-0", Color::White) => ("e1", "g1"),
        ("O-O" | "0-0", Color::Black) => ("e8", "g8"),
        ("O-O-O" | "0-0-0", Color::White) => ("e1", "c1"),
        ("O-O-O" | "0-0-0", Color::Black) => ("e8", "c8"),
        _ => return None,
    };
    Some(Move::new(Square::parse(from)?, Square::parse(to)?))
}

/// Single step first, then the double step. Intermediate squares are not checked.
fn pawn_push(board: &Board, target: Square, side: Color) -> Option<Move> {
    let pawn = Piece::new(PieceKind::Pawn, side);
    let back = -side.forward();
    [1, 2]
        .into_iter()
        .filter_map(|steps| target.offset(0, back * steps))
        .find(|from| board.piece_at(*from) == Some(pawn))
        .map(|from| Move::new(from, target))
}

fn pawn_capture(board: &Board, from_file: u8, target: Square, side: Color) -> Option<Move> {
    let from_rank = target.rank() as i8 - side.forward();
    if !(0..8).contains(&from_rank) {
        return None;
    }
    let from = Square::new(from_file, from_rank as u8)?;
    if board.piece_at(from) == Some(Piece::new(PieceKind::Pawn, side)) {
        Some(Move::new(from, target))
    } else {
        None
    }
}

fn piece_move(token: &[char], board: &Board, target: Square, side: Color) -> Option<Move> {
    let letter = token[0];
    if !"NBRQK".contains(letter) {
        return None;
    }
    let kind = PieceKind::from_letter(letter)?;
    let wanted = Piece::new(kind, side);

    // Only the four-character form (`Nbd2`, `R1e1`) carries a hint.
    let (file_hint, rank_hint) = if token.len() == 4 {
        (file_index(token[1]), rank_index(token[1]))
    } else {
        (None, None)
    };

    board
        .pieces()
        .filter(|(_, piece)| *piece == wanted)
        .map(|(sq, _)| sq)
        .filter(|sq| file_hint.map_or(true, |f| sq.file() == f))
        .filter(|sq| rank_hint.map_or(true, |r| sq.rank() == r))
        .find(|sq| can_move(*sq, target, letter))
        .map(|from| Move::new(from, target))
}

/// Geometry-only reachability for a piece letter (case-insensitive).
///
/// Knight: an L jump. Bishop: any diagonal. Rook: a straight line. Queen:
/// either. King: one step. Blocking pieces are ignored. A letter that is not
/// one of `NBRQK` always reaches.
pub fn can_move(from: Square, to: Square, letter: char) -> bool {
    let file_diff = (to.file() as i8 - from.file() as i8).abs();
    let rank_diff = (to.rank() as i8 - from.rank() as i8).abs();
    let diagonal = file_diff == rank_diff;
    let straight = (file_diff == 0) != (rank_diff == 0);

    match letter.to_ascii_uppercase() {
        'N' => matches!((file_diff, rank_diff), (2, 1) | (1, 2)),
        'B' => diagonal,
        'R' => straight,
        'Q' => diagonal || straight,
        'K' => file_diff <= 1 && rank_diff <= 1,
        _ => true,
    }
}
