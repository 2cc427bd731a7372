//! Game session: the single owner of board position and move history.

use tracing::debug;

use crate::board::Board;
use crate::moves::Move;
use crate::notation;
use crate::pgn;
use crate::piece::Color;
use crate::square::Square;

/// Result of replaying a line of SAN text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineReplay {
    /// Plies that resolved and were applied.
    pub applied: usize,
    /// First token that could not be resolved, if any.
    pub stopped_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GameSession {
    board: Board,
    history: Vec<Move>,
    last_move: Option<Move>,
}

impl GameSession {
    pub fn new() -> Self {
        Self {
            board: Board::standard(),
            history: Vec::new(),
            last_move: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    pub fn ply_count(&self) -> usize {
        self.history.len()
    }

    pub fn side_to_move(&self) -> Color {
        Color::for_ply(self.history.len())
    }

    /// Apply `from -> to` with no legality check. The pair is recorded in
    /// history even when `from` is empty and the board does not change.
    pub fn make_move(&mut self, from: Square, to: Square) {
        self.board.apply(from, to);
        let mv = Move::new(from, to);
        self.history.push(mv);
        self.last_move = Some(mv);
    }

    pub fn reset(&mut self) {
        self.board = Board::standard();
        self.history.clear();
        self.last_move = None;
    }

    /// Rebuild the board from `moves` and take them as the new history.
    pub fn set_position_from_moves(&mut self, moves: Vec<Move>) {
        self.board = Board::reconstruct(&moves);
        self.last_move = moves.last().copied();
        self.history = moves;
    }

    /// Replay everything except the last move. No-op on an empty history.
    pub fn undo_move(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let mut moves = self.history.clone();
        moves.pop();
        self.set_position_from_moves(moves);
    }

    /// Decode and play SAN tokens from `text` in order, stopping at the first
    /// token that does not resolve on the current board.
    pub fn play_san_line(&mut self, text: &str) -> LineReplay {
        let mut applied = 0;
        for token in pgn::extract_san_tokens(text) {
            match notation::decode(&token, &self.board, self.side_to_move()) {
                Some(mv) => {
                    self.make_move(mv.from, mv.to);
                    applied += 1;
                }
                None => {
                    debug!(token = %token, applied, "play_san_line: unresolvable token");
                    return LineReplay {
                        applied,
                        stopped_at: Some(token),
                    };
                }
            }
        }
        LineReplay {
            applied,
            stopped_at: None,
        }
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::Piece;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn test_make_move_records_history() {
        let mut game = GameSession::new();
        game.make_move(sq("e2"), sq("e4"));
        assert_eq!(game.ply_count(), 1);
        assert_eq!(game.last_move(), Some(Move::new(sq("e2"), sq("e4"))));
        assert_eq!(game.side_to_move(), Color::Black);
        assert_eq!(game.board().piece_at(sq("e4")).map(Piece::to_char), Some('P'));
    }

    #[test]
    fn test_make_move_from_empty_still_recorded() {
        let mut game = GameSession::new();
        game.make_move(sq("e4"), sq("e5"));
        assert_eq!(game.ply_count(), 1);
        assert_eq!(game.board(), &Board::standard());
    }

    #[test]
    fn test_reset() {
        let mut game = GameSession::new();
        game.make_move(sq("d2"), sq("d4"));
        game.reset();
        assert_eq!(game.ply_count(), 0);
        assert_eq!(game.last_move(), None);
        assert_eq!(game.board(), &Board::standard());
    }

    #[test]
    fn test_undo_replays_all_but_last() {
        let mut game = GameSession::new();
        game.make_move(sq("e2"), sq("e4"));
        game.make_move(sq("e7"), sq("e5"));
        game.undo_move();
        assert_eq!(game.ply_count(), 1);
        assert_eq!(game.last_move(), Some(Move::new(sq("e2"), sq("e4"))));
        assert!(game.board().piece_at(sq("e5")).is_none());
        assert_eq!(game.board().piece_at(sq("e7")).map(Piece::to_char), Some('p'));

        game.undo_move();
        game.undo_move();
        assert_eq!(game.ply_count(), 0);
        assert_eq!(game.board(), &Board::standard());
    }

    #[test]
    fn test_set_position_from_moves() {
        let mut game = GameSession::new();
        let moves = vec![Move::new(sq("g1"), sq("f3")), Move::new(sq("g8"), sq("f6"))];
        game.set_position_from_moves(moves.clone());
        assert_eq!(game.history(), moves.as_slice());
        assert_eq!(game.last_move(), Some(moves[1]));
        assert_eq!(game.board(), &Board::reconstruct(&moves));
    }

    #[test]
    fn test_play_san_line() {
        let mut game = GameSession::new();
        let replay = game.play_san_line("1. e4 e5 2. Nf3 Nc6 3. Bb5");
        assert_eq!(replay, LineReplay { applied: 5, stopped_at: None });
        assert_eq!(game.board().piece_at(sq("b5")).map(Piece::to_char), Some('B'));

        let mut game = GameSession::new();
        let replay = game.play_san_line("1. e4 Ke6");
        assert_eq!(replay.applied, 1);
        assert_eq!(replay.stopped_at.as_deref(), Some("Ke6"));
    }
}
