//! The external move-suggestion / commentary service.

pub mod chat;
pub mod scripted;

use std::future::Future;

use drill_core::{Board, Color, NotatedMove};

use crate::error::TrainerError;

pub use chat::ChatClient;
pub use scripted::ScriptedCollaborator;

/// Snapshot sent when asking for the opponent's move.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRequest {
    pub board: Board,
    pub moves: Vec<NotatedMove>,
    pub side_to_move: Color,
}

/// Snapshot sent when asking for a reaction to the learner's move.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentaryRequest {
    pub board: Board,
    pub moves: Vec<NotatedMove>,
    pub last_move: String,
}

/// Anything that can play the opponent and talk about the game.
///
/// `suggest_move` returns the raw reply text; extracting the move from it is
/// the caller's job (see `suggestion::parse_suggestion`).
pub trait Collaborator: Send + Sync + 'static {
    fn suggest_move(
        &self,
        request: &SuggestionRequest,
    ) -> impl Future<Output = Result<String, TrainerError>> + Send;

    fn comment(
        &self,
        request: &CommentaryRequest,
    ) -> impl Future<Output = Result<String, TrainerError>> + Send;
}
