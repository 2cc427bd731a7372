//! Free play against the collaborator.
//!
//! `BattleSession` holds the game and decides whose turn it is. The
//! collaborator round trip lives in `BattleOrchestrator`: it takes a tagged
//! request out of the session, awaits the reply without holding the lock,
//! and hands the result back. A reply whose tag no longer matches the
//! session is dropped.

use std::sync::{Arc, Mutex};

use drill_core::notation::{decode, encode_move};
use drill_core::{pgn, Board, Color, GameSession, Move, NotatedMove, Square};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::clients::{Collaborator, CommentaryRequest, SuggestionRequest};
use crate::config::Timing;
use crate::error::TrainerError;
use crate::lock;
use crate::suggestion::{parse_suggestion, Suggestion};

pub const ANALYZING_TEXT: &str = "Analyzing the position...";
pub const REACTION_FALLBACK: &str = "Interesting move.";
pub const REACTION_UNAVAILABLE: &str = "Still thinking about that one...";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Playing,
    Ended,
}

/// Identifies the game and ply a request was issued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestTag {
    pub epoch: u64,
    pub ply: usize,
}

/// The opponent's latest explanation plus its reaction to the player's move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Commentary {
    pub thinking: String,
    pub evaluation: String,
    pub confidence: u8,
    /// Notation of the move the opponent played, once it is on the board.
    pub played: Option<String>,
    pub reaction: Option<String>,
}

impl Commentary {
    fn pending() -> Self {
        Self {
            thinking: ANALYZING_TEXT.to_string(),
            evaluation: "Calculating".to_string(),
            confidence: 0,
            played: None,
            reaction: None,
        }
    }

    fn failure(thinking: String) -> Self {
        Self {
            thinking,
            evaluation: "Error".to_string(),
            confidence: 0,
            played: None,
            reaction: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattleIgnore {
    NotPlaying,
    Thinking,
    NotPlayerTurn,
    EmptySquare,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlayerMoveOutcome {
    Played {
        notation: String,
        tag: RequestTag,
        reaction: CommentaryRequest,
    },
    Ignored(BattleIgnore),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpponentOutcome {
    /// The suggestion resolved to a move and it was played.
    Applied { notation: String, mv: Move },
    /// The reply had no move, or the move did not fit the board.
    Unresolved,
    /// The collaborator call itself failed.
    Failed,
    /// The game moved on while the request was in flight.
    Stale,
}

#[derive(Clone, Debug)]
pub struct BattleView {
    pub phase: Phase,
    pub color: Color,
    pub board: Board,
    pub last_move: Option<Move>,
    pub movetext: String,
    pub thinking: bool,
    pub stalled: bool,
    pub commentary: Option<Commentary>,
    pub result: Option<String>,
    pub disabled: bool,
}

pub struct BattleSession {
    color: Color,
    phase: Phase,
    game: GameSession,
    moves: Vec<NotatedMove>,
    thinking: bool,
    stalled: bool,
    commentary: Option<Commentary>,
    /// Ply of the player move the current reaction is about.
    reaction_ply: Option<usize>,
    result: Option<String>,
    epoch: u64,
}

impl BattleSession {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            phase: Phase::Setup,
            game: GameSession::new(),
            moves: Vec::new(),
            thinking: false,
            stalled: false,
            commentary: None,
            reaction_ply: None,
            result: None,
            epoch: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn moves(&self) -> &[NotatedMove] {
        &self.moves
    }

    pub fn game(&self) -> &GameSession {
        &self.game
    }

    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn commentary(&self) -> Option<&Commentary> {
        self.commentary.as_ref()
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    fn tag(&self) -> RequestTag {
        RequestTag {
            epoch: self.epoch,
            ply: self.game.ply_count(),
        }
    }

    /// Only while setting up.
    pub fn set_color(&mut self, color: Color) -> bool {
        if self.phase != Phase::Setup {
            return false;
        }
        self.color = color;
        true
    }

    pub fn start(&mut self) -> bool {
        if self.phase != Phase::Setup {
            return false;
        }
        self.clear_game();
        self.phase = Phase::Playing;
        info!(color = %self.color, epoch = self.epoch, "Battle started");
        true
    }

    pub fn is_player_turn(&self) -> bool {
        Color::for_ply(self.game.ply_count()) == self.color
    }

    pub fn submit_move(&mut self, from: Square, to: Square) -> PlayerMoveOutcome {
        if self.phase != Phase::Playing {
            return PlayerMoveOutcome::Ignored(BattleIgnore::NotPlaying);
        }
        if self.thinking {
            return PlayerMoveOutcome::Ignored(BattleIgnore::Thinking);
        }
        if !self.is_player_turn() {
            return PlayerMoveOutcome::Ignored(BattleIgnore::NotPlayerTurn);
        }
        let mv = Move::new(from, to);
        let Some(notation) = encode_move(self.game.board(), mv) else {
            return PlayerMoveOutcome::Ignored(BattleIgnore::EmptySquare);
        };

        let tag = self.tag();
        self.game.make_move(from, to);
        self.moves.push(NotatedMove::new(mv, notation.clone()));
        let reaction = CommentaryRequest {
            board: self.game.board().clone(),
            moves: self.moves.clone(),
            last_move: notation.clone(),
        };
        PlayerMoveOutcome::Played {
            notation,
            tag,
            reaction,
        }
    }

    /// Claim the opponent's turn. Returns `None` unless the game is on, it is
    /// the opponent's ply, nothing is in flight and the last attempt did not
    /// stall.
    pub fn begin_opponent_turn(&mut self) -> Option<(RequestTag, SuggestionRequest)> {
        if self.phase != Phase::Playing || self.thinking || self.stalled || self.is_player_turn() {
            return None;
        }
        self.thinking = true;
        let reaction = self.commentary.take().and_then(|c| c.reaction);
        self.commentary = Some(Commentary {
            reaction,
            ..Commentary::pending()
        });
        Some((
            self.tag(),
            SuggestionRequest {
                board: self.game.board().clone(),
                moves: self.moves.clone(),
                side_to_move: self.game.side_to_move(),
            },
        ))
    }

    pub fn complete_opponent_turn(
        &mut self,
        tag: RequestTag,
        result: Result<Suggestion, TrainerError>,
    ) -> OpponentOutcome {
        if self.phase != Phase::Playing || !self.thinking || tag != self.tag() {
            warn!(?tag, current = ?self.tag(), "Discarding stale opponent reply");
            return OpponentOutcome::Stale;
        }
        self.thinking = false;
        let reaction = self.commentary.take().and_then(|c| c.reaction);

        let suggestion = match result {
            Ok(s) => s,
            Err(e) => {
                warn!("Opponent move request failed: {e}");
                self.stalled = true;
                self.commentary = Some(Commentary {
                    reaction,
                    ..Commentary::failure(format!("Something went wrong: {e}"))
                });
                return OpponentOutcome::Failed;
            }
        };

        let side = self.game.side_to_move();
        let resolved = suggestion
            .notation
            .as_deref()
            .and_then(|n| decode(n, self.game.board(), side).map(|mv| (n.to_string(), mv)));

        let Some((notation, mv)) = resolved else {
            self.stalled = true;
            let thinking = match &suggestion.notation {
                Some(n) => format!("Could not determine the move \"{n}\". {}", suggestion.thinking),
                None => suggestion.thinking,
            };
            warn!(thinking = %thinking, "Opponent move unresolved");
            self.commentary = Some(Commentary {
                reaction,
                ..Commentary::failure(thinking)
            });
            return OpponentOutcome::Unresolved;
        };

        self.game.make_move(mv.from, mv.to);
        self.moves.push(NotatedMove::new(mv, notation.clone()));
        self.commentary = Some(Commentary {
            thinking: suggestion.thinking,
            evaluation: suggestion.evaluation,
            confidence: suggestion.confidence,
            played: Some(notation.clone()),
            reaction,
        });
        OpponentOutcome::Applied { notation, mv }
    }

    /// Attach a reaction to the player's move. Dropped when the game it was
    /// asked for is gone, or when a reaction to a later move already landed.
    pub fn apply_reaction(&mut self, tag: RequestTag, text: String) -> bool {
        if tag.epoch != self.epoch || self.phase == Phase::Setup {
            return false;
        }
        if self.reaction_ply.is_some_and(|ply| tag.ply < ply) {
            return false;
        }
        self.reaction_ply = Some(tag.ply);
        match &mut self.commentary {
            Some(c) => c.reaction = Some(text),
            None => {
                self.commentary = Some(Commentary {
                    thinking: String::new(),
                    evaluation: String::new(),
                    confidence: 0,
                    played: None,
                    reaction: Some(text),
                })
            }
        }
        true
    }

    /// Let a stalled opponent turn be requested again.
    pub fn retry(&mut self) -> bool {
        if self.phase != Phase::Playing || !self.stalled || self.thinking {
            return false;
        }
        self.stalled = false;
        true
    }

    pub fn resign(&mut self) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        let result = match self.color {
            Color::White => "Black wins by resignation",
            Color::Black => "White wins by resignation",
        };
        info!(color = %self.color, "Player resigned");
        self.result = Some(result.to_string());
        self.phase = Phase::Ended;
        self.thinking = false;
        true
    }

    /// Back to setup from any phase. Replies still in flight become stale.
    pub fn new_game(&mut self) {
        self.clear_game();
        self.phase = Phase::Setup;
    }

    fn clear_game(&mut self) {
        self.game.reset();
        self.moves.clear();
        self.thinking = false;
        self.stalled = false;
        self.commentary = None;
        self.reaction_ply = None;
        self.result = None;
        self.epoch += 1;
    }

    pub fn view(&self) -> BattleView {
        let notations: Vec<&str> = self.moves.iter().map(|m| m.notation.as_str()).collect();
        BattleView {
            phase: self.phase,
            color: self.color,
            board: self.game.board().clone(),
            last_move: self.game.last_move(),
            movetext: pgn::format_movetext(&notations),
            thinking: self.thinking,
            stalled: self.stalled,
            commentary: self.commentary.clone(),
            result: self.result.clone(),
            disabled: self.phase != Phase::Playing || self.thinking || !self.is_player_turn(),
        }
    }
}

/// Runs a `BattleSession` against a collaborator. Cheap to clone; clones
/// share the session.
pub struct BattleOrchestrator<C> {
    session: Arc<Mutex<BattleSession>>,
    collaborator: Arc<C>,
    timing: Timing,
}

impl<C> Clone for BattleOrchestrator<C> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            collaborator: Arc::clone(&self.collaborator),
            timing: self.timing,
        }
    }
}

impl<C: Collaborator> BattleOrchestrator<C> {
    pub fn new(collaborator: Arc<C>, color: Color, timing: Timing) -> Self {
        Self {
            session: Arc::new(Mutex::new(BattleSession::new(color))),
            collaborator,
            timing,
        }
    }

    pub fn set_color(&self, color: Color) -> bool {
        lock(&self.session).set_color(color)
    }

    /// Start the game. When the player has black the opponent moves first
    /// and this waits for it.
    pub async fn start(&self) -> Option<OpponentOutcome> {
        if !lock(&self.session).start() {
            return None;
        }
        self.play_opponent_turn().await
    }

    /// Play the player's move, ask for a reaction in the background, then
    /// wait for the opponent's reply.
    pub async fn submit_move(
        &self,
        from: Square,
        to: Square,
    ) -> (PlayerMoveOutcome, Option<OpponentOutcome>) {
        let outcome = lock(&self.session).submit_move(from, to);
        let PlayerMoveOutcome::Played { tag, reaction, .. } = &outcome else {
            return (outcome, None);
        };
        self.spawn_reaction(*tag, reaction.clone());
        let opponent = self.play_opponent_turn().await;
        (outcome, opponent)
    }

    /// Ask for the opponent's move if it is their turn and nothing is in
    /// flight. A resolved move is held back until `min_think` has passed
    /// since the request went out.
    pub async fn play_opponent_turn(&self) -> Option<OpponentOutcome> {
        let (tag, request) = lock(&self.session).begin_opponent_turn()?;
        let issued = Instant::now();

        let result = self
            .collaborator
            .suggest_move(&request)
            .await
            .map(|raw| parse_suggestion(&raw));
        if matches!(&result, Ok(s) if s.notation.is_some()) {
            tokio::time::sleep_until(issued + self.timing.min_think).await;
        }

        Some(lock(&self.session).complete_opponent_turn(tag, result))
    }

    pub async fn retry(&self) -> Option<OpponentOutcome> {
        if !lock(&self.session).retry() {
            return None;
        }
        self.play_opponent_turn().await
    }

    pub fn resign(&self) -> bool {
        lock(&self.session).resign()
    }

    pub fn new_game(&self) {
        lock(&self.session).new_game();
    }

    pub fn snapshot(&self) -> BattleView {
        lock(&self.session).view()
    }

    fn spawn_reaction(&self, tag: RequestTag, request: CommentaryRequest) {
        let collaborator = Arc::clone(&self.collaborator);
        let session = Arc::downgrade(&self.session);
        tokio::spawn(async move {
            let text = match collaborator.comment(&request).await {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                Ok(_) => REACTION_FALLBACK.to_string(),
                Err(e) => {
                    warn!("Reaction request failed: {e}");
                    REACTION_UNAVAILABLE.to_string()
                }
            };
            if let Some(session) = session.upgrade() {
                lock(&session).apply_reaction(tag, text);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ScriptedCollaborator;
    use std::time::Duration;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn orchestrator(color: Color) -> (Arc<ScriptedCollaborator>, BattleOrchestrator<ScriptedCollaborator>) {
        let collaborator = Arc::new(ScriptedCollaborator::new());
        let battle = BattleOrchestrator::new(Arc::clone(&collaborator), color, Timing::default());
        (collaborator, battle)
    }

    #[test]
    fn test_turn_ownership_for_black() {
        let mut session = BattleSession::new(Color::Black);
        session.start();
        assert!(!session.is_player_turn());
        assert_eq!(
            session.submit_move(sq("e2"), sq("e4")),
            PlayerMoveOutcome::Ignored(BattleIgnore::NotPlayerTurn)
        );
        let (tag, request) = session.begin_opponent_turn().unwrap();
        assert_eq!(request.side_to_move, Color::White);
        let outcome = session.complete_opponent_turn(tag, Ok(parse_suggestion(r#"{"move":"e4"}"#)));
        assert!(matches!(outcome, OpponentOutcome::Applied { .. }));
        assert!(session.is_player_turn());
    }

    #[test]
    fn test_input_gated_while_thinking() {
        let mut session = BattleSession::new(Color::Black);
        session.start();
        session.begin_opponent_turn().unwrap();
        assert!(session.begin_opponent_turn().is_none());
        assert_eq!(
            session.submit_move(sq("e7"), sq("e5")),
            PlayerMoveOutcome::Ignored(BattleIgnore::Thinking)
        );
        assert!(session.view().disabled);
    }

    #[test]
    fn test_malformed_reply_stalls_without_moving() {
        let mut session = BattleSession::new(Color::Black);
        session.start();
        let (tag, _) = session.begin_opponent_turn().unwrap();
        let suggestion = parse_suggestion(r#"Sure! {"thinking": "hmm", "confidence": 90}"#);
        assert_eq!(suggestion.confidence, 0);

        assert_eq!(session.complete_opponent_turn(tag, Ok(suggestion)), OpponentOutcome::Unresolved);
        assert_eq!(session.game().ply_count(), 0);
        assert_eq!(session.game().board(), &Board::standard());
        assert!(session.is_stalled());
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.commentary().unwrap().confidence, 0);
        assert!(session.begin_opponent_turn().is_none());

        assert!(session.retry());
        assert!(session.begin_opponent_turn().is_some());
    }

    #[test]
    fn test_undecodable_move_is_unresolved() {
        let mut session = BattleSession::new(Color::Black);
        session.start();
        let (tag, _) = session.begin_opponent_turn().unwrap();
        let outcome = session.complete_opponent_turn(tag, Ok(parse_suggestion(r#"{"move":"Nf6"}"#)));
        assert_eq!(outcome, OpponentOutcome::Unresolved);
        let thinking = &session.commentary().unwrap().thinking;
        assert!(thinking.starts_with("Could not determine the move \"Nf6\""));
    }

    #[test]
    fn test_collaborator_error_is_failed() {
        let mut session = BattleSession::new(Color::Black);
        session.start();
        let (tag, _) = session.begin_opponent_turn().unwrap();
        let outcome =
            session.complete_opponent_turn(tag, Err(TrainerError::Collaborator("down".into())));
        assert_eq!(outcome, OpponentOutcome::Failed);
        assert!(session.is_stalled());
        assert_eq!(session.commentary().unwrap().evaluation, "Error");
    }

    #[test]
    fn test_stale_reply_after_new_game() {
        let mut session = BattleSession::new(Color::Black);
        session.start();
        let (tag, _) = session.begin_opponent_turn().unwrap();
        session.new_game();
        session.start();
        let outcome = session.complete_opponent_turn(tag, Ok(parse_suggestion(r#"{"move":"e4"}"#)));
        assert_eq!(outcome, OpponentOutcome::Stale);
        assert_eq!(session.game().ply_count(), 0);
    }

    #[test]
    fn test_resignation_result() {
        let mut white = BattleSession::new(Color::White);
        assert!(!white.resign());
        white.start();
        assert!(white.resign());
        assert_eq!(white.phase(), Phase::Ended);
        assert_eq!(white.result(), Some("Black wins by resignation"));

        let mut black = BattleSession::new(Color::Black);
        black.start();
        black.resign();
        assert_eq!(black.result(), Some("White wins by resignation"));

        black.new_game();
        assert_eq!(black.phase(), Phase::Setup);
        assert!(black.result().is_none());
    }

    #[test]
    fn test_older_reaction_does_not_replace_newer() {
        let mut session = BattleSession::new(Color::White);
        session.start();
        let first = RequestTag { epoch: session.epoch, ply: 0 };
        let second = RequestTag { epoch: session.epoch, ply: 2 };

        assert!(session.apply_reaction(second, "About Nf3.".into()));
        assert!(!session.apply_reaction(first, "About e4.".into()));
        assert_eq!(session.commentary().unwrap().reaction.as_deref(), Some("About Nf3."));

        let stale = RequestTag { epoch: session.epoch - 1, ply: 4 };
        assert!(!session.apply_reaction(stale, "Old game.".into()));

        session.new_game();
        session.start();
        let fresh = RequestTag { epoch: session.epoch, ply: 0 };
        assert!(session.apply_reaction(fresh, "New game.".into()));
    }

    #[test]
    fn test_color_fixed_after_start() {
        let mut session = BattleSession::new(Color::White);
        assert!(session.set_color(Color::Black));
        session.start();
        assert!(!session.set_color(Color::White));
        assert_eq!(session.color(), Color::Black);
    }

    #[tokio::test(start_paused = true)]
    async fn test_opponent_waits_minimum_think_time() {
        let (collaborator, battle) = orchestrator(Color::White);
        collaborator.push_move("e5");
        collaborator.push_comment("Solid start.");
        battle.start().await;

        let started = Instant::now();
        let (player, opponent) = battle.submit_move(sq("e2"), sq("e4")).await;
        assert!(matches!(player, PlayerMoveOutcome::Played { ref notation, .. } if notation == "e4"));
        assert!(matches!(opponent, Some(OpponentOutcome::Applied { ref notation, .. }) if notation == "e5"));
        assert!(started.elapsed() >= Duration::from_millis(1000));

        tokio::task::yield_now().await;
        let view = battle.snapshot();
        assert_eq!(view.movetext, "1. e4 e5");
        assert!(!view.disabled);
        let commentary = view.commentary.unwrap();
        assert_eq!(commentary.played.as_deref(), Some("e5"));
        assert_eq!(commentary.confidence, 80);
        assert_eq!(commentary.reaction.as_deref(), Some("Solid start."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_reply_adds_no_extra_wait() {
        let collaborator =
            Arc::new(ScriptedCollaborator::new().with_delay(Duration::from_millis(1500)));
        collaborator.push_move("e4");
        let battle = BattleOrchestrator::new(Arc::clone(&collaborator), Color::Black, Timing::default());

        let started = Instant::now();
        let outcome = battle.start().await;
        assert!(matches!(outcome, Some(OpponentOutcome::Applied { .. })));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed < Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_needs_manual_retry() {
        let (collaborator, battle) = orchestrator(Color::Black);
        collaborator.push_failure("rate limited");
        assert_eq!(battle.start().await, Some(OpponentOutcome::Failed));
        assert!(battle.snapshot().stalled);
        assert_eq!(battle.play_opponent_turn().await, None);
        assert_eq!(collaborator.suggest_calls(), 1);

        collaborator.push_move("d4");
        assert!(matches!(battle.retry().await, Some(OpponentOutcome::Applied { .. })));
        assert_eq!(battle.snapshot().movetext, "1. d4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_after_new_game_is_discarded() {
        let collaborator =
            Arc::new(ScriptedCollaborator::new().with_delay(Duration::from_millis(200)));
        collaborator.push_move("e4");
        let battle = BattleOrchestrator::new(Arc::clone(&collaborator), Color::Black, Timing::default());

        let pending = tokio::spawn({
            let battle = battle.clone();
            async move { battle.start().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        battle.new_game();

        assert_eq!(pending.await.unwrap(), Some(OpponentOutcome::Stale));
        let view = battle.snapshot();
        assert_eq!(view.phase, Phase::Setup);
        assert_eq!(view.board, Board::standard());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaction_failure_uses_placeholder() {
        let (collaborator, battle) = orchestrator(Color::White);
        collaborator.push_move("c5");
        battle.start().await;
        battle.submit_move(sq("e2"), sq("e4")).await;
        tokio::task::yield_now().await;

        let reaction = battle.snapshot().commentary.unwrap().reaction;
        assert_eq!(reaction.as_deref(), Some(REACTION_UNAVAILABLE));
        assert_eq!(collaborator.comment_calls(), 1);
    }
}
