//! Opening drill: replay a catalog line and check the learner against it.
//!
//! `DrillSession` is a plain state machine. Scripted opponent plies are not
//! played by it directly; it reports them through `pending_auto_play` and
//! applies them in `fire_auto_play` once the caller's timer fires.
//! `DrillRunner` wires that up to a `Scheduler`.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use drill_core::{Board, Color, GameSession, Move, Opening, OpeningMove, Square};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Timing;
use crate::lock;
use crate::scheduler::{Scheduler, TimerKey};

pub const LEARN_MISMATCH: &str = "Try another move. Check the hint!";
pub const COMPLETION_MESSAGE: &str = "Opening complete. Well done!";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Every ply is played by the learner; hints and jumping are available.
    Learn,
    /// The learner plays their color, the line's other side replies by itself.
    Practice,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub correct: u32,
    pub wrong: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
}

impl Feedback {
    fn new(kind: FeedbackKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The line is finished.
    Complete,
    /// The ply belongs to the scripted opponent.
    NotLearnerTurn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Accepted { completed: bool },
    Rejected,
    Ignored(IgnoreReason),
}

/// A scripted ply waiting for its timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoPlay {
    pub key: TimerKey,
    pub delay: Duration,
}

/// What the presentation layer needs to draw a drill.
#[derive(Clone, Debug)]
pub struct DrillView {
    pub opening_id: String,
    pub mode: Mode,
    pub color: Color,
    pub ply: usize,
    pub line_len: usize,
    pub board: Board,
    pub last_move: Option<Move>,
    pub highlighted: Vec<Square>,
    pub disabled: bool,
    pub feedback: Option<Feedback>,
    pub stats: Stats,
    pub complete: bool,
}

pub struct DrillSession {
    opening: Arc<Opening>,
    color: Color,
    mode: Mode,
    ply: usize,
    game: GameSession,
    show_hint: bool,
    stats: Stats,
    feedback: Option<Feedback>,
    epoch: u64,
    timing: Timing,
}

impl DrillSession {
    /// Start in learn mode, playing the side the line is for.
    pub fn new(opening: Arc<Opening>, timing: Timing) -> Self {
        Self {
            color: opening.color,
            opening,
            mode: Mode::Learn,
            ply: 0,
            game: GameSession::new(),
            show_hint: false,
            stats: Stats::default(),
            feedback: None,
            epoch: 0,
            timing,
        }
    }

    pub fn opening(&self) -> &Arc<Opening> {
        &self.opening
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn ply(&self) -> usize {
        self.ply
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    pub fn game(&self) -> &GameSession {
        &self.game
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn hint_visible(&self) -> bool {
        self.show_hint
    }

    pub fn select_opening(&mut self, opening: Arc<Opening>) {
        info!(opening = %opening.id, "Opening selected");
        self.color = opening.color;
        self.opening = opening;
        self.stats = Stats::default();
        self.restart();
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.stats = Stats::default();
        self.restart();
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.stats = Stats::default();
        self.restart();
    }

    /// Back to ply 0 of the same line. Stats are kept.
    pub fn reset(&mut self) {
        self.restart();
    }

    fn restart(&mut self) {
        self.game.reset();
        self.ply = 0;
        self.feedback = None;
        self.show_hint = false;
        self.epoch += 1;
        debug!(epoch = self.epoch, mode = ?self.mode, color = ?self.color, "Drill restarted");
    }

    pub fn is_complete(&self) -> bool {
        self.ply >= self.opening.len()
    }

    /// White owns even plies, black odd ones.
    pub fn is_learner_turn(&self) -> bool {
        Color::for_ply(self.ply) == self.color
    }

    pub fn expected(&self) -> Option<&OpeningMove> {
        self.opening.ply(self.ply)
    }

    /// Check a learner move against the line. Only an exact `from -> to`
    /// match is played; anything else leaves the board alone.
    pub fn submit_move(&mut self, from: Square, to: Square) -> MoveOutcome {
        if self.is_complete() {
            return MoveOutcome::Ignored(IgnoreReason::Complete);
        }
        if self.pending_auto_play().is_some() {
            return MoveOutcome::Ignored(IgnoreReason::NotLearnerTurn);
        }
        let Some(expected) = self.opening.ply(self.ply).cloned() else {
            return MoveOutcome::Ignored(IgnoreReason::Complete);
        };

        let matches = expected.mv() == Move::new(from, to);
        match (self.mode, matches) {
            (Mode::Learn, true) => {
                self.advance(&expected);
                self.feedback = Some(Feedback::new(FeedbackKind::Success, &expected.comment));
            }
            (Mode::Learn, false) => {
                self.feedback = Some(Feedback::new(FeedbackKind::Error, LEARN_MISMATCH));
            }
            (Mode::Practice, true) => {
                self.advance(&expected);
                self.stats.correct += 1;
                self.feedback = Some(Feedback::new(
                    FeedbackKind::Success,
                    format!("Correct! {}", expected.comment),
                ));
            }
            (Mode::Practice, false) => {
                self.stats.wrong += 1;
                self.feedback = Some(Feedback::new(
                    FeedbackKind::Error,
                    format!("Wrong. The expected move was {}", expected.notation),
                ));
            }
        }

        if matches {
            MoveOutcome::Accepted {
                completed: self.is_complete(),
            }
        } else {
            debug!(ply = self.ply, %from, %to, expected = %expected.notation, "Move rejected");
            MoveOutcome::Rejected
        }
    }

    fn advance(&mut self, expected: &OpeningMove) {
        self.game.make_move(expected.from, expected.to);
        self.ply += 1;
        self.show_hint = false;
    }

    /// The scripted ply that should be played after a delay, if any: the
    /// line's first move when the learner has black, and every opponent ply
    /// in practice mode.
    pub fn pending_auto_play(&self) -> Option<AutoPlay> {
        if self.is_complete() {
            return None;
        }
        let delay = if self.ply == 0 && self.color == Color::Black {
            self.timing.first_move
        } else if self.mode == Mode::Practice && !self.is_learner_turn() {
            self.timing.opponent_reply
        } else {
            return None;
        };
        Some(AutoPlay {
            key: TimerKey {
                epoch: self.epoch,
                ply: self.ply,
            },
            delay,
        })
    }

    /// Play the scripted ply armed under `key`. Keys from an earlier epoch or
    /// ply are stale and ignored.
    pub fn fire_auto_play(&mut self, key: TimerKey) -> bool {
        let Some(pending) = self.pending_auto_play() else {
            return false;
        };
        if pending.key != key {
            debug!(?key, current = ?pending.key, "Stale auto-play ignored");
            return false;
        }
        let Some(expected) = self.expected().cloned() else {
            return false;
        };
        self.advance(&expected);
        self.feedback = Some(Feedback::new(
            FeedbackKind::Info,
            format!("Opponent played {}", expected.notation),
        ));
        true
    }

    /// Learn mode: show the line up to and including `index`, whether or not
    /// the earlier plies were ever played.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if self.mode != Mode::Learn {
            return false;
        }
        let Some(entry) = self.opening.ply(index) else {
            return false;
        };
        let comment = entry.comment.clone();
        self.game
            .set_position_from_moves(self.opening.line()[..=index].to_vec());
        self.ply = index + 1;
        self.feedback = Some(Feedback::new(FeedbackKind::Info, comment));
        true
    }

    /// Learn mode only, and only while the line is unfinished.
    pub fn toggle_hint(&mut self) -> bool {
        if self.mode == Mode::Learn && !self.is_complete() {
            self.show_hint = !self.show_hint;
        }
        self.show_hint
    }

    /// The expected move's squares while the hint is shown.
    pub fn highlighted_squares(&self) -> Vec<Square> {
        match self.expected() {
            Some(expected) if self.show_hint => vec![expected.from, expected.to],
            _ => Vec::new(),
        }
    }

    pub fn completion_message(&self) -> Option<&'static str> {
        self.is_complete().then_some(COMPLETION_MESSAGE)
    }

    pub fn view(&self) -> DrillView {
        let disabled = self.is_complete()
            || self.pending_auto_play().is_some()
            || (self.mode == Mode::Practice && !self.is_learner_turn());
        DrillView {
            opening_id: self.opening.id.clone(),
            mode: self.mode,
            color: self.color,
            ply: self.ply,
            line_len: self.opening.len(),
            board: self.game.board().clone(),
            last_move: self.game.last_move(),
            highlighted: self.highlighted_squares(),
            disabled,
            feedback: self.feedback.clone(),
            stats: self.stats,
            complete: self.is_complete(),
        }
    }
}

/// Drives a `DrillSession` on the Tokio runtime: every transition re-arms the
/// scripted opponent, and anything that restarts the drill cancels
/// outstanding timers first.
///
/// Methods must be called from inside a Tokio runtime.
pub struct DrillRunner {
    session: Arc<Mutex<DrillSession>>,
    scheduler: Arc<Scheduler>,
}

impl DrillRunner {
    pub fn new(session: DrillSession) -> Self {
        let runner = Self {
            session: Arc::new(Mutex::new(session)),
            scheduler: Scheduler::new(),
        };
        runner.arm();
        runner
    }

    pub fn submit_move(&self, from: Square, to: Square) -> MoveOutcome {
        let outcome = lock(&self.session).submit_move(from, to);
        self.arm();
        outcome
    }

    pub fn select_opening(&self, opening: Arc<Opening>) {
        self.restart_with(|s| s.select_opening(opening));
    }

    pub fn set_mode(&self, mode: Mode) {
        self.restart_with(|s| s.set_mode(mode));
    }

    pub fn set_color(&self, color: Color) {
        self.restart_with(|s| s.set_color(color));
    }

    pub fn reset(&self) {
        self.restart_with(DrillSession::reset);
    }

    pub fn jump_to(&self, index: usize) -> bool {
        let mut jumped = false;
        self.restart_with(|s| jumped = s.jump_to(index));
        jumped
    }

    pub fn toggle_hint(&self) -> bool {
        lock(&self.session).toggle_hint()
    }

    pub fn view(&self) -> DrillView {
        lock(&self.session).view()
    }

    pub fn completion_message(&self) -> Option<&'static str> {
        lock(&self.session).completion_message()
    }

    fn restart_with<F: FnOnce(&mut DrillSession)>(&self, f: F) {
        self.scheduler.cancel_all();
        f(&mut lock(&self.session));
        self.arm();
    }

    fn arm(&self) {
        arm(&self.session, &self.scheduler);
    }
}

impl Drop for DrillRunner {
    fn drop(&mut self) {
        self.scheduler.cancel_all();
    }
}

fn arm(session: &Arc<Mutex<DrillSession>>, scheduler: &Arc<Scheduler>) {
    let Some(auto) = lock(session).pending_auto_play() else {
        return;
    };
    let weak_session: Weak<Mutex<DrillSession>> = Arc::downgrade(session);
    let weak_scheduler = Arc::downgrade(scheduler);
    scheduler.schedule(auto.key, auto.delay, move || {
        let (Some(session), Some(scheduler)) = (weak_session.upgrade(), weak_scheduler.upgrade())
        else {
            return;
        };
        let played = lock(&session).fire_auto_play(auto.key);
        if played {
            arm(&session, &scheduler);
        }
    });
}
