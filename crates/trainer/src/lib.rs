//! Opening drills and battle mode on top of `drill_core`.

pub mod battle;
pub mod clients;
pub mod config;
pub mod drill;
pub mod error;
pub mod prompt;
pub mod scheduler;
pub mod suggestion;

use std::sync::{Mutex, MutexGuard};

pub use battle::{BattleOrchestrator, BattleSession, BattleView, OpponentOutcome, Phase, PlayerMoveOutcome};
pub use clients::{ChatClient, Collaborator, ScriptedCollaborator};
pub use config::{Config, Timing};
pub use drill::{DrillRunner, DrillSession, DrillView, Mode, MoveOutcome};
pub use error::TrainerError;
pub use suggestion::{parse_suggestion, Suggestion};

/// Session state stays usable after a panic elsewhere; every transition
/// leaves it consistent before returning.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
