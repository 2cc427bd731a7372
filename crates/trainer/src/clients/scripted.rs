//! Canned collaborator for tests and offline play.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::clients::{Collaborator, CommentaryRequest, SuggestionRequest};
use crate::error::TrainerError;
use crate::lock;

type Reply = Result<String, String>;

/// Hands out queued replies in order. An exhausted queue is a collaborator error.
#[derive(Default)]
pub struct ScriptedCollaborator {
    replies: Mutex<VecDeque<Reply>>,
    comments: Mutex<VecDeque<Reply>>,
    delay: Duration,
    suggest_calls: AtomicUsize,
    comment_calls: AtomicUsize,
}

impl ScriptedCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push_reply(&self, raw: impl Into<String>) {
        lock(&self.replies).push_back(Ok(raw.into()));
    }

    /// Queue a move reply in the JSON shape the real service is asked for.
    pub fn push_move(&self, notation: &str) {
        self.push_reply(format!(
            r#"{{"move": "{notation}", "thinking": "I play {notation}.", "evaluation": "Equal", "confidence": 80}}"#
        ));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        lock(&self.replies).push_back(Err(message.into()));
    }

    pub fn push_comment(&self, text: impl Into<String>) {
        lock(&self.comments).push_back(Ok(text.into()));
    }

    pub fn suggest_calls(&self) -> usize {
        self.suggest_calls.load(Ordering::SeqCst)
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }

    async fn answer(&self, queue: &Mutex<VecDeque<Reply>>) -> Result<String, TrainerError> {
        let next = lock(queue).pop_front();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(TrainerError::Collaborator(message)),
            None => Err(TrainerError::Collaborator("no scripted reply left".into())),
        }
    }
}

impl Collaborator for ScriptedCollaborator {
    async fn suggest_move(&self, _request: &SuggestionRequest) -> Result<String, TrainerError> {
        self.suggest_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.replies).await
    }

    async fn comment(&self, _request: &CommentaryRequest) -> Result<String, TrainerError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(&self.comments).await
    }
}
