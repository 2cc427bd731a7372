//! Trainer configuration from environment variables

use std::env;
use std::time::Duration;

/// Auto-play and pacing delays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Scripted opponent reply in practice mode.
    pub opponent_reply: Duration,
    /// Scripted first move when the learner plays the second side.
    pub first_move: Duration,
    /// Minimum time between asking for an opponent move and playing it.
    pub min_think: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            opponent_reply: Duration::from_millis(500),
            first_move: Duration::from_millis(300),
            min_think: Duration::from_millis(1000),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Chat-completion endpoint (OpenAI-compatible)
    pub chat_api_url: String,

    /// Bearer token; empty means every request fails with a config error
    pub chat_api_key: String,

    pub chat_model: String,

    pub chat_timeout: Duration,

    pub timing: Timing,

    /// Optional JSON catalog replacing the built-in openings
    pub openings_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Timing::default();
        Self {
            chat_api_url: env::var("CHAT_API_URL").unwrap_or_else(|_| {
                "https://api.groq.com/openai/v1/chat/completions".to_string()
            }),
            chat_api_key: env::var("CHAT_API_KEY").unwrap_or_default(),
            chat_model: env::var("CHAT_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            chat_timeout: Duration::from_secs(env_parse("CHAT_TIMEOUT_SECS").unwrap_or(30)),
            timing: Timing {
                opponent_reply: env_millis("OPPONENT_REPLY_DELAY_MS")
                    .unwrap_or(defaults.opponent_reply),
                first_move: env_millis("FIRST_MOVE_DELAY_MS").unwrap_or(defaults.first_move),
                min_think: env_millis("MIN_THINK_MS").unwrap_or(defaults.min_think),
            },
            openings_path: env::var("OPENINGS_PATH").ok().filter(|p| !p.is_empty()),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}
