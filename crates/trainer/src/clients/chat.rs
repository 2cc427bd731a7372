use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use crate::clients::{Collaborator, CommentaryRequest, SuggestionRequest};
use crate::config::Config;
use crate::error::TrainerError;
use crate::prompt;

const MOVE_MAX_TOKENS: u32 = 500;
const COMMENT_MAX_TOKENS: u32 = 200;

/// OpenAI-compatible chat-completion client.
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(config: &Config) -> Result<Self, TrainerError> {
        Self::with_timeout(
            &config.chat_api_url,
            &config.chat_api_key,
            &config.chat_model,
            config.chat_timeout,
        )
    }

    pub fn with_timeout(
        endpoint: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, TrainerError> {
        let client = Client::builder()
            .user_agent("OpeningDrill/1.0")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Run one completion and return the first choice's content.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<String, TrainerError> {
        if self.api_key.is_empty() {
            return Err(TrainerError::Config("CHAT_API_KEY not set"));
        }

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.7,
            "max_tokens": max_tokens,
        });

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(TrainerError::Api(resp.status()));
        }

        let data: Value = resp.json().await?;
        extract_content(&data).ok_or(TrainerError::EmptyResponse)
    }
}

/// `choices[0].message.content`, if present and non-blank.
fn extract_content(data: &Value) -> Option<String> {
    data.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .filter(|c| !c.trim().is_empty())
        .map(String::from)
}

impl Collaborator for ChatClient {
    async fn suggest_move(&self, request: &SuggestionRequest) -> Result<String, TrainerError> {
        let user = prompt::move_prompt(&request.board, &request.moves, request.side_to_move);
        self.complete(prompt::MOVE_SYSTEM_PROMPT, &user, MOVE_MAX_TOKENS)
            .await
    }

    async fn comment(&self, request: &CommentaryRequest) -> Result<String, TrainerError> {
        let user = prompt::commentary_prompt(&request.board, &request.moves, &request.last_move);
        blank_comment(
            self.complete(prompt::COMMENTARY_SYSTEM_PROMPT, &user, COMMENT_MAX_TOKENS)
                .await,
        )
    }
}

/// A blank commentary is a valid answer; the caller shows its placeholder.
fn blank_comment(result: Result<String, TrainerError>) -> Result<String, TrainerError> {
    match result {
        Err(TrainerError::EmptyResponse) => Ok(String::new()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content() {
        let data = json!({ "choices": [ { "message": { "content": "{\"move\":\"e4\"}" } } ] });
        assert_eq!(extract_content(&data).as_deref(), Some("{\"move\":\"e4\"}"));
        assert_eq!(extract_content(&json!({ "choices": [] })), None);
        assert_eq!(
            extract_content(&json!({ "choices": [ { "message": { "content": "  " } } ] })),
            None
        );
        assert_eq!(extract_content(&json!({ "error": "rate limited" })), None);
    }

    #[test]
    fn test_blank_comment_is_not_an_error() {
        assert_eq!(blank_comment(Err(TrainerError::EmptyResponse)).unwrap(), "");
        assert_eq!(blank_comment(Ok("Nice.".into())).unwrap(), "Nice.");
        assert!(matches!(
            blank_comment(Err(TrainerError::Config("CHAT_API_KEY not set"))),
            Err(TrainerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let client = ChatClient::with_timeout(
            "http://127.0.0.1:9/unused",
            "",
            "model",
            Duration::from_secs(1),
        )
        .unwrap();
        let err = client.complete("sys", "user", 10).await.unwrap_err();
        assert!(matches!(err, TrainerError::Config(_)));
    }
}
