//! OpenAI-compatible chat-completions client.
//!
//! Sends the prompt as a single user message and returns the text of the
//! first choice.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::generate::CodeGenerator;

pub const DEFAULT_API_URL: &str = "https://aipipe.org/openai/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client.
pub struct LlmClient {
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.api_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Send a conversation and return the first choice's text.
    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, RemoteError> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::http(status.as_u16(), body));
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| RemoteError::http(status.as_u16(), "response contained no completion"))
    }
}

#[async_trait]
impl CodeGenerator for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, RemoteError> {
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Requesting completion");
        self.chat(vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }])
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn returns_trimmed_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o",
                "max_tokens": 1000,
                "messages": [{"role": "user", "content": "build it"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"\n<html></html>\n"}}]}"#)
            .create_async()
            .await;

        let client = LlmClient::new("sk-test".into()).with_api_url(&server.url());
        let text = client.complete("build it").await.unwrap();
        assert_eq!(text, "<html></html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid key")
            .create_async()
            .await;

        let client = LlmClient::new("bad".into()).with_api_url(&server.url());
        let err = client.complete("x").await.unwrap_err();
        assert_eq!(err, RemoteError::http(401, "invalid key"));
    }

    #[tokio::test]
    async fn missing_choices_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = LlmClient::new("k".into()).with_api_url(&server.url());
        let err = client.complete("x").await.unwrap_err();
        assert_eq!(err.status, Some(200));
    }
}
