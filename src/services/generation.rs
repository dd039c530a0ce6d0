//! Answer generation capability.
//!
//! The core only needs "query plus ordered history in, answer out"; the
//! production implementation speaks the OpenAI-compatible chat
//! completions wire shape so any such endpoint works.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::models::{GenerationConfig, Role, SourceSnippet, Turn};
use crate::utils::retry::{RetryConfig, with_retry};

const SYSTEM_PROMPT: &str = "You are an enterprise conversational assistant. \
Ground answers in the retrieved context below and clearly state when the \
context is insufficient.";

#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer for `query` given the session history and the
    /// snippets retrieved for this turn.
    async fn generate(
        &self,
        query: &str,
        history: &[Turn],
        sources: &[SourceSnippet],
    ) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

/// Generator backed by an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsGenerator {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    retry: RetryConfig,
}

impl ChatCompletionsGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            retry: RetryConfig::default(),
        })
    }

    fn build_messages(
        &self,
        query: &str,
        history: &[Turn],
        sources: &[SourceSnippet],
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: render_system_prompt(sources),
        });

        for turn in history {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(ChatMessage {
                role: role.to_string(),
                content: turn.content.clone(),
            });
        }

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: query.to_string(),
        });

        messages
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = CompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else {
                GenerationError::RequestError(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("no completion choices".to_string()))
    }
}

#[async_trait]
impl Generator for ChatCompletionsGenerator {
    async fn generate(
        &self,
        query: &str,
        history: &[Turn],
        sources: &[SourceSnippet],
    ) -> Result<String, GenerationError> {
        with_retry(&self.retry, || {
            self.complete(self.build_messages(query, history, sources))
        })
        .await
    }
}

/// Render the retrieved snippets into the system instruction.
fn render_system_prompt(sources: &[SourceSnippet]) -> String {
    if sources.is_empty() {
        return format!("{SYSTEM_PROMPT}\n\nNo relevant context found.");
    }

    let mut prompt = format!("{SYSTEM_PROMPT}\n\nContext:");
    for source in sources {
        prompt.push_str(&format!(
            "\n\n[source={} score={:.4}] {}",
            source.metadata.source_id, source.score, source.text
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn snippet(source_id: &str, score: f32, text: &str) -> SourceSnippet {
        SourceSnippet {
            id: format!("{source_id}-0-deadbeef"),
            score,
            metadata: ChunkMetadata {
                source_id: source_id.to_string(),
                chunk_index: 0,
                text: text.to_string(),
                path: String::new(),
            },
            text: text.to_string(),
        }
    }

    #[test]
    fn test_system_prompt_includes_sources() {
        let prompt = render_system_prompt(&[snippet("guide", 0.91, "chunk text")]);
        assert!(prompt.contains("[source=guide score=0.9100] chunk text"));
    }

    #[test]
    fn test_system_prompt_without_sources() {
        let prompt = render_system_prompt(&[]);
        assert!(prompt.contains("No relevant context found."));
    }

    #[test]
    fn test_messages_preserve_history_order() {
        let generator = ChatCompletionsGenerator::new(&GenerationConfig::default()).unwrap();
        let history = vec![
            Turn::new(Role::User, "hi"),
            Turn::new(Role::Assistant, "hello"),
        ];
        let messages = generator.build_messages("next", &history, &[]);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "hi");
        assert_eq!(messages[2].content, "hello");
        assert_eq!(messages[3].content, "next");
    }
}
