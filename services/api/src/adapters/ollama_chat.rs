//! services/api/src/adapters/ollama_chat.rs
//!
//! Implements the `ChatBackend` port against Ollama's native `/api/chat` endpoint.

use async_trait::async_trait;
use movie_quiz_core::{ChatBackend, ChatHandle, PortError, PortResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct OllamaChatAdapter {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaChatAdapter {
    pub fn new(client: reqwest::Client, base_url: String, model: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn request<'a>(model: &'a str, system_prompt: &str, instruction: &str) -> OllamaChatRequest<'a> {
        OllamaChatRequest {
            model,
            messages: vec![
                OllamaMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                OllamaMessage {
                    role: "user".to_string(),
                    content: instruction.to_string(),
                },
            ],
            stream: false,
        }
    }
}

//=========================================================================================
// `ChatBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatBackend for OllamaChatAdapter {
    async fn start_chat(&self) -> PortResult<ChatHandle> {
        Ok(ChatHandle {
            model: self.model.clone(),
        })
    }

    async fn send(
        &self,
        chat: &ChatHandle,
        system_prompt: &str,
        instruction: &str,
    ) -> PortResult<String> {
        let url = format!("{}/api/chat", self.base_url);
        debug!("Sending chat request to {} ({})", url, chat.model);

        let response = self
            .client
            .post(&url)
            .json(&Self::request(&chat.model, system_prompt, instruction))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Ollama request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Ollama error {}: {}",
                status, text
            )));
        }

        let body: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to parse Ollama reply: {}", e)))?;
        Ok(body.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_carries_system_and_user_messages_without_streaming() {
        let request = OllamaChatAdapter::request("llama3", "be a quiz master", "three lines");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "llama3",
                "messages": [
                    { "role": "system", "content": "be a quiz master" },
                    { "role": "user", "content": "three lines" }
                ],
                "stream": false
            })
        );
    }

    #[test]
    fn reply_content_is_read_from_the_message() {
        let body: OllamaChatResponse = serde_json::from_value(json!({
            "model": "llama3",
            "created_at": "2024-05-01T10:00:00Z",
            "message": { "role": "assistant", "content": "问题: q\n提示1: a\n提示2: b" },
            "done": true
        }))
        .unwrap();
        assert_eq!(body.message.content, "问题: q\n提示1: a\n提示2: b");
    }

    #[test]
    fn trailing_slash_is_dropped_from_the_base_url() {
        let adapter = OllamaChatAdapter::new(
            reqwest::Client::new(),
            "http://localhost:11434/".to_string(),
            "llama3".to_string(),
        );
        assert_eq!(adapter.base_url, "http://localhost:11434");
    }
}
