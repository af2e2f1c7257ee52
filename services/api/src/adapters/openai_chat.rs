//! services/api/src/adapters/openai_chat.rs
//!
//! This module contains the adapter for OpenAI-compatible chat completion endpoints.
//! It implements the `ChatBackend` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use movie_quiz_core::{ChatBackend, ChatHandle, PortError, PortResult};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatBackend` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    streaming: bool,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    ///
    /// With `streaming` set, replies are read as a stream of deltas and
    /// concatenated before they are returned.
    pub fn new(client: Client<OpenAIConfig>, model: String, streaming: bool) -> Self {
        Self {
            client,
            model,
            streaming,
        }
    }

    fn build_request(
        &self,
        system_prompt: &str,
        instruction: &str,
    ) -> PortResult<CreateChatCompletionRequest> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system_prompt)
                    .build()
                    .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(instruction)
                    .build()
                    .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?,
            ),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))
    }

    async fn complete(&self, request: CreateChatCompletionRequest) -> PortResult<String> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PortError::Unexpected("Chat completion had no content".to_string()))
    }

    async fn complete_streaming(&self, request: CreateChatCompletionRequest) -> PortResult<String> {
        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let mut reply = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;
            for choice in chunk.choices {
                if let Some(delta) = choice.delta.content {
                    reply.push_str(&delta);
                }
            }
        }
        Ok(reply)
    }
}

//=========================================================================================
// `ChatBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatBackend for OpenAiChatAdapter {
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
        debug!("Sending chat request to {}", chat.model);
        let request = self.build_request(system_prompt, instruction)?;
        if self.streaming {
            self.complete_streaming(request).await
        } else {
            self.complete(request).await
        }
    }
}
