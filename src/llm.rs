use std::pin::Pin;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::{future, Stream, StreamExt};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::Role;

/// One role + content pair of model context, decoupled from the provider's
/// own request types.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AppError>> + Send>>;

/// Seam to the external model provider. The relay consumes `stream_chat`,
/// the analysis and synthesis engines consume `complete`.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Opens a streaming completion over the given history and returns the
    /// incremental text fragments in arrival order.
    async fn stream_chat(
        &self,
        history: &[ChatTurn],
        system_prompt: Option<&str>,
    ) -> Result<TextStream, AppError>;

    /// Single non-streaming completion with a system instruction.
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, AppError>;
}

impl From<OpenAIError> for AppError {
    fn from(e: OpenAIError) -> Self {
        AppError::UpstreamProvider(e.to_string())
    }
}

pub struct OpenAiCompletionClient {
    client: Client<OpenAIConfig>,
    chat_model: String,
    report_model: String,
}

impl OpenAiCompletionClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(config.model_api_key.clone())
                .with_api_base(config.model_api_base.clone()),
        );
        OpenAiCompletionClient {
            client,
            chat_model: config.chat_model.clone(),
            report_model: config.report_model.clone(),
        }
    }

    fn build_messages(
        history: &[ChatTurn],
        system_prompt: Option<&str>,
    ) -> Result<Vec<ChatCompletionRequestMessage>, OpenAIError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(history.len() + 1);
        if let Some(system) = system_prompt {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?
                    .into(),
            );
        }
        for turn in history {
            let message = match turn.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.clone())
                    .build()?
                    .into(),
            };
            messages.push(message);
        }
        Ok(messages)
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn stream_chat(
        &self,
        history: &[ChatTurn],
        system_prompt: Option<&str>,
    ) -> Result<TextStream, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.chat_model)
            .messages(Self::build_messages(history, system_prompt)?)
            .max_tokens(2048u32)
            .stream(true)
            .build()?;

        let response = self.client.chat().create_stream(request).await?;

        let stream = response
            .map(|item| match item {
                Ok(chunk) => Ok(chunk
                    .choices
                    .first()
                    .and_then(|choice| choice.delta.content.clone())
                    .unwrap_or_default()),
                Err(e) => Err(AppError::UpstreamProvider(e.to_string())),
            })
            .filter(|fragment| {
                // Role-only and finish-reason chunks carry no text
                future::ready(!matches!(fragment, Ok(text) if text.is_empty()))
            })
            .boxed();

        Ok(stream)
    }

    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.report_model)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .max_tokens(max_tokens)
            .build()?;

        let response = self.client.chat().create(request).await?;

        Ok(response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default())
    }
}
