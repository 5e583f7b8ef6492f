use std::{sync::Arc, time::Duration};

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;

use crate::{
    error::AppError,
    utils::{config::AppConfig, http::build_http_client},
};

/// A single-turn prompt: system instruction plus one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Produces natural-language text for a prompt.
///
/// `Ok(None)` means the provider answered but returned no usable text; `Err`
/// means the call itself failed.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<Option<String>, AppError>;
}

pub struct OpenAIGenerator {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String) -> Self {
        Self { client, model }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let http = build_http_client(Duration::from_secs(config.request_timeout_secs))?;
        let client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(&config.openai_api_key)
                .with_api_base(&config.openai_base_url),
        )
        .with_http_client(http);

        Ok(Self::new(Arc::new(client), config.generation_model.clone()))
    }

    fn build_request(
        &self,
        request: GenerationRequest,
    ) -> Result<CreateChatCompletionRequest, AppError> {
        Ok(CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessage::from(request.system).into(),
                ChatCompletionRequestUserMessage::from(request.user).into(),
            ])
            .temperature(request.temperature)
            .build()?)
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Option<String>, AppError> {
        let request = self.build_request(request)?;
        let response = self.client.chat().create(request).await?;
        Ok(first_choice_text(response))
    }
}

fn first_choice_text(response: CreateChatCompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
}
