//! OpenAI chat completions.

use super::{CompletionRequest, LanguageModel};
use crate::config::OpenAISettings;
use crate::error::{PlotlineError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat model served by the OpenAI API.
pub struct OpenAIChatModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIChatModel {
    pub fn new(settings: &OpenAISettings, model: &str) -> Result<Self> {
        Ok(Self::with_client(create_client(settings)?, model))
    }

    pub fn with_client(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    fn messages(request: &CompletionRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);

        if let Some(system) = &request.system {
            messages.push(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(system.clone())
                    .build()
                    .map_err(|e| PlotlineError::Llm(e.to_string()))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.clone())
                .build()
                .map_err(|e| PlotlineError::Llm(e.to_string()))?
                .into(),
        );

        Ok(messages)
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model, structured = request.response_schema.is_some()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(Self::messages(request)?)
            .temperature(request.temperature);

        if let Some(schema) = &request.response_schema {
            args.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: schema.description.clone(),
                    name: schema.name.clone(),
                    schema: Some(schema.schema.clone()),
                    strict: Some(true),
                },
            });
        }

        let chat_request = args.build().map_err(|e| PlotlineError::Llm(e.to_string()))?;

        let response = self.client.chat().create(chat_request).await.map_err(|e| {
            PlotlineError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| PlotlineError::Llm("Empty response from LLM".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(PlotlineError::Llm(format!("Model refused: {}", refusal)));
        }

        let content = message
            .content
            .ok_or_else(|| PlotlineError::Llm("Empty response from LLM".to_string()))?;

        debug!("Received {} characters", content.len());
        Ok(content)
    }
}
