//! The model seam behind `POST /api/analyze`.
//!
//! The HTTP handler only knows [`DocumentModel`]; the production
//! implementation, [`LlmDocumentModel`], sends the document to an
//! `edgequake-llm` provider as an inline attachment next to the analysis
//! prompt. Tests substitute a canned model.

use crate::config::ServerConfig;
use crate::error::IntakeError;
use crate::prompts::{analysis_prompt, SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// One document to analyse, as received by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRequest {
    pub base64_content: String,
    pub mime_type: String,
    pub file_name: String,
    pub file_size: u64,
}

/// The model call failed. The message ends up in the `details` field of the
/// 500 response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ModelError(pub String);

/// Turns a document into the raw text of an analysis record.
#[async_trait]
pub trait DocumentModel: Send + Sync {
    async fn generate(&self, request: &DocumentRequest) -> Result<String, ModelError>;
}

/// [`DocumentModel`] backed by an `edgequake-llm` provider.
pub struct LlmDocumentModel {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmDocumentModel {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    /// Build the provider named in `config`.
    ///
    /// Fails with [`IntakeError::ServerConfiguration`] when the provider's key
    /// variable is unset or the provider cannot be created.
    pub fn from_config(config: &ServerConfig) -> Result<Self, IntakeError> {
        if let Some(var) = config.missing_credential() {
            warn!("{var} is not set; '{}' cannot be used", config.provider_name);
            return Err(IntakeError::ServerConfiguration("Missing API key.".into()));
        }
        let provider = ProviderFactory::create_llm_provider(&config.provider_name, &config.model)
            .map_err(|e| {
                IntakeError::ServerConfiguration(format!(
                    "provider '{}' unavailable: {e}",
                    config.provider_name
                ))
            })?;
        info!("Analysis model: {} / {}", config.provider_name, config.model);
        Ok(Self::new(provider, config.temperature, config.max_tokens))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

/// System prompt, then the analysis prompt with the document attached.
pub fn build_messages(request: &DocumentRequest) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user_with_images(
            &analysis_prompt(&request.file_name, request.file_size),
            vec![document_attachment(request)],
        ),
    ]
}

fn document_attachment(request: &DocumentRequest) -> ImageData {
    ImageData::new(request.base64_content.clone(), request.mime_type.as_str())
}

#[async_trait]
impl DocumentModel for LlmDocumentModel {
    async fn generate(&self, request: &DocumentRequest) -> Result<String, ModelError> {
        let start = Instant::now();
        let messages = build_messages(request);
        let options = self.options();

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError(e.to_string()))?;

        debug!(
            "'{}': {} input tokens, {} output tokens, {:?}",
            request.file_name,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> DocumentRequest {
        DocumentRequest {
            base64_content: "JVBERi0=".into(),
            mime_type: "application/pdf".into(),
            file_name: "brief.pdf".into(),
            file_size: 5,
        }
    }

    #[test]
    fn attachment_carries_content_and_type() {
        let data = document_attachment(&request());
        assert_eq!(data.mime_type, "application/pdf");
        assert_eq!(data.data, "JVBERi0=");
    }

    #[test]
    fn system_prompt_then_document() {
        assert_eq!(build_messages(&request()).len(), 2);
    }

    #[test]
    fn missing_credential_is_a_configuration_error() {
        let config = ServerConfig {
            api_key: None,
            ..ServerConfig::default()
        };
        let err = LlmDocumentModel::from_config(&config).err().unwrap();
        assert_eq!(err.to_string(), "Server configuration error: Missing API key.");
    }
}
