use async_openai::{config::OpenAIConfig, types::CreateCompletionRequestArgs, Client};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use vertexops_common::{Result, VertexError};

/// Text completion backend used to phrase RAG answers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Without a key no remote provider is built.
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub max_tokens: u16,
    pub timeout_secs: u64,
    /// Snippets quoted by the local fallback answer.
    pub fallback_snippets: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo-instruct".to_string(),
            max_tokens: 256,
            timeout_secs: 15,
            fallback_snippets: 3,
        }
    }
}

/// OpenAI-compatible `/completions` endpoint.
pub struct OpenAiCompletions {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u16,
    timeout: Duration,
}

impl OpenAiCompletions {
    pub fn from_config(config: &CompletionConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref().filter(|key| !key.trim().is_empty())?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&config.api_base);

        Some(Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletions {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CreateCompletionRequestArgs::default()
            .model(self.model.clone())
            .prompt(prompt.to_string())
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| VertexError::Upstream(format!("Invalid completion request: {}", e)))?;

        debug!("Requesting completion from {}", self.model);
        let response = tokio::time::timeout(self.timeout, self.client.completions().create(request))
            .await
            .map_err(|_| VertexError::Upstream("Completion request timed out".to_string()))?
            .map_err(|e| VertexError::Upstream(format!("Completion request failed: {}", e)))?;

        response
            .choices
            .first()
            .map(|choice| choice.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| VertexError::Upstream("Completion returned no text".to_string()))
    }
}
