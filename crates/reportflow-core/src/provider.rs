use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::ReportFlowError;

/// One system-conditioned completion round. No tool use, no streaming.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// Boundary to the language-model provider. The crew tasks only depend on
/// this trait, so tests can script replies without any network.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ReportFlowError>;
}

/// OpenAI-compatible `/chat/completions` client. Works against OpenAI,
/// OpenRouter, Ollama, vLLM and similar endpoints.
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: LlmConfig) -> Result<Self, ReportFlowError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(180))
            .build()
            .map_err(|err| ReportFlowError::InvalidConfiguration(err.to_string()))?;

        Ok(Self {
            base_url: config.base_url,
            api_key: config.api_key,
            client,
        })
    }

    pub fn from_env() -> Result<Self, ReportFlowError> {
        Self::new(LlmConfig::from_env()?)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ReportFlowError> {
        let url = format!("{}/chat/completions", self.base_url);
        let model = LlmConfig::model();

        let body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": 0.7,
            "stream": false,
        });

        debug!(%model, url = %url, "sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ReportFlowError::Provider(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportFlowError::ProviderStatus {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|err| ReportFlowError::Provider(err.to_string()))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                ReportFlowError::Provider("completion response contained no choices".to_string())
            })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
