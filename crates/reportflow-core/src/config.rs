use std::env;

use crate::error::ReportFlowError;

pub const MODEL_ENV: &str = "OPENAI_MODEL_NAME";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for the completion endpoint. The credential is read
/// from the environment only; this crate never writes or stores it elsewhere.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ReportFlowError> {
        let api_key = require_env(API_KEY_ENV)?;
        let base_url = env::var(BASE_URL_ENV)
            .ok()
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self { base_url, api_key })
    }

    /// Model selection is process-wide and re-read before each run, matching
    /// the original deployment's `OPENAI_MODEL_NAME` semantics.
    pub fn model() -> String {
        env::var(MODEL_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }
}

pub fn require_env(name: &str) -> Result<String, ReportFlowError> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ReportFlowError::MissingSecret(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_defaults_when_env_unset() {
        unsafe {
            env::remove_var(MODEL_ENV);
        }
        assert_eq!(LlmConfig::model(), DEFAULT_MODEL);
    }

    #[test]
    fn require_env_rejects_missing() {
        let missing = require_env("REPORTFLOW_TEST_UNSET_VAR");
        assert!(matches!(missing, Err(ReportFlowError::MissingSecret(_))));
    }
}
