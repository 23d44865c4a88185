use thiserror::Error;

/// Core error type for ReportFlow.
#[derive(Debug, Error)]
pub enum ReportFlowError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("completion request failed: {0}")]
    Provider(String),
    #[error("completion endpoint returned {status}: {body}")]
    ProviderStatus { status: u16, body: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
