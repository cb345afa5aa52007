use serde::Serialize;
use thiserror::Error;

/// Normalized failure category surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller error, detected before any network call
    InvalidRequest,
    /// Network failure or timeout
    Unreachable,
    /// Non-2xx status or malformed provider response
    ProviderError,
    /// Unknown task id
    NotFound,
    /// Local configuration problem (missing key, unknown profile, bad file)
    Config,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Provider unreachable: {0}")]
    Unreachable(String),

    #[error("Provider error{}: {message}", status_code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    ProviderError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Unknown task: {0}")]
    NotFound(String),

    #[error(
        "API key not found for {provider}. Set {env_var} environment variable or add to config."
    )]
    MissingApiKey { provider: String, env_var: String },

    #[error("Unknown provider profile: {0}")]
    UnknownProfile(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl GatewayError {
    /// Shorthand for a provider error without an HTTP status
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::ProviderError {
            message: message.into(),
            status_code: None,
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Unreachable(_) => ErrorKind::Unreachable,
            Self::ProviderError { .. } => ErrorKind::ProviderError,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::MissingApiKey { .. }
            | Self::UnknownProfile(_)
            | Self::ConfigError(_)
            | Self::Io(_)
            | Self::TomlParse(_)
            | Self::TomlSerialize(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            GatewayError::InvalidRequest("x".into()).kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            GatewayError::Unreachable("x".into()).kind(),
            ErrorKind::Unreachable
        );
        assert_eq!(GatewayError::malformed("x").kind(), ErrorKind::ProviderError);
        assert_eq!(GatewayError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            GatewayError::UnknownProfile("x".into()).kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_provider_error_display() {
        let err = GatewayError::ProviderError {
            message: "quota exceeded".into(),
            status_code: Some(429),
        };
        assert_eq!(err.to_string(), "Provider error (HTTP 429): quota exceeded");
        assert_eq!(
            GatewayError::malformed("no task id").to_string(),
            "Provider error: no task id"
        );
    }
}
