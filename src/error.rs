use std::io;
use std::result::Result as StdResult;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("API invalid format: {0}")]
    ApiInvalidFormat(String),
    #[error("Upstream returned status {status}: {message}")]
    UpstreamStatus { status: u16, message: String },
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),
    #[error("Coin not found: {0}")]
    CoinNotFound(String),
    #[error("Request canceled")]
    Canceled,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ApiInvalidFormat(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::ApiInvalidFormat(err.to_string())
        } else if let Some(status) = err.status() {
            Error::UpstreamStatus {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Error::NetworkError(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Error::Canceled
        } else {
            Error::InternalError(err.to_string())
        }
    }
}

pub type Result<T> = StdResult<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_maps_to_invalid_format() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::ApiInvalidFormat(_)));
    }

    #[test]
    fn test_display_includes_status() {
        let err = Error::UpstreamStatus {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream returned status 502: bad gateway");
    }
}
