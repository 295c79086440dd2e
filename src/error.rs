//! Errors raised while loading page data.

use thiserror::Error;

use crate::http::StatusCode;

/// Failure of a single loader invocation.
///
/// Nothing here is recovered locally: the page server logs the error and
/// maps it to a status with [`LoadError::status`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The outbound call could not complete (DNS, connect, transport).
    #[error("upstream request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The upstream body is not valid JSON.
    #[error("upstream body from {url} is not valid JSON: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Non-2xx status under [`StatusPolicy::Strict`](crate::upstream::StatusPolicy::Strict).
    #[error("upstream {url} answered {status}")]
    Upstream {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("missing route parameter `{name}`")]
    MissingParam { name: &'static str },

    /// A request local the loader depends on is absent or empty.
    #[error("request context is missing `{0}`")]
    Context(&'static str),

    #[error("leaderboard date window is out of range")]
    DateOutOfRange,
}

impl LoadError {
    /// Status the page server answers with when this error reaches it.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParam { .. } => StatusCode::BadRequest,
            Self::Network(_) | Self::Parse { .. } | Self::Upstream { .. } => {
                StatusCode::BadGateway
            }
            Self::Encode(_) | Self::Context(_) | Self::DateOutOfRange => {
                StatusCode::InternalServerError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_are_bad_gateway() {
        let err = LoadError::Upstream {
            url: "http://api/list-category".into(),
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.status(), StatusCode::BadGateway);
        assert_eq!(err.to_string(), "upstream http://api/list-category answered 503");
    }

    #[test]
    fn missing_param_is_client_error() {
        let err = LoadError::MissingParam { name: "tickerID" };
        assert_eq!(err.status(), StatusCode::BadRequest);
        assert_eq!(err.to_string(), "missing route parameter `tickerID`");
    }

    #[test]
    fn context_errors_are_server_errors() {
        assert_eq!(
            LoadError::Context("apiKey").status(),
            StatusCode::InternalServerError
        );
    }
}
