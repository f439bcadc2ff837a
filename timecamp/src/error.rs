use thiserror::Error;

/// Placeholder body used when a failed response's body could not be read.
pub const UNREADABLE_BODY: &str = "couldn't read response body";

/// Errors surfaced by [`crate::ApiClient`] calls.
///
/// Every caller that joined the same in-flight request receives a clone of
/// the same error, so the type is `Clone` and carries owned messages rather
/// than source errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The request could not be encoded (body or headers). Raised before the
    /// request is registered, so it is never shared with other callers.
    #[error("error serializing request: {0}")]
    Serialization(String),
    /// Connection, DNS, TLS, timeout or body-stream failure.
    #[error("error making request: {0}")]
    Transport(String),
    /// The server answered outside 200..=299.
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body did not match the requested shape.
    #[error("error decoding response JSON: {0}")]
    Decode(String),
    /// The caller performing the request was dropped before it finished.
    #[error("in-flight request was abandoned before completion")]
    Abandoned,
}

impl CallError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

#[derive(Error, Debug)]
pub enum ClientBuildError {
    #[error("invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_formats_code_and_body() {
        let err = CallError::Status {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "API request failed with status 404: not found");
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn unauthorized_covers_401_and_403() {
        for status in [401, 403] {
            let err = CallError::Status {
                status,
                body: String::new(),
            };
            assert!(err.is_unauthorized());
        }
        assert!(!CallError::Transport("refused".into()).is_unauthorized());
    }
}
