use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Client error ({status}): {message}")]
    ClientError { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Request timeout: {0}")]
    TimeoutError(String),

    #[error("Failed to extract metadata: {0}")]
    ExtractError(String),

    #[error("Failed to decode image: {0}")]
    ImageDecodeError(String),

    #[error("External service error: {service} - {message}")]
    ExternalServiceError { service: String, message: String },
}

impl PreviewError {
    /// Map a reqwest transport error onto the closest variant.
    pub fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            PreviewError::TimeoutError(format!("{url}: {err}"))
        } else {
            PreviewError::FetchError(format!("{url}: {err}"))
        }
    }

    /// Map a non-success HTTP status onto an error.
    pub fn from_status(status: reqwest::StatusCode, url: &str) -> Self {
        let code = status.as_u16();
        match code {
            404 => PreviewError::NotFound(format!("{url} not found")),
            400..=499 => PreviewError::ClientError {
                status: code,
                message: format!("{url} returned {status}"),
            },
            500..=599 => PreviewError::ServerError {
                status: code,
                message: format!("{url} returned {status}"),
            },
            _ => PreviewError::FetchError(format!("{url} returned unexpected status {status}")),
        }
    }

    pub fn log(&self) {
        match self {
            PreviewError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            PreviewError::FetchError(e) => {
                error!(error = %e, "Content fetch failed");
            }
            PreviewError::NotFound(e) => {
                warn!(error = %e, "Resource not found");
            }
            PreviewError::ClientError { status, message } => {
                warn!(status = *status, error = %message, "Client error response");
            }
            PreviewError::ServerError { status, message } => {
                error!(status = *status, error = %message, "Server error response");
            }
            PreviewError::TimeoutError(e) => {
                warn!(error = %e, "Request timed out");
            }
            PreviewError::ExtractError(e) => {
                error!(error = %e, "Metadata extraction failed");
            }
            PreviewError::ImageDecodeError(e) => {
                warn!(error = %e, "Image decoding failed");
            }
            PreviewError::ExternalServiceError { service, message } => {
                error!(
                    service = %service,
                    error = %message,
                    "External service error occurred"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = PreviewError::from_status(reqwest::StatusCode::NOT_FOUND, "https://a.test/x");
        assert!(matches!(err, PreviewError::NotFound(ref m) if m.contains("not found")));

        let err = PreviewError::from_status(reqwest::StatusCode::FORBIDDEN, "https://a.test/x");
        assert!(matches!(err, PreviewError::ClientError { status: 403, .. }));

        let err = PreviewError::from_status(reqwest::StatusCode::BAD_GATEWAY, "https://a.test/x");
        assert!(matches!(err, PreviewError::ServerError { status: 502, .. }));
    }
}
