use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::transforms::StreamError;

pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Which upstream vocabulary produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    Anthropic,
    OpenAI,
}

impl ErrorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSource::Anthropic => "anthropic",
            ErrorSource::OpenAI => "openai",
        }
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for ErrorSource {}

/// A structured error returned by an upstream provider, either as a non-2xx
/// HTTP body or as an in-stream `error` event.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{source} upstream error ({error_type}): {message}")]
pub struct ProviderError {
    error_type: String,
    message: String,
    source: ErrorSource,
    status: Option<u16>,
}

impl ProviderError {
    pub fn new(
        source: ErrorSource,
        error_type: impl Into<String>,
        message: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
            source,
            status,
        }
    }

    /// Decode a non-2xx response body into a provider error. Both vendor
    /// shapes nest the payload under an `error` key:
    /// `{"type":"error","error":{"type":…,"message":…}}` (Anthropic) and
    /// `{"error":{"type":…,"message":…}}` (OpenAI). Anything else is kept as
    /// the raw body text.
    pub fn from_response(source: ErrorSource, status: u16, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct ErrorBody {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
        }

        #[derive(Deserialize)]
        struct Envelope {
            error: Option<ErrorBody>,
        }

        match serde_json::from_slice::<Envelope>(body) {
            Ok(Envelope { error: Some(body) }) => Self::new(
                source,
                body.error_type.unwrap_or_else(|| "api_error".to_string()),
                body.message.unwrap_or_default(),
                Some(status),
            ),
            _ => Self::new(
                source,
                "api_error",
                String::from_utf8_lossy(body).trim().to_string(),
                Some(status),
            ),
        }
    }

    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source(&self) -> ErrorSource {
        self.source
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status
    }
}

/// Validate the upstream HTTP response boundary before streaming begins.
///
/// Non-2xx statuses become a [`ProviderError`] decoded from the body; a
/// content type other than `text/event-stream` is fatal.
pub fn check_event_stream(
    source: ErrorSource,
    status: u16,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<(), StreamError> {
    if !(200..300).contains(&status) {
        return Err(StreamError::Provider(ProviderError::from_response(
            source, status, body,
        )));
    }

    let media_type = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim())
        .unwrap_or("");
    if !media_type.eq_ignore_ascii_case(EVENT_STREAM_CONTENT_TYPE) {
        return Err(StreamError::Protocol(format!(
            "expected {EVENT_STREAM_CONTENT_TYPE} response, got {:?}",
            content_type.unwrap_or("<missing>")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_anthropic_error_body() {
        let body = br#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let err = ProviderError::from_response(ErrorSource::Anthropic, 529, body);

        assert_eq!(err.error_type(), "overloaded_error");
        assert_eq!(err.message(), "Overloaded");
        assert_eq!(err.source(), ErrorSource::Anthropic);
        assert_eq!(err.status_code(), Some(529));
        assert_eq!(err.source().as_str(), "anthropic");
    }

    #[test]
    fn test_openai_error_body() {
        let body = br#"{"error":{"message":"Rate limit reached","type":"rate_limit_error","code":"rate_limit_exceeded"}}"#;
        let err = ProviderError::from_response(ErrorSource::OpenAI, 429, body);

        assert_eq!(err.error_type(), "rate_limit_error");
        assert_eq!(err.message(), "Rate limit reached");
        assert_eq!(err.source(), ErrorSource::OpenAI);
    }

    #[test]
    fn test_unstructured_error_body_keeps_raw_text() {
        let err = ProviderError::from_response(ErrorSource::OpenAI, 502, b"Bad Gateway\n");

        assert_eq!(err.error_type(), "api_error");
        assert_eq!(err.message(), "Bad Gateway");
        assert_eq!(err.status_code(), Some(502));
    }

    #[test]
    fn test_check_event_stream_accepts_parameters() {
        assert!(check_event_stream(
            ErrorSource::Anthropic,
            200,
            Some("text/event-stream; charset=utf-8"),
            b""
        )
        .is_ok());
    }

    #[test]
    fn test_check_event_stream_rejects_wrong_content_type() {
        let err = check_event_stream(ErrorSource::OpenAI, 200, Some("application/json"), b"")
            .unwrap_err();
        assert!(matches!(err, StreamError::Protocol(_)));

        let err = check_event_stream(ErrorSource::OpenAI, 200, None, b"").unwrap_err();
        assert!(matches!(err, StreamError::Protocol(_)));
    }

    #[test]
    fn test_check_event_stream_surfaces_provider_error() {
        let body = br#"{"error":{"message":"invalid api key","type":"authentication_error"}}"#;
        let err =
            check_event_stream(ErrorSource::OpenAI, 401, Some("application/json"), body)
                .unwrap_err();

        match err {
            StreamError::Provider(provider) => {
                assert_eq!(provider.error_type(), "authentication_error");
                assert_eq!(provider.status_code(), Some(401));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }
}
