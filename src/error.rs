use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Message shown to users whenever a generation fails, whatever the cause.
pub const GENERATION_FAILED_MESSAGE: &str = "Generation failed, please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("{}", GENERATION_FAILED_MESSAGE)]
    GenerationFailed,

    #[error("internal error: {0}")]
    InternalError(String),
}

/// Taxonomy kind of a completion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmErrorKind {
    Transport,
    RemoteStatus,
    MalformedResponse,
    UserInput,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<LlmError> },
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RemoteStatus { .. })
    }

    pub fn kind(&self) -> LlmErrorKind {
        match self {
            Self::Transport(_) => LlmErrorKind::Transport,
            Self::RemoteStatus { .. } => LlmErrorKind::RemoteStatus,
            Self::MalformedResponse(_) => LlmErrorKind::MalformedResponse,
            Self::InvalidRequest(_) => LlmErrorKind::UserInput,
            Self::Exhausted { last, .. } => last.kind(),
        }
    }

    /// True when every allowed attempt failed with a retryable error.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            other => {
                tracing::error!("Generation failed ({:?}): {}", other.kind(), other);
                ApiError::GenerationFailed
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config: {0}")]
    MissingRequired(String),

    #[error("invalid value for {0}")]
    InvalidValue(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("failed to read PDF: {0}")]
    Pdf(String),

    #[error("no text could be extracted from {0}")]
    Empty(String),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedFileType(_) => ApiError::UnsupportedMedia(err.to_string()),
            IngestError::Pdf(_) | IngestError::Empty(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("message content must not be empty")]
    EmptyContent,

    #[error("no document uploaded for session {0}")]
    NoDocument(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => ApiError::NotFound(err.to_string()),
            SessionError::EmptyContent | SessionError::NoDocument(_) => {
                ApiError::BadRequest(err.to_string())
            }
            SessionError::Llm(e) => e.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::GenerationFailed => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::UnsupportedMedia(_) => "UNSUPPORTED_MEDIA",
            ApiError::GenerationFailed => "GENERATION_FAILED",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_retryable() {
        let status = LlmError::RemoteStatus {
            status: 429,
            body: "slow down".to_string(),
        };
        assert!(status.is_retryable());
        assert_eq!(status.kind(), LlmErrorKind::RemoteStatus);

        let malformed = LlmError::MalformedResponse("no choices".to_string());
        assert!(!malformed.is_retryable());

        let invalid = LlmError::InvalidRequest("empty".to_string());
        assert!(!invalid.is_retryable());
        assert_eq!(invalid.kind(), LlmErrorKind::UserInput);
    }

    #[test]
    fn test_exhausted_reports_last_kind() {
        let exhausted = LlmError::Exhausted {
            attempts: 3,
            last: Box::new(LlmError::RemoteStatus {
                status: 503,
                body: String::new(),
            }),
        };
        assert!(exhausted.is_exhausted());
        assert!(!exhausted.is_retryable());
        assert_eq!(exhausted.kind(), LlmErrorKind::RemoteStatus);
    }

    #[test]
    fn test_llm_error_maps_to_generic_failure() {
        let api: ApiError = LlmError::MalformedResponse("secret detail".to_string()).into();
        assert!(matches!(api, ApiError::GenerationFailed));
        assert_eq!(api.to_string(), GENERATION_FAILED_MESSAGE);
        assert_eq!(api.status_code(), StatusCode::BAD_GATEWAY);

        let api: ApiError = LlmError::InvalidRequest("topic is empty".to_string()).into();
        assert_eq!(api.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_api_error_status_codes() {
        let not_found = ApiError::NotFound("session_123".to_string());
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let unsupported: ApiError = IngestError::UnsupportedFileType("docx".to_string()).into();
        assert_eq!(unsupported.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let missing: ApiError = SessionError::NotFound("abc".to_string()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }
}
