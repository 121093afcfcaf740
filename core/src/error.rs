//! Error types for the Prodex API client.
//!
//! # Design
//! Compilation errors (`UnknownModel` through `RecordNotFound`) are raised
//! before a request is built, so a failed compilation never reaches the
//! network. Status-mapped variants carry the raw response body for
//! debugging; any non-expected status without a dedicated variant lands in
//! `Http` with its code.

/// Errors returned by the compilers, `ProdexClient` parse methods and the
/// session facade.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("'{model}' doesn't exist. Allowed models: {}", .allowed.join(", "))]
    UnknownModel { model: String, allowed: Vec<String> },

    #[error("{0} is not a valid operator")]
    UnknownOperator(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("direction must be ASC or DESC, got {0}")]
    InvalidDirection(String),

    #[error("mode must be one of add, remove, set, got {0}")]
    InvalidMode(String),

    #[error("{0} is not a m2m field")]
    NotM2MField(String),

    #[error("no {model} record with id {id}")]
    RecordNotFound { model: String, id: String },

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The server returned 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The server returned 401.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The server returned 403.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The server returned 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server returned 408.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// The server returned 500.
    #[error("internal server error: {0}")]
    ServerError(String),

    /// The server returned 503.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other unexpected status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("thumbnail: {0}")]
    Thumbnail(String),

    /// The transport could not complete the round trip.
    #[error("transport: {0}")]
    Transport(String),
}

impl ApiError {
    /// Classify an unexpected status code, attaching the raw body.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => ApiError::BadRequest(body),
            401 => ApiError::Unauthorized(body),
            403 => ApiError::Forbidden(body),
            404 => ApiError::NotFound(body),
            408 => ApiError::Timeout(body),
            500 => ApiError::ServerError(body),
            503 => ApiError::ServiceUnavailable(body),
            _ => ApiError::Http { status, body },
        }
    }

    /// HTTP status behind a status-mapped error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest(_) => Some(400),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Timeout(_) => Some(408),
            ApiError::ServerError(_) => Some(500),
            ApiError::ServiceUnavailable(_) => Some(503),
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
