use thiserror::Error;

/// Code reported when the server gives no machine-readable error of its own.
pub const FALLBACK_ERROR_CODE: &str = "request_failed";

/// Failures of the durable key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage contents could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Every failure a call into the API layer can surface.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network unreachable, connection reset, body read failure. The
    /// underlying error is kept as the source.
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response body was not the JSON we expected.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Non-success HTTP status, normalized from the server's error body.
    #[error("{message} ({code}, HTTP {status})")]
    Http {
        code: String,
        message: String,
        status: u16,
    },

    /// A refresh was requested but no refresh token is stored.
    #[error("no refresh token available")]
    RefreshTokenUnavailable,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("invalid request URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The access token contains bytes that cannot be sent as a header.
    #[error("access token cannot be encoded as a header value")]
    InvalidCredential,

    /// Success envelope without a `data` member.
    #[error("response from {endpoint} carried no data")]
    MissingData { endpoint: String },
}

impl ApiError {
    /// Builds the normalized error for a non-success status, preferring
    /// whatever detail the server put in its body.
    pub fn from_status(status: u16, code: Option<String>, message: Option<String>) -> Self {
        ApiError::Http {
            code: code.unwrap_or_else(|| FALLBACK_ERROR_CODE.to_string()),
            message: message.unwrap_or_else(|| format!("HTTP {status}")),
            status,
        }
    }

    /// HTTP status for [`ApiError::Http`], `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the failure is a missing precondition rather than a network
    /// or server problem. Callers use this to force a full re-login.
    pub fn is_precondition(&self) -> bool {
        matches!(self, ApiError::RefreshTokenUnavailable)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Transport(Box::new(err))
    }
}
