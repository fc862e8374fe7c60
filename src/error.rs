use thiserror::Error;

/// Errors produced by the bearer-token gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer` credential on the request
    #[error("Not authenticated")]
    Missing,

    /// Token `exp` has passed
    #[error("Token expired")]
    Expired,

    /// Token is malformed, has a bad signature, or carries invalid claims
    #[error("Invalid token")]
    Invalid,
}

/// Errors raised by a background removal backend
#[derive(Debug, Clone, Error)]
pub enum RemovalError {
    /// The upload contained no bytes
    #[error("Uploaded image is empty")]
    EmptyInput,

    /// The bytes could not be decoded as a supported image
    #[error("Could not decode image: {message}")]
    Decode { message: String },

    /// The result could not be encoded as PNG
    #[error("Could not encode PNG: {message}")]
    Encode { message: String },

    /// A remote removal service failed or was unreachable
    #[error("Removal service error: {message}")]
    Upstream { message: String },
}

impl RemovalError {
    /// Whether the failure was caused by the caller-supplied bytes.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RemovalError::EmptyInput | RemovalError::Decode { .. })
    }
}

/// Errors that occur while reading the multipart upload
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    /// Neither a `file` nor an `image` field was present
    #[error("Missing file field")]
    MissingField,

    /// The upload exceeded the configured body limit
    #[error("Uploaded file is too large")]
    TooLarge,

    /// The multipart body could not be parsed
    #[error("Malformed multipart body: {0}")]
    Multipart(String),
}
