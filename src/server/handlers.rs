//! HTTP request handlers for the background removal API.
//!
//! # Endpoints
//!
//! - `POST /remove-bg` - Remove the background from an uploaded image
//! - `GET /health` - Health check endpoint

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, FromRef, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{RemovalError, UploadError};
use crate::removal::BackgroundRemover;

use super::auth::{Authenticated, JwtVerifier};

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// Alternative field name accepted for the image.
pub const IMAGE_FIELD: &str = "image";

/// Size of the chunks the PNG response is streamed in.
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// Everything in here is immutable after startup; per-request data never
/// lands in the state.
#[derive(Clone)]
pub struct AppState {
    /// Backend that performs the removal
    pub remover: Arc<dyn BackgroundRemover>,

    /// Token verifier for the auth gate
    pub verifier: Arc<JwtVerifier>,
}

impl AppState {
    pub fn new(remover: Arc<dyn BackgroundRemover>, verifier: JwtVerifier) -> Self {
        Self {
            remover,
            verifier: Arc::new(verifier),
        }
    }
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.verifier)
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error body returned for every error condition.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable reason
    pub detail: String,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Active removal backend
    pub remover: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Failures of the remove-bg handler after authentication.
#[derive(Debug)]
pub enum HandlerError {
    Upload(UploadError),
    Removal(RemovalError),
}

impl From<UploadError> for HandlerError {
    fn from(err: UploadError) -> Self {
        HandlerError::Upload(err)
    }
}

impl From<RemovalError> for HandlerError {
    fn from(err: RemovalError) -> Self {
        HandlerError::Removal(err)
    }
}

impl HandlerError {
    /// HTTP status for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Upload(UploadError::MissingField) => StatusCode::UNPROCESSABLE_ENTITY,
            HandlerError::Upload(UploadError::TooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            HandlerError::Upload(UploadError::Multipart(_)) => StatusCode::BAD_REQUEST,

            // caller-supplied bytes the backend cannot work with
            HandlerError::Removal(err) if err.is_client_error() => StatusCode::BAD_REQUEST,

            HandlerError::Removal(RemovalError::Upstream { .. }) => StatusCode::BAD_GATEWAY,
            HandlerError::Removal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            HandlerError::Upload(err) => err.to_string(),
            HandlerError::Removal(err) => err.to_string(),
        }
    }
}

/// Convert handler failures to HTTP responses.
///
/// - 4xx errors are logged at WARN level (client errors)
/// - 5xx errors are logged at ERROR level (server errors)
impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if status.is_server_error() {
            error!(status = status.as_u16(), "Server error: {}", message);
        } else {
            warn!(status = status.as_u16(), "Client error: {}", message);
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge
    } else {
        UploadError::Multipart(err.body_text())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle background removal requests.
///
/// # Endpoint
///
/// `POST /remove-bg`
///
/// # Request
///
/// - Header `Authorization: Bearer <token>`
/// - `multipart/form-data` body with the image in the `file` field
///   (`image` is accepted as well)
///
/// # Response
///
/// - `200 OK`: PNG with a transparent background, `Content-Type: image/png`
/// - `400 Bad Request`: Empty or undecodable image, malformed multipart body
/// - `401 Unauthorized`: Missing, expired, or invalid token
/// - `413 Payload Too Large`: Upload exceeds the configured limit
/// - `422 Unprocessable Entity`: No file field in the form
/// - `502 Bad Gateway`: Remote removal service failed
/// - `500 Internal Server Error`: PNG encoding failed
pub async fn remove_bg_handler(
    State(state): State<AppState>,
    Authenticated(claims): Authenticated,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HandlerError> {
    let multipart = multipart.map_err(|e| UploadError::Multipart(e.body_text()))?;
    let image = read_upload(multipart).await?;

    debug!(
        subject = claims.subject().as_deref().unwrap_or("-"),
        bytes = image.len(),
        remover = state.remover.name(),
        "Removing background"
    );

    let png = state.remover.remove(image).await?;

    Ok(png_response(png))
}

/// Read the first image field of the form into memory.
///
/// Fields with other names are skipped.
pub async fn read_upload(mut multipart: Multipart) -> Result<Bytes, UploadError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_image = matches!(field.name(), Some(FILE_FIELD) | Some(IMAGE_FIELD));
        if is_image {
            return field.bytes().await.map_err(multipart_error);
        }
    }

    Err(UploadError::MissingField)
}

/// Wrap PNG bytes in a chunked streaming response.
fn png_response(png: Bytes) -> Response {
    let len = png.len();
    let chunks = (0..len).step_by(STREAM_CHUNK_SIZE).map(move |start| {
        let end = (start + STREAM_CHUNK_SIZE).min(len);
        Ok::<_, Infallible>(png.slice(start..end))
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        Body::from_stream(futures::stream::iter(chunks)),
    )
        .into_response()
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "remover": "local"
/// }
/// ```
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        remover: state.remover.name().to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
