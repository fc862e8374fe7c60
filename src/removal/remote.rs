//! Remote background removal over HTTP.
//!
//! Speaks the ClipDrop `remove-background` protocol: a multipart POST with an
//! `image_file` part, authenticated with an `x-api-key` header, answered by
//! PNG bytes. Any service exposing the same contract can be used.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::error::RemovalError;

use super::{is_png, BackgroundRemover};

/// Default remote endpoint.
pub const DEFAULT_REMOTE_URL: &str = "https://clipdrop-api.co/remove-background/v1";

/// Default request timeout in seconds.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 60;

/// Multipart field the remote service reads the image from.
const IMAGE_FIELD: &str = "image_file";

/// Header carrying the remote API key.
const API_KEY_HEADER: &str = "x-api-key";

/// Longest upstream error body written to the debug log.
const MAX_LOGGED_BODY: usize = 256;

/// Cut `text` to at most `max` bytes on a char boundary.
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Client for a remote removal service.
#[derive(Debug, Clone)]
pub struct RemoteRemover {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl RemoteRemover {
    /// Create a client for `endpoint`.
    pub fn new(
        endpoint: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RemovalError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemovalError::Upstream {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl BackgroundRemover for RemoteRemover {
    async fn remove(&self, image: Bytes) -> Result<Bytes, RemovalError> {
        if image.is_empty() {
            return Err(RemovalError::EmptyInput);
        }

        let size = image.len();
        let part = Part::stream_with_length(reqwest::Body::from(image), size as u64)
            .file_name("upload");
        let form = Form::new().part(IMAGE_FIELD, part);

        let mut request = self.client.post(self.endpoint.clone()).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        debug!(endpoint = %self.endpoint, bytes = size, "Forwarding image to removal service");

        let response = request.send().await.map_err(|e| RemovalError::Upstream {
            message: e.to_string(),
        })?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST
                | StatusCode::UNSUPPORTED_MEDIA_TYPE
                | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            // the service rejected the image itself; its wording stays in our logs
            let body = response.text().await.unwrap_or_default();
            debug!(
                status = status.as_u16(),
                body = truncate(&body, MAX_LOGGED_BODY),
                "Removal service rejected image"
            );
            return Err(RemovalError::Decode {
                message: format!("removal service rejected image ({})", status.as_u16()),
            });
        }

        if !status.is_success() {
            warn!(status = status.as_u16(), "Removal service returned an error");
            return Err(RemovalError::Upstream {
                message: format!("removal service returned {}", status),
            });
        }

        let body = response.bytes().await.map_err(|e| RemovalError::Upstream {
            message: e.to_string(),
        })?;

        if !is_png(&body) {
            return Err(RemovalError::Upstream {
                message: "removal service did not return a PNG".to_string(),
            });
        }

        Ok(body)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
