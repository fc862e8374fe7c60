//! Test utilities for integration tests.
//!
//! This module provides a counting mock remover, token helpers, and builders
//! for multipart requests and test images.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgba, RgbaImage};

use bg_remover::{
    create_router, BackgroundRemover, Claims, JwtVerifier, LocalRemover, RemovalError,
    RouterConfig, TokenSigner,
};

pub const TEST_SECRET: &str = "test-secret-key-for-jwt-signing";

pub const BOUNDARY: &str = "bg-remover-test-boundary";

// =============================================================================
// Mock Remover with Call Tracking
// =============================================================================

/// A remover that records how often it was called and returns a fixed PNG.
#[derive(Clone)]
pub struct CountingRemover {
    calls: Arc<AtomicUsize>,
    output: Bytes,
}

impl CountingRemover {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            output: Bytes::from(create_png(2, 2, Rgba([0, 0, 0, 0]))),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackgroundRemover for CountingRemover {
    async fn remove(&self, image: Bytes) -> Result<Bytes, RemovalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.is_empty() {
            return Err(RemovalError::EmptyInput);
        }
        Ok(self.output.clone())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

// =============================================================================
// Router Helpers
// =============================================================================

/// Router backed by the local remover, without request tracing.
pub fn local_router() -> Router {
    create_router(
        Arc::new(LocalRemover::new()),
        JwtVerifier::new_hs256(TEST_SECRET),
        RouterConfig::new().with_tracing(false),
    )
}

/// Router backed by a counting mock; the mock is returned for assertions.
pub fn counting_router() -> (Router, CountingRemover) {
    let remover = CountingRemover::new();
    let router = create_router(
        Arc::new(remover.clone()),
        JwtVerifier::new_hs256(TEST_SECRET),
        RouterConfig::new().with_tracing(false),
    );
    (router, remover)
}

// =============================================================================
// Token Helpers
// =============================================================================

/// A token valid for an hour, signed with the test secret.
pub fn valid_token() -> String {
    TokenSigner::new_hs256(TEST_SECRET)
        .sign_with_ttl(Claims::with_subject("user-1"), Some(Duration::from_secs(3600)))
        .unwrap()
}

/// A token whose `exp` is `seconds_ago` in the past.
pub fn expired_token(secret: &str, seconds_ago: u64) -> String {
    let now = bg_remover::server::auth::unix_now();
    let claims = Claims {
        sub: Some("user-1".to_string()),
        iat: Some(now - seconds_ago - 60),
        exp: Some(now - seconds_ago),
        ..Claims::default()
    };
    TokenSigner::new_hs256(secret).sign(&claims).unwrap()
}

// =============================================================================
// Request Builders
// =============================================================================

/// Build a `multipart/form-data` body with a single file field.
pub fn multipart_body(field: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Build a `POST /remove-bg` request with an optional bearer token.
pub fn remove_bg_request(token: Option<&str>, field: &str, data: &[u8]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/remove-bg")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::from(multipart_body(field, data))).unwrap()
}

// =============================================================================
// Image Helpers
// =============================================================================

/// Encode a solid-colour RGBA image as PNG.
pub fn create_png(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(width, height, color))
}

/// A white image with a red square in the middle.
pub fn create_subject_png(size: u32) -> Vec<u8> {
    let quarter = size / 4;
    let img = RgbaImage::from_fn(size, size, |x, y| {
        let inside = (quarter..size - quarter).contains(&x) && (quarter..size - quarter).contains(&y);
        if inside {
            Rgba([200, 20, 20, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    encode_png(&img)
}

/// The same subject as [`create_subject_png`], encoded as JPEG.
pub fn create_subject_jpeg(size: u32) -> Vec<u8> {
    let png = create_subject_png(size);
    let rgb = image::load_from_memory(&png).unwrap().to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 95)
        .encode_image(&rgb)
        .unwrap();
    out
}

fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Check if data is a valid PNG (magic bytes).
pub fn is_valid_png(data: &[u8]) -> bool {
    bg_remover::is_png(data)
}
