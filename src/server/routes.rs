//! Router configuration for the background removal API.
//!
//! This module defines the HTTP routes and applies CORS, body limits, and
//! request tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health        - Health check (public)
//! /remove-bg     - Background removal (bearer token required)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bg_remover::removal::LocalRemover;
//! use bg_remover::server::{create_router, JwtVerifier, RouterConfig};
//!
//! let verifier = JwtVerifier::new_hs256("my-secret-key");
//! let router = create_router(Arc::new(LocalRemover::new()), verifier, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::JwtVerifier;
use super::handlers::{health_handler, remove_bg_handler, AppState};
use crate::removal::BackgroundRemover;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Upper bound on request bodies in bytes (None = unlimited)
    pub max_upload_bytes: Option<usize>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin, method, and header, with credentials
    /// - Request bodies are unlimited
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            max_upload_bytes: None,
            enable_tracing: true,
        }
    }

    /// Restrict CORS to specific origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Cap request body size.
    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = Some(limit);
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `remover` - Backend performing the background removal
/// * `verifier` - Token verifier guarding `/remove-bg`
/// * `config` - Router configuration
pub fn create_router(
    remover: Arc<dyn BackgroundRemover>,
    verifier: JwtVerifier,
    config: RouterConfig,
) -> Router {
    let app_state = AppState::new(remover, verifier);

    let body_limit = match config.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    // The bearer check lives in the handler's extractor chain, ahead of the
    // multipart body
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/remove-bg", post(remove_bg_handler))
        .with_state(app_state)
        .layer(body_limit)
        .layer(build_cors_layer(&config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
///
/// Credentials are always allowed. Wildcards cannot be combined with
/// credentials, so origin, method, and headers mirror the request instead.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(AllowOrigin::mirror_request()),
        Some(origins) if origins.is_empty() => {
            // No origins allowed - this effectively disables CORS
            cors
        }
        Some(origins) => {
            let parsed_origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
