//! # bg-remover
//!
//! An HTTP service that removes the background from uploaded images and
//! streams back a transparent PNG.
//!
//! Callers authenticate with a bearer JWT issued by the account backend and
//! signed with a shared secret. The service keeps no state between requests:
//! every upload is read, transformed, and returned in a single pass.
//!
//! ## Features
//!
//! - **Bearer token gate**: JWT verification pinned to one key and algorithm,
//!   with expired and invalid tokens reported distinctly
//! - **Pluggable removal**: in-process border keying or a remote
//!   ClipDrop-compatible service
//! - **Streaming responses**: PNG output is streamed back in chunks
//! - **Open CORS**: any origin, method, and header, credentials allowed
//!
//! ## Architecture
//!
//! - [`server`] - Axum router, handlers, and the auth gate
//! - [`removal`] - Background removal backends
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bg_remover::{create_router, JwtVerifier, LocalRemover, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let verifier = JwtVerifier::new_hs256("shared-secret");
//!     let router = create_router(Arc::new(LocalRemover::new()), verifier, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod removal;
pub mod server;

// Re-export commonly used types
pub use config::{
    Cli, Command, MintConfig, MintOutputFormat, RemoverKind, ServeConfig, VerifyConfig,
};
pub use error::{AuthError, RemovalError, UploadError};
pub use removal::{
    is_png, BackgroundRemover, LocalRemover, RemoteRemover, DEFAULT_REMOTE_TIMEOUT_SECS,
    DEFAULT_REMOTE_URL, DEFAULT_TOLERANCE,
};
pub use server::{
    bearer_token, create_router, health_handler, remove_bg_handler, AppState, Authenticated,
    Claims, ErrorResponse, HandlerError, HealthResponse, JwtVerifier, RouterConfig, TokenSigner,
    Verification,
};
