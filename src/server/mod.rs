//! HTTP server layer for the background removal service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                      POST /remove-bg                            │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    auth     │  │        routes           │  │
//! │  │ (upload →   │  │ (bearer JWT │  │  (router, CORS, limits) │  │
//! │  │  PNG)       │  │  gate)      │  │                         │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{
    bearer_token, Authenticated, Claims, JwtVerifier, TokenSigner, Verification,
    DEFAULT_ALGORITHM,
};
pub use handlers::{
    health_handler, read_upload, remove_bg_handler, AppState, ErrorResponse, HandlerError,
    HealthResponse, FILE_FIELD, IMAGE_FIELD,
};
pub use routes::{create_router, RouterConfig};
