//! Background removal backends.
//!
//! The HTTP layer talks to a single [`BackgroundRemover`]: image bytes go in,
//! PNG bytes with a transparent background come out, or a [`RemovalError`]
//! explains why not.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          POST /remove-bg handler        │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │       BackgroundRemover (trait)         │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  LocalRemover   │    │   RemoteRemover     │
//! │ (border flood)  │    │ (ClipDrop-style API)│
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`LocalRemover`]: in-process removal using the `image` crate. Keys out the
//!   colour found along the image border and flood-fills it from the edges.
//! - [`RemoteRemover`]: forwards the upload to a remote removal service over
//!   HTTP and relays the PNG it returns.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RemovalError;

mod local;
mod remote;

pub use local::{is_png, LocalRemover, DEFAULT_TOLERANCE};
pub use remote::{RemoteRemover, DEFAULT_REMOTE_TIMEOUT_SECS, DEFAULT_REMOTE_URL};

/// An image-to-image transform that makes the background transparent.
///
/// Implementations hold no per-request state and are shared across
/// concurrent requests.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    /// Remove the background from `image` and return PNG bytes.
    async fn remove(&self, image: Bytes) -> Result<Bytes, RemovalError>;

    /// Short backend name used in logs and the health endpoint.
    fn name(&self) -> &'static str;
}
