//! Configuration management for bg-remover.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables (`BG_` prefix, plus the `JWT_*` names shared with
//!   the account backend)
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `serve` (default) - Run the HTTP server
//! - `mint` - Mint a signed token for local testing
//! - `verify` - Check a token against the configured key
//!
//! # Environment Variables
//!
//! - `BG_HOST` - Server bind address (default: 0.0.0.0)
//! - `BG_PORT` - Server port (default: 8000)
//! - `JWT_SECRET` - Shared secret (or PEM public key) for token verification
//! - `JWT_ALGORITHM` - Token signing algorithm (default: HS256)
//! - `BG_JWT_LEEWAY` - Clock leeway in seconds for `exp` (default: 0)
//! - `BG_REMOVER` - Removal backend, `local` or `remote` (default: local)
//! - `BG_REMOVER_URL` - Remote removal endpoint
//! - `BG_REMOVER_API_KEY` - API key for the remote removal endpoint
//! - `BG_REMOVER_TIMEOUT` - Remote request timeout in seconds (default: 60)
//! - `BG_TOLERANCE` - Local backdrop colour tolerance (default: 48)
//! - `BG_MAX_UPLOAD_BYTES` - Optional request body cap
//! - `BG_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use jsonwebtoken::Algorithm;
use serde_json::Value;
use url::Url;

use crate::removal::{DEFAULT_REMOTE_TIMEOUT_SECS, DEFAULT_REMOTE_URL, DEFAULT_TOLERANCE};
use crate::server::auth::is_hmac;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default token lifetime for `mint`, in seconds.
pub const DEFAULT_MINT_TTL: u64 = 3600;

/// Claims `mint` stamps itself; `--claim` may not set them.
const RESERVED_CLAIMS: [&str; 3] = ["sub", "iat", "exp"];

/// Default base URL used in `mint --format curl` output.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Parse a JWT algorithm name such as `HS256`.
pub fn parse_algorithm(value: &str) -> Result<Algorithm, String> {
    Algorithm::from_str(value.trim()).map_err(|_| format!("unsupported JWT algorithm: {}", value))
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// bg-remover - Remove image backgrounds over HTTP.
///
/// Accepts an uploaded image from callers holding a valid bearer token and
/// streams back a PNG with the background made transparent.
#[derive(Parser, Debug, Clone)]
#[command(name = "bg-remover")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Server options when no subcommand is given
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeConfig),

    /// Mint a signed token for local testing
    Mint(MintConfig),

    /// Verify a token and print its claims
    Verify(VerifyConfig),
}

/// Which removal backend to run.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoverKind {
    /// In-process border keying
    Local,
    /// Remote ClipDrop-compatible service
    Remote,
}

// =============================================================================
// Serve
// =============================================================================

/// Options for `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "BG_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "BG_PORT")]
    pub port: u16,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Shared secret used to verify bearer tokens.
    ///
    /// For RS*, PS*, ES* and EdDSA algorithms this is a PEM encoded public key.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Token signing algorithm.
    #[arg(long, default_value = "HS256", env = "JWT_ALGORITHM", value_parser = parse_algorithm)]
    pub jwt_algorithm: Algorithm,

    /// Clock leeway in seconds when checking `exp`.
    #[arg(long, default_value_t = 0, env = "BG_JWT_LEEWAY")]
    pub jwt_leeway: u64,

    // =========================================================================
    // Removal Configuration
    // =========================================================================
    /// Removal backend.
    #[arg(long, value_enum, default_value_t = RemoverKind::Local, env = "BG_REMOVER")]
    pub remover: RemoverKind,

    /// Endpoint of the remote removal service.
    #[arg(long, default_value = DEFAULT_REMOTE_URL, env = "BG_REMOVER_URL")]
    pub remover_url: String,

    /// API key sent to the remote removal service.
    #[arg(long, env = "BG_REMOVER_API_KEY", hide_env_values = true)]
    pub remover_api_key: Option<String>,

    /// Remote request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_REMOTE_TIMEOUT_SECS, env = "BG_REMOVER_TIMEOUT")]
    pub remover_timeout: u64,

    /// Colour distance treated as backdrop by the local remover.
    #[arg(long, default_value_t = DEFAULT_TOLERANCE, env = "BG_TOLERANCE")]
    pub tolerance: u8,

    /// Maximum request body size in bytes.
    ///
    /// If not specified, uploads are unlimited.
    #[arg(long, env = "BG_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "BG_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret_or_empty().is_empty() {
            return Err("JWT secret is required. Set --jwt-secret or JWT_SECRET".to_string());
        }

        if self.remover == RemoverKind::Remote {
            Url::parse(&self.remover_url)
                .map_err(|e| format!("Invalid remover URL '{}': {}", self.remover_url, e))?;

            if self.remover_timeout == 0 {
                return Err("remover_timeout must be greater than 0".to_string());
            }
        }

        if self.max_upload_bytes == Some(0) {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the JWT secret, or an empty string if unset (call validate() first).
    pub fn jwt_secret_or_empty(&self) -> &str {
        self.jwt_secret.as_deref().unwrap_or("")
    }
}

// =============================================================================
// Mint
// =============================================================================

/// Output format for `mint`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintOutputFormat {
    /// The bare token
    Token,
    /// Token and claims as JSON
    Json,
    /// A ready-to-run curl command
    Curl,
}

/// Options for `mint`.
#[derive(Args, Debug, Clone)]
pub struct MintConfig {
    /// Shared secret to sign with.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub secret: String,

    /// HMAC algorithm to sign with.
    #[arg(long, default_value = "HS256", env = "JWT_ALGORITHM", value_parser = parse_algorithm)]
    pub algorithm: Algorithm,

    /// Subject claim.
    #[arg(long)]
    pub sub: Option<String>,

    /// Token lifetime in seconds (0 = no expiry).
    #[arg(long, default_value_t = DEFAULT_MINT_TTL)]
    pub ttl: u64,

    /// Extra claims as key=value (repeatable). Values that parse as JSON are
    /// kept as JSON, anything else becomes a string.
    #[arg(long = "claim")]
    pub claims: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = MintOutputFormat::Token)]
    pub format: MintOutputFormat,

    /// Base URL used in curl output.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

impl MintConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.is_empty() {
            return Err("Secret is required. Set --secret or JWT_SECRET".to_string());
        }

        if !is_hmac(self.algorithm) {
            return Err(format!(
                "Can only mint HMAC tokens (HS256, HS384, HS512), not {:?}",
                self.algorithm
            ));
        }

        Ok(())
    }

    /// Parse `--claim key=value` arguments.
    pub fn parse_claims(&self) -> Result<Vec<(String, Value)>, String> {
        self.claims
            .iter()
            .map(|raw| {
                let (key, value) = raw
                    .split_once('=')
                    .ok_or_else(|| format!("Invalid claim '{}': expected key=value", raw))?;

                let key = key.trim();
                if key.is_empty() {
                    return Err(format!("Invalid claim '{}': empty key", raw));
                }
                if RESERVED_CLAIMS.contains(&key) {
                    return Err(format!(
                        "Invalid claim '{}': use --sub and --ttl to set sub, iat and exp",
                        raw
                    ));
                }

                let value = serde_json::from_str(value)
                    .unwrap_or_else(|_| Value::String(value.to_string()));

                Ok((key.to_string(), value))
            })
            .collect()
    }
}

// =============================================================================
// Verify
// =============================================================================

/// Options for `verify`.
#[derive(Args, Debug, Clone)]
pub struct VerifyConfig {
    /// Token to verify.
    pub token: String,

    /// Shared secret (or PEM public key) to verify with.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Expected signing algorithm.
    #[arg(long, default_value = "HS256", env = "JWT_ALGORITHM", value_parser = parse_algorithm)]
    pub algorithm: Algorithm,

    /// Clock leeway in seconds when checking `exp`.
    #[arg(long, default_value_t = 0, env = "BG_JWT_LEEWAY")]
    pub leeway: u64,
}

// =============================================================================
// Tests
// =============================================================================
