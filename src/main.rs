//! bg-remover - Remove image backgrounds over HTTP.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use bg_remover::{
    config::{Cli, Command, MintConfig, MintOutputFormat, RemoverKind, ServeConfig, VerifyConfig},
    create_router, BackgroundRemover, Claims, JwtVerifier, LocalRemover, RemoteRemover,
    RouterConfig, TokenSigner, Verification,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Mint(config) => run_mint(config),
        Command::Verify(config) => run_verify(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("bg-remover v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  JWT algorithm: {:?}", config.jwt_algorithm);
    if config.jwt_leeway > 0 {
        info!("  JWT leeway: {}s", config.jwt_leeway);
    }

    let verifier = match JwtVerifier::new(
        config.jwt_secret_or_empty(),
        config.jwt_algorithm,
        config.jwt_leeway,
    ) {
        Ok(verifier) => verifier,
        Err(e) => {
            error!("Invalid JWT key for {:?}: {}", config.jwt_algorithm, e);
            return ExitCode::FAILURE;
        }
    };

    let remover = match build_remover(&config) {
        Ok(remover) => remover,
        Err(e) => {
            error!("Failed to create remover: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.max_upload_bytes {
        Some(limit) => info!("  Upload limit: {} bytes", limit),
        None => info!("  Upload limit: none"),
    }
    match config.cors_origins {
        Some(ref origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any (credentials allowed)"),
    }

    let router = create_router(remover, verifier, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -H 'Authorization: Bearer <token>' -F file=@photo.jpg http://{}/remove-bg -o out.png",
        addr
    );
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "bg_remover=debug,tower_http=debug"
    } else {
        "bg_remover=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the configured removal backend.
fn build_remover(config: &ServeConfig) -> Result<Arc<dyn BackgroundRemover>, String> {
    match config.remover {
        RemoverKind::Local => {
            info!("  Remover: local (tolerance {})", config.tolerance);
            Ok(Arc::new(LocalRemover::with_tolerance(config.tolerance)))
        }
        RemoverKind::Remote => {
            let endpoint = Url::parse(&config.remover_url).map_err(|e| e.to_string())?;
            info!("  Remover: remote ({})", endpoint);
            if config.remover_api_key.is_none() {
                warn!("  No remover API key set; requests will be sent unauthenticated");
            }

            let remover = RemoteRemover::new(
                endpoint,
                config.remover_api_key.clone(),
                Duration::from_secs(config.remover_timeout),
            )
            .map_err(|e| e.to_string())?;

            Ok(Arc::new(remover))
        }
    }
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    if let Some(limit) = config.max_upload_bytes {
        router_config = router_config.with_max_upload_bytes(limit);
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Mint Command
// =============================================================================

fn run_mint(config: MintConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let extra = match config.parse_claims() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let Some(signer) = TokenSigner::new(&config.secret, config.algorithm) else {
        eprintln!("Error: cannot sign with {:?}", config.algorithm);
        return ExitCode::FAILURE;
    };

    let mut claims = Claims {
        sub: config.sub.clone(),
        ..Claims::default()
    };
    for (key, value) in extra {
        claims = claims.with_claim(key, value);
    }

    let ttl = (config.ttl > 0).then(|| Duration::from_secs(config.ttl));
    let now = bg_remover::server::auth::unix_now();
    claims.iat = Some(now);
    claims.exp = ttl.map(|ttl| now + ttl.as_secs());

    let token = match signer.sign(&claims) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Error: failed to sign token: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        MintOutputFormat::Token => {
            println!("{}", token);
        }
        MintOutputFormat::Json => {
            let json = serde_json::json!({
                "token": token,
                "algorithm": format!("{:?}", config.algorithm),
                "claims": claims,
                "ttl": config.ttl,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(out) => println!("{}", out),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        MintOutputFormat::Curl => {
            let base_url = config.base_url.trim_end_matches('/');
            println!(
                "curl -X POST -H 'Authorization: Bearer {}' -F file=@image.jpg {}/remove-bg -o out.png",
                token, base_url
            );
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Verify Command
// =============================================================================

fn run_verify(config: VerifyConfig) -> ExitCode {
    let verifier = match JwtVerifier::new(&config.secret, config.algorithm, config.leeway) {
        Ok(verifier) => verifier,
        Err(e) => {
            eprintln!("Error: invalid key for {:?}: {}", config.algorithm, e);
            return ExitCode::FAILURE;
        }
    };

    match verifier.verify(config.token.trim()) {
        Verification::Valid(claims) => {
            println!("✓ Token is valid");
            if let Some(subject) = claims.subject() {
                println!("  Subject: {}", subject);
            }
            match claims.exp {
                Some(exp) => println!("  Expires: {} (unix seconds)", exp),
                None => println!("  Expires: never"),
            }
            if let Ok(json) = serde_json::to_string_pretty(&claims) {
                println!();
                println!("{}", json);
            }
            ExitCode::SUCCESS
        }
        Verification::Expired => {
            println!("✗ Token expired");
            ExitCode::FAILURE
        }
        Verification::Invalid => {
            println!("✗ Invalid token");
            ExitCode::FAILURE
        }
    }
}
