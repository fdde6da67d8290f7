// Copyright (c) 2026 Nostrgate Contributors. MIT License.
// See LICENSE for details.

//! # Nostrgate Authentication Node
//!
//! Entry point for the `nostrgate-node` binary. Parses CLI arguments,
//! initializes logging, wires the authentication pipeline, and serves the
//! HTTP API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the authentication node
//! - `keygen`  — generate a Nostr keypair and print it
//! - `version` — print build version information

mod api;
mod cli;
mod identity;
mod logging;
mod tokens;

use anyhow::{Context, Result};
use clap::Parser;
use rand::RngCore;
use std::sync::Arc;
use tokio::signal;

use nostrgate_protocol::auth::AuthService;
use nostrgate_protocol::challenge::InMemoryChallengeStore;
use nostrgate_protocol::codec::keys::KeyCodec;
use nostrgate_protocol::crypto::Secp256k1;

use cli::{Commands, NostrgateCli};
use identity::IdentityRegistry;
use tokens::JwtIssuer;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = NostrgateCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Keygen => {
            keygen();
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the authentication node: challenge store, identity registry,
/// token issuer, and the HTTP API on the configured port.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init(args.log_format);

    tracing::info!(port = args.port, "starting nostrgate-node");

    // --- Curve domain parameters ---
    // Built once, shared by reference with everything that does curve math.
    let curve = Arc::new(Secp256k1::new());

    // --- Challenge store ---
    let store = Arc::new(InMemoryChallengeStore::new());

    // --- Identity registry ---
    let identities = Arc::new(IdentityRegistry::new());

    // --- Token issuer ---
    let jwt_secret = match args.jwt_secret {
        Some(secret) => secret.into_bytes(),
        None => {
            tracing::warn!(
                "no JWT secret configured, generating an ephemeral one; \
                 tokens will not survive a restart"
            );
            let mut secret = [0u8; 32];
            rand::rngs::OsRng.fill_bytes(&mut secret);
            secret.to_vec()
        }
    };
    let issuer = Arc::new(JwtIssuer::new(&jwt_secret));

    // --- Authentication pipeline ---
    let auth = Arc::new(AuthService::new(
        Arc::clone(&curve),
        store,
        Arc::clone(&identities) as Arc<dyn nostrgate_protocol::auth::IdentityResolver>,
        issuer as Arc<dyn nostrgate_protocol::auth::TokenIssuer>,
    ));

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            nostrgate_protocol::config::PROTOCOL_VERSION,
        ),
        auth,
        identities,
    };

    // --- API server ---
    let router = api::create_router(app_state);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", addr))?;
    tracing::info!("authentication API listening on {}", addr);

    tokio::select! {
        res = axum::serve(listener, router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("nostrgate-node stopped");
    Ok(())
}

/// Generates a fresh keypair and prints every encoding to stdout.
fn keygen() {
    let curve = Arc::new(Secp256k1::new());
    let pair = KeyCodec::new(curve).generate();

    println!("Public key (hex) : {}", pair.public_key_hex);
    println!("Public key (npub): {}", pair.npub);
    println!("Secret key (hex) : {}", pair.secret_key_hex);
    println!("Secret key (nsec): {}", pair.nsec);
    println!();
    println!("Keep the secret key private. Anyone holding it can authenticate as you.");
}

/// Prints version information to stdout.
fn print_version() {
    println!("nostrgate-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol       {}", nostrgate_protocol::config::PROTOCOL_VERSION);
    println!("rustc          {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
