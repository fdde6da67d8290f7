//! # CLI Interface
//!
//! Defines the command-line argument structure for `nostrgate-node` using
//! `clap` derive. Supports three subcommands: `run`, `keygen`, and
//! `version`.

use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Nostrgate authentication node.
///
/// Serves the challenge-response authentication API: issues single-use
/// challenges, verifies signed Nostr events, and mints session tokens for
/// authenticated keys.
#[derive(Parser, Debug)]
#[command(
    name = "nostrgate-node",
    about = "Nostrgate authentication node",
    version,
    propagate_version = true
)]
pub struct NostrgateCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the authentication node.
    Run(RunArgs),
    /// Generate a fresh Nostr keypair and print it to stdout.
    Keygen,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the authentication HTTP API.
    #[arg(long, env = "NOSTRGATE_PORT", default_value_t = nostrgate_protocol::config::DEFAULT_API_PORT)]
    pub port: u16,

    /// Secret used to sign session JWTs.
    ///
    /// When omitted, a random secret is generated at startup; tokens then
    /// stop verifying across restarts, which is fine for development and
    /// wrong for anything else.
    #[arg(long, env = "NOSTRGATE_JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Log output format.
    #[arg(long, env = "NOSTRGATE_LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}
