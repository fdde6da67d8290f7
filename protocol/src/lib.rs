// Copyright (c) 2026 Nostrgate Contributors. MIT License.
// See LICENSE for details.

//! # Nostrgate Protocol — Core Library
//!
//! Passwordless authentication by cryptographic proof of control over a
//! Nostr keypair. A client asks for a single-use challenge, signs it into a
//! kind-22242 event with its secp256k1 key, and submits the event; the
//! server recomputes the canonical NIP-01 event id, verifies the BIP340
//! Schnorr signature, and hands the verified identity to its collaborators
//! for session issuance.
//!
//! ## Architecture
//!
//! The crate is layered leaves-first, and the upper layers only ever talk
//! to the layer directly beneath them:
//!
//! - **codec** — bech32 encoding and npub/nsec key conversion.
//! - **crypto** — finite-field arithmetic, secp256k1 points, BIP340 Schnorr.
//! - **event** — NIP-01 canonical serialization and event-id computation.
//! - **challenge** — single-use, time-bounded challenge storage.
//! - **auth** — the orchestrating login protocol.
//! - **config** — every constant shared across the above.
//!
//! ## Design Philosophy
//!
//! 1. Byte-exact canonical encoding. One escaping rule, one pubkey form.
//! 2. Fail closed. Every verification error collapses to a generic failure;
//!    nothing about the cryptographic sub-cause crosses the API boundary.
//! 3. No global state. Curve domain parameters are an explicit value passed
//!    by reference, not a process-wide singleton.
//! 4. If it gates a login, it has tests. Plural.

pub mod auth;
pub mod challenge;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod event;

// Re-export the types most integrations need so they don't have to memorize
// the module hierarchy.
pub use auth::{AuthError, AuthResult, AuthService, IdentityResolver, TokenIssuer, TokenPair};
pub use challenge::{AuthChallenge, ChallengeStore, InMemoryChallengeStore, StoreError, TimeoutStore};
pub use codec::keys::{KeyCodec, NostrKeyPair, PublicKeyRef};
pub use codec::FormatError;
pub use crypto::curve::Secp256k1;
pub use event::NostrEvent;
