//! # Protocol Configuration & Constants
//!
//! Every magic number in the authentication protocol lives here. If you are
//! hardcoding `22242` or `300` somewhere else, stop and import it instead;
//! the login flow, the challenge store, and the tests all have to agree on
//! these values or interoperability with real Nostr clients breaks.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Nostr Protocol Identifiers
// ---------------------------------------------------------------------------

/// Event kind reserved for client authentication. Relays and clients treat
/// kind-22242 events as ephemeral auth payloads; any other kind is rejected
/// during structural validation.
pub const AUTH_EVENT_KIND: u32 = 22242;

/// Bech32 human-readable prefix for public keys.
pub const HRP_PUBLIC_KEY: &str = "npub";

/// Bech32 human-readable prefix for secret keys.
pub const HRP_SECRET_KEY: &str = "nsec";

// ---------------------------------------------------------------------------
// Key & Signature Material Sizes
// ---------------------------------------------------------------------------

/// X-only public key length in bytes. BIP340 drops the y parity byte, so a
/// public key is just the 32-byte x coordinate.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Secret key (scalar) length in bytes.
pub const SECRET_KEY_LENGTH: usize = 32;

/// BIP340 Schnorr signature length: 32 bytes of `r` followed by 32 of `s`.
pub const SIGNATURE_LENGTH: usize = 64;

/// Event identifier length: a SHA-256 digest of the canonical serialization.
pub const EVENT_ID_LENGTH: usize = 32;

/// Hex string lengths for the wire forms of the above.
pub const PUBLIC_KEY_HEX_LENGTH: usize = 64;
pub const SIGNATURE_HEX_LENGTH: usize = 128;
pub const EVENT_ID_HEX_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Bech32 Framing
// ---------------------------------------------------------------------------

/// Minimum total length of a bech32 string (hrp + separator + checksum).
pub const BECH32_MIN_LENGTH: usize = 8;

/// Maximum total length of a bech32 string per BIP-173.
pub const BECH32_MAX_LENGTH: usize = 90;

/// Number of 5-bit checksum symbols appended to every bech32 string.
pub const BECH32_CHECKSUM_LENGTH: usize = 6;

// ---------------------------------------------------------------------------
// Challenge Lifecycle
// ---------------------------------------------------------------------------

/// How long an issued challenge stays valid. After this window the challenge
/// is dead regardless of whether anyone tried to use it. The same window
/// bounds the accepted clock skew on the signed event's `created_at`.
pub const CHALLENGE_VALIDITY: Duration = Duration::from_secs(300);

/// Challenge validity in whole seconds, for timestamp arithmetic.
/// Keep in sync with [`CHALLENGE_VALIDITY`].
pub const CHALLENGE_VALIDITY_SECS: i64 = 300;

/// How often the in-memory store sweeps out expired challenges. The sweep is
/// housekeeping, not correctness: `consume` re-checks expiry on every call,
/// so a stale entry can never authenticate.
pub const CHALLENGE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Human-readable prefix baked into every challenge secret. The signed
/// event's content must contain `prefix + challenge id` verbatim.
pub const CHALLENGE_PREFIX: &str = "Strong Nostr authentication challenge: ";

/// Upper bound applied to calls into external (network-backed) challenge
/// stores. A store that cannot answer inside this window is treated as
/// "challenge invalid", never as "authenticated".
pub const STORE_CALL_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Serving Defaults
// ---------------------------------------------------------------------------

/// Default port for the authentication HTTP API.
pub const DEFAULT_API_PORT: u16 = 8470;

/// Crate version string, assembled at compile time.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");
