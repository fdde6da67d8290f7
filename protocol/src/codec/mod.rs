//! # Key & Address Codecs
//!
//! Everything that turns key material into strings and back: the bech32
//! codec (hand-implemented, because the byte-exact checksum algorithm is
//! part of this protocol's interoperability surface) and the npub/nsec key
//! codec layered on top of it.

pub mod bech32;
pub mod keys;

use thiserror::Error;

/// Errors produced while parsing or encoding key material.
///
/// These are permanent, non-retryable failures surfaced synchronously to
/// the immediate caller. They describe the *shape* of the input only; no
/// key bytes ever appear in a message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// The bech32 string length is outside the allowed [8, 90] range.
    #[error("bech32 length {0} outside the allowed range [8, 90]")]
    InvalidLength(usize),

    /// The string mixes upper- and lower-case characters. BIP-173 allows
    /// all-upper or all-lower, never both.
    #[error("mixed-case bech32 string")]
    MixedCase,

    /// The `1` separator is missing, leading, or leaves fewer than six
    /// characters (the checksum) after it.
    #[error("bech32 separator missing or misplaced")]
    InvalidSeparator,

    /// A data character is not part of the bech32 charset.
    #[error("invalid character {0:?} in bech32 string")]
    InvalidCharacter(char),

    /// The six checksum symbols do not match the payload.
    #[error("bech32 checksum mismatch")]
    ChecksumMismatch,

    /// A 5-bit group exceeds its bit width, or unpadded conversion left
    /// non-canonical trailing bits.
    #[error("non-canonical padding in base conversion")]
    InvalidPadding,

    /// A value handed to the encoder does not fit in 5 bits.
    #[error("data value {0} exceeds 5 bits")]
    InvalidDataValue(u8),

    /// The human-readable part is empty or contains out-of-range characters.
    #[error("invalid human-readable part")]
    InvalidHrp,

    /// The decoded HRP does not match the expected key prefix.
    #[error("wrong prefix: expected {expected:?}, got {got:?}")]
    WrongHrp {
        /// The prefix required by the caller.
        expected: String,
        /// The prefix actually decoded.
        got: String,
    },

    /// The decoded payload is not exactly 32 bytes.
    #[error("key payload must be 32 bytes, got {0}")]
    InvalidPayloadLength(usize),

    /// The input is not a hex string of the required length.
    #[error("{context} must be {expected} hexadecimal characters")]
    InvalidHex {
        /// What the caller was parsing ("public key", "signature", ...).
        context: &'static str,
        /// Required character count.
        expected: usize,
    },

    /// A secret scalar is zero or not below the curve order.
    #[error("scalar outside the valid range [1, n-1]")]
    ScalarOutOfRange,
}
