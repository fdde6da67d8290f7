//! # Nostr Key Codec
//!
//! Conversion between the three forms a Nostr key travels in: raw 32-byte
//! material, lowercase hex, and the bech32 `npub`/`nsec` human-readable
//! encoding. Hex is the canonical internal form; bech32 exists for humans
//! and is normalized away at the API boundary.
//!
//! Also home to key generation: uniformly sampled secp256k1 scalars from the
//! operating system RNG, rejection-sampled into `[1, n-1]`.

use std::fmt;
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::codec::{bech32, FormatError};
use crate::config::{
    HRP_PUBLIC_KEY, HRP_SECRET_KEY, PUBLIC_KEY_HEX_LENGTH, PUBLIC_KEY_LENGTH,
    SECRET_KEY_LENGTH,
};
use crate::crypto::curve::Secp256k1;
use crate::crypto::field;

/// A freshly generated keypair in every encoding a caller might need.
///
/// `Debug` deliberately omits the secret material; a keypair that ends up in
/// a log line must never take the signing key with it.
#[derive(Clone, PartialEq, Eq)]
pub struct NostrKeyPair {
    /// X-only public key, lowercase hex.
    pub public_key_hex: String,
    /// Secret scalar, lowercase hex.
    pub secret_key_hex: String,
    /// Public key in bech32 `npub` form.
    pub npub: String,
    /// Secret key in bech32 `nsec` form.
    pub nsec: String,
}

impl fmt::Debug for NostrKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NostrKeyPair")
            .field("public_key_hex", &self.public_key_hex)
            .field("npub", &self.npub)
            .field("secret_key_hex", &"<redacted>")
            .field("nsec", &"<redacted>")
            .finish()
    }
}

/// A public key as it arrives from the outside world: either canonical hex
/// or bech32. Classified once at ingestion so the rest of the pipeline only
/// ever sees canonical hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyRef {
    /// 64 hexadecimal characters.
    Hex(String),
    /// An `npub1...` bech32 string.
    Npub(String),
}

impl PublicKeyRef {
    /// Classify a raw input string by shape. No validation happens here;
    /// [`KeyCodec::canonical_hex`] does the real parsing.
    pub fn classify(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.to_lowercase().starts_with(HRP_PUBLIC_KEY) {
            PublicKeyRef::Npub(trimmed.to_string())
        } else {
            PublicKeyRef::Hex(trimmed.to_string())
        }
    }
}

/// Key conversion and generation against an explicit curve.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    curve: Arc<Secp256k1>,
}

impl KeyCodec {
    pub fn new(curve: Arc<Secp256k1>) -> Self {
        KeyCodec { curve }
    }

    /// Generate a fresh keypair from the operating system RNG.
    ///
    /// The secret scalar is rejection-sampled into `[1, n-1]`; a sample of
    /// zero or at least the group order is discarded and redrawn, never
    /// reduced, so the distribution stays uniform.
    pub fn generate(&self) -> NostrKeyPair {
        let mut bytes = [0u8; SECRET_KEY_LENGTH];
        let secret = loop {
            OsRng.fill_bytes(&mut bytes);
            let candidate = field::from_be_bytes(&bytes);
            if !candidate.is_zero() && candidate < self.curve.n {
                break candidate;
            }
        };

        let point = self.curve.mul_g(&secret);
        let x = point.x().unwrap_or(&self.curve.p);
        let public_bytes = field::to_be_bytes(x);

        let public_key_hex = hex::encode(public_bytes);
        let secret_key_hex = hex::encode(bytes);
        let npub = bech32::encode_bytes(HRP_PUBLIC_KEY, &public_bytes)
            .expect("32-byte payload always encodes");
        let nsec = bech32::encode_bytes(HRP_SECRET_KEY, &bytes)
            .expect("32-byte payload always encodes");

        NostrKeyPair {
            public_key_hex,
            secret_key_hex,
            npub,
            nsec,
        }
    }

    /// Derive the x-only public key (lowercase hex) from a hex secret key.
    pub fn derive_public_key(&self, secret_key_hex: &str) -> Result<String, FormatError> {
        let bytes = decode_hex32(secret_key_hex, "secret key")?;
        let secret = field::from_be_bytes(&bytes);
        if secret.is_zero() || secret >= self.curve.n {
            return Err(FormatError::ScalarOutOfRange);
        }
        let point = self.curve.mul_g(&secret);
        let x = point.x().ok_or(FormatError::ScalarOutOfRange)?;
        Ok(hex::encode(field::to_be_bytes(x)))
    }

    /// Convert a hex public key to `npub` form.
    pub fn hex_to_npub(&self, public_key_hex: &str) -> Result<String, FormatError> {
        let bytes = decode_hex32(public_key_hex, "public key")?;
        bech32::encode_bytes(HRP_PUBLIC_KEY, &bytes)
    }

    /// Convert an `npub` string to canonical lowercase hex. Also accepts a
    /// key already in hex, which is validated and lowercased, so callers
    /// can ingest either wire form through one path.
    pub fn npub_to_hex(&self, input: &str) -> Result<String, FormatError> {
        let trimmed = input.trim();
        if is_plain_hex(trimmed) {
            let bytes = decode_hex32(trimmed, "public key")?;
            return Ok(hex::encode(bytes));
        }
        decode_key(trimmed, HRP_PUBLIC_KEY)
    }

    /// Convert a hex secret key to `nsec` form.
    pub fn hex_to_nsec(&self, secret_key_hex: &str) -> Result<String, FormatError> {
        let bytes = decode_hex32(secret_key_hex, "secret key")?;
        bech32::encode_bytes(HRP_SECRET_KEY, &bytes)
    }

    /// Convert an `nsec` string to canonical lowercase hex. Accepts hex
    /// passthrough the same way [`npub_to_hex`](Self::npub_to_hex) does.
    pub fn nsec_to_hex(&self, input: &str) -> Result<String, FormatError> {
        let trimmed = input.trim();
        if is_plain_hex(trimmed) {
            let bytes = decode_hex32(trimmed, "secret key")?;
            return Ok(hex::encode(bytes));
        }
        decode_key(trimmed, HRP_SECRET_KEY)
    }

    /// Normalize either public key form to canonical lowercase hex and
    /// check that it names a point on the curve.
    pub fn canonical_hex(&self, key: &PublicKeyRef) -> Result<String, FormatError> {
        let hex_form = match key {
            PublicKeyRef::Hex(h) => {
                decode_hex32(h, "public key")?;
                h.to_lowercase()
            }
            PublicKeyRef::Npub(npub) => self.npub_to_hex(npub)?,
        };

        let bytes = decode_hex32(&hex_form, "public key")?;
        let x = field::from_be_bytes(&bytes);
        if self.curve.lift_x(&x).is_none() {
            return Err(FormatError::ScalarOutOfRange);
        }
        Ok(hex_form)
    }

    /// True if the input is a well-formed public key in either wire form:
    /// 64 hex characters, or a decodable `npub` carrying a 32-byte payload.
    ///
    /// A shape check only. Whether the x coordinate actually names a curve
    /// point is decided by [`canonical_hex`](Self::canonical_hex) when the
    /// key enters the signing pipeline. Never errors: malformed input is
    /// simply invalid.
    pub fn is_valid_public_key(&self, input: &str) -> bool {
        self.npub_to_hex(input).is_ok()
    }

    /// True if the input is a well-formed secret key in either wire form:
    /// 64 hex characters, or a decodable `nsec` carrying a 32-byte payload.
    ///
    /// A shape check only; [`derive_public_key`](Self::derive_public_key)
    /// enforces the `[1, n-1]` scalar range.
    pub fn is_valid_secret_key(&self, input: &str) -> bool {
        self.nsec_to_hex(input).is_ok()
    }
}

/// True for a string that can only be a raw hex key, never bech32 (the
/// `npub`/`nsec` prefixes contain non-hex characters).
fn is_plain_hex(input: &str) -> bool {
    input.len() == PUBLIC_KEY_HEX_LENGTH && input.chars().all(|c| c.is_ascii_hexdigit())
}

/// Decode a bech32 key under the expected prefix into lowercase hex.
fn decode_key(encoded: &str, expected_hrp: &str) -> Result<String, FormatError> {
    let (hrp, bytes) = bech32::decode_bytes(encoded)?;
    if hrp != expected_hrp {
        return Err(FormatError::WrongHrp {
            expected: expected_hrp.to_string(),
            got: hrp,
        });
    }
    if bytes.len() != PUBLIC_KEY_LENGTH {
        return Err(FormatError::InvalidPayloadLength(bytes.len()));
    }
    Ok(hex::encode(bytes))
}

/// Decode exactly 32 bytes of hex, upper- or lower-case.
fn decode_hex32(input: &str, context: &'static str) -> Result<[u8; 32], FormatError> {
    let invalid = FormatError::InvalidHex {
        context,
        expected: PUBLIC_KEY_HEX_LENGTH,
    };
    if input.len() != PUBLIC_KEY_HEX_LENGTH {
        return Err(invalid);
    }
    let decoded = hex::decode(input).map_err(|_| FormatError::InvalidHex {
        context,
        expected: PUBLIC_KEY_HEX_LENGTH,
    })?;
    decoded.try_into().map_err(|_| FormatError::InvalidHex {
        context,
        expected: PUBLIC_KEY_HEX_LENGTH,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> KeyCodec {
        KeyCodec::new(Arc::new(Secp256k1::new()))
    }

    #[test]
    fn generated_keypairs_are_well_formed() {
        let codec = codec();
        let pair = codec.generate();
        assert_eq!(pair.public_key_hex.len(), 64);
        assert_eq!(pair.secret_key_hex.len(), 64);
        assert!(pair.npub.starts_with("npub1"));
        assert!(pair.nsec.starts_with("nsec1"));
        assert!(codec.is_valid_public_key(&pair.public_key_hex));
        assert!(codec.is_valid_secret_key(&pair.secret_key_hex));
    }

    #[test]
    fn derive_matches_bip340_vector() {
        // seckey 3 maps to the first published BIP340 test public key.
        let codec = codec();
        let secret = "0000000000000000000000000000000000000000000000000000000000000003";
        assert_eq!(
            codec.derive_public_key(secret).unwrap(),
            "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9"
        );
    }

    #[test]
    fn derive_rejects_out_of_range_scalars() {
        let codec = codec();
        let zero = "0".repeat(64);
        assert_eq!(
            codec.derive_public_key(&zero).unwrap_err(),
            FormatError::ScalarOutOfRange
        );
        // The group order itself is one past the largest valid scalar.
        let order = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
        assert_eq!(
            codec.derive_public_key(order).unwrap_err(),
            FormatError::ScalarOutOfRange
        );
    }

    #[test]
    fn npub_roundtrip() {
        let codec = codec();
        let pair = codec.generate();
        let npub = codec.hex_to_npub(&pair.public_key_hex).unwrap();
        assert_eq!(npub, pair.npub);
        assert_eq!(codec.npub_to_hex(&npub).unwrap(), pair.public_key_hex);
    }

    #[test]
    fn nsec_roundtrip() {
        let codec = codec();
        let pair = codec.generate();
        assert_eq!(codec.nsec_to_hex(&pair.nsec).unwrap(), pair.secret_key_hex);
    }

    #[test]
    fn to_hex_accepts_hex_passthrough() {
        let codec = codec();
        let pair = codec.generate();
        assert_eq!(
            codec.npub_to_hex(&pair.public_key_hex.to_uppercase()).unwrap(),
            pair.public_key_hex
        );
        assert_eq!(
            codec.nsec_to_hex(&pair.secret_key_hex).unwrap(),
            pair.secret_key_hex
        );
    }

    #[test]
    fn npub_to_hex_rejects_wrong_prefix() {
        let codec = codec();
        let pair = codec.generate();
        let err = codec.npub_to_hex(&pair.nsec).unwrap_err();
        assert_eq!(
            err,
            FormatError::WrongHrp {
                expected: "npub".to_string(),
                got: "nsec".to_string(),
            }
        );
    }

    #[test]
    fn uppercase_hex_is_accepted_and_lowercased() {
        let codec = codec();
        let pair = codec.generate();
        let upper = pair.public_key_hex.to_uppercase();
        let canonical = codec
            .canonical_hex(&PublicKeyRef::classify(&upper))
            .unwrap();
        assert_eq!(canonical, pair.public_key_hex);
    }

    #[test]
    fn canonical_hex_accepts_npub_form() {
        let codec = codec();
        let pair = codec.generate();
        let canonical = codec
            .canonical_hex(&PublicKeyRef::classify(&pair.npub))
            .unwrap();
        assert_eq!(canonical, pair.public_key_hex);
    }

    #[test]
    fn validity_predicates_check_shape_only() {
        // The published BIP340 "not a valid X coordinate" value is still
        // 64 well-formed hex characters, so the format predicate accepts
        // it; only canonical normalization cares about the curve.
        let codec = codec();
        let off_curve = "eefdea4cdb677750a420fee807eacf21eb9898ae79b9768766e4faa04a2d4a34";
        assert!(codec.is_valid_public_key(off_curve));

        // Likewise a zero secret is shaped like a key even though it can
        // never sign; the range check lives in derivation.
        let zero = "0".repeat(64);
        assert!(codec.is_valid_secret_key(&zero));
        assert!(codec.derive_public_key(&zero).is_err());
    }

    #[test]
    fn canonical_hex_rejects_off_curve_x() {
        let codec = codec();
        let off_curve = "eefdea4cdb677750a420fee807eacf21eb9898ae79b9768766e4faa04a2d4a34";
        assert_eq!(
            codec
                .canonical_hex(&PublicKeyRef::classify(off_curve))
                .unwrap_err(),
            FormatError::ScalarOutOfRange
        );
    }

    #[test]
    fn malformed_inputs_are_invalid_not_errors() {
        let codec = codec();
        for input in ["", "zz", "npub1", "nsec1qqqq", "0123", "g".repeat(64).as_str()] {
            assert!(!codec.is_valid_public_key(input), "input {input:?}");
            assert!(!codec.is_valid_secret_key(input), "input {input:?}");
        }
    }

    #[test]
    fn debug_redacts_secret_material() {
        let pair = codec().generate();
        let rendered = format!("{pair:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains(&pair.secret_key_hex));
        assert!(!rendered.contains(&pair.nsec));
    }

    #[test]
    fn classify_by_shape() {
        assert!(matches!(
            PublicKeyRef::classify(" npub1xyz "),
            PublicKeyRef::Npub(_)
        ));
        assert!(matches!(
            PublicKeyRef::classify("deadbeef"),
            PublicKeyRef::Hex(_)
        ));
    }
}
