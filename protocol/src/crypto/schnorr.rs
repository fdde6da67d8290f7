//! # BIP340 Schnorr Signatures
//!
//! Verification (the server's job) and deterministic signing (used by key
//! tooling and the test suite to mint its own vectors). Both sides share
//! the tagged-hash construction and the x-only / even-y key convention, so
//! the `lift_x` in [`crate::crypto::curve`] and the key derivation in
//! [`crate::codec::keys`] must stay in agreement; a parity mismatch between
//! them makes every signature invalid.
//!
//! Verification never returns an error. Malformed lengths, out-of-range
//! scalars, off-curve keys, and plain mismatches all collapse to `false`,
//! so callers cannot use the failure mode as an oracle.

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use crate::crypto::curve::{Point, Secp256k1};
use crate::crypto::field::{self, U256};

/// Tag for the BIP340 challenge hash.
const TAG_CHALLENGE: &str = "BIP0340/challenge";

/// Tag for the BIP340 auxiliary-randomness hash (signing only).
const TAG_AUX: &str = "BIP0340/aux";

/// Tag for the BIP340 nonce hash (signing only).
const TAG_NONCE: &str = "BIP0340/nonce";

/// Errors from the signing path. Verification never errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignError {
    /// The secret scalar is zero or not below the curve order.
    #[error("secret key outside the valid range [1, n-1]")]
    SecretKeyOutOfRange,

    /// The derived nonce reduced to zero.
    #[error("derived nonce is zero")]
    BadNonce,
}

/// The BIP340 tagged hash: `SHA256(SHA256(tag) ‖ SHA256(tag) ‖ data)`.
///
/// The doubled tag digest pads the prefix to a full compression-function
/// block and domain-separates the protocol's hash uses from each other.
pub fn tagged_hash(tag: &str, parts: &[&[u8]]) -> [u8; 32] {
    let tag_digest = Sha256::digest(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_digest);
    hasher.update(tag_digest);
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Verify a BIP340 Schnorr signature.
///
/// * `pubkey` - 32-byte x-only public key.
/// * `message` - the signed message; for event authentication this is the
///   32-byte event id.
/// * `signature` - 64 bytes, `r ‖ s` big-endian.
///
/// Returns `true` only when every check passes:
/// lengths, `0 < r < p`, `0 < s < n`, the key lifts to a curve point, and
/// `R = s·G - e·P` is finite with even y and `R.x == r`.
pub fn verify(curve: &Secp256k1, pubkey: &[u8], message: &[u8], signature: &[u8]) -> bool {
    if pubkey.len() != PUBLIC_KEY_LENGTH || signature.len() != SIGNATURE_LENGTH {
        return false;
    }

    let r_bytes: [u8; 32] = signature[..32].try_into().expect("checked length");
    let s_bytes: [u8; 32] = signature[32..].try_into().expect("checked length");
    let pk_bytes: [u8; 32] = pubkey.try_into().expect("checked length");

    let r = field::from_be_bytes(&r_bytes);
    let s = field::from_be_bytes(&s_bytes);
    if r.is_zero() || r >= curve.p || s.is_zero() || s >= curve.n {
        return false;
    }

    let pk_x = field::from_be_bytes(&pk_bytes);
    let p = match curve.lift_x(&pk_x) {
        Some(point) => point,
        None => return false,
    };

    // e = H_tag(r ‖ P.x ‖ m) mod n. The challenge binds the nonce, the key,
    // and the message; truncating any component would re-open the
    // related-key forgeries BIP340 closed.
    let e = challenge_scalar(curve, &r_bytes, &pk_bytes, message);

    // R = s·G - e·P
    let s_g = curve.mul_g(&s);
    let e_p = curve.mul(&p, &e);
    let r_point = curve.add(&s_g, &curve.negate(&e_p));

    !r_point.is_infinity() && r_point.has_even_y() && r_point.x() == Some(&r)
}

/// Produce a BIP340 signature over `message` with the default nonce
/// derivation (auxiliary randomness mixed into the secret via the tagged
/// aux hash).
pub fn sign(
    curve: &Secp256k1,
    secret_key: &[u8; 32],
    message: &[u8; 32],
    aux_rand: &[u8; 32],
) -> Result<[u8; 64], SignError> {
    let d_prime = field::from_be_bytes(secret_key);
    if d_prime.is_zero() || d_prime >= curve.n {
        return Err(SignError::SecretKeyOutOfRange);
    }

    let p = curve.mul_g(&d_prime);
    // Work with the secret for the even-y representative of P, matching
    // what lift_x will reconstruct on the verifying side.
    let d = if p.has_even_y() {
        d_prime
    } else {
        curve.n - d_prime
    };
    let px_bytes = field::to_be_bytes(p.x().expect("d in [1, n-1] cannot yield infinity"));

    let mut t = field::to_be_bytes(&d);
    let aux_digest = tagged_hash(TAG_AUX, &[aux_rand]);
    for (byte, mask) in t.iter_mut().zip(aux_digest.iter()) {
        *byte ^= mask;
    }

    let rand = tagged_hash(TAG_NONCE, &[&t, &px_bytes, message]);
    let k_prime = reduce_mod_n(curve, &rand);
    if k_prime.is_zero() {
        return Err(SignError::BadNonce);
    }

    let r_point = curve.mul_g(&k_prime);
    let k = if r_point.has_even_y() {
        k_prime
    } else {
        curve.n - k_prime
    };
    let rx_bytes = field::to_be_bytes(r_point.x().expect("non-zero nonce"));

    let e = challenge_scalar(curve, &rx_bytes, &px_bytes, message);
    let s = field::add_mod(&k, &field::mul_mod(&e, &d, &curve.n), &curve.n);

    let mut signature = [0u8; 64];
    signature[..32].copy_from_slice(&rx_bytes);
    signature[32..].copy_from_slice(&field::to_be_bytes(&s));
    Ok(signature)
}

fn challenge_scalar(curve: &Secp256k1, r: &[u8; 32], px: &[u8; 32], message: &[u8]) -> U256 {
    let digest = tagged_hash(TAG_CHALLENGE, &[r, px, message]);
    reduce_mod_n(curve, &digest)
}

fn reduce_mod_n(curve: &Secp256k1, bytes: &[u8; 32]) -> U256 {
    field::from_be_bytes(bytes) % curve.n
}
