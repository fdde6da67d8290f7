//! # Cryptographic Primitives
//!
//! The verification stack, bottom to top: 256-bit modular arithmetic
//! ([`field`]), affine secp256k1 point operations ([`curve`]), and BIP340
//! Schnorr signatures ([`schnorr`]). Hand-implemented because byte-exact
//! BIP340 semantics (x-only keys, even-y lifting, tagged hashes) are part of
//! this protocol's interoperability contract with Nostr signers.

pub mod curve;
pub mod field;
pub mod schnorr;

pub use curve::{Point, Secp256k1};
pub use field::U256;
pub use schnorr::{sign, tagged_hash, verify, SignError};
