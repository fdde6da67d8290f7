//! # 256-bit Modular Arithmetic
//!
//! The arithmetic substrate for the secp256k1 point operations: addition,
//! subtraction, multiplication, exponentiation, and inversion modulo a
//! 256-bit prime. Products are widened to 512 bits before reduction, so no
//! intermediate ever wraps.
//!
//! This is verification-side math. It runs only on public inputs (points,
//! signatures, message digests), so we do not attempt constant-time
//! execution here; the one secret-scalar consumer (key generation) leaks
//! nothing useful through timing because the scalar is used exactly once
//! per freshly generated key.

use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer. Field elements and curve scalars.
    pub struct U256(4);
}

construct_uint! {
    /// 512-bit unsigned integer. Intermediate products before reduction.
    pub struct U512(8);
}

/// Serialize to 32 big-endian bytes.
pub fn to_be_bytes(v: &U256) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[0..8].copy_from_slice(&v.0[3].to_be_bytes());
    bytes[8..16].copy_from_slice(&v.0[2].to_be_bytes());
    bytes[16..24].copy_from_slice(&v.0[1].to_be_bytes());
    bytes[24..32].copy_from_slice(&v.0[0].to_be_bytes());
    bytes
}

/// Deserialize from 32 big-endian bytes.
pub fn from_be_bytes(bytes: &[u8; 32]) -> U256 {
    U256([
        u64::from_be_bytes(bytes[24..32].try_into().expect("8-byte slice")),
        u64::from_be_bytes(bytes[16..24].try_into().expect("8-byte slice")),
        u64::from_be_bytes(bytes[8..16].try_into().expect("8-byte slice")),
        u64::from_be_bytes(bytes[0..8].try_into().expect("8-byte slice")),
    ])
}

fn widen(v: &U256) -> U512 {
    U512([v.0[0], v.0[1], v.0[2], v.0[3], 0, 0, 0, 0])
}

fn narrow(v: &U512) -> U256 {
    debug_assert!(v.0[4..].iter().all(|&limb| limb == 0), "narrowing overflow");
    U256([v.0[0], v.0[1], v.0[2], v.0[3]])
}

/// `(a + b) mod m`. Inputs need not be reduced.
pub fn add_mod(a: &U256, b: &U256, m: &U256) -> U256 {
    let sum = widen(a) + widen(b);
    narrow(&(sum % widen(m)))
}

/// `(a - b) mod m`. Inputs must already be reduced below `m`.
pub fn sub_mod(a: &U256, b: &U256, m: &U256) -> U256 {
    if a >= b {
        *a - *b
    } else {
        *m - (*b - *a)
    }
}

/// `(a * b) mod m` via a 512-bit intermediate product.
pub fn mul_mod(a: &U256, b: &U256, m: &U256) -> U256 {
    let product = widen(a) * widen(b);
    narrow(&(product % widen(m)))
}

/// `base^exp mod m` by square-and-multiply over the bits of `exp`.
pub fn pow_mod(base: &U256, exp: &U256, m: &U256) -> U256 {
    let mut result = U256::one();
    let mut acc = *base % *m;
    // Walk every bit from least significant; squaring carries the weight.
    for i in 0..256 {
        if exp.bit(i) {
            result = mul_mod(&result, &acc, m);
        }
        acc = mul_mod(&acc, &acc, m);
    }
    result
}

/// Modular inverse by Fermat's little theorem: `a^(m-2) mod m`.
/// Requires `m` prime and `a` non-zero mod `m`; returns zero for zero input,
/// which callers must treat as "no inverse".
pub fn inv_mod(a: &U256, m: &U256) -> U256 {
    pow_mod(a, &(*m - U256::from(2u64)), m)
}
