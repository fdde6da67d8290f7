//! # Bech32 Codec
//!
//! A from-scratch BIP-173 bech32 implementation. We deliberately do not
//! depend on an external bech32 crate here: the checksum algorithm, the
//! strict padding rules, and the exact rejection behavior are part of this
//! protocol's interoperability surface, and owning the implementation keeps
//! the whole surface auditable in one file.
//!
//! The format is `hrp + "1" + data + checksum`, where data and checksum are
//! drawn from a 32-character alphabet and the checksum is a 6-symbol BCH
//! code capable of detecting up to 4 character substitutions.

use crate::codec::FormatError;
use crate::config::{BECH32_CHECKSUM_LENGTH, BECH32_MAX_LENGTH, BECH32_MIN_LENGTH};

/// The bech32 alphabet. Position in the string is the symbol's 5-bit value.
/// Chosen by the BIP-173 authors to minimize transcription errors; the
/// ordering is load-bearing and must never change.
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Generator coefficients for the BCH checksum polymod.
const GENERATOR: [u32; 5] = [0x3b6a_57b2, 0x2650_8e6d, 0x1ea1_19fa, 0x3d42_33dd, 0x2a14_62b3];

/// A decoded bech32 string: the human-readable part plus the payload as
/// 5-bit values. The checksum has already been verified and stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bech32Data {
    /// Human-readable part, lowercased.
    pub hrp: String,
    /// Payload symbols, each in `0..32`. Never includes the checksum.
    pub values: Vec<u8>,
}

/// Encode 5-bit values under the given human-readable part.
///
/// The HRP must be non-empty ASCII in the visible range; each value must
/// fit in 5 bits. Output is always lowercase.
pub fn encode(hrp: &str, values: &[u8]) -> Result<String, FormatError> {
    validate_hrp(hrp)?;
    if let Some(&v) = values.iter().find(|&&v| v >= 32) {
        return Err(FormatError::InvalidDataValue(v));
    }

    let checksum = create_checksum(hrp, values);

    let mut out = String::with_capacity(hrp.len() + 1 + values.len() + BECH32_CHECKSUM_LENGTH);
    out.push_str(hrp);
    out.push('1');
    for &v in values.iter().chain(checksum.iter()) {
        out.push(CHARSET[v as usize] as char);
    }
    Ok(out)
}

/// Decode a bech32 string, verifying the checksum.
///
/// Decoding is case-insensitive but rejects strings that mix cases, since
/// a mixed-case string can silently carry a transcription error the
/// checksum was never computed over.
pub fn decode(s: &str) -> Result<Bech32Data, FormatError> {
    if s.len() < BECH32_MIN_LENGTH || s.len() > BECH32_MAX_LENGTH {
        return Err(FormatError::InvalidLength(s.len()));
    }

    let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        return Err(FormatError::MixedCase);
    }
    let s = s.to_lowercase();

    // The separator is the LAST '1': the HRP itself may contain '1'.
    let sep = s.rfind('1').ok_or(FormatError::InvalidSeparator)?;
    if sep == 0 || sep + 1 + BECH32_CHECKSUM_LENGTH > s.len() {
        return Err(FormatError::InvalidSeparator);
    }

    let hrp = &s[..sep];
    validate_hrp(hrp)?;

    let mut values = Vec::with_capacity(s.len() - sep - 1);
    for c in s[sep + 1..].chars() {
        let idx = CHARSET
            .iter()
            .position(|&b| b as char == c)
            .ok_or(FormatError::InvalidCharacter(c))?;
        values.push(idx as u8);
    }

    if !verify_checksum(hrp, &values) {
        return Err(FormatError::ChecksumMismatch);
    }

    values.truncate(values.len() - BECH32_CHECKSUM_LENGTH);
    Ok(Bech32Data {
        hrp: hrp.to_string(),
        values,
    })
}

/// Regroup a byte stream between bit widths.
///
/// Converting 8-bit bytes to 5-bit symbols uses `pad = true` (a final
/// partial group is zero-padded). Converting back uses `pad = false`,
/// which strictly rejects non-canonical padding: leftover bits must be
/// fewer than `from` and must all be zero, otherwise two distinct strings
/// could decode to the same payload.
pub fn convert_bits(data: &[u8], from: u32, to: u32, pad: bool) -> Result<Vec<u8>, FormatError> {
    debug_assert!(from <= 8 && to <= 8, "bit widths above 8 are unsupported");

    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let maxv: u32 = (1 << to) - 1;
    let mut out = Vec::with_capacity(data.len() * from as usize / to as usize + 1);

    for &b in data {
        let v = b as u32;
        if v >> from != 0 {
            return Err(FormatError::InvalidPadding);
        }
        acc = (acc << from) | v;
        bits += from;
        while bits >= to {
            bits -= to;
            out.push(((acc >> bits) & maxv) as u8);
        }
    }

    if pad {
        if bits > 0 {
            out.push(((acc << (to - bits)) & maxv) as u8);
        }
    } else if bits >= from || ((acc << (to - bits)) & maxv) != 0 {
        return Err(FormatError::InvalidPadding);
    }

    Ok(out)
}

/// Convenience: encode raw bytes (regrouped to 5-bit symbols) under `hrp`.
pub fn encode_bytes(hrp: &str, bytes: &[u8]) -> Result<String, FormatError> {
    let values = convert_bits(bytes, 8, 5, true)?;
    encode(hrp, &values)
}

/// Convenience: decode a bech32 string and regroup the payload into bytes.
pub fn decode_bytes(s: &str) -> Result<(String, Vec<u8>), FormatError> {
    let data = decode(s)?;
    let bytes = convert_bits(&data.values, 5, 8, false)?;
    Ok((data.hrp, bytes))
}

fn validate_hrp(hrp: &str) -> Result<(), FormatError> {
    if hrp.is_empty() || !hrp.bytes().all(|b| (33..=126).contains(&b)) {
        return Err(FormatError::InvalidHrp);
    }
    Ok(())
}

/// The BCH checksum fold. Processes one 5-bit symbol per step, carrying a
/// 30-bit state and mixing in the generator coefficients selected by the
/// bits shifted out of the top.
fn polymod(values: impl IntoIterator<Item = u8>) -> u32 {
    let mut chk: u32 = 1;
    for v in values {
        let top = chk >> 25;
        chk = ((chk & 0x01ff_ffff) << 5) ^ v as u32;
        for (i, &g) in GENERATOR.iter().enumerate() {
            if (top >> i) & 1 != 0 {
                chk ^= g;
            }
        }
    }
    chk
}

/// Expand the HRP for checksumming: high bits of each character, a zero
/// separator, then the low bits.
fn hrp_expand(hrp: &str) -> impl Iterator<Item = u8> + '_ {
    hrp.bytes()
        .map(|b| b >> 5)
        .chain(std::iter::once(0))
        .chain(hrp.bytes().map(|b| b & 31))
}

fn create_checksum(hrp: &str, values: &[u8]) -> [u8; BECH32_CHECKSUM_LENGTH] {
    let stream = hrp_expand(hrp)
        .chain(values.iter().copied())
        .chain(std::iter::repeat(0).take(BECH32_CHECKSUM_LENGTH));
    let pm = polymod(stream) ^ 1;

    let mut checksum = [0u8; BECH32_CHECKSUM_LENGTH];
    for (i, c) in checksum.iter_mut().enumerate() {
        *c = ((pm >> (5 * (5 - i))) & 31) as u8;
    }
    checksum
}

fn verify_checksum(hrp: &str, values_with_checksum: &[u8]) -> bool {
    polymod(hrp_expand(hrp).chain(values_with_checksum.iter().copied())) == 1
}
