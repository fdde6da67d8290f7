//! # Nostr Events
//!
//! The NIP-01 event structure and its canonical serialization. The event id
//! is the SHA-256 of a byte-exact JSON array, so the serialization here is
//! built by hand rather than delegated to a generic JSON serializer: the
//! escaping rules are fixed by the protocol, and a serializer that escaped
//! one extra character would change every id we compute.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A Nostr event as it arrives on the wire.
///
/// All fields are owned strings in their wire form; validation and
/// canonicalization happen in the authentication pipeline, not in the type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NostrEvent {
    /// Event id: lowercase hex SHA-256 of the canonical serialization.
    #[serde(default)]
    pub id: String,
    /// Author public key, x-only, hex.
    #[serde(default)]
    pub pubkey: String,
    /// Unix timestamp (seconds) claimed by the author.
    #[serde(default)]
    pub created_at: i64,
    /// Event kind. Authentication uses kind 22242.
    #[serde(default)]
    pub kind: u32,
    /// Arbitrary string-matrix tags.
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    /// Free-form content; carries the challenge text during authentication.
    #[serde(default)]
    pub content: String,
    /// BIP340 signature over the id, hex.
    #[serde(default)]
    pub sig: String,
}

impl NostrEvent {
    /// The canonical NIP-01 serialization:
    ///
    /// ```text
    /// [0,"<pubkey>",<created_at>,<kind>,<tags>,"<content>"]
    /// ```
    ///
    /// The pubkey is lowercased; strings escape exactly backslash, double
    /// quote, newline, carriage return, and tab, and nothing else. Every
    /// byte here is load-bearing: two implementations that disagree on even
    /// one escape produce different event ids.
    pub fn canonical_serialization(&self) -> String {
        let mut out = String::with_capacity(64 + self.content.len());
        out.push_str("[0,\"");
        escape_into(&self.pubkey.to_lowercase(), &mut out);
        out.push_str("\",");
        out.push_str(&self.created_at.to_string());
        out.push(',');
        out.push_str(&self.kind.to_string());
        out.push(',');
        serialize_tags(&self.tags, &mut out);
        out.push_str(",\"");
        escape_into(&self.content, &mut out);
        out.push_str("\"]");
        out
    }

    /// Compute the event id: lowercase hex SHA-256 of the canonical bytes.
    pub fn compute_id(&self) -> String {
        let digest = Sha256::digest(self.canonical_serialization().as_bytes());
        hex::encode(digest)
    }

    /// True if the `id` field matches the recomputed canonical id.
    pub fn id_is_canonical(&self) -> bool {
        self.id == self.compute_id()
    }
}

fn serialize_tags(tags: &[Vec<String>], out: &mut String) {
    out.push('[');
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('[');
        for (j, value) in tag.iter().enumerate() {
            if j > 0 {
                out.push(',');
            }
            out.push('"');
            escape_into(value, out);
            out.push('"');
        }
        out.push(']');
    }
    out.push(']');
}

/// The NIP-01 escape set. Exactly these five characters and no others; in
/// particular, other control characters pass through verbatim.
fn escape_into(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
}
