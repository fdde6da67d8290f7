//! # Authentication Protocol
//!
//! The orchestrating login pipeline. A login attempt is a challenge id plus
//! a signed kind-22242 event; the pipeline burns the challenge, validates
//! the event structurally and temporally, recomputes the canonical event
//! id, verifies the BIP340 signature, and only then talks to the identity
//! and token collaborators.
//!
//! Two rules shape everything here:
//!
//! 1. **Consume before verify.** The challenge is atomically taken out of
//!    the store as step one, so even a verification crash cannot leave a
//!    replayable challenge behind.
//! 2. **One failure message.** Every rejection, from a malformed event to a
//!    bad signature to a dead store backend, surfaces as the same generic
//!    message. The specific cause goes to the logs, never to the client.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::challenge::{AuthChallenge, ChallengeStore, StoreError};
use crate::codec::keys::{KeyCodec, PublicKeyRef};
use crate::config::{AUTH_EVENT_KIND, CHALLENGE_VALIDITY_SECS};
use crate::crypto::curve::Secp256k1;
use crate::crypto::schnorr;
use crate::event::NostrEvent;

/// The one message every rejected login receives.
const FAILURE_MESSAGE: &str = "Invalid or expired challenge";

/// Access and refresh tokens minted for an authenticated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Outcome of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub success: bool,
    /// Human-readable outcome. Generic on failure.
    pub message: String,
    /// Canonical hex public key, present on success only.
    pub pubkey: Option<String>,
    /// Session tokens, present on success only.
    pub tokens: Option<TokenPair>,
}

impl AuthResult {
    fn success(pubkey: String, tokens: TokenPair) -> Self {
        AuthResult {
            success: true,
            message: "Authentication successful".to_string(),
            pubkey: Some(pubkey),
            tokens: Some(tokens),
        }
    }

    fn failure() -> Self {
        AuthResult {
            success: false,
            message: FAILURE_MESSAGE.to_string(),
            pubkey: None,
            tokens: None,
        }
    }
}

/// Errors crossing the collaborator seams. Clients never see these; the
/// pipeline folds them into the generic failure.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("identity resolution failed: {0}")]
    Identity(String),

    #[error("token issuance failed: {0}")]
    Token(String),
}

/// Maps a verified public key to an application identity, creating one on
/// first contact if the deployment wants that.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, public_key_hex: &str) -> Result<(), AuthError>;
}

/// Mints session tokens for a verified public key.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue(&self, public_key_hex: &str) -> Result<TokenPair, AuthError>;
}

/// The authentication service: challenge issuance plus the login pipeline.
pub struct AuthService {
    curve: Arc<Secp256k1>,
    key_codec: KeyCodec,
    store: Arc<dyn ChallengeStore>,
    identities: Arc<dyn IdentityResolver>,
    tokens: Arc<dyn TokenIssuer>,
}

impl AuthService {
    pub fn new(
        curve: Arc<Secp256k1>,
        store: Arc<dyn ChallengeStore>,
        identities: Arc<dyn IdentityResolver>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        let key_codec = KeyCodec::new(Arc::clone(&curve));
        AuthService {
            curve,
            key_codec,
            store,
            identities,
            tokens,
        }
    }

    /// Issue and persist a fresh single-use challenge.
    pub async fn generate_challenge(&self) -> Result<AuthChallenge, AuthError> {
        let challenge = AuthChallenge::new();
        self.store.store(&challenge).await?;
        debug!(challenge_id = %challenge.id, "issued challenge");
        Ok(challenge)
    }

    /// Run the full login pipeline. Never errors: every failure mode,
    /// including collaborator outages, collapses into a failed
    /// [`AuthResult`] carrying the generic message.
    pub async fn login(&self, challenge_id: &str, event: &NostrEvent) -> AuthResult {
        // Step 1: burn the challenge first. Whatever happens after this
        // point, the challenge cannot be presented again.
        let secret = match self.store.consume(challenge_id).await {
            Ok(Some(secret)) => secret,
            Ok(None) => {
                debug!(challenge_id, "login with unknown, expired, or reused challenge");
                return AuthResult::failure();
            }
            Err(err) => {
                warn!(challenge_id, error = %err, "challenge store failure during login");
                return AuthResult::failure();
            }
        };

        // Step 2: structural validation.
        if let Err(reason) = structural_check(event) {
            debug!(challenge_id, reason, "login event failed structural validation");
            return AuthResult::failure();
        }

        // Step 3: freshness and challenge binding.
        let skew = (Utc::now().timestamp() - event.created_at).abs();
        if skew > CHALLENGE_VALIDITY_SECS {
            debug!(challenge_id, skew, "login event outside the freshness window");
            return AuthResult::failure();
        }
        if !event.content.contains(&secret) {
            debug!(challenge_id, "login event content does not carry the challenge");
            return AuthResult::failure();
        }

        // Step 4: the claimed id must be the canonical id. Anything else
        // means the signature below would cover different bytes than the
        // fields we validated.
        let canonical_id = event.compute_id();
        if event.id.to_lowercase() != canonical_id {
            debug!(challenge_id, "login event id is not canonical");
            return AuthResult::failure();
        }

        // Step 5: BIP340 signature over the event id.
        let (Ok(pubkey_bytes), Ok(id_bytes), Ok(sig_bytes)) = (
            hex::decode(event.pubkey.to_lowercase()),
            hex::decode(&canonical_id),
            hex::decode(event.sig.to_lowercase()),
        ) else {
            debug!(challenge_id, "login event carries non-hex material");
            return AuthResult::failure();
        };
        if !schnorr::verify(&self.curve, &pubkey_bytes, &id_bytes, &sig_bytes) {
            debug!(challenge_id, "login signature verification failed");
            return AuthResult::failure();
        }

        // Step 6: hand the verified key to the collaborators.
        let pubkey = match self
            .key_codec
            .canonical_hex(&PublicKeyRef::classify(&event.pubkey))
        {
            Ok(pubkey) => pubkey,
            Err(err) => {
                debug!(challenge_id, error = %err, "verified key failed canonicalization");
                return AuthResult::failure();
            }
        };
        if let Err(err) = self.identities.resolve(&pubkey).await {
            warn!(challenge_id, error = %err, "identity resolution failed");
            return AuthResult::failure();
        }
        let tokens = match self.tokens.issue(&pubkey).await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(challenge_id, error = %err, "token issuance failed");
                return AuthResult::failure();
            }
        };

        info!(challenge_id, "login succeeded");
        AuthResult::success(pubkey, tokens)
    }
}

/// Shape checks that need no cryptography. Returns the reason for the logs.
fn structural_check(event: &NostrEvent) -> Result<(), &'static str> {
    if event.kind != AUTH_EVENT_KIND {
        return Err("wrong event kind");
    }
    if event.pubkey.trim().is_empty() {
        return Err("blank pubkey");
    }
    if event.content.trim().is_empty() {
        return Err("blank content");
    }
    if event.sig.trim().is_empty() {
        return Err("blank signature");
    }
    if event.created_at <= 0 {
        return Err("non-positive created_at");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::InMemoryChallengeStore;
    use crate::crypto::field;

    struct OpenResolver;

    #[async_trait]
    impl IdentityResolver for OpenResolver {
        async fn resolve(&self, _public_key_hex: &str) -> Result<(), AuthError> {
            Ok(())
        }
    }

    struct RefusingResolver;

    #[async_trait]
    impl IdentityResolver for RefusingResolver {
        async fn resolve(&self, _public_key_hex: &str) -> Result<(), AuthError> {
            Err(AuthError::Identity("registry offline".to_string()))
        }
    }

    struct StaticIssuer;

    #[async_trait]
    impl TokenIssuer for StaticIssuer {
        async fn issue(&self, public_key_hex: &str) -> Result<TokenPair, AuthError> {
            Ok(TokenPair {
                access_token: format!("access-{public_key_hex}"),
                refresh_token: format!("refresh-{public_key_hex}"),
            })
        }
    }

    const TEST_SECRET_KEY: &str =
        "b7e151628aed2a6abf7158809cf4f3c762e7160f38b4da56a784d9045190cfef";

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(Secp256k1::new()),
            Arc::new(InMemoryChallengeStore::new()),
            Arc::new(OpenResolver),
            Arc::new(StaticIssuer),
        )
    }

    /// Build a fully signed login event the way a client-side signer would.
    fn signed_event(curve: &Secp256k1, secret_key_hex: &str, content: &str) -> NostrEvent {
        let sk: [u8; 32] = hex::decode(secret_key_hex).unwrap().try_into().unwrap();
        let d = field::from_be_bytes(&sk);
        let point = curve.mul_g(&d);
        let pubkey = hex::encode(field::to_be_bytes(point.x().unwrap()));

        let mut event = NostrEvent {
            id: String::new(),
            pubkey,
            created_at: Utc::now().timestamp(),
            kind: AUTH_EVENT_KIND,
            tags: Vec::new(),
            content: content.to_string(),
            sig: String::new(),
        };
        event.id = event.compute_id();

        let id_bytes: [u8; 32] = hex::decode(&event.id).unwrap().try_into().unwrap();
        let sig = schnorr::sign(curve, &sk, &id_bytes, &[7u8; 32]).unwrap();
        event.sig = hex::encode(sig);
        event
    }

    #[tokio::test]
    async fn full_login_roundtrip() {
        let service = service();
        let challenge = service.generate_challenge().await.unwrap();
        let event = signed_event(&service.curve, TEST_SECRET_KEY, &challenge.secret);

        let result = service.login(&challenge.id, &event).await;
        assert!(result.success, "login failed: {}", result.message);
        assert_eq!(result.pubkey.as_deref(), Some(event.pubkey.as_str()));
        let tokens = result.tokens.unwrap();
        assert!(tokens.access_token.starts_with("access-"));
        assert!(tokens.refresh_token.starts_with("refresh-"));
    }

    #[tokio::test]
    async fn replay_is_rejected() {
        let service = service();
        let challenge = service.generate_challenge().await.unwrap();
        let event = signed_event(&service.curve, TEST_SECRET_KEY, &challenge.secret);

        assert!(service.login(&challenge.id, &event).await.success);
        let replay = service.login(&challenge.id, &event).await;
        assert!(!replay.success);
        assert_eq!(replay.message, FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn tampered_signature_burns_the_challenge() {
        let service = service();
        let challenge = service.generate_challenge().await.unwrap();
        let good = signed_event(&service.curve, TEST_SECRET_KEY, &challenge.secret);

        let mut bad = good.clone();
        let mut sig = hex::decode(&bad.sig).unwrap();
        sig[0] ^= 0x01;
        bad.sig = hex::encode(sig);

        assert!(!service.login(&challenge.id, &bad).await.success);
        // The failed attempt consumed the challenge; even the genuine event
        // cannot use it now.
        assert!(!service.login(&challenge.id, &good).await.success);
    }

    #[tokio::test]
    async fn wrong_kind_is_rejected() {
        let service = service();
        let challenge = service.generate_challenge().await.unwrap();
        let mut event = signed_event(&service.curve, TEST_SECRET_KEY, &challenge.secret);
        event.kind = 1;
        // Re-canonicalize so only the kind check can fail.
        event.id = event.compute_id();

        let result = service.login(&challenge.id, &event).await;
        assert!(!result.success);
        assert_eq!(result.message, FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn content_without_the_challenge_is_rejected() {
        let service = service();
        let challenge = service.generate_challenge().await.unwrap();
        let event = signed_event(&service.curve, TEST_SECRET_KEY, "unrelated content");
        assert!(!service.login(&challenge.id, &event).await.success);
    }

    #[tokio::test]
    async fn stale_created_at_is_rejected() {
        let service = service();
        let challenge = service.generate_challenge().await.unwrap();

        let sk: [u8; 32] = hex::decode(TEST_SECRET_KEY).unwrap().try_into().unwrap();
        let d = field::from_be_bytes(&sk);
        let point = service.curve.mul_g(&d);
        let mut event = NostrEvent {
            id: String::new(),
            pubkey: hex::encode(field::to_be_bytes(point.x().unwrap())),
            created_at: Utc::now().timestamp() - CHALLENGE_VALIDITY_SECS - 10,
            kind: AUTH_EVENT_KIND,
            tags: Vec::new(),
            content: challenge.secret.clone(),
            sig: String::new(),
        };
        event.id = event.compute_id();
        let id_bytes: [u8; 32] = hex::decode(&event.id).unwrap().try_into().unwrap();
        event.sig = hex::encode(schnorr::sign(&service.curve, &sk, &id_bytes, &[0u8; 32]).unwrap());

        assert!(!service.login(&challenge.id, &event).await.success);
    }

    #[tokio::test]
    async fn non_canonical_id_is_rejected() {
        let service = service();
        let challenge = service.generate_challenge().await.unwrap();
        let mut event = signed_event(&service.curve, TEST_SECRET_KEY, &challenge.secret);
        // Claim an id the canonical bytes do not hash to.
        event.id = "0".repeat(64);
        assert!(!service.login(&challenge.id, &event).await.success);
    }

    #[tokio::test]
    async fn uppercase_hex_event_authenticates() {
        // Signers that emit uppercase hex are still interoperable; the
        // canonical id covers the lowercased pubkey.
        let service = service();
        let challenge = service.generate_challenge().await.unwrap();
        let mut event = signed_event(&service.curve, TEST_SECRET_KEY, &challenge.secret);
        event.pubkey = event.pubkey.to_uppercase();
        event.sig = event.sig.to_uppercase();
        event.id = event.id.to_uppercase();

        let result = service.login(&challenge.id, &event).await;
        assert!(result.success, "login failed: {}", result.message);
        // The resolved key is canonical lowercase regardless of wire casing.
        assert_eq!(result.pubkey.unwrap(), event.pubkey.to_lowercase());
    }

    #[tokio::test]
    async fn resolver_outage_fails_closed_with_generic_message() {
        let service = AuthService::new(
            Arc::new(Secp256k1::new()),
            Arc::new(InMemoryChallengeStore::new()),
            Arc::new(RefusingResolver),
            Arc::new(StaticIssuer),
        );
        let challenge = service.generate_challenge().await.unwrap();
        let event = signed_event(&service.curve, TEST_SECRET_KEY, &challenge.secret);

        let result = service.login(&challenge.id, &event).await;
        assert!(!result.success);
        assert_eq!(result.message, FAILURE_MESSAGE);
        assert!(result.tokens.is_none());
    }

    #[tokio::test]
    async fn blank_fields_are_rejected() {
        let service = service();
        for blank in ["pubkey", "content", "sig"] {
            let challenge = service.generate_challenge().await.unwrap();
            let mut event = signed_event(&service.curve, TEST_SECRET_KEY, &challenge.secret);
            match blank {
                "pubkey" => event.pubkey = "  ".to_string(),
                "content" => event.content = String::new(),
                _ => event.sig = String::new(),
            }
            assert!(
                !service.login(&challenge.id, &event).await.success,
                "blank {blank} accepted"
            );
        }
    }
}
