//! # Session Tokens
//!
//! HS256 JWT issuance for authenticated keys. Two tokens per login: a
//! short-lived access token and a longer-lived refresh token, told apart by
//! the `typ` claim so a refresh token can never pass as an access token.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use nostrgate_protocol::auth::{AuthError, TokenIssuer, TokenPair};

/// Access token lifetime.
const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Refresh token lifetime.
const REFRESH_TOKEN_TTL_SECS: i64 = 30 * 24 * 3600;

/// Claim set carried by both token kinds.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The authenticated public key, canonical hex.
    pub sub: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
    /// Token kind: "access" or "refresh".
    pub typ: String,
}

/// HS256 token issuer.
pub struct JwtIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtIssuer {
    pub fn new(secret: &[u8]) -> Self {
        JwtIssuer {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    fn mint(&self, pubkey: &str, typ: &str, ttl_secs: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: pubkey.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl_secs)).timestamp(),
            typ: typ.to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Token(e.to_string()))
    }

    /// Validate a token of the expected kind and return its claims.
    pub fn verify(&self, token: &str, expected_typ: &str) -> Option<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default()).ok()?;
        if data.claims.typ != expected_typ {
            return None;
        }
        Some(data.claims)
    }
}

#[async_trait]
impl TokenIssuer for JwtIssuer {
    async fn issue(&self, public_key_hex: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.mint(public_key_hex, "access", ACCESS_TOKEN_TTL_SECS)?,
            refresh_token: self.mint(public_key_hex, "refresh", REFRESH_TOKEN_TTL_SECS)?,
        })
    }
}
