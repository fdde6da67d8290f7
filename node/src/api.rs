//! # Authentication HTTP API
//!
//! Builds the axum router that exposes the node's HTTP interface. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                     | Description                        |
//! |--------|--------------------------|------------------------------------|
//! | POST   | `/api/v1/auth/challenge` | Issue a single-use login challenge |
//! | POST   | `/api/v1/auth/login`     | Verify a signed event, mint tokens |
//! | GET    | `/health`                | Liveness probe                     |

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use nostrgate_protocol::auth::AuthService;
use nostrgate_protocol::event::NostrEvent;

use crate::identity::{IdentityRegistry, ProfileUpdate, UserProfile};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone, everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The authentication pipeline.
    pub auth: Arc<AuthService>,
    /// User registry, shared with the pipeline's identity resolver.
    pub identities: Arc<IdentityRegistry>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes and request tracing.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/auth/challenge", post(challenge_handler))
        .route("/api/v1/auth/login", post(login_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

/// Response payload for `POST /api/v1/auth/challenge`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    /// Opaque challenge identifier, echoed back in the login request.
    pub challenge_id: String,
    /// The full text the client must embed in its signed event's content.
    pub challenge: String,
    /// Issue timestamp, Unix milliseconds.
    pub issued_at_millis: i64,
}

/// Request payload for `POST /api/v1/auth/login`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// The signed kind-22242 event.
    pub nostr_event: NostrEvent,
    /// The challenge being answered.
    pub challenge_id: String,
    /// Optional profile fields to merge on success.
    #[serde(default)]
    pub user_profile: Option<ProfileUpdate>,
}

/// Response payload for `POST /api/v1/auth/login`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<UserProfile>,
}

/// Generic error body returned on non-auth failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /api/v1/auth/challenge` — issue a fresh single-use challenge.
///
/// A store outage maps to 503; clients retry, nothing leaks.
async fn challenge_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.auth.generate_challenge().await {
        Ok(challenge) => (
            StatusCode::OK,
            Json(serde_json::json!(ChallengeResponse {
                challenge_id: challenge.id,
                challenge: challenge.secret,
                issued_at_millis: challenge.issued_at.timestamp_millis(),
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "challenge issuance failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!(ErrorResponse {
                    error: "challenge service unavailable".to_string(),
                })),
            )
        }
    }
}

/// `POST /api/v1/auth/login` — run the full authentication pipeline.
///
/// 200 with tokens on success, 401 with the pipeline's generic message on
/// any failure. The status code never distinguishes failure causes.
async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> impl IntoResponse {
    let result = state
        .auth
        .login(&request.challenge_id, &request.nostr_event)
        .await;

    if !result.success {
        return (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                success: false,
                message: result.message,
                pubkey: None,
                access_token: None,
                refresh_token: None,
                user_profile: None,
            }),
        );
    }

    // The pipeline guarantees these on success.
    let pubkey = result.pubkey.unwrap_or_default();
    let tokens = result.tokens;

    let profile = match &request.user_profile {
        Some(update) => state.identities.merge_profile(&pubkey, update),
        None => state.identities.get_or_create(&pubkey),
    };

    (
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            message: result.message,
            pubkey: Some(pubkey),
            access_token: tokens.as_ref().map(|t| t.access_token.clone()),
            refresh_token: tokens.map(|t| t.refresh_token),
            user_profile: Some(profile),
        }),
    )
}

/// `GET /health` — returns 200 if the node is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.). It
/// intentionally checks nothing beyond process liveness.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use nostrgate_protocol::challenge::InMemoryChallengeStore;
    use nostrgate_protocol::config::AUTH_EVENT_KIND;
    use nostrgate_protocol::crypto::{field, schnorr, Secp256k1};

    use crate::tokens::JwtIssuer;

    const TEST_SECRET_KEY: &str =
        "b7e151628aed2a6abf7158809cf4f3c762e7160f38b4da56a784d9045190cfef";

    fn test_app_state() -> (AppState, Arc<Secp256k1>, Arc<JwtIssuer>) {
        let curve = Arc::new(Secp256k1::new());
        let identities = Arc::new(IdentityRegistry::new());
        let issuer = Arc::new(JwtIssuer::new(b"test-secret"));
        let auth = Arc::new(AuthService::new(
            Arc::clone(&curve),
            Arc::new(InMemoryChallengeStore::new()),
            Arc::clone(&identities) as Arc<dyn nostrgate_protocol::auth::IdentityResolver>,
            Arc::clone(&issuer) as Arc<dyn nostrgate_protocol::auth::TokenIssuer>,
        ));
        let state = AppState {
            version: "0.1.0-test".into(),
            auth,
            identities,
        };
        (state, curve, issuer)
    }

    /// Build a signed login event the way a client signer would.
    fn signed_event(curve: &Secp256k1, content: &str) -> NostrEvent {
        let sk: [u8; 32] = hex::decode(TEST_SECRET_KEY).unwrap().try_into().unwrap();
        let point = curve.mul_g(&field::from_be_bytes(&sk));
        let mut event = NostrEvent {
            id: String::new(),
            pubkey: hex::encode(field::to_be_bytes(point.x().unwrap())),
            created_at: chrono::Utc::now().timestamp(),
            kind: AUTH_EVENT_KIND,
            tags: Vec::new(),
            content: content.to_string(),
            sig: String::new(),
        };
        event.id = event.compute_id();
        let id_bytes: [u8; 32] = hex::decode(&event.id).unwrap().try_into().unwrap();
        event.sig = hex::encode(schnorr::sign(curve, &sk, &id_bytes, &[9u8; 32]).unwrap());
        event
    }

    /// Sends a GET request and returns (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(
        router: &Router,
        path: &str,
        body: serde_json::Value,
    ) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn fetch_challenge(router: &Router) -> ChallengeResponse {
        let (status, body) = post_json(router, "/api/v1/auth/challenge", serde_json::json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (state, _, _) = test_app_state();
        let router = create_router(state);
        let (status, body) = get(&router, "/health").await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], "0.1.0-test");
    }

    #[tokio::test]
    async fn challenge_endpoint_issues_usable_challenges() {
        let (state, _, _) = test_app_state();
        let router = create_router(state);

        let a = fetch_challenge(&router).await;
        let b = fetch_challenge(&router).await;
        assert_ne!(a.challenge_id, b.challenge_id);
        assert!(a.challenge.contains(&a.challenge_id));
        assert!(a.issued_at_millis > 0);
    }

    #[tokio::test]
    async fn full_login_flow_over_http() {
        let (state, curve, issuer) = test_app_state();
        let router = create_router(state);

        let challenge = fetch_challenge(&router).await;
        let event = signed_event(&curve, &challenge.challenge);

        let (status, body) = post_json(
            &router,
            "/api/v1/auth/login",
            serde_json::json!({
                "nostrEvent": event,
                "challengeId": challenge.challenge_id,
                "userProfile": { "name": "Alice" },
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let resp: LoginResponse = serde_json::from_slice(&body).unwrap();
        assert!(resp.success);
        assert_eq!(resp.pubkey.as_deref(), Some(event.pubkey.as_str()));

        // The minted access token verifies against the node's issuer.
        let claims = issuer
            .verify(resp.access_token.as_deref().unwrap(), "access")
            .unwrap();
        assert_eq!(claims.sub, event.pubkey);

        let profile = resp.user_profile.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Alice"));
        assert!(profile.username.starts_with("nostr_user_"));
    }

    #[tokio::test]
    async fn login_replay_returns_401() {
        let (state, curve, _) = test_app_state();
        let router = create_router(state);

        let challenge = fetch_challenge(&router).await;
        let event = signed_event(&curve, &challenge.challenge);
        let body = serde_json::json!({
            "nostrEvent": event,
            "challengeId": challenge.challenge_id,
        });

        let (status, _) = post_json(&router, "/api/v1/auth/login", body.clone()).await;
        assert_eq!(status, StatusCode::OK);

        let (status, raw) = post_json(&router, "/api/v1/auth/login", body).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let resp: LoginResponse = serde_json::from_slice(&raw).unwrap();
        assert!(!resp.success);
        assert!(resp.access_token.is_none());
    }

    #[tokio::test]
    async fn tampered_signature_returns_401_with_generic_message() {
        let (state, curve, _) = test_app_state();
        let router = create_router(state);

        let challenge = fetch_challenge(&router).await;
        let mut event = signed_event(&curve, &challenge.challenge);
        let mut sig = hex::decode(&event.sig).unwrap();
        sig[10] ^= 0xff;
        event.sig = hex::encode(sig);

        let (status, raw) = post_json(
            &router,
            "/api/v1/auth/login",
            serde_json::json!({
                "nostrEvent": event,
                "challengeId": challenge.challenge_id,
            }),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let resp: LoginResponse = serde_json::from_slice(&raw).unwrap();
        assert_eq!(resp.message, "Invalid or expired challenge");
    }

    #[tokio::test]
    async fn unknown_challenge_returns_401() {
        let (state, curve, _) = test_app_state();
        let router = create_router(state);

        let event = signed_event(&curve, "whatever");
        let (status, _) = post_json(
            &router,
            "/api/v1/auth/login",
            serde_json::json!({
                "nostrEvent": event,
                "challengeId": "00000000-0000-4000-8000-000000000000",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_login_body_is_a_client_error() {
        let (state, _, _) = test_app_state();
        let router = create_router(state);

        let (status, _) = post_json(
            &router,
            "/api/v1/auth/login",
            serde_json::json!({ "nope": true }),
        )
        .await;
        // Axum's Json extractor rejects before the handler runs.
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
