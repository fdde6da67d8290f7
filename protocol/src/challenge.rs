//! # Authentication Challenges
//!
//! Issue, store, and consume the single-use challenges that anchor a login
//! attempt in time. The store contract is deliberately narrow: a challenge
//! can be stored once and consumed at most once, and consumption is atomic
//! under arbitrary concurrency. Everything else (structural checks, the
//! signature itself) belongs to the pipeline in [`crate::auth`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::{CHALLENGE_PREFIX, CHALLENGE_SWEEP_INTERVAL, CHALLENGE_VALIDITY, STORE_CALL_TIMEOUT};

/// A freshly issued challenge, handed to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Opaque challenge identifier (UUID v4).
    pub id: String,
    /// The full text the client must embed in its signed event's content.
    pub secret: String,
    /// Issue timestamp, for the API response.
    pub issued_at: DateTime<Utc>,
}

impl AuthChallenge {
    /// Mint a new challenge with a random id.
    pub fn new() -> Self {
        let id = Uuid::new_v4().to_string();
        let secret = format!("{CHALLENGE_PREFIX}{id}");
        AuthChallenge {
            id,
            secret,
            issued_at: Utc::now(),
        }
    }
}

impl Default for AuthChallenge {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from a challenge store backend.
///
/// The pipeline maps every variant to a generic login failure; these exist
/// so operators can tell a dead backend apart from an expired challenge in
/// the logs, not so clients can.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend did not answer within [`STORE_CALL_TIMEOUT`].
    #[error("challenge store call timed out")]
    Timeout,

    /// The backend answered with a failure of its own.
    #[error("challenge store unavailable: {0}")]
    Unavailable(String),
}

/// Storage for outstanding challenges.
///
/// Implementations must make [`consume`](ChallengeStore::consume) atomic:
/// when any number of callers race on the same id, exactly one receives the
/// secret and the rest receive `None`.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Record a freshly issued challenge.
    async fn store(&self, challenge: &AuthChallenge) -> Result<(), StoreError>;

    /// Peek at an outstanding challenge without consuming it. Returns the
    /// secret if the challenge is still active.
    async fn get(&self, id: &str) -> Result<Option<String>, StoreError>;

    /// Atomically take the challenge out of the store. Returns the secret
    /// if the challenge existed, was unexpired, and had not been consumed;
    /// `None` in every other case.
    async fn consume(&self, id: &str) -> Result<Option<String>, StoreError>;

    /// Reclaim expired entries. Returns how many were removed. Backends
    /// with native TTL support may implement this as a no-op.
    async fn sweep(&self) -> Result<usize, StoreError>;
}

struct StoredChallenge {
    secret: String,
    expires_at: Instant,
}

/// In-process challenge store backed by a concurrent map.
///
/// Consumption removes the entry, so the map itself is the used-flag: a
/// second consumer finds nothing. A background sweeper reclaims entries the
/// clients abandoned; it is pure housekeeping, since `consume` re-checks
/// expiry on every call.
pub struct InMemoryChallengeStore {
    entries: Arc<DashMap<String, StoredChallenge>>,
    sweeper: JoinHandle<()>,
}

impl InMemoryChallengeStore {
    /// Create the store and spawn its sweeper. Must be called from within a
    /// Tokio runtime.
    pub fn new() -> Self {
        let entries: Arc<DashMap<String, StoredChallenge>> = Arc::new(DashMap::new());
        let sweep_view = Arc::clone(&entries);
        let sweeper = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CHALLENGE_SWEEP_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = sweep_entries(&sweep_view);
                if removed > 0 {
                    debug!(removed, remaining = sweep_view.len(), "swept expired challenges");
                }
            }
        });
        InMemoryChallengeStore { entries, sweeper }
    }

    /// Number of outstanding (stored, not yet consumed or swept) challenges.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InMemoryChallengeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InMemoryChallengeStore {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

#[async_trait]
impl ChallengeStore for InMemoryChallengeStore {
    async fn store(&self, challenge: &AuthChallenge) -> Result<(), StoreError> {
        trace!(challenge_id = %challenge.id, "storing challenge");
        self.entries.insert(
            challenge.id.clone(),
            StoredChallenge {
                secret: challenge.secret.clone(),
                expires_at: Instant::now() + CHALLENGE_VALIDITY,
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<String>, StoreError> {
        let secret = self.entries.get(id).and_then(|entry| {
            (entry.expires_at > Instant::now()).then(|| entry.secret.clone())
        });
        Ok(secret)
    }

    async fn consume(&self, id: &str) -> Result<Option<String>, StoreError> {
        // remove() is the atomicity point: the map hands the entry to
        // exactly one caller. An expired entry is still removed, it just
        // yields nothing.
        match self.entries.remove(id) {
            Some((_, entry)) if entry.expires_at > Instant::now() => Ok(Some(entry.secret)),
            Some(_) => {
                trace!(challenge_id = %id, "challenge expired before consumption");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn sweep(&self) -> Result<usize, StoreError> {
        Ok(sweep_entries(&self.entries))
    }
}

fn sweep_entries(entries: &DashMap<String, StoredChallenge>) -> usize {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    before - entries.len()
}

/// Decorator that bounds every call into a (typically network-backed) store.
///
/// Timeouts fail closed: a store that cannot answer in time reports
/// [`StoreError::Timeout`], which the pipeline treats as an invalid
/// challenge, never as an authenticated one.
pub struct TimeoutStore<S> {
    inner: S,
}

impl<S: ChallengeStore> TimeoutStore<S> {
    pub fn new(inner: S) -> Self {
        TimeoutStore { inner }
    }
}

#[async_trait]
impl<S: ChallengeStore> ChallengeStore for TimeoutStore<S> {
    async fn store(&self, challenge: &AuthChallenge) -> Result<(), StoreError> {
        tokio::time::timeout(STORE_CALL_TIMEOUT, self.inner.store(challenge))
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn get(&self, id: &str) -> Result<Option<String>, StoreError> {
        tokio::time::timeout(STORE_CALL_TIMEOUT, self.inner.get(id))
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn consume(&self, id: &str) -> Result<Option<String>, StoreError> {
        tokio::time::timeout(STORE_CALL_TIMEOUT, self.inner.consume(id))
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn sweep(&self) -> Result<usize, StoreError> {
        tokio::time::timeout(STORE_CALL_TIMEOUT, self.inner.sweep())
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}
