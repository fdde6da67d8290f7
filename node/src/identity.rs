//! # Identity Registry
//!
//! Maps verified public keys to application user profiles. First contact
//! creates a profile with a generated username; later logins can merge
//! profile fields the client chose to share. In-process storage, same as
//! the challenge store: this node keeps no database.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use nostrgate_protocol::auth::{AuthError, IdentityResolver};

/// A user profile keyed by its Nostr public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Canonical hex public key.
    pub pubkey: String,
    /// Unique login name, generated on first contact.
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nip05: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lud16: Option<String>,
}

/// Profile fields a client may attach to a login request. Everything is
/// optional; absent fields leave the stored profile untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub about: Option<String>,
    pub avatar_url: Option<String>,
    pub nip05: Option<String>,
    pub lud16: Option<String>,
}

/// In-process user registry.
pub struct IdentityRegistry {
    users: DashMap<String, UserProfile>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        IdentityRegistry {
            users: DashMap::new(),
        }
    }

    /// Fetch the profile for a key, creating one on first contact.
    pub fn get_or_create(&self, pubkey: &str) -> UserProfile {
        self.users
            .entry(pubkey.to_string())
            .or_insert_with(|| {
                let profile = UserProfile {
                    pubkey: pubkey.to_string(),
                    username: generated_username(pubkey),
                    name: None,
                    about: None,
                    avatar_url: None,
                    nip05: None,
                    lud16: None,
                };
                info!(username = %profile.username, "registered new identity");
                profile
            })
            .clone()
    }

    /// Look up a profile without creating one.
    pub fn get(&self, pubkey: &str) -> Option<UserProfile> {
        self.users.get(pubkey).map(|entry| entry.clone())
    }

    /// Merge client-supplied fields into a stored profile and return the
    /// result. Only present fields overwrite; the username never changes
    /// through this path.
    pub fn merge_profile(&self, pubkey: &str, update: &ProfileUpdate) -> UserProfile {
        let mut entry = self
            .users
            .entry(pubkey.to_string())
            .or_insert_with(|| UserProfile {
                pubkey: pubkey.to_string(),
                username: generated_username(pubkey),
                name: None,
                about: None,
                avatar_url: None,
                nip05: None,
                lud16: None,
            });

        if update.name.is_some() {
            entry.name = update.name.clone();
        }
        if update.about.is_some() {
            entry.about = update.about.clone();
        }
        if update.avatar_url.is_some() {
            entry.avatar_url = update.avatar_url.clone();
        }
        if update.nip05.is_some() {
            entry.nip05 = update.nip05.clone();
        }
        if update.lud16.is_some() {
            entry.lud16 = update.lud16.clone();
        }
        entry.clone()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityResolver for IdentityRegistry {
    async fn resolve(&self, public_key_hex: &str) -> Result<(), AuthError> {
        self.get_or_create(public_key_hex);
        Ok(())
    }
}

/// Derive a stable, readable username from the key itself. The key prefix
/// keeps it unique without a counter as long as keys are distinct.
fn generated_username(pubkey: &str) -> String {
    let prefix: String = pubkey.chars().take(8).collect();
    format!("nostr_user_{prefix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: &str = "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";
    const KEY_B: &str = "dff1d77f2a671c5f36183726db2341be58feae1da2deced843240f7b502ba659";

    #[test]
    fn first_contact_creates_a_profile() {
        let registry = IdentityRegistry::new();
        assert!(registry.get(KEY_A).is_none());

        let profile = registry.get_or_create(KEY_A);
        assert_eq!(profile.pubkey, KEY_A);
        assert_eq!(profile.username, "nostr_user_f9308a01");
        assert_eq!(registry.user_count(), 1);
    }

    #[test]
    fn repeated_contact_returns_the_same_profile() {
        let registry = IdentityRegistry::new();
        let first = registry.get_or_create(KEY_A);
        let second = registry.get_or_create(KEY_A);
        assert_eq!(first, second);
        assert_eq!(registry.user_count(), 1);
    }

    #[test]
    fn distinct_keys_get_distinct_usernames() {
        let registry = IdentityRegistry::new();
        let a = registry.get_or_create(KEY_A);
        let b = registry.get_or_create(KEY_B);
        assert_ne!(a.username, b.username);
    }

    #[test]
    fn merge_overwrites_only_present_fields() {
        let registry = IdentityRegistry::new();
        registry.merge_profile(
            KEY_A,
            &ProfileUpdate {
                name: Some("Alice".to_string()),
                about: Some("hello".to_string()),
                ..Default::default()
            },
        );

        let merged = registry.merge_profile(
            KEY_A,
            &ProfileUpdate {
                about: Some("updated".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(merged.name.as_deref(), Some("Alice"));
        assert_eq!(merged.about.as_deref(), Some("updated"));
        assert_eq!(merged.username, "nostr_user_f9308a01");
    }

    #[tokio::test]
    async fn resolver_seam_registers_the_key() {
        let registry = IdentityRegistry::new();
        registry.resolve(KEY_A).await.unwrap();
        assert!(registry.get(KEY_A).is_some());
    }
}
