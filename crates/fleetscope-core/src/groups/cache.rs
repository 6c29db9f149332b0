// ── User-group cache ──
//
// Bounded by count (LRU) and by absolute age (TTL). Only successful
// lookups are cached; a failed lookup degrades to "no groups" for that
// one request.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleetscope_api::TransportConfig;
use lru::LruCache;
use parking_lot::Mutex;
use secrecy::SecretString;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{UserGroupProvider, provider_from_config};
use crate::config::UserGroupConfig;
use crate::error::CoreError;

/// One cached lookup.
#[derive(Debug, Clone)]
pub struct UserGroupCacheEntry {
    pub email: String,
    pub groups: Vec<String>,
    pub inserted_at: DateTime<Utc>,
    inserted: Instant,
}

impl UserGroupCacheEntry {
    fn expired(&self, ttl: Duration) -> bool {
        self.inserted.elapsed() >= ttl
    }
}

/// Memoizes user → group lookups in front of a [`UserGroupProvider`].
pub struct UserGroupCache {
    provider: Arc<dyn UserGroupProvider>,
    entries: Mutex<LruCache<String, UserGroupCacheEntry>>,
    ttl: Duration,
}

impl UserGroupCache {
    pub fn new(
        provider: Arc<dyn UserGroupProvider>,
        capacity: usize,
        ttl: Duration,
    ) -> Result<Self, CoreError> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| CoreError::config("user_groups.capacity must be at least 1"))?;
        Ok(Self {
            provider,
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        })
    }

    pub fn from_config(
        config: &UserGroupConfig,
        transport: &TransportConfig,
    ) -> Result<Self, CoreError> {
        Self::new(provider_from_config(config, transport)?, config.capacity, config.ttl)
    }

    /// Groups for `email`, from cache when fresh, otherwise from the provider.
    ///
    /// Provider failures are logged and yield an empty list; they are not
    /// cached.
    pub async fn get_user_groups(&self, email: &str, access_token: &SecretString) -> Vec<String> {
        if let Some(groups) = self.cached(email) {
            debug!(email, "user groups served from cache");
            return groups;
        }

        match self.provider.get_user_groups(email, access_token).await {
            Ok(groups) => {
                if groups.is_empty() {
                    warn!(email, provider = self.provider.name(), "user belongs to no groups");
                }
                let entry = UserGroupCacheEntry {
                    email: email.to_owned(),
                    groups: groups.clone(),
                    inserted_at: Utc::now(),
                    inserted: Instant::now(),
                };
                self.entries.lock().put(email.to_owned(), entry);
                groups
            }
            Err(e) => {
                warn!(email, error = %e, "user group lookup failed");
                Vec::new()
            }
        }
    }

    fn cached(&self, email: &str) -> Option<Vec<String>> {
        let mut entries = self.entries.lock();
        let fresh = entries.get(email).map(|entry| !entry.expired(self.ttl))?;
        if fresh {
            entries.peek(email).map(|entry| entry.groups.clone())
        } else {
            entries.pop(email);
            None
        }
    }

    /// Unexpired entries, most recently used first.
    pub fn values(&self) -> Vec<UserGroupCacheEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| !entry.expired(self.ttl))
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    /// Drop one user's entry. Returns whether one was cached.
    pub fn invalidate(&self, email: &str) -> bool {
        self.entries.lock().pop(email).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
