// ── Explorer cache ──
//
// One live client handle per (datastore type, cluster, region, env).
// Handles are created lazily through a caller-supplied connect function;
// concurrent requests for the same key share a single connect. A handle
// is retired once its cluster leaves discovery or its endpoints change.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::access::AccessControlReader;
use crate::discovery::{DiscoveryReader, DiscoverySnapshot};
use crate::error::CoreError;
use crate::model::{ClusterDefinition, ClusterKey};

/// A connected datastore client owned by the [`ExplorerCache`].
#[async_trait]
pub trait Explorer: Send + Sync + 'static {
    /// Downcast hook for callers that know the concrete client type.
    fn as_any(&self) -> &dyn Any;

    /// Release connections. Called once when the explorer is retired.
    async fn shutdown(&self) {}
}

pub type ExplorerKey = ClusterKey;

struct Slot {
    cluster: Arc<ClusterDefinition>,
    cell: OnceCell<Arc<dyn Explorer>>,
    created_at: DateTime<Utc>,
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Default)]
struct Lifecycle {
    retired: bool,
    closed: bool,
}

impl Slot {
    fn new(cluster: Arc<ClusterDefinition>) -> Self {
        Self {
            cluster,
            cell: OnceCell::new(),
            created_at: Utc::now(),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Mark the slot dead and close its explorer if one exists. A connect
    /// still in flight is closed by [`admit`](Self::admit) when it lands.
    async fn retire(&self) {
        let explorer = {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.retired = true;
            match self.cell.get() {
                Some(explorer) if !lifecycle.closed => {
                    lifecycle.closed = true;
                    Some(Arc::clone(explorer))
                }
                _ => None,
            }
        };
        if let Some(explorer) = explorer {
            explorer.shutdown().await;
        }
    }

    /// Whether a freshly connected `explorer` may be handed out. Closes it
    /// when the slot was retired during the connect.
    async fn admit(&self, explorer: &Arc<dyn Explorer>) -> bool {
        let close = {
            let mut lifecycle = self.lifecycle.lock();
            if !lifecycle.retired {
                return true;
            }
            !std::mem::replace(&mut lifecycle.closed, true)
        };
        if close {
            explorer.shutdown().await;
        }
        false
    }
}

/// A live explorer as shown on the status surface.
#[derive(Clone)]
pub struct ExplorerEntry {
    pub key: ExplorerKey,
    pub cluster: Arc<ClusterDefinition>,
    pub explorer: Arc<dyn Explorer>,
    pub created_at: DateTime<Utc>,
}

/// Owns explorers and keeps them in step with discovery.
pub struct ExplorerCache {
    discovery: DiscoveryReader,
    access: Option<AccessControlReader>,
    slots: DashMap<ExplorerKey, Arc<Slot>>,
}

impl ExplorerCache {
    pub fn new(discovery: DiscoveryReader) -> Self {
        Self {
            discovery,
            access: None,
            slots: DashMap::new(),
        }
    }

    /// Enable ownership checks in
    /// [`get_authorized_explorer`](Self::get_authorized_explorer).
    #[must_use]
    pub fn with_access_control(mut self, access: AccessControlReader) -> Self {
        self.access = Some(access);
        self
    }

    /// Return the explorer for `key`, connecting on first use.
    ///
    /// Fails with [`CoreError::ClusterNotFound`] when discovery does not
    /// know the cluster. A failed connect is returned to every waiter and
    /// not remembered; the next call connects again. An explorer whose
    /// cluster was retired while it connected is closed, not returned.
    pub async fn get_explorer<F, Fut>(
        &self,
        key: &ExplorerKey,
        connect: F,
    ) -> Result<Arc<dyn Explorer>, CoreError>
    where
        F: FnOnce(Arc<ClusterDefinition>) -> Fut,
        Fut: Future<Output = Result<Arc<dyn Explorer>, CoreError>>,
    {
        let snapshot = self.discovery.load();
        let cluster = snapshot
            .find(key)
            .cloned()
            .ok_or_else(|| CoreError::ClusterNotFound {
                key: key.to_string(),
            })?;

        let (slot, stale) = self.slot_for(key, cluster);
        if let Some(stale) = stale {
            info!(cluster = %key, "cluster endpoints changed; replacing explorer");
            stale.retire().await;
        }

        let explorer = slot
            .cell
            .get_or_try_init(|| {
                debug!(cluster = %key, "connecting explorer");
                connect(Arc::clone(&slot.cluster))
            })
            .await?;
        if slot.admit(explorer).await {
            return Ok(Arc::clone(explorer));
        }

        debug!(cluster = %key, "cluster retired while connecting");
        if self.discovery.load().find(key).is_none() {
            return Err(CoreError::ClusterNotFound {
                key: key.to_string(),
            });
        }
        Err(CoreError::ConnectionFailed {
            cluster: key.cluster_name.clone(),
            reason: "cluster endpoints changed while connecting".into(),
        })
    }

    /// Like [`get_explorer`](Self::get_explorer), but first rejects callers
    /// whose groups do not own the cluster.
    pub async fn get_authorized_explorer<S, F, Fut>(
        &self,
        groups: &[S],
        key: &ExplorerKey,
        connect: F,
    ) -> Result<Arc<dyn Explorer>, CoreError>
    where
        S: AsRef<str>,
        F: FnOnce(Arc<ClusterDefinition>) -> Fut,
        Fut: Future<Output = Result<Arc<dyn Explorer>, CoreError>>,
    {
        let permitted = self
            .access
            .as_ref()
            .is_none_or(|access| access.is_authorized(&key.cluster_name, groups));
        if !permitted {
            debug!(cluster = %key, "caller not in owning groups");
            return Err(CoreError::Forbidden {
                cluster: key.cluster_name.clone(),
            });
        }
        self.get_explorer(key, connect).await
    }

    /// The cached explorer for `key`, if connected and still current.
    /// Never connects.
    pub fn peek_explorer(&self, key: &ExplorerKey) -> Option<Arc<dyn Explorer>> {
        let slot = self.slots.get(key)?;
        let snapshot = self.discovery.load();
        let current = snapshot.find(key)?;
        if !current.same_endpoints(&slot.cluster) {
            return None;
        }
        slot.cell.get().cloned()
    }

    /// Every connected explorer.
    pub fn values(&self) -> Vec<ExplorerEntry> {
        self.slots
            .iter()
            .filter_map(|entry| {
                let slot = entry.value();
                slot.cell.get().map(|explorer| ExplorerEntry {
                    key: entry.key().clone(),
                    cluster: Arc::clone(&slot.cluster),
                    explorer: Arc::clone(explorer),
                    created_at: slot.created_at,
                })
            })
            .collect()
    }

    /// Retire explorers whose cluster vanished or whose endpoints changed
    /// in `snapshot`. Returns how many were dropped.
    pub async fn reconcile(&self, snapshot: &DiscoverySnapshot) -> usize {
        let mut retired = Vec::new();
        self.slots.retain(|key, slot| {
            let keep = snapshot
                .find(key)
                .is_some_and(|current| current.same_endpoints(&slot.cluster));
            if !keep {
                retired.push((key.clone(), Arc::clone(slot)));
            }
            keep
        });

        for (key, slot) in &retired {
            info!(cluster = %key, "retiring explorer");
            slot.retire().await;
        }
        retired.len()
    }

    /// Retire every explorer.
    pub async fn shutdown(&self) {
        let slots: Vec<Arc<Slot>> = self.slots.iter().map(|e| Arc::clone(e.value())).collect();
        self.slots.clear();
        for slot in slots {
            slot.retire().await;
        }
    }

    /// Number of cached keys, connected or connecting.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Current slot for `key`, replacing it when `cluster` no longer has
    /// the endpoints the slot was created for. Returns the replaced slot.
    fn slot_for(
        &self,
        key: &ExplorerKey,
        cluster: Arc<ClusterDefinition>,
    ) -> (Arc<Slot>, Option<Arc<Slot>>) {
        let mut entry = self
            .slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Slot::new(Arc::clone(&cluster))));

        if entry.cluster.same_endpoints(&cluster) {
            return (Arc::clone(entry.value()), None);
        }
        let fresh = Arc::new(Slot::new(cluster));
        let stale = std::mem::replace(entry.value_mut(), Arc::clone(&fresh));
        (fresh, Some(stale))
    }
}
