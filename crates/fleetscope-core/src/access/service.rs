// ── Access-control poller ──
//
// One provider, one pending timer. `start()` polls inline, then a single
// background task sleeps for the success or error interval and polls
// again until shutdown. A failed poll keeps the previous map.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{AccessControlEvent, AclRequestOptions, ClusterAccessControlProvider};
use crate::config::{AccessControlConfig, FleetConfig};
use crate::error::CoreError;
use crate::model::ClusterAccessControlMap;

const EVENT_CHANNEL_SIZE: usize = 64;

struct Shared {
    map: ArcSwap<ClusterAccessControlMap>,
    event_tx: broadcast::Sender<AccessControlEvent>,
    next_delay: Mutex<Option<Duration>>,
}

impl Shared {
    fn publish(&self, map: ClusterAccessControlMap) {
        let map = Arc::new(map);
        self.map.store(Arc::clone(&map));
        let _ = self.event_tx.send(AccessControlEvent::Loaded(map));
    }

    fn fail(&self, error: CoreError) {
        let _ = self.event_tx.send(AccessControlEvent::Error(Arc::new(error)));
    }

    /// Run one poll for the whole map. Returns `true` on success.
    async fn poll(&self, provider: &dyn ClusterAccessControlProvider) -> bool {
        match provider
            .get_cluster_access_control(&AclRequestOptions::default())
            .await
        {
            Ok(map) => {
                debug!(provider = provider.name(), clusters = map.len(), "ownership refreshed");
                self.publish(map);
                true
            }
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "ownership poll failed");
                self.fail(e);
                false
            }
        }
    }
}

/// Keeps the cluster ownership map current by polling one provider.
pub struct ClusterAccessControlService {
    shared: Arc<Shared>,
    provider: RwLock<Option<Arc<dyn ClusterAccessControlProvider>>>,
    enabled: bool,
    poll_interval: Duration,
    error_poll_interval: Duration,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ClusterAccessControlService {
    /// Create an unbound service. Call [`use_provider`](Self::use_provider)
    /// before starting unless the service is disabled.
    pub fn new(config: &AccessControlConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            shared: Arc::new(Shared {
                map: ArcSwap::from_pointee(ClusterAccessControlMap::new()),
                event_tx,
                next_delay: Mutex::new(None),
            }),
            provider: RwLock::new(None),
            enabled: config.enabled,
            poll_interval: config.poll_interval,
            error_poll_interval: config.error_poll_interval,
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Create a service bound to the configured provider.
    pub fn from_config(
        config: &FleetConfig,
        transport: &fleetscope_api::TransportConfig,
    ) -> Result<Self, CoreError> {
        let service = Self::new(&config.access_control);
        if config.access_control.enabled {
            service.use_provider(super::provider_from_config(config, transport)?);
        }
        Ok(service)
    }

    /// Bind the provider used by subsequent polls.
    pub fn use_provider(&self, provider: Arc<dyn ClusterAccessControlProvider>) {
        debug!(provider = provider.name(), "access-control provider bound");
        *self.provider.write() = Some(provider);
    }

    fn provider(&self) -> Result<Arc<dyn ClusterAccessControlProvider>, CoreError> {
        self.provider.read().clone().ok_or(CoreError::ProviderNotSet)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Poll once, then keep polling in the background.
    ///
    /// When disabled, publishes one empty map and schedules nothing.
    /// Calling `start` again replaces the running loop. Fails once
    /// [`shutdown`](Self::shutdown) has run.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::Internal(
                "access-control service has been shut down".into(),
            ));
        }
        if !self.enabled {
            info!("access control disabled; all clusters are open");
            self.shared.publish(ClusterAccessControlMap::new());
            return Ok(());
        }

        let provider = self.provider()?;
        if let Some(previous) = self.task.lock().take() {
            previous.abort();
        }

        info!(provider = provider.name(), "starting ownership poller");
        let ok = self.shared.poll(provider.as_ref()).await;
        let first_delay = if ok {
            self.poll_interval
        } else {
            self.error_poll_interval
        };
        *self.shared.next_delay.lock() = Some(first_delay);

        let handle = tokio::spawn(poll_task(
            Arc::clone(&self.shared),
            provider,
            (self.poll_interval, self.error_poll_interval),
            Instant::now() + first_delay,
            self.cancel.child_token(),
        ));
        if let Some(previous) = self.task.lock().replace(handle) {
            previous.abort();
        }
        Ok(())
    }

    /// One out-of-band poll. The background schedule is left untouched.
    ///
    /// Provider failures are reported as [`AccessControlEvent::Error`], not
    /// returned.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let provider = self.provider()?;
        self.shared.poll(provider.as_ref()).await;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccessControlEvent> {
        self.shared.event_tx.subscribe()
    }

    /// The current ownership map.
    pub fn current(&self) -> Arc<ClusterAccessControlMap> {
        self.shared.map.load_full()
    }

    /// Whether a member of `groups` may use `cluster` under the current map.
    pub fn is_authorized<S: AsRef<str>>(&self, cluster: &str, groups: &[S]) -> bool {
        self.shared.map.load().permits(cluster, groups)
    }

    /// Delay before the next scheduled poll, if one is pending.
    pub fn next_poll_delay(&self) -> Option<Duration> {
        *self.shared.next_delay.lock()
    }

    pub fn reader(&self) -> AccessControlReader {
        AccessControlReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stop the poll loop.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        *self.shared.next_delay.lock() = None;
        debug!("ownership poller stopped");
    }
}

/// Background loop. `intervals` is `(success, error)`; the first deadline
/// comes from `start()`.
async fn poll_task(
    shared: Arc<Shared>,
    provider: Arc<dyn ClusterAccessControlProvider>,
    intervals: (Duration, Duration),
    first_deadline: Instant,
    cancel: CancellationToken,
) {
    let (poll_interval, error_poll_interval) = intervals;
    let mut deadline = first_deadline;
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep_until(deadline) => {}
        }
        let delay = if shared.poll(provider.as_ref()).await {
            poll_interval
        } else {
            error_poll_interval
        };
        *shared.next_delay.lock() = Some(delay);
        deadline = Instant::now() + delay;
    }
    *shared.next_delay.lock() = None;
}

// ── Reader ───────────────────────────────────────────────────────────

/// Read-only view of the current ownership map.
#[derive(Clone)]
pub struct AccessControlReader {
    shared: Arc<Shared>,
}

impl AccessControlReader {
    pub fn current(&self) -> Arc<ClusterAccessControlMap> {
        self.shared.map.load_full()
    }

    pub fn is_authorized<S: AsRef<str>>(&self, cluster: &str, groups: &[S]) -> bool {
        self.shared.map.load().permits(cluster, groups)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccessControlEvent> {
        self.shared.event_tx.subscribe()
    }
}
