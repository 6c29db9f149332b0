// ── Filesystem discovery ──
//
// Watches one JSON cluster file. The first read happens inside `start()`
// and must succeed; afterwards every debounced change re-reads the file.
// A bad read or a document that fails validation is reported as an
// `Error` event and the previously loaded list stays current.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{ClusterSchema, DiscoveryProvider, DiscoverySink, emit_topology, parse_cluster_document};
use crate::error::CoreError;
use crate::model::ClusterDefinition;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Lifecycle of a [`FileSystemDiscoveryProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Unstarted,
    Watching,
}

/// Serves the cluster list stored in a JSON file and follows its changes.
pub struct FileSystemDiscoveryProvider {
    inner: Arc<FsInner>,
    debounce: Duration,
    watcher: Mutex<Option<Debouncer<RecommendedWatcher>>>,
}

struct FsInner {
    path: PathBuf,
    schema: OnceLock<ClusterSchema>,
    state: Mutex<WatchState>,
    clusters: Mutex<Option<Arc<Vec<ClusterDefinition>>>>,
    sink: OnceLock<DiscoverySink>,
}

impl FileSystemDiscoveryProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FsInner {
                path: path.into(),
                schema: OnceLock::new(),
                state: Mutex::new(WatchState::Unstarted),
                clusters: Mutex::new(None),
                sink: OnceLock::new(),
            }),
            debounce: DEFAULT_DEBOUNCE,
            watcher: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn state(&self) -> WatchState {
        *self.inner.state.lock()
    }

    /// The last successfully loaded cluster list.
    pub fn clusters(&self) -> Option<Arc<Vec<ClusterDefinition>>> {
        self.inner.clusters.lock().clone()
    }

    /// Re-read the file now, as a filesystem change would.
    pub fn reload(&self) {
        self.inner.reload();
    }

    fn watch(&self) -> Result<(), CoreError> {
        let inner = Arc::clone(&self.inner);
        let file_name = self.inner.path.file_name().map(OsString::from);

        let mut debouncer = new_debouncer(self.debounce, move |res: DebounceEventResult| {
            match res {
                Ok(events) => {
                    let touched = events
                        .iter()
                        .any(|e| e.path.file_name().map(OsString::from) == file_name);
                    if touched {
                        inner.reload();
                    }
                }
                Err(e) => {
                    warn!(error = %e, "cluster file watch error");
                    if let Some(sink) = inner.sink.get() {
                        sink.error(inner.source_error(e.to_string()));
                    }
                }
            }
        })
        .map_err(|e| self.inner.source_error(format!("cannot create watcher: {e}")))?;

        // Watch the directory so replace-by-rename saves are seen too.
        let dir = match self.inner.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| self.inner.source_error(format!("cannot watch {}: {e}", dir.display())))?;

        *self.watcher.lock() = Some(debouncer);
        Ok(())
    }
}

impl FsInner {
    fn source_error(&self, reason: String) -> CoreError {
        CoreError::DiscoverySource {
            source_name: self.path.display().to_string(),
            reason,
        }
    }

    fn read(&self) -> Result<Vec<ClusterDefinition>, CoreError> {
        let schema = self
            .schema
            .get()
            .ok_or_else(|| CoreError::Internal("cluster schema not loaded".into()))?;
        let raw = std::fs::read_to_string(&self.path).map_err(|e| self.source_error(e.to_string()))?;
        parse_cluster_document(schema, &raw)
    }

    fn publish(&self, sink: &DiscoverySink, clusters: Vec<ClusterDefinition>) {
        *self.clusters.lock() = Some(Arc::new(clusters.clone()));
        emit_topology(sink, clusters, None, None);
    }

    fn reload(&self) {
        let Some(sink) = self.sink.get() else {
            debug!(path = %self.path.display(), "reload before start ignored");
            return;
        };
        match self.read() {
            Ok(clusters) => {
                info!(
                    path = %self.path.display(),
                    clusters = clusters.len(),
                    "cluster file reloaded"
                );
                self.publish(sink, clusters);
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "keeping previous cluster list");
                sink.error(e);
            }
        }
    }
}

#[async_trait]
impl DiscoveryProvider for FileSystemDiscoveryProvider {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn start(&self, sink: DiscoverySink) -> Result<(), CoreError> {
        if self.inner.schema.get().is_none() {
            let _ = self.inner.schema.set(ClusterSchema::load()?);
        }

        let clusters = self.inner.read()?;
        info!(
            path = %self.inner.path.display(),
            clusters = clusters.len(),
            "cluster file loaded"
        );
        self.inner.publish(&sink, clusters);
        let _ = self.inner.sink.set(sink);

        self.watch()?;
        *self.inner.state.lock() = WatchState::Watching;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use tokio::sync::broadcast;

    use super::*;
    use crate::discovery::{DiscoveryEvent, DiscoveryService};
    use crate::model::DatastoreType;

    const TWO_CLUSTERS: &str = r#"[
        { "name": "orders", "env": "prod", "region": "us-west-2",
          "datastoreType": "cassandra",
          "instances": [{ "hostname": "c1", "ip": "10.0.0.1" }] },
        { "name": "sessions", "env": "test", "region": "us-east-1",
          "datastoreType": "redis",
          "instances": [{ "hostname": "r1", "ip": "10.0.1.1" }] }
    ]"#;

    const ONE_CLUSTER: &str = r#"[
        { "name": "sessions", "env": "test", "region": "us-east-1",
          "datastoreType": "redis",
          "instances": [{ "hostname": "r1", "ip": "10.0.1.1" }] }
    ]"#;

    const INVALID: &str = r#"[{ "name": "orders", "datastoreType": "mysql" }]"#;

    async fn drain_topology(rx: &mut broadcast::Receiver<DiscoveryEvent>) -> usize {
        let count = match rx.recv().await.unwrap() {
            DiscoveryEvent::LoadedClusters(c) => c.len(),
            other => panic!("unexpected event {other:?}"),
        };
        assert!(matches!(rx.recv().await.unwrap(), DiscoveryEvent::LoadedEnvironments(_)));
        assert!(matches!(rx.recv().await.unwrap(), DiscoveryEvent::LoadedRegions(_)));
        count
    }

    #[tokio::test]
    async fn invalid_update_keeps_previous_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters.json");
        fs::write(&path, TWO_CLUSTERS).unwrap();

        let provider = Arc::new(
            FileSystemDiscoveryProvider::new(&path).with_debounce(Duration::from_secs(60)),
        );
        assert_eq!(provider.state(), WatchState::Unstarted);

        let service = DiscoveryService::new(Arc::clone(&provider) as Arc<dyn DiscoveryProvider>);
        let mut rx = service.subscribe();
        service.start().await.unwrap();
        assert_eq!(provider.state(), WatchState::Watching);
        assert_eq!(drain_topology(&mut rx).await, 2);

        fs::write(&path, INVALID).unwrap();
        provider.reload();

        match rx.recv().await.unwrap() {
            DiscoveryEvent::Error(e) => {
                assert!(matches!(*e, CoreError::ValidationFailed { .. }), "{e}");
            }
            other => panic!("expected error event, got {other:?}"),
        }
        assert_eq!(provider.clusters().unwrap().len(), 2);
        assert_eq!(service.snapshot().cluster_count(), 2);
        assert_eq!(service.snapshot().environments(), ["prod", "test"]);
    }

    #[tokio::test]
    async fn valid_update_replaces_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters.json");
        fs::write(&path, TWO_CLUSTERS).unwrap();

        let provider = Arc::new(
            FileSystemDiscoveryProvider::new(&path).with_debounce(Duration::from_secs(60)),
        );
        let service = DiscoveryService::new(Arc::clone(&provider) as Arc<dyn DiscoveryProvider>);
        let mut rx = service.subscribe();
        service.start().await.unwrap();
        drain_topology(&mut rx).await;

        fs::write(&path, ONE_CLUSTER).unwrap();
        provider.reload();

        assert_eq!(drain_topology(&mut rx).await, 1);
        let snap = service.snapshot();
        assert!(snap.clusters(DatastoreType::Cassandra).is_empty());
        assert_eq!(snap.regions(), ["us-east-1"]);
    }

    #[tokio::test]
    async fn file_change_triggers_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clusters.json");
        fs::write(&path, TWO_CLUSTERS).unwrap();

        let provider = Arc::new(
            FileSystemDiscoveryProvider::new(&path).with_debounce(Duration::from_millis(50)),
        );
        let service = DiscoveryService::new(Arc::clone(&provider) as Arc<dyn DiscoveryProvider>);
        let mut rx = service.subscribe();
        service.start().await.unwrap();
        assert_eq!(drain_topology(&mut rx).await, 2);

        // Other files in the watched directory are ignored.
        fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();
        let quiet = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(quiet.is_err(), "sibling write caused {quiet:?}");

        fs::write(&path, ONE_CLUSTER).unwrap();
        let reloaded = tokio::time::timeout(Duration::from_secs(5), drain_topology(&mut rx))
            .await
            .expect("no reload after the cluster file changed");
        assert_eq!(reloaded, 1);
        assert_eq!(provider.clusters().unwrap().len(), 1);
        assert!(service.snapshot().clusters(DatastoreType::Cassandra).is_empty());
    }

    #[tokio::test]
    async fn missing_file_fails_start() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FileSystemDiscoveryProvider::new(dir.path().join("absent.json"));
        let service = DiscoveryService::new(Arc::new(provider));

        let err = service.start().await.unwrap_err();
        assert!(matches!(err, CoreError::DiscoverySource { .. }));
    }

    #[tokio::test]
    async fn reload_before_start_is_ignored() {
        let provider = FileSystemDiscoveryProvider::new("/nonexistent/clusters.json");
        provider.reload();
        assert_eq!(provider.state(), WatchState::Unstarted);
        assert!(provider.clusters().is_none());
    }
}
