//! The redeploy coordinator.
//!
//! One state machine per record: `Undeployed` → `Deploying` → `Deployed`
//! → `Undeploying` → `Undeployed`, with `Failed` reachable from either
//! transition and recoverable on the next trigger. Transitions for one
//! record never interleave — the record's transition mutex admits one
//! in-flight redeploy and rejects concurrent triggers — while records
//! redeploy independently of each other.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use hotswap_artifact::resolver::ArtifactResolver;
use hotswap_common::error::{HotswapError, Result};
use hotswap_common::types::AppState;
use hotswap_resources::composite::CompositeResourceView;

use crate::host::{ContainerHost, Deployment};
use crate::registry::{AppRecord, DeployedUnit, Registry};
use crate::session::{SessionIdSource, SessionManager};

/// Owns the registry and the collaborator handles, and drives redeploys.
///
/// Constructed once at startup and passed explicitly to whatever exposes
/// the control surface. Clones share the same registry and collaborators,
/// which is what the per-record tasks hold.
#[derive(Clone)]
pub struct Controller {
    registry: Arc<Registry>,
    host: Arc<dyn ContainerHost>,
    resolver: Arc<dyn ArtifactResolver>,
    sessions: Arc<dyn SessionIdSource>,
}

impl Controller {
    /// Creates a controller over a frozen registry.
    #[must_use]
    pub fn new(
        registry: Registry,
        host: Arc<dyn ContainerHost>,
        resolver: Arc<dyn ArtifactResolver>,
        sessions: Arc<dyn SessionIdSource>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            host,
            resolver,
            sessions,
        }
    }

    /// The registry this controller drives.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolves every record's coordinate; returns the number of records
    /// whose round failed.
    pub async fn resolve_all(&self) -> usize {
        self.registry.resolve_all(self.resolver.as_ref()).await
    }

    /// Runs one full redeploy cycle for a record.
    ///
    /// Returns `Ok(false)` when the trigger is rejected because another
    /// cycle for the same record is still in flight. The cycle is
    /// undeploy-then-deploy: the old unit is fully released before the
    /// replacement is built.
    ///
    /// # Errors
    ///
    /// Returns the error that moved the record to `Failed`. The error is
    /// already logged; callers may ignore it.
    pub async fn redeploy(&self, record: &Arc<AppRecord>) -> Result<bool> {
        let Ok(_guard) = record.transition_lock().try_lock() else {
            tracing::info!(
                context_path = record.context_path(),
                "redeploy already in flight, trigger ignored"
            );
            return Ok(false);
        };
        if !record.state().accepts_redeploy() {
            tracing::info!(
                context_path = record.context_path(),
                state = %record.state(),
                "record not redeployable, trigger ignored"
            );
            return Ok(false);
        }

        if let Err(e) = self.undeploy(record).await {
            record.set_state(AppState::Failed);
            tracing::error!(
                context_path = record.context_path(),
                error = %e,
                "undeploy failed"
            );
            return Err(e);
        }

        let start = Instant::now();
        record.set_state(AppState::Deploying);
        match self.deploy(record).await {
            Ok(version) => {
                record.set_state(AppState::Deployed);
                tracing::info!(
                    context_path = record.context_path(),
                    version = %version,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "deployed"
                );
                Ok(true)
            }
            Err(e) => {
                record.set_state(AppState::Failed);
                tracing::error!(
                    context_path = record.context_path(),
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "deploy failed"
                );
                Err(e)
            }
        }
    }

    /// Stops and removes the record's live unit, if any.
    ///
    /// Stop failures are logged and do not block removal; the handle is
    /// cleared only once the host has confirmed removal.
    async fn undeploy(&self, record: &AppRecord) -> Result<()> {
        let Some(unit) = record.current_unit() else {
            record.set_state(AppState::Undeployed);
            return Ok(());
        };

        record.set_state(AppState::Undeploying);
        if let Err(e) = self.host.stop(&unit.handle).await {
            tracing::warn!(
                context_path = record.context_path(),
                error = %e,
                "stop failed, continuing with removal"
            );
        }
        self.host
            .remove_application(&unit.handle)
            .await
            .map_err(|e| {
                HotswapError::lifecycle(
                    record.context_path(),
                    format!("cannot remove unit {}: {e}", unit.handle),
                )
            })?;
        record.clear_unit();
        record.set_state(AppState::Undeployed);
        tracing::info!(
            context_path = record.context_path(),
            version = %unit.version,
            "undeployed"
        );
        Ok(())
    }

    /// Builds and starts a fresh unit from the record's current descriptor.
    async fn deploy(&self, record: &AppRecord) -> Result<String> {
        let Some(resolved) = record.resolved() else {
            return Err(HotswapError::resolution(
                record.coordinate().to_string(),
                "no successful resolution to deploy from",
            ));
        };

        let dependencies: Vec<PathBuf> = resolved
            .dependencies
            .iter()
            .map(|d| d.file.clone())
            .collect();
        let primary = resolved.artifact.file.clone();
        let view = tokio::task::spawn_blocking(move || {
            CompositeResourceView::open(dependencies, &primary)
        })
        .await
        .map_err(|e| {
            HotswapError::lifecycle(
                record.context_path(),
                format!("resource view build aborted: {e}"),
            )
        })??;

        let deployment = Deployment {
            context_path: record.context_path().to_string(),
            archive: resolved.artifact.file.clone(),
            resources: view,
            sessions: SessionManager::new(Arc::clone(&self.sessions)),
        };
        let handle = self.host.add_application(deployment).await?;
        if let Err(e) = self.host.start(&handle).await {
            // A unit that failed to start must not keep the path occupied.
            if let Err(remove_err) = self.host.remove_application(&handle).await {
                tracing::warn!(
                    context_path = record.context_path(),
                    error = %remove_err,
                    "rollback removal failed"
                );
            }
            return Err(e);
        }

        let version = resolved.artifact.version.clone();
        record.store_unit(DeployedUnit {
            handle,
            version: version.clone(),
            deployed_at: chrono::Utc::now().to_rfc3339(),
        });
        Ok(version)
    }

    /// Resolves everything, then dispatches one independent redeploy task
    /// per record and returns without waiting.
    ///
    /// Each record's resolution completes before its redeploy task reads
    /// the descriptor; beyond that, no cross-record ordering exists.
    pub async fn redeploy_all(&self) {
        let failures = self.resolve_all().await;
        if failures > 0 {
            tracing::warn!(failures, "resolution round left records on stale descriptors");
        }
        for record in self.registry.list() {
            let controller = self.clone();
            let record = Arc::clone(record);
            let _ = tokio::spawn(async move {
                let _ = controller.redeploy(&record).await;
            });
        }
    }

    /// One resolution pass, then every record redeploys in parallel and
    /// the call waits until each reached a terminal state.
    pub async fn startup(&self) {
        let _ = self.resolve_all().await;
        let tasks: Vec<_> = self
            .registry
            .list()
            .iter()
            .map(|record| {
                let controller = self.clone();
                let record = Arc::clone(record);
                tokio::spawn(async move {
                    let _ = controller.redeploy(&record).await;
                })
            })
            .collect();
        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "startup redeploy task panicked");
            }
        }
        tracing::info!(
            records = self.registry.list().len(),
            "startup warm-up complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use hotswap_artifact::resolver::ResolvedArtifact;
    use hotswap_common::types::{Coordinate, UnitId};

    use super::*;
    use crate::session::session_source;

    fn create_tar(dir: &Path, name: &str) -> PathBuf {
        let tar_path = dir.join(name);
        let file = std::fs::File::create(&tar_path).expect("create tar");
        let mut builder = tar::Builder::new(file);
        let data = b"content";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "index.html", &data[..])
            .expect("append entry");
        builder.finish().expect("finish tar");
        tar_path
    }

    /// Resolver handing out the same archive for every coordinate.
    struct StubResolver {
        file: PathBuf,
        version: String,
        failing: Vec<String>,
    }

    #[async_trait]
    impl ArtifactResolver for StubResolver {
        async fn resolve_artifact(
            &self,
            coordinate: &Coordinate,
        ) -> Result<(ResolvedArtifact, Vec<Coordinate>)> {
            if self.failing.contains(&coordinate.name) {
                return Err(HotswapError::resolution(
                    coordinate.to_string(),
                    "repository unreachable",
                ));
            }
            Ok((
                ResolvedArtifact {
                    coordinate: coordinate.clone(),
                    version: self.version.clone(),
                    file: self.file.clone(),
                },
                Vec::new(),
            ))
        }
    }

    /// Host that tracks lifecycle calls and can be told to fail them.
    #[derive(Default)]
    struct RecordingHost {
        mounted: StdMutex<HashMap<UnitId, String>>,
        adds: AtomicUsize,
        removes: AtomicUsize,
        stops: AtomicUsize,
        fail_start: AtomicBool,
        fail_stop: AtomicBool,
        fail_remove: AtomicBool,
        start_gate: Option<tokio::sync::Semaphore>,
    }

    impl RecordingHost {
        fn mounted_count(&self) -> usize {
            self.mounted.lock().expect("lock").len()
        }
    }

    #[async_trait]
    impl ContainerHost for RecordingHost {
        async fn add_application(&self, deployment: Deployment) -> Result<UnitId> {
            let mut mounted = self.mounted.lock().expect("lock");
            assert!(
                !mounted.values().any(|p| *p == deployment.context_path),
                "two units on one context path"
            );
            let handle = UnitId::generate();
            let _ = mounted.insert(handle.clone(), deployment.context_path);
            let _ = self.adds.fetch_add(1, Ordering::SeqCst);
            Ok(handle)
        }

        async fn remove_application(&self, handle: &UnitId) -> Result<()> {
            if self.fail_remove.load(Ordering::SeqCst) {
                return Err(HotswapError::lifecycle("?", "remove refused"));
            }
            let _ = self
                .mounted
                .lock()
                .expect("lock")
                .remove(handle)
                .ok_or(HotswapError::NotFound {
                    kind: "deployed unit",
                    id: handle.to_string(),
                })?;
            let _ = self.removes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn start(&self, handle: &UnitId) -> Result<()> {
            if let Some(gate) = &self.start_gate {
                let permit = gate.acquire().await.expect("gate open");
                permit.forget();
            }
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(HotswapError::lifecycle(handle.to_string(), "start refused"));
            }
            Ok(())
        }

        async fn stop(&self, _handle: &UnitId) -> Result<()> {
            let _ = self.stops.fetch_add(1, Ordering::SeqCst);
            if self.fail_stop.load(Ordering::SeqCst) {
                return Err(HotswapError::lifecycle("?", "stop refused"));
            }
            Ok(())
        }
    }

    fn controller_with(
        host: Arc<RecordingHost>,
        resolver: StubResolver,
        apps: &[&str],
    ) -> Arc<Controller> {
        let mut registry = Registry::new();
        for entry in apps {
            let spec: hotswap_common::config::AppSpec = entry.parse().expect("spec");
            let _ = registry
                .register(&spec.context_path, spec.coordinate)
                .expect("register");
        }
        Arc::new(Controller::new(
            registry,
            host,
            Arc::new(resolver),
            session_source(false),
        ))
    }

    fn stub(file: PathBuf, version: &str) -> StubResolver {
        StubResolver {
            file,
            version: version.into(),
            failing: Vec::new(),
        }
    }

    #[tokio::test]
    async fn startup_deploys_every_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tar = create_tar(dir.path(), "app.tar");
        let host = Arc::new(RecordingHost::default());
        let controller = controller_with(
            Arc::clone(&host),
            stub(tar, "1.0"),
            &["app1=g:a:1.0", "g:b:2.0"],
        );

        controller.startup().await;

        for record in controller.registry().list() {
            assert_eq!(record.state(), AppState::Deployed);
            assert_eq!(record.current_unit().expect("unit").version, "1.0");
        }
        assert_eq!(host.adds.load(Ordering::SeqCst), 2);
        assert_eq!(host.mounted_count(), 2);
    }

    #[tokio::test]
    async fn resolution_failure_is_isolated_per_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tar = create_tar(dir.path(), "app.tar");
        let host = Arc::new(RecordingHost::default());
        let mut resolver = stub(tar, "1.0");
        resolver.failing = vec!["b".into()];
        let controller = controller_with(Arc::clone(&host), resolver, &["g:a:1.0", "g:b:1.0"]);

        controller.startup().await;

        let a = controller.registry().lookup("a").expect("a");
        let b = controller.registry().lookup("b").expect("b");
        assert_eq!(a.state(), AppState::Deployed);
        assert_eq!(b.state(), AppState::Failed);
        assert!(b.current_unit().is_none());
    }

    #[tokio::test]
    async fn sequential_redeploys_replace_the_unit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tar = create_tar(dir.path(), "app.tar");
        let host = Arc::new(RecordingHost::default());
        let controller = controller_with(Arc::clone(&host), stub(tar, "1.0"), &["g:a:1.0"]);
        let record = controller.registry().lookup("a").expect("a");

        let _ = controller.resolve_all().await;
        assert!(controller.redeploy(&record).await.expect("first"));
        let first = record.current_unit().expect("unit").handle;
        assert!(controller.redeploy(&record).await.expect("second"));
        let second = record.current_unit().expect("unit").handle;

        assert_ne!(first, second);
        assert_eq!(record.state(), AppState::Deployed);
        assert_eq!(host.adds.load(Ordering::SeqCst), 2);
        assert_eq!(host.removes.load(Ordering::SeqCst), 1);
        assert_eq!(host.mounted_count(), 1);
    }

    #[tokio::test]
    async fn start_failure_sets_failed_and_rolls_back_the_mount() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tar = create_tar(dir.path(), "app.tar");
        let host = Arc::new(RecordingHost::default());
        host.fail_start.store(true, Ordering::SeqCst);
        let controller = controller_with(Arc::clone(&host), stub(tar, "1.0"), &["g:a:1.0"]);
        let record = controller.registry().lookup("a").expect("a");

        let _ = controller.resolve_all().await;
        assert!(controller.redeploy(&record).await.is_err());

        assert_eq!(record.state(), AppState::Failed);
        assert!(record.current_unit().is_none());
        assert!(record.resolved().is_some());
        assert_eq!(host.mounted_count(), 0);

        // Next trigger recovers once the host cooperates again.
        host.fail_start.store(false, Ordering::SeqCst);
        assert!(controller.redeploy(&record).await.expect("retry"));
        assert_eq!(record.state(), AppState::Deployed);
    }

    #[tokio::test]
    async fn stop_failure_does_not_block_the_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tar = create_tar(dir.path(), "app.tar");
        let host = Arc::new(RecordingHost::default());
        let controller = controller_with(Arc::clone(&host), stub(tar, "1.0"), &["g:a:1.0"]);
        let record = controller.registry().lookup("a").expect("a");

        let _ = controller.resolve_all().await;
        assert!(controller.redeploy(&record).await.expect("deploy"));

        host.fail_stop.store(true, Ordering::SeqCst);
        assert!(controller.redeploy(&record).await.expect("redeploy"));
        assert_eq!(record.state(), AppState::Deployed);
        assert_eq!(host.removes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn remove_failure_keeps_handle_and_recovers_later() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tar = create_tar(dir.path(), "app.tar");
        let host = Arc::new(RecordingHost::default());
        let controller = controller_with(Arc::clone(&host), stub(tar, "1.0"), &["g:a:1.0"]);
        let record = controller.registry().lookup("a").expect("a");

        let _ = controller.resolve_all().await;
        assert!(controller.redeploy(&record).await.expect("deploy"));

        host.fail_remove.store(true, Ordering::SeqCst);
        assert!(controller.redeploy(&record).await.is_err());
        assert_eq!(record.state(), AppState::Failed);
        assert!(record.current_unit().is_some());

        host.fail_remove.store(false, Ordering::SeqCst);
        assert!(controller.redeploy(&record).await.expect("recover"));
        assert_eq!(record.state(), AppState::Deployed);
        assert_eq!(host.mounted_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_second_trigger_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tar = create_tar(dir.path(), "app.tar");
        let host = Arc::new(RecordingHost {
            start_gate: Some(tokio::sync::Semaphore::new(0)),
            ..RecordingHost::default()
        });
        let controller = controller_with(Arc::clone(&host), stub(tar, "1.0"), &["g:a:1.0"]);
        let record = controller.registry().lookup("a").expect("a");

        let _ = controller.resolve_all().await;
        let in_flight = {
            let controller = Arc::clone(&controller);
            let record = Arc::clone(&record);
            tokio::spawn(async move { controller.redeploy(&record).await })
        };

        // Wait until the first cycle is parked inside the host start call.
        while record.state() != AppState::Deploying {
            tokio::task::yield_now().await;
        }
        assert!(!controller.redeploy(&record).await.expect("second trigger"));

        if let Some(gate) = &host.start_gate {
            gate.add_permits(1);
        }
        assert!(in_flight.await.expect("join").expect("first trigger"));
        assert_eq!(record.state(), AppState::Deployed);
        assert_eq!(host.adds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn deploy_without_resolution_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tar = create_tar(dir.path(), "app.tar");
        let host = Arc::new(RecordingHost::default());
        let controller = controller_with(Arc::clone(&host), stub(tar, "1.0"), &["g:a:1.0"]);
        let record = controller.registry().lookup("a").expect("a");

        let result = controller.redeploy(&record).await;
        assert!(matches!(result, Err(HotswapError::Resolution { .. })));
        assert_eq!(record.state(), AppState::Failed);
    }
}
