//! The fixed application registry.
//!
//! Records are created once at startup and never added or removed
//! afterward; the lookup maps are frozen and every mutable field lives
//! behind its own lock, so status reads are snapshot-safe without touching
//! any record's transition lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use hotswap_artifact::resolver::{ArtifactResolver, ResolvedApp};
use hotswap_common::config::AppSpec;
use hotswap_common::error::{HotswapError, Result};
use hotswap_common::types::{AppState, Coordinate, UnitId};
use serde::Serialize;

/// The live handle into the container host for one running instance.
///
/// Exclusively owned by its record and replaced wholesale on each
/// redeploy, never mutated.
#[derive(Debug, Clone)]
pub struct DeployedUnit {
    /// Host handle for lifecycle calls.
    pub handle: UnitId,
    /// Resolved version this unit is running.
    pub version: String,
    /// ISO-8601 deployment timestamp.
    pub deployed_at: String,
}

/// One declared application and everything the controller knows about it.
#[derive(Debug)]
pub struct AppRecord {
    context_path: String,
    coordinate: Coordinate,
    resolved: RwLock<Option<ResolvedApp>>,
    resolution_error: RwLock<Option<String>>,
    state: RwLock<AppState>,
    unit: Mutex<Option<DeployedUnit>>,
    transition: tokio::sync::Mutex<()>,
}

impl AppRecord {
    fn new(context_path: String, coordinate: Coordinate) -> Self {
        Self {
            context_path,
            coordinate,
            resolved: RwLock::new(None),
            resolution_error: RwLock::new(None),
            state: RwLock::new(AppState::Undeployed),
            unit: Mutex::new(None),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// Routing prefix this record is bound to.
    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Declared coordinate of the primary artifact.
    #[must_use]
    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> AppState {
        *self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn set_state(&self, state: AppState) {
        *self
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = state;
    }

    /// Snapshot of the latest successful resolution, if any.
    #[must_use]
    pub fn resolved(&self) -> Option<ResolvedApp> {
        self.resolved
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Replaces descriptor and dependency list together and clears the
    /// round's error — the all-or-nothing half of a resolution round.
    pub(crate) fn set_resolved(&self, app: ResolvedApp) {
        *self
            .resolved
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(app);
        *self
            .resolution_error
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    /// Records a failed round, leaving the previous descriptor untouched.
    pub(crate) fn set_resolution_failure(&self, message: String) {
        *self
            .resolution_error
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(message);
    }

    /// Error message of the last failed resolution round, if any.
    #[must_use]
    pub fn resolution_error(&self) -> Option<String> {
        self.resolution_error
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the current deployed unit, if any.
    #[must_use]
    pub fn current_unit(&self) -> Option<DeployedUnit> {
        self.unit
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn store_unit(&self, unit: DeployedUnit) {
        *self
            .unit
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(unit);
    }

    pub(crate) fn clear_unit(&self) {
        *self
            .unit
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    pub(crate) fn transition_lock(&self) -> &tokio::sync::Mutex<()> {
        &self.transition
    }

    /// Point-in-time status row for the control surface.
    #[must_use]
    pub fn status(&self) -> AppStatus {
        let resolved = self
            .resolved
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        AppStatus {
            context_path: self.context_path.clone(),
            coordinate: self.coordinate.to_string(),
            resolved_version: resolved.as_ref().map(|r| r.artifact.version.clone()),
            deployed_version: self.current_unit().map(|u| u.version),
            dependency_count: resolved.as_ref().map_or(0, |r| r.dependencies.len()),
            state: self.state(),
            resolution_error: self.resolution_error(),
        }
    }
}

/// Read-only status snapshot of one record.
#[derive(Debug, Clone, Serialize)]
pub struct AppStatus {
    /// Routing prefix.
    pub context_path: String,
    /// Declared coordinate.
    pub coordinate: String,
    /// Latest resolved (available) version.
    pub resolved_version: Option<String>,
    /// Version the live unit is running, if one is live.
    pub deployed_version: Option<String>,
    /// Number of resolved dependency descriptors.
    pub dependency_count: usize,
    /// Lifecycle state.
    pub state: AppState,
    /// Error of the last failed resolution round, if any.
    pub resolution_error: Option<String>,
}

/// Fixed mapping of context path to application record.
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<Arc<AppRecord>>,
    by_path: HashMap<String, Arc<AppRecord>>,
    by_coordinate: HashMap<Coordinate, Arc<AppRecord>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from declared startup entries, in order.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate context paths or coordinates.
    pub fn from_specs(specs: &[AppSpec]) -> Result<Self> {
        let mut registry = Self::new();
        for spec in specs {
            let _ = registry.register(&spec.context_path, spec.coordinate.clone())?;
        }
        Ok(registry)
    }

    /// Registers an application. Startup-only: the registry is frozen and
    /// shared once the controller starts.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error when the context path or coordinate is
    /// already registered.
    pub fn register(
        &mut self,
        context_path: &str,
        coordinate: Coordinate,
    ) -> Result<Arc<AppRecord>> {
        if self.by_path.contains_key(context_path) {
            return Err(HotswapError::Config {
                message: format!("context path already registered: {context_path}"),
            });
        }
        if self.by_coordinate.contains_key(&coordinate) {
            return Err(HotswapError::Config {
                message: format!("coordinate already registered: {coordinate}"),
            });
        }
        let record = Arc::new(AppRecord::new(context_path.to_string(), coordinate.clone()));
        self.records.push(Arc::clone(&record));
        let _ = self
            .by_path
            .insert(context_path.to_string(), Arc::clone(&record));
        let _ = self.by_coordinate.insert(coordinate, Arc::clone(&record));
        tracing::info!(context_path, coordinate = %record.coordinate(), "application registered");
        Ok(record)
    }

    /// Looks up a record by context path.
    #[must_use]
    pub fn lookup(&self, context_path: &str) -> Option<Arc<AppRecord>> {
        self.by_path.get(context_path).cloned()
    }

    /// Looks up a record by its declared coordinate.
    #[must_use]
    pub fn lookup_coordinate(&self, coordinate: &Coordinate) -> Option<Arc<AppRecord>> {
        self.by_coordinate.get(coordinate).cloned()
    }

    /// All records, in declaration order.
    #[must_use]
    pub fn list(&self) -> &[Arc<AppRecord>] {
        &self.records
    }

    /// Status snapshot of every record, in declaration order.
    #[must_use]
    pub fn status(&self) -> Vec<AppStatus> {
        self.records.iter().map(|r| r.status()).collect()
    }

    /// Resolves every record's coordinate concurrently.
    ///
    /// Per record, all-or-nothing: success replaces descriptor and
    /// dependency list together, failure leaves the previous descriptor
    /// untouched and records the error. Returns the number of records
    /// whose round failed.
    pub async fn resolve_all(&self, resolver: &dyn ArtifactResolver) -> usize {
        let rounds = self.records.iter().map(|record| async move {
            match resolver.resolve(record.coordinate()).await {
                Ok(app) => {
                    tracing::info!(
                        context_path = record.context_path(),
                        version = %app.artifact.version,
                        dependencies = app.dependencies.len(),
                        "resolved"
                    );
                    record.set_resolved(app);
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        context_path = record.context_path(),
                        coordinate = %record.coordinate(),
                        error = %e,
                        "resolution failed, keeping previous descriptor"
                    );
                    record.set_resolution_failure(e.to_string());
                    false
                }
            }
        });
        let results = futures::future::join_all(rounds).await;
        results.iter().filter(|ok| !**ok).count()
    }
}
