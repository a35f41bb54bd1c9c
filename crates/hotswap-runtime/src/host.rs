//! Container host abstraction.
//!
//! The host runs deployed units and routes their traffic. Add/remove for
//! one context path is not reentrant — the coordinator's per-record lock
//! serializes those calls.

use std::path::PathBuf;

use async_trait::async_trait;
use hotswap_common::error::Result;
use hotswap_common::types::UnitId;
use hotswap_resources::composite::CompositeResourceView;

use crate::session::SessionManager;

/// Everything the host needs to mount one application instance.
#[derive(Debug)]
pub struct Deployment {
    /// Routing prefix the unit is bound to.
    pub context_path: String,
    /// Primary artifact archive backing the unit.
    pub archive: PathBuf,
    /// Resource view built for this unit; dies with it.
    pub resources: CompositeResourceView,
    /// Session manager attached to this unit; dies with it.
    pub sessions: SessionManager,
}

/// Runs deployed units on behalf of the coordinator.
///
/// Lifecycle errors are returned to the caller, which logs them and moves
/// the affected record to `Failed` — they never crash the controller.
#[async_trait]
pub trait ContainerHost: Send + Sync {
    /// Mounts a new unit for the deployment, without starting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the unit cannot be mounted — in particular when
    /// another unit already occupies the context path.
    async fn add_application(&self, deployment: Deployment) -> Result<UnitId>;

    /// Unmounts a unit. After this returns `Ok`, the handle is dead.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown or removal fails.
    async fn remove_application(&self, handle: &UnitId) -> Result<()>;

    /// Starts serving traffic for a mounted unit.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown or the unit refuses to
    /// start.
    async fn start(&self, handle: &UnitId) -> Result<()>;

    /// Stops serving traffic for a unit, leaving it mounted.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown or the unit refuses to
    /// stop.
    async fn stop(&self, handle: &UnitId) -> Result<()>;
}
