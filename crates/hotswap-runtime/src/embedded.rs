//! In-process container host.
//!
//! Mounts deployed units in a shared table and serves their resources
//! through each unit's composite view. One unit per context path: a second
//! mount on an occupied path is refused so the at-most-one invariant holds
//! even if a caller misbehaves.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use hotswap_common::error::{HotswapError, Result};
use hotswap_common::types::UnitId;

use crate::host::{ContainerHost, Deployment};

/// A resource served out of a running unit.
#[derive(Debug)]
pub struct ServedResource {
    /// Resource bytes from the unit's composite view.
    pub content: Vec<u8>,
    /// Session ID minted for this request, when it arrived without one.
    pub minted_session: Option<String>,
}

#[derive(Debug)]
struct MountedUnit {
    deployment: Deployment,
    running: bool,
}

/// Container host living inside the controller process.
#[derive(Debug, Default)]
pub struct EmbeddedHost {
    units: RwLock<HashMap<UnitId, MountedUnit>>,
}

impl EmbeddedHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves a resource from the running unit mounted at `context_path`.
    ///
    /// Returns `None` while no running unit owns the path or the resource
    /// does not exist in the unit's view. A request without a session ID
    /// gets one minted from the unit's session manager.
    #[must_use]
    pub fn serve(
        &self,
        context_path: &str,
        resource_path: &str,
        session_id: Option<&str>,
    ) -> Option<ServedResource> {
        let units = self
            .units
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let unit = units
            .values()
            .find(|u| u.running && u.deployment.context_path == context_path)?;
        let content = unit.deployment.resources.get(resource_path)?;
        let minted_session = match session_id {
            Some(_) => None,
            None => Some(unit.deployment.sessions.create()),
        };
        Some(ServedResource {
            content,
            minted_session,
        })
    }

    /// Whether any unit (running or not) is mounted at the path.
    #[must_use]
    pub fn is_mounted(&self, context_path: &str) -> bool {
        self.units
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .any(|u| u.deployment.context_path == context_path)
    }

    /// Number of mounted units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl ContainerHost for EmbeddedHost {
    async fn add_application(&self, deployment: Deployment) -> Result<UnitId> {
        let mut units = self
            .units
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if units
            .values()
            .any(|u| u.deployment.context_path == deployment.context_path)
        {
            return Err(HotswapError::lifecycle(
                deployment.context_path,
                "context path already occupied by another unit",
            ));
        }
        let handle = UnitId::generate();
        tracing::info!(
            handle = %handle,
            context_path = %deployment.context_path,
            archive = %deployment.archive.display(),
            "unit mounted"
        );
        let _ = units.insert(
            handle.clone(),
            MountedUnit {
                deployment,
                running: false,
            },
        );
        Ok(handle)
    }

    async fn remove_application(&self, handle: &UnitId) -> Result<()> {
        let mut units = self
            .units
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match units.remove(handle) {
            Some(unit) => {
                tracing::info!(
                    handle = %handle,
                    context_path = %unit.deployment.context_path,
                    "unit removed"
                );
                Ok(())
            }
            None => Err(HotswapError::NotFound {
                kind: "deployed unit",
                id: handle.to_string(),
            }),
        }
    }

    async fn start(&self, handle: &UnitId) -> Result<()> {
        self.set_running(handle, true)
    }

    async fn stop(&self, handle: &UnitId) -> Result<()> {
        self.set_running(handle, false)
    }
}

impl EmbeddedHost {
    fn set_running(&self, handle: &UnitId, running: bool) -> Result<()> {
        let mut units = self
            .units
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match units.get_mut(handle) {
            Some(unit) => {
                unit.running = running;
                tracing::debug!(
                    handle = %handle,
                    context_path = %unit.deployment.context_path,
                    running,
                    "unit state flipped"
                );
                Ok(())
            }
            None => Err(HotswapError::NotFound {
                kind: "deployed unit",
                id: handle.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use hotswap_resources::composite::CompositeResourceView;

    use super::*;
    use crate::session::{session_source, SessionManager};

    fn create_tar(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let tar_path = dir.join(name);
        let file = std::fs::File::create(&tar_path).expect("create tar");
        let mut builder = tar::Builder::new(file);
        for (entry_name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, entry_name, *data)
                .expect("append entry");
        }
        builder.finish().expect("finish tar");
        tar_path
    }

    fn deployment(dir: &Path, context_path: &str) -> Deployment {
        let archive = create_tar(
            dir,
            &format!("{context_path}.tar"),
            &[("index.html", b"hello")],
        );
        let resources = CompositeResourceView::open(Vec::new(), &archive).expect("view");
        Deployment {
            context_path: context_path.into(),
            archive,
            resources,
            sessions: SessionManager::new(session_source(false)),
        }
    }

    #[tokio::test]
    async fn started_unit_serves_resources() {
        let dir = tempfile::tempdir().expect("tempdir");
        let host = EmbeddedHost::new();
        let handle = host
            .add_application(deployment(dir.path(), "shop"))
            .await
            .expect("mount");
        host.start(&handle).await.expect("start");

        let served = host.serve("shop", "index.html", None).expect("served");
        assert_eq!(served.content, b"hello");
        assert!(served.minted_session.is_some());
    }

    #[tokio::test]
    async fn stopped_unit_serves_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let host = EmbeddedHost::new();
        let handle = host
            .add_application(deployment(dir.path(), "shop"))
            .await
            .expect("mount");

        assert!(host.serve("shop", "index.html", None).is_none());
        host.start(&handle).await.expect("start");
        host.stop(&handle).await.expect("stop");
        assert!(host.serve("shop", "index.html", None).is_none());
    }

    #[tokio::test]
    async fn duplicate_context_path_is_refused() {
        let dir = tempfile::tempdir().expect("tempdir");
        let host = EmbeddedHost::new();
        let _first = host
            .add_application(deployment(dir.path(), "shop"))
            .await
            .expect("mount");

        let result = host.add_application(deployment(dir.path(), "shop")).await;
        assert!(matches!(result, Err(HotswapError::Lifecycle { .. })));
        assert_eq!(host.unit_count(), 1);
    }

    #[tokio::test]
    async fn removed_unit_frees_its_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let host = EmbeddedHost::new();
        let handle = host
            .add_application(deployment(dir.path(), "shop"))
            .await
            .expect("mount");
        host.remove_application(&handle).await.expect("remove");

        assert!(!host.is_mounted("shop"));
        assert!(host
            .add_application(deployment(dir.path(), "shop"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn lifecycle_on_unknown_handle_errors() {
        let host = EmbeddedHost::new();
        let ghost = UnitId::new("ghost");
        assert!(host.start(&ghost).await.is_err());
        assert!(host.stop(&ghost).await.is_err());
        assert!(host.remove_application(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn request_with_session_id_mints_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let host = EmbeddedHost::new();
        let handle = host
            .add_application(deployment(dir.path(), "shop"))
            .await
            .expect("mount");
        host.start(&handle).await.expect("start");

        let served = host
            .serve("shop", "index.html", Some("existing"))
            .expect("served");
        assert!(served.minted_session.is_none());
    }
}
