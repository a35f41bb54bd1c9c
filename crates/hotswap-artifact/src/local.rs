//! Directory-layout artifact repository.
//!
//! Layout: `<root>/<group>/<name>/` holds `<name>-<version>.tar` archives,
//! each optionally accompanied by `<name>-<version>.deps.json` — an ordered
//! JSON array of dependency coordinate strings.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hotswap_common::constants::{ARCHIVE_EXTENSION, DEPS_MANIFEST_SUFFIX};
use hotswap_common::error::{HotswapError, Result};
use hotswap_common::types::Coordinate;

use crate::coordinate::select_version;
use crate::resolver::{ArtifactResolver, ResolvedArtifact};

/// Artifact repository backed by a local directory tree.
#[derive(Debug)]
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    /// Opens a repository at the given root directory.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the root does not exist.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(HotswapError::NotFound {
                kind: "repository root",
                id: root.display().to_string(),
            });
        }
        tracing::info!(root = %root.display(), "opened local repository");
        Ok(Self { root })
    }

    /// Returns the repository root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, coordinate: &Coordinate) -> PathBuf {
        self.root.join(&coordinate.group).join(&coordinate.name)
    }

    /// Lists the versions for which an archive is present.
    fn list_versions(&self, coordinate: &Coordinate) -> Result<Vec<String>> {
        let dir = self.artifact_dir(coordinate);
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            HotswapError::resolution(
                coordinate.to_string(),
                format!("artifact directory {} unreadable: {e}", dir.display()),
            )
        })?;

        let prefix = format!("{}-", coordinate.name);
        let suffix = format!(".{ARCHIVE_EXTENSION}");
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| HotswapError::io(&dir, e))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(version) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&suffix))
            {
                versions.push(version.to_string());
            }
        }
        Ok(versions)
    }

    fn read_dependencies(
        &self,
        coordinate: &Coordinate,
        version: &str,
    ) -> Result<Vec<Coordinate>> {
        let manifest = self.artifact_dir(coordinate).join(format!(
            "{}-{version}{DEPS_MANIFEST_SUFFIX}",
            coordinate.name
        ));
        if !manifest.is_file() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&manifest)
            .map_err(|e| HotswapError::io(&manifest, e))?;
        let entries: Vec<String> = serde_json::from_str(&content)?;
        entries.iter().map(|s| s.parse()).collect()
    }
}

#[async_trait]
impl ArtifactResolver for LocalRepository {
    async fn resolve_artifact(
        &self,
        coordinate: &Coordinate,
    ) -> Result<(ResolvedArtifact, Vec<Coordinate>)> {
        let available = self.list_versions(coordinate)?;
        let Some(version) = select_version(&available, &coordinate.version) else {
            return Err(HotswapError::resolution(
                coordinate.to_string(),
                format!("no version satisfies the request (available: {available:?})"),
            ));
        };
        let version = version.to_string();
        let file = self.artifact_dir(coordinate).join(format!(
            "{}-{version}.{ARCHIVE_EXTENSION}",
            coordinate.name
        ));
        let dependencies = self.read_dependencies(coordinate, &version)?;
        tracing::debug!(
            coordinate = %coordinate,
            version = %version,
            file = %file.display(),
            "resolved from local repository"
        );
        Ok((
            ResolvedArtifact {
                coordinate: coordinate.clone(),
                version,
                file,
            },
            dependencies,
        ))
    }
}
