//! The artifact resolver contract and transitive dependency flattening.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::path::PathBuf;

use async_trait::async_trait;
use hotswap_common::error::Result;
use hotswap_common::types::Coordinate;

/// A coordinate resolved to a concrete version and a retrievable file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    /// Coordinate this descriptor was resolved from.
    pub coordinate: Coordinate,
    /// Concrete version the repository settled on.
    pub version: String,
    /// Local path of the artifact archive.
    pub file: PathBuf,
}

/// A fully resolved application: its primary artifact plus the ordered,
/// transitively flattened dependency descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedApp {
    /// The application's own artifact.
    pub artifact: ResolvedArtifact,
    /// Dependency descriptors in shadowing order (earlier wins).
    pub dependencies: Vec<ResolvedArtifact>,
}

/// Resolves coordinates against a repository.
///
/// A resolver never partially mutates caller state: it either returns a
/// complete result or an error, and the caller decides what to keep.
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    /// Resolves one coordinate to its artifact and the coordinates of its
    /// direct dependencies.
    ///
    /// # Errors
    ///
    /// Returns a `Resolution` error when the coordinate has no satisfiable
    /// version or the repository cannot be reached.
    async fn resolve_artifact(
        &self,
        coordinate: &Coordinate,
    ) -> Result<(ResolvedArtifact, Vec<Coordinate>)>;

    /// Resolves a coordinate and flattens its transitive dependencies.
    ///
    /// Breadth-first over the dependency declarations: direct dependencies
    /// keep their declared order, nearer declarations shadow farther ones,
    /// and a group+name already seen is not resolved again (cycle-safe).
    ///
    /// # Errors
    ///
    /// Returns a `Resolution` error if the primary artifact or any reachable
    /// dependency fails to resolve.
    async fn resolve(&self, coordinate: &Coordinate) -> Result<ResolvedApp> {
        let (artifact, direct) = self.resolve_artifact(coordinate).await?;

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let _ = seen.insert((coordinate.group.clone(), coordinate.name.clone()));

        let mut queue: VecDeque<Coordinate> = VecDeque::new();
        let mut dependencies = Vec::new();
        enqueue_unseen(&mut queue, &mut seen, direct);

        while let Some(dep) = queue.pop_front() {
            let (resolved, transitive) = self.resolve_artifact(&dep).await?;
            tracing::debug!(
                coordinate = %dep,
                version = %resolved.version,
                "dependency resolved"
            );
            dependencies.push(resolved);
            enqueue_unseen(&mut queue, &mut seen, transitive);
        }

        Ok(ResolvedApp {
            artifact,
            dependencies,
        })
    }
}

fn enqueue_unseen(
    queue: &mut VecDeque<Coordinate>,
    seen: &mut HashSet<(String, String)>,
    coordinates: Vec<Coordinate>,
) {
    for c in coordinates {
        if seen.insert((c.group.clone(), c.name.clone())) {
            queue.push_back(c);
        }
    }
}
