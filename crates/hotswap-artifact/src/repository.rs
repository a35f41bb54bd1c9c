//! Repository URI dispatch.
//!
//! Supports `file://` (local directory tree) and `http(s)://` (remote
//! repository with a local download cache).

use std::path::Path;
use std::sync::Arc;

use hotswap_common::error::{HotswapError, Result};

use crate::local::LocalRepository;
use crate::remote::RemoteRepository;
use crate::resolver::ArtifactResolver;

/// Opens the resolver matching a repository URI scheme.
///
/// `cache_dir` is only used by remote repositories, as the landing
/// directory for downloaded archives.
///
/// # Errors
///
/// Returns an error if the URI scheme is unsupported or the repository
/// cannot be opened.
pub fn open_repository(uri: &str, cache_dir: &Path) -> Result<Arc<dyn ArtifactResolver>> {
    if let Some(path) = uri.strip_prefix("file://") {
        tracing::info!(path, "using local repository");
        Ok(Arc::new(LocalRepository::open(path)?))
    } else if uri.starts_with("https://") || uri.starts_with("http://") {
        tracing::info!(url = uri, "using remote repository");
        Ok(Arc::new(RemoteRepository::open(uri, cache_dir)?))
    } else {
        Err(HotswapError::Config {
            message: format!("unsupported repository URI scheme: {uri}"),
        })
    }
}
