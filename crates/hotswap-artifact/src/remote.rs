//! HTTP artifact repository with a local download cache.
//!
//! The remote layout mirrors the local one: `<base>/<group>/<name>/` serves
//! an `index.json` describing available versions plus the archives
//! themselves. Downloads land in the local cache, are verified against the
//! index digest when one is published, and gzip-compressed payloads are
//! stored decompressed so resource sets can seek into them.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hotswap_common::constants::ARCHIVE_EXTENSION;
use hotswap_common::error::{HotswapError, Result};
use hotswap_common::types::Coordinate;
use serde::Deserialize;

use crate::coordinate::select_version;
use crate::hash::validate_hash;
use crate::resolver::{ArtifactResolver, ResolvedArtifact};

/// Per-artifact index document served by a remote repository.
#[derive(Debug, Deserialize)]
struct ArtifactIndex {
    /// Version string -> metadata for that version.
    versions: BTreeMap<String, VersionEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct VersionEntry {
    /// Archive filename when it differs from `<name>-<version>.tar`.
    #[serde(default)]
    archive: Option<String>,
    /// Hex SHA-256 of the published archive, verified after download.
    #[serde(default)]
    sha256: Option<String>,
    /// Direct dependency coordinates, in shadowing order.
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Artifact repository reached over HTTP, caching downloads locally.
#[derive(Debug)]
pub struct RemoteRepository {
    base_url: String,
    cache: PathBuf,
    client: reqwest::Client,
}

impl RemoteRepository {
    /// Creates a repository client for the given base URL and cache dir.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be created.
    pub fn open(base_url: impl Into<String>, cache: impl Into<PathBuf>) -> Result<Self> {
        let base_url = base_url.into();
        let cache = cache.into();
        std::fs::create_dir_all(&cache).map_err(|e| HotswapError::io(&cache, e))?;
        tracing::info!(url = %base_url, cache = %cache.display(), "opened remote repository");
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
            client: reqwest::Client::new(),
        })
    }

    /// Returns the path an archive is cached at once downloaded.
    #[must_use]
    pub fn cached_archive(&self, coordinate: &Coordinate, version: &str) -> PathBuf {
        self.cache
            .join(&coordinate.group)
            .join(&coordinate.name)
            .join(format!(
                "{}-{version}.{ARCHIVE_EXTENSION}",
                coordinate.name
            ))
    }

    async fn fetch_index(&self, coordinate: &Coordinate) -> Result<ArtifactIndex> {
        let url = format!(
            "{}/{}/{}/index.json",
            self.base_url, coordinate.group, coordinate.name
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| HotswapError::resolution(coordinate.to_string(), e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| HotswapError::resolution(coordinate.to_string(), e.to_string()))
    }

    async fn download(
        &self,
        coordinate: &Coordinate,
        version: &str,
        entry: &VersionEntry,
    ) -> Result<PathBuf> {
        let cached = self.cached_archive(coordinate, version);
        if cached.is_file() {
            tracing::debug!(path = %cached.display(), "archive already cached");
            return Ok(cached);
        }

        let archive_name = entry.archive.clone().unwrap_or_else(|| {
            format!("{}-{version}.{ARCHIVE_EXTENSION}", coordinate.name)
        });
        let url = format!(
            "{}/{}/{}/{archive_name}",
            self.base_url, coordinate.group, coordinate.name
        );
        tracing::info!(url = %url, "downloading artifact archive");

        let bytes = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| HotswapError::resolution(coordinate.to_string(), e.to_string()))?
            .bytes()
            .await
            .map_err(|e| HotswapError::resolution(coordinate.to_string(), e.to_string()))?;

        if let Some(parent) = cached.parent() {
            std::fs::create_dir_all(parent).map_err(|e| HotswapError::io(parent, e))?;
        }
        let part = cached.with_extension("part");
        std::fs::write(&part, &bytes).map_err(|e| HotswapError::io(&part, e))?;

        if let Some(expected) = &entry.sha256 {
            if let Err(e) = validate_hash(&part, expected) {
                let _ = std::fs::remove_file(&part);
                return Err(e);
            }
        }

        store_archive(&part, &cached, is_gzip_name(&archive_name))?;
        tracing::info!(path = %cached.display(), size = bytes.len(), "archive cached");
        Ok(cached)
    }
}

#[async_trait]
impl ArtifactResolver for RemoteRepository {
    async fn resolve_artifact(
        &self,
        coordinate: &Coordinate,
    ) -> Result<(ResolvedArtifact, Vec<Coordinate>)> {
        let index = self.fetch_index(coordinate).await?;
        let available: Vec<String> = index.versions.keys().cloned().collect();
        let Some(version) = select_version(&available, &coordinate.version) else {
            return Err(HotswapError::resolution(
                coordinate.to_string(),
                format!("no version satisfies the request (available: {available:?})"),
            ));
        };
        let version = version.to_string();
        let Some(entry) = index.versions.get(&version) else {
            return Err(HotswapError::resolution(
                coordinate.to_string(),
                format!("index has no entry for selected version {version}"),
            ));
        };

        let file = self.download(coordinate, &version, entry).await?;
        let dependencies = entry
            .dependencies
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<Coordinate>>>()?;

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

/// Moves a downloaded archive into its cache slot, decompressing gzip
/// payloads into plain tar on the way.
fn store_archive(src: &Path, dest: &Path, gzipped: bool) -> Result<()> {
    if gzipped {
        let file = std::fs::File::open(src).map_err(|e| HotswapError::io(src, e))?;
        let mut decoder = flate2::read::GzDecoder::new(file);
        let mut out = std::fs::File::create(dest).map_err(|e| HotswapError::io(dest, e))?;
        std::io::copy(&mut decoder, &mut out).map_err(|e| HotswapError::io(dest, e))?;
        out.flush().map_err(|e| HotswapError::io(dest, e))?;
        std::fs::remove_file(src).map_err(|e| HotswapError::io(src, e))?;
    } else {
        std::fs::rename(src, dest).map_err(|e| HotswapError::io(dest, e))?;
    }
    Ok(())
}

/// Determines whether the archive is gzip-compressed based on its name.
fn is_gzip_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".gz") || lower.ends_with(".tgz")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_gzip_name_detects_extensions() {
        assert!(is_gzip_name("shop-1.0.tar.gz"));
        assert!(is_gzip_name("shop-1.0.tgz"));
        assert!(!is_gzip_name("shop-1.0.tar"));
    }

    #[test]
    fn index_deserializes_full_entry() {
        let json = r#"{
            "versions": {
                "1.0": {
                    "archive": "shop-1.0.tar.gz",
                    "sha256": "abc",
                    "dependencies": ["acme:commons:1.0"]
                },
                "1.1": {}
            }
        }"#;
        let index: ArtifactIndex = serde_json::from_str(json).expect("parse");
        assert_eq!(index.versions.len(), 2);
        let v1 = &index.versions["1.0"];
        assert_eq!(v1.archive.as_deref(), Some("shop-1.0.tar.gz"));
        assert_eq!(v1.dependencies, vec!["acme:commons:1.0"]);
        assert!(index.versions["1.1"].sha256.is_none());
    }

    #[test]
    fn cached_archive_path_is_per_coordinate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo =
            RemoteRepository::open("http://repo.example", dir.path()).expect("open");
        let coordinate: Coordinate = "acme:shop:1.0".parse().expect("coordinate");
        let path = repo.cached_archive(&coordinate, "1.2");
        assert!(path.ends_with("acme/shop/shop-1.2.tar"));
    }

    #[test]
    fn store_archive_moves_plain_tar() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("download.part");
        let dest = dir.path().join("shop-1.0.tar");
        std::fs::write(&src, b"tar bytes").expect("write");

        store_archive(&src, &dest, false).expect("store");
        assert!(!src.exists());
        assert_eq!(std::fs::read(&dest).expect("read"), b"tar bytes");
    }

    #[test]
    fn store_archive_decompresses_gzip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("download.part");
        let dest = dir.path().join("shop-1.0.tar");

        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"inner tar bytes").expect("encode");
        let compressed = encoder.finish().expect("finish");
        std::fs::write(&src, compressed).expect("write");

        store_archive(&src, &dest, true).expect("store");
        assert!(!src.exists());
        assert_eq!(std::fs::read(&dest).expect("read"), b"inner tar bytes");
    }
}
