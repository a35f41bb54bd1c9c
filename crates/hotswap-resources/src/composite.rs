//! Layered first-match-wins lookup over ordered resource sets.
//!
//! One view per deployed unit: built from the unit's dependency archives at
//! deployment time, discarded with the unit, never patched. Earlier
//! archives shadow later ones, so callers control shadowing through
//! dependency-list order.

use std::path::{Path, PathBuf};

use hotswap_common::error::Result;

use crate::archive::ArchiveResourceSet;

/// One logical resource namespace for an application: its dependency
/// archives in declared order, falling back to the application's own
/// primary archive.
#[derive(Debug)]
pub struct CompositeResourceView {
    sets: Vec<ArchiveResourceSet>,
    fallback: ArchiveResourceSet,
}

impl CompositeResourceView {
    /// Opens one resource set per dependency archive, in the given order,
    /// plus the primary archive as the fallback set.
    ///
    /// The dependency list is taken by value: the view owns its inputs and
    /// holds no reference back to the record it was built for.
    ///
    /// # Errors
    ///
    /// Returns a `Construction` error if any archive cannot be opened —
    /// a total open failure aborts the owning deploy attempt.
    pub fn open(dependencies: Vec<PathBuf>, primary: &Path) -> Result<Self> {
        let mut sets = Vec::with_capacity(dependencies.len());
        for archive in &dependencies {
            sets.push(ArchiveResourceSet::open(archive)?);
        }
        let fallback = ArchiveResourceSet::open(primary)?;
        tracing::debug!(
            sets = sets.len(),
            primary = %primary.display(),
            "composite resource view built"
        );
        Ok(Self { sets, fallback })
    }

    /// Looks up a resource across the layered sets.
    ///
    /// Checks each dependency set in declared order and returns the first
    /// match; a lookup error against one set is logged and treated as "not
    /// found in this set". When no dependency set matches, the primary
    /// archive's own resolution is consulted.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        for set in &self.sets {
            match set.get(path) {
                Ok(Some(content)) => return Some(content),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(
                        archive = %set.archive_path().display(),
                        path,
                        error = %e,
                        "resource set lookup failed, continuing"
                    );
                }
            }
        }
        match self.fallback.get(path) {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(
                    archive = %self.fallback.archive_path().display(),
                    path,
                    error = %e,
                    "fallback lookup failed"
                );
                None
            }
        }
    }

    /// Number of dependency-backed sets (the fallback is not counted).
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.sets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn earlier_set_shadows_later_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = create_tar(dir.path(), "a.tar", &[("x.class", b"from a")]);
        let b = create_tar(dir.path(), "b.tar", &[("x.class", b"from b")]);
        let primary = create_tar(dir.path(), "app.tar", &[("index.html", b"app")]);

        let view = CompositeResourceView::open(vec![a, b], &primary).expect("open");
        assert_eq!(view.get("/x.class").expect("present"), b"from a");
    }

    #[test]
    fn later_set_serves_what_earlier_lacks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = create_tar(dir.path(), "a.tar", &[("a.class", b"a")]);
        let b = create_tar(dir.path(), "b.tar", &[("b.class", b"b")]);
        let primary = create_tar(dir.path(), "app.tar", &[]);

        let view = CompositeResourceView::open(vec![a, b], &primary).expect("open");
        assert_eq!(view.get("b.class").expect("present"), b"b");
    }

    #[test]
    fn falls_back_to_primary_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = create_tar(dir.path(), "a.tar", &[("a.class", b"a")]);
        let primary = create_tar(dir.path(), "app.tar", &[("index.html", b"<html/>")]);

        let view = CompositeResourceView::open(vec![a], &primary).expect("open");
        assert_eq!(view.get("index.html").expect("present"), b"<html/>");
    }

    #[test]
    fn missing_everywhere_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = create_tar(dir.path(), "a.tar", &[("a.class", b"a")]);
        let primary = create_tar(dir.path(), "app.tar", &[("index.html", b"x")]);

        let view = CompositeResourceView::open(vec![a], &primary).expect("open");
        assert!(view.get("/nope.class").is_none());
    }

    #[test]
    fn unopenable_dependency_aborts_construction() {
        let dir = tempfile::tempdir().expect("tempdir");
        let primary = create_tar(dir.path(), "app.tar", &[("index.html", b"x")]);
        let missing = dir.path().join("missing.tar");

        assert!(CompositeResourceView::open(vec![missing], &primary).is_err());
    }

    #[test]
    fn empty_dependency_list_still_serves_primary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let primary = create_tar(dir.path(), "app.tar", &[("index.html", b"only")]);

        let view = CompositeResourceView::open(Vec::new(), &primary).expect("open");
        assert_eq!(view.set_count(), 0);
        assert_eq!(view.get("index.html").expect("present"), b"only");
    }
}
