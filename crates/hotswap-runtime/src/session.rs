//! Session ID sources and the per-unit session manager.
//!
//! The source is swappable without touching the coordinator: the secure
//! variant is the default, the simple one exists for development setups
//! where predictable IDs are convenient.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Generates unique session identifiers.
pub trait SessionIdSource: Send + Sync {
    /// Returns a fresh identifier.
    fn generate(&self) -> String;
}

/// Cryptographically random session IDs (UUID v4).
#[derive(Debug, Default)]
pub struct SecureSessionIds;

impl SessionIdSource for SecureSessionIds {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Process-local counter IDs. Not cryptographic; development only.
#[derive(Debug, Default)]
pub struct SimpleSessionIds {
    counter: AtomicU64,
}

impl SessionIdSource for SimpleSessionIds {
    fn generate(&self) -> String {
        format!("s-{}", self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

/// Returns the configured session ID source.
#[must_use]
pub fn session_source(secure: bool) -> Arc<dyn SessionIdSource> {
    if secure {
        Arc::new(SecureSessionIds)
    } else {
        Arc::new(SimpleSessionIds::default())
    }
}

/// Mints and tracks session IDs for one deployed unit.
///
/// A fresh manager is attached on every deploy; its sessions die with the
/// unit they belong to.
pub struct SessionManager {
    source: Arc<dyn SessionIdSource>,
    active: RwLock<HashSet<String>>,
}

impl SessionManager {
    /// Creates a manager drawing IDs from the given source.
    #[must_use]
    pub fn new(source: Arc<dyn SessionIdSource>) -> Self {
        Self {
            source,
            active: RwLock::new(HashSet::new()),
        }
    }

    /// Mints and registers a new session ID.
    pub fn create(&self) -> String {
        let id = self.source.generate();
        let mut active = self
            .active
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let _ = active.insert(id.clone());
        id
    }

    /// Whether the given ID belongs to this manager.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.active
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(id)
    }

    /// Number of sessions minted so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.active
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("active", &self.count())
            .finish()
    }
}
