//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for Hotswap data on Linux with root access.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/hotswap";

/// Returns the data directory, preferring `$HOME/.hotswap` for non-root
/// or non-Linux environments, falling back to `/var/lib/hotswap`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        let user_dir = PathBuf::from(home).join(".hotswap");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default artifact cache directory.
pub fn default_artifact_cache() -> PathBuf {
    data_dir().join("artifacts")
}

/// Default port for the shared HTTP listener.
pub const DEFAULT_PORT: u16 = 8080;

/// Path of the status page on the control surface.
pub const STATUS_PATH: &str = "/";

/// Path of the machine-readable status document.
pub const STATUS_JSON_PATH: &str = "/status.json";

/// Path that triggers a resolve-and-redeploy round.
pub const UPDATE_PATH: &str = "/update";

/// Response header carrying the session ID minted for a request.
pub const SESSION_HEADER: &str = "x-session-id";

/// File extension for artifact archives.
pub const ARCHIVE_EXTENSION: &str = "tar";

/// Suffix of the dependency manifest stored beside a local artifact.
pub const DEPS_MANIFEST_SUFFIX: &str = ".deps.json";

/// Application name used in CLI output and log messages.
pub const APP_NAME: &str = "hotswap";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "hsw";
