//! Domain primitive types used across the Hotswap workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HotswapError, Result};

/// Version part of a coordinate: a concrete floor or "whatever is newest".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionRequest {
    /// Resolve to the newest available version that is at least this one.
    Floor(String),
    /// Resolve to the newest available version, whatever it is.
    Latest,
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Floor(v) => write!(f, "{v}"),
            Self::Latest => write!(f, "latest"),
        }
    }
}

/// Reference to a versioned artifact: `group:name:version`.
///
/// The version is a *request*, not a pin — resolution may return a newer
/// version published under the same group and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// Namespace of the artifact (organization or project).
    pub group: String,
    /// Artifact name within the group.
    pub name: String,
    /// Requested version.
    pub version: VersionRequest,
}

impl Coordinate {
    /// Creates a coordinate from its parts.
    #[must_use]
    pub fn new(group: impl Into<String>, name: impl Into<String>, version: VersionRequest) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version,
        }
    }
}

impl FromStr for Coordinate {
    type Err = HotswapError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let (Some(group), Some(name), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(HotswapError::Config {
                message: format!("coordinate must be group:name:version, got {s:?}"),
            });
        };
        if group.is_empty() || name.is_empty() || version.is_empty() {
            return Err(HotswapError::Config {
                message: format!("coordinate has an empty segment: {s:?}"),
            });
        }
        let version = if version == "latest" {
            VersionRequest::Latest
        } else {
            VersionRequest::Floor(version.to_string())
        };
        Ok(Self::new(group, name, version))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

/// Handle identifying one deployed unit inside the container host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(String);

impl UnitId {
    /// Creates a unit ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random unit ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of an application record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    /// No deployed unit exists; the record is ready for a deploy.
    Undeployed,
    /// A deploy cycle is building and starting a new unit.
    Deploying,
    /// A unit is live and serving traffic.
    Deployed,
    /// A redeploy cycle is stopping and removing the old unit.
    Undeploying,
    /// The last cycle errored; recoverable on the next trigger.
    Failed,
}

impl AppState {
    /// Whether a new redeploy trigger may be accepted in this state.
    #[must_use]
    pub const fn accepts_redeploy(self) -> bool {
        matches!(self, Self::Undeployed | Self::Deployed | Self::Failed)
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undeployed => write!(f, "undeployed"),
            Self::Deploying => write!(f, "deploying"),
            Self::Deployed => write!(f, "deployed"),
            Self::Undeploying => write!(f, "undeploying"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
