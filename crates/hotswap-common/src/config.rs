//! Global configuration model for the Hotswap controller.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{HotswapError, Result};
use crate::types::Coordinate;

/// One declared application: an optional context path and a coordinate.
///
/// Written as `coordinate` or `contextPath=coordinate` on the command line.
/// An omitted context path defaults to the coordinate's artifact name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSpec {
    /// Routing prefix for the application's traffic.
    pub context_path: String,
    /// Coordinate of the primary artifact.
    pub coordinate: Coordinate,
}

impl FromStr for AppSpec {
    type Err = HotswapError;

    fn from_str(s: &str) -> Result<Self> {
        let (path, gav) = match s.split_once('=') {
            Some((path, gav)) => (Some(path), gav),
            None => (None, s),
        };
        let coordinate: Coordinate = gav.parse()?;
        let context_path = match path {
            Some(p) if !p.is_empty() => p.trim_matches('/').to_string(),
            _ => coordinate.name.clone(),
        };
        if context_path.is_empty() {
            return Err(HotswapError::Config {
                message: format!("application entry has an empty context path: {s:?}"),
            });
        }
        Ok(Self {
            context_path,
            coordinate,
        })
    }
}

/// Root configuration for the Hotswap controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Port the shared HTTP listener binds to.
    pub port: u16,
    /// Base directory for cached artifacts and controller state.
    pub data_dir: PathBuf,
    /// Repository URI artifacts are resolved against
    /// (`file:///path` or `http(s)://host/base`).
    pub repository: String,
    /// Declared applications, in startup order.
    pub apps: Vec<AppSpec>,
    /// Whether session IDs come from the secure source.
    pub secure_sessions: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            port: crate::constants::DEFAULT_PORT,
            data_dir: crate::constants::data_dir().clone(),
            repository: String::new(),
            apps: Vec::new(),
            secure_sessions: true,
        }
    }
}
