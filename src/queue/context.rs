//! Queue configuration
//!
//! Loaded from JSON. Only `name` is required:
//!
//! ```json
//! { "name": "orders", "cluster": "east", "base_path": "/var/lib/queues" }
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{QueueError, QueueResult};
use crate::log::FileLogConfig;

/// Directory under the system temp dir used when no base path is given
pub const DEFAULT_BASE_DIR: &str = "engine-queue";

/// Configuration of one queue view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueContext {
    /// Queue name, also its directory name
    pub name: String,

    /// Resource path used for replication lookups (default `/<name>`)
    #[serde(default)]
    pub full_name: Option<String>,

    /// Cluster the source host is reached through
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Parent directory of the queue directory
    #[serde(default)]
    pub base_path: Option<PathBuf>,

    /// fsync after every append (default true)
    #[serde(default = "default_sync_on_append")]
    pub sync_on_append: bool,
}

fn default_cluster() -> String {
    "cluster".to_string()
}

fn default_sync_on_append() -> bool {
    true
}

impl QueueContext {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: None,
            cluster: default_cluster(),
            base_path: None,
            sync_on_append: default_sync_on_append(),
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = cluster.into();
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn with_sync_on_append(mut self, sync_on_append: bool) -> Self {
        self.sync_on_append = sync_on_append;
        self
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> QueueResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            QueueError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let context: QueueContext = serde_json::from_str(&content)
            .map_err(|e| QueueError::Config(format!("Invalid config JSON: {}", e)))?;

        context.validate()?;
        Ok(context)
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.name.is_empty() {
            return Err(QueueError::Config("name must not be empty".into()));
        }
        if self.name.contains('/') {
            return Err(QueueError::Config(format!(
                "name '{}' must not contain '/'",
                self.name
            )));
        }
        if let Some(full_name) = &self.full_name {
            if !full_name.starts_with('/') {
                return Err(QueueError::Config(format!(
                    "full_name '{}' must start with '/'",
                    full_name
                )));
            }
        }
        if self.cluster.is_empty() {
            return Err(QueueError::Config("cluster must not be empty".into()));
        }
        Ok(())
    }

    /// Resource path, `/<name>` unless configured.
    pub fn full_name(&self) -> String {
        self.full_name
            .clone()
            .unwrap_or_else(|| format!("/{}", self.name))
    }

    /// Directory holding this queue's log file.
    pub fn queue_dir(&self, host_id: Option<u8>) -> PathBuf {
        self.base_path
            .clone()
            .unwrap_or_else(|| default_base_path(host_id))
            .join(&self.name)
    }

    pub fn log_config(&self) -> FileLogConfig {
        FileLogConfig {
            sync_on_append: self.sync_on_append,
        }
    }
}

/// `<temp>/engine-queue/<host id>`, or `.../none` without host identity.
pub fn default_base_path(host_id: Option<u8>) -> PathBuf {
    let host = host_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "none".to_string());
    env::temp_dir().join(DEFAULT_BASE_DIR).join(host)
}
