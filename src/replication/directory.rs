//! Collaborator directories
//!
//! The environment a queue view is built in may or may not provide host
//! identity, a queue source directory and cluster membership. A missing
//! host identity or queue source switches replication off; the other
//! lookups are required once a node has been found to be a sink.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use super::errors::{ReplicationError, ReplicationResult};
use super::transport::ConnectionManager;

/// Identity of the local node.
pub trait HostIdentifier: Send + Sync {
    fn host_id(&self) -> u8;
}

/// Which host is authoritative for a named resource.
pub trait QueueSource: Send + Sync {
    /// Authoritative host for `full_name`.
    fn source_host_id(&self, full_name: &str) -> ReplicationResult<u8>;
}

/// Reachable peers of one cluster.
pub trait EngineCluster: Send + Sync {
    /// Host ids of every known peer
    fn peers(&self) -> Vec<u8>;

    /// Connection manager for `host_id`, if it is a peer.
    fn connection_manager(&self, host_id: u8) -> Option<Arc<dyn ConnectionManager>>;
}

/// Clusters by name.
pub trait Clusters: Send + Sync {
    fn cluster(&self, name: &str) -> Option<Arc<dyn EngineCluster>>;
}

/// Fixed host id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHostIdentifier(pub u8);

impl HostIdentifier for StaticHostIdentifier {
    fn host_id(&self) -> u8 {
        self.0
    }
}

/// Source hosts from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticQueueSource {
    sources: HashMap<String, u8>,
}

impl StaticQueueSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `host_id` authoritative for `full_name`.
    pub fn with_source(mut self, full_name: impl Into<String>, host_id: u8) -> Self {
        self.sources.insert(full_name.into(), host_id);
        self
    }
}

impl QueueSource for StaticQueueSource {
    fn source_host_id(&self, full_name: &str) -> ReplicationResult<u8> {
        self.sources.get(full_name).copied().ok_or_else(|| {
            ReplicationError::configuration_error(format!(
                "no source host configured for '{}'",
                full_name
            ))
        })
    }
}

/// Cluster with a fixed peer set.
#[derive(Default)]
pub struct StaticCluster {
    managers: BTreeMap<u8, Arc<dyn ConnectionManager>>,
}

impl StaticCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer reachable through `manager`.
    pub fn with_peer(mut self, manager: Arc<dyn ConnectionManager>) -> Self {
        self.managers.insert(manager.remote_host_id(), manager);
        self
    }
}

impl EngineCluster for StaticCluster {
    fn peers(&self) -> Vec<u8> {
        self.managers.keys().copied().collect()
    }

    fn connection_manager(&self, host_id: u8) -> Option<Arc<dyn ConnectionManager>> {
        self.managers.get(&host_id).cloned()
    }
}

/// Clusters with fixed names.
#[derive(Default)]
pub struct StaticClusters {
    clusters: HashMap<String, Arc<dyn EngineCluster>>,
}

impl StaticClusters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(mut self, name: impl Into<String>, cluster: Arc<dyn EngineCluster>) -> Self {
        self.clusters.insert(name.into(), cluster);
        self
    }
}

impl Clusters for StaticClusters {
    fn cluster(&self, name: &str) -> Option<Arc<dyn EngineCluster>> {
        self.clusters.get(name).cloned()
    }
}

/// The capabilities available to a queue view at construction.
#[derive(Clone, Default)]
pub struct Environment {
    host_identifier: Option<Arc<dyn HostIdentifier>>,
    queue_source: Option<Arc<dyn QueueSource>>,
    clusters: Option<Arc<dyn Clusters>>,
}

impl Environment {
    /// Empty environment: replication is off.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host_identifier(mut self, host_identifier: Arc<dyn HostIdentifier>) -> Self {
        self.host_identifier = Some(host_identifier);
        self
    }

    pub fn with_queue_source(mut self, queue_source: Arc<dyn QueueSource>) -> Self {
        self.queue_source = Some(queue_source);
        self
    }

    pub fn with_clusters(mut self, clusters: Arc<dyn Clusters>) -> Self {
        self.clusters = Some(clusters);
        self
    }

    pub fn host_identifier(&self) -> Option<&Arc<dyn HostIdentifier>> {
        self.host_identifier.as_ref()
    }

    pub fn queue_source(&self) -> Option<&Arc<dyn QueueSource>> {
        self.queue_source.as_ref()
    }

    pub fn clusters(&self) -> Option<&Arc<dyn Clusters>> {
        self.clusters.as_ref()
    }

    /// Local host id, if host identity is available
    pub fn host_id(&self) -> Option<u8> {
        self.host_identifier.as_ref().map(|h| h.host_id())
    }

    /// Connection manager for `host_id` in `cluster`.
    ///
    /// Every missing piece is a configuration error.
    pub fn find_connection_manager(
        &self,
        cluster: &str,
        host_id: u8,
    ) -> ReplicationResult<Arc<dyn ConnectionManager>> {
        let clusters = self.clusters.as_ref().ok_or_else(|| {
            ReplicationError::configuration_error("no cluster directory available")
        })?;
        let engine_cluster = clusters.cluster(cluster).ok_or_else(|| {
            ReplicationError::configuration_error(format!("unknown cluster '{}'", cluster))
        })?;
        engine_cluster.connection_manager(host_id).ok_or_else(|| {
            ReplicationError::configuration_error(format!(
                "host {} is not a peer of cluster '{}'",
                host_id, cluster
            ))
        })
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("host_id", &self.host_id())
            .field("queue_source", &self.queue_source.is_some())
            .field("clusters", &self.clusters.is_some())
            .finish()
    }
}
