//! Replication subsystem
//!
//! - One authoritative source per resource; everyone else is a sink
//! - The role is resolved once, at construction, and never changes
//! - Sinks reject local writes; replicated records arrive through a
//!   separate write path
//! - A sink asks its source to resume after its last index on every
//!   reconnect
//!
//! Replication is off unless the environment provides both host identity
//! and a queue source directory.

mod directory;
mod errors;
mod handshake;
mod receiver;
mod role;
mod transport;

pub use directory::{
    Clusters, EngineCluster, Environment, HostIdentifier, QueueSource, StaticCluster,
    StaticClusters, StaticHostIdentifier, StaticQueueSource,
};
pub use errors::{ReplicationError, ReplicationErrorKind, ReplicationResult};
pub use handshake::{handler_cid, CatchUpHandshake, Frame, ResumeRequest, HANDLER_NAME};
pub use receiver::{ReceiveResult, ReplicaReceiver, ReplicatedRecord};
pub use role::{resolve_role, ReplicationRole};
pub use transport::{
    ConnectionListener, ConnectionManager, LocalConnectionManager, OutboundPublisher,
};
