//! Replication role
//!
//! Decided exactly once, when a queue view is built:
//!
//! - `NonReplicating`: host identity or queue source is not available
//! - `Source`: this host is authoritative for the resource
//! - `Sink`: another host is authoritative; local writes are rejected
//!
//! The role never changes for the lifetime of the view.

use std::fmt;

use super::directory::Environment;
use super::errors::{ReplicationError, ReplicationResult};
use crate::observability::{Event, Logger};

/// Replication role of one queue view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicationRole {
    /// Replication is off for this resource
    NonReplicating,

    /// This host originates writes
    Source { host_id: u8 },

    /// This host follows `source_host_id`
    Sink { host_id: u8, source_host_id: u8 },
}

impl ReplicationRole {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NonReplicating => "non_replicating",
            Self::Source { .. } => "source",
            Self::Sink { .. } => "sink",
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Self::Source { .. })
    }

    pub fn is_replicating(&self) -> bool {
        matches!(self, Self::Sink { .. })
    }

    /// Whether locally originated writes are accepted.
    pub fn allows_local_writes(&self) -> bool {
        !self.is_replicating()
    }

    /// Authoritative host, when replication is on.
    pub fn source_host_id(&self) -> Option<u8> {
        match self {
            Self::Sink { source_host_id, .. } => Some(*source_host_id),
            Self::Source { host_id } => Some(*host_id),
            Self::NonReplicating => None,
        }
    }

    /// Fail with `WriteRejected` unless local writes are accepted.
    pub fn check_local_write(&self, full_name: &str) -> ReplicationResult<()> {
        match self {
            Self::Sink { source_host_id, .. } => Err(ReplicationError::write_rejected(format!(
                "'{}' is replicated from host {}; local writes are not allowed",
                full_name, source_host_id
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ReplicationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decide the role of `full_name` in `env`.
///
/// Missing collaborators switch replication off. A queue source that
/// cannot answer for `full_name` is a configuration error.
pub fn resolve_role(full_name: &str, env: &Environment) -> ReplicationResult<ReplicationRole> {
    let (host_identifier, queue_source) = match (env.host_identifier(), env.queue_source()) {
        (Some(h), Some(q)) => (h, q),
        _ => {
            Logger::event(Event::ReplicationDisabled, &[("full_name", full_name)]);
            return Ok(ReplicationRole::NonReplicating);
        }
    };

    let host_id = host_identifier.host_id();
    let source_host_id = queue_source.source_host_id(full_name)?;

    let role = if host_id == source_host_id {
        ReplicationRole::Source { host_id }
    } else {
        ReplicationRole::Sink {
            host_id,
            source_host_id,
        }
    };

    let host = host_id.to_string();
    let source = source_host_id.to_string();
    Logger::event(
        Event::ReplicationRoleResolved,
        &[
            ("full_name", full_name),
            ("host_id", host.as_str()),
            ("role", role.name()),
            ("source_host_id", source.as_str()),
        ],
    );
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::directory::{StaticHostIdentifier, StaticQueueSource};
    use crate::replication::errors::ReplicationErrorKind;
    use std::sync::Arc;

    fn env(local: u8, source: u8) -> Environment {
        Environment::new()
            .with_host_identifier(Arc::new(StaticHostIdentifier(local)))
            .with_queue_source(Arc::new(StaticQueueSource::new().with_source("/orders", source)))
    }

    #[test]
    fn test_missing_collaborators_disable_replication() {
        assert_eq!(
            resolve_role("/orders", &Environment::new()).unwrap(),
            ReplicationRole::NonReplicating
        );

        let host_only = Environment::new().with_host_identifier(Arc::new(StaticHostIdentifier(1)));
        assert_eq!(
            resolve_role("/orders", &host_only).unwrap(),
            ReplicationRole::NonReplicating
        );
    }

    #[test]
    fn test_local_host_is_source() {
        let role = resolve_role("/orders", &env(1, 1)).unwrap();
        assert_eq!(role, ReplicationRole::Source { host_id: 1 });
        assert!(role.is_source());
        assert!(role.allows_local_writes());
    }

    #[test]
    fn test_remote_host_is_sink() {
        let role = resolve_role("/orders", &env(2, 1)).unwrap();
        assert_eq!(
            role,
            ReplicationRole::Sink {
                host_id: 2,
                source_host_id: 1
            }
        );
        assert!(role.is_replicating());
        assert!(!role.allows_local_writes());
        assert_eq!(role.source_host_id(), Some(1));
    }

    #[test]
    fn test_unknown_resource_is_fatal() {
        let err = resolve_role("/prices", &env(1, 1)).unwrap_err();
        assert_eq!(err.kind, ReplicationErrorKind::ConfigurationError);
    }

    #[test]
    fn test_sink_rejects_local_writes() {
        let sink = ReplicationRole::Sink {
            host_id: 2,
            source_host_id: 1,
        };
        let err = sink.check_local_write("/orders").unwrap_err();
        assert_eq!(err.kind, ReplicationErrorKind::WriteRejected);
        assert!(ReplicationRole::NonReplicating.check_local_write("/orders").is_ok());
    }
}
