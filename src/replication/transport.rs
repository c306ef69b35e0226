//! Connection managers and the outbound queue
//!
//! Listeners run on whatever thread the transport uses to report
//! connectivity. They must only build a frame and hand it to the
//! `OutboundPublisher`, which never blocks, and must not call back into
//! the manager.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockWriteGuard};

use tokio::sync::mpsc;

use super::errors::{ReplicationError, ReplicationResult};
use super::handshake::Frame;

/// Callback invoked on every connect (`true`) / disconnect (`false`).
pub type ConnectionListener = Box<dyn Fn(&OutboundPublisher, bool) + Send + Sync>;

/// Connectivity to one remote host.
pub trait ConnectionManager: Send + Sync {
    /// Host id of the remote end
    fn remote_host_id(&self) -> u8;

    /// Register a listener for connectivity transitions.
    fn add_listener(&self, listener: ConnectionListener);
}

/// Non-blocking handle onto the transport's outbound queue.
#[derive(Debug, Clone)]
pub struct OutboundPublisher {
    peer_host_id: u8,
    tx: mpsc::UnboundedSender<Frame>,
}

impl OutboundPublisher {
    /// Wrap the sending half of an outbound channel
    pub fn new(peer_host_id: u8, tx: mpsc::UnboundedSender<Frame>) -> Self {
        Self { peer_host_id, tx }
    }

    /// Host the frames are addressed to
    pub fn peer_host_id(&self) -> u8 {
        self.peer_host_id
    }

    /// Queue a frame for the connected peer.
    pub fn publish(&self, frame: Frame) -> ReplicationResult<()> {
        self.tx.send(frame).map_err(|_| {
            ReplicationError::send_failed(format!(
                "outbound queue to host {} is closed",
                self.peer_host_id
            ))
        })
    }
}

/// In-process connection manager.
///
/// Frames published by listeners land on the receiver returned from
/// `new`. Connectivity is driven explicitly with `set_connected`.
pub struct LocalConnectionManager {
    remote_host_id: u8,
    publisher: OutboundPublisher,
    listeners: RwLock<Vec<ConnectionListener>>,
    connected: AtomicBool,
}

impl LocalConnectionManager {
    /// Create a disconnected manager for `remote_host_id`.
    pub fn new(remote_host_id: u8) -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self {
            remote_host_id,
            publisher: OutboundPublisher::new(remote_host_id, tx),
            listeners: RwLock::new(Vec::new()),
            connected: AtomicBool::new(false),
        };
        (manager, rx)
    }

    /// Report a connectivity change. Listeners fire only on transitions.
    ///
    /// The flag flips under the listener lock, so a listener being added
    /// concurrently sees either the old state and this notification, or
    /// the new state and its own immediate call.
    pub fn set_connected(&self, connected: bool) {
        let listeners = self.lock_listeners();
        if self.connected.swap(connected, Ordering::AcqRel) == connected {
            return;
        }
        for listener in listeners.iter() {
            listener(&self.publisher, connected);
        }
    }

    fn lock_listeners(&self) -> RwLockWriteGuard<'_, Vec<ConnectionListener>> {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether the peer is currently connected
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }
}

impl ConnectionManager for LocalConnectionManager {
    fn remote_host_id(&self) -> u8 {
        self.remote_host_id
    }

    /// A listener added while connected is told about it immediately.
    fn add_listener(&self, listener: ConnectionListener) {
        let mut listeners = self.lock_listeners();
        if self.is_connected() {
            listener(&self.publisher, true);
        }
        listeners.push(listener);
    }
}

impl fmt::Debug for LocalConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalConnectionManager")
            .field("remote_host_id", &self.remote_host_id)
            .field("connected", &self.is_connected())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
