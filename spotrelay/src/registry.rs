//! Connection registry
//!
//! Membership set of live downstream connections. The accept path inserts
//! and removes entries while the broadcast engine iterates over them, so
//! every access goes through one mutex. Iteration works on a copy
//! ([`ConnectionRegistry::snapshot`]) and never holds the lock across an
//! `await`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::ConnectionWriteError;

/// One downstream real-time link
///
/// Implemented over an axum WebSocket in [`crate::ws`] and by in-memory
/// fakes in tests.
#[async_trait]
pub trait ConnectionSink: Send + Sync {
    /// Sends one text frame
    async fn send_text(&self, text: String) -> Result<(), ConnectionWriteError>;

    /// Closes the link; calling it twice is harmless
    async fn close(&self);
}

/// Registry key, unique for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: Mutex<HashMap<ConnectionId, Arc<dyn ConnectionSink>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Arc<dyn ConnectionSink>>> {
        // the map stays consistent even if a holder panicked
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a connection and returns its key
    pub fn register(&self, sink: Arc<dyn ConnectionSink>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, sink);
        id
    }

    /// Removes a connection
    ///
    /// Returns the removed sink, or `None` if it was already gone.
    pub fn unregister(&self, id: ConnectionId) -> Option<Arc<dyn ConnectionSink>> {
        self.lock().remove(&id)
    }

    /// Copy of the current membership
    pub fn snapshot(&self) -> Vec<(ConnectionId, Arc<dyn ConnectionSink>)> {
        self.lock()
            .iter()
            .map(|(id, sink)| (*id, sink.clone()))
            .collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
