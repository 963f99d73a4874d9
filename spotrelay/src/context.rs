//! Shared relay state
//!
//! One [`RelayContext`] is built at startup and handed to the accept path,
//! the poll scheduler and the broadcast engine.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ConnectionWriteError;
use crate::registry::{ConnectionId, ConnectionRegistry, ConnectionSink};
use crate::state::PlayingState;

/// Capacity of the scheduler → broadcaster queue
pub const QUEUE_CAPACITY: usize = 1;

pub struct RelayContext {
    registry: ConnectionRegistry,
    last_state: RwLock<PlayingState>,
    queue: mpsc::Sender<PlayingState>,
}

impl RelayContext {
    /// Creates the context and the receiving end of the broadcast queue
    ///
    /// The receiver belongs to the [`BroadcastEngine`](crate::BroadcastEngine).
    pub fn new() -> (Arc<Self>, mpsc::Receiver<PlayingState>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let ctx = Self {
            registry: ConnectionRegistry::new(),
            last_state: RwLock::new(PlayingState::initial()),
            queue: tx,
        };
        (Arc::new(ctx), rx)
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Most recently broadcast snapshot
    pub fn last_state(&self) -> PlayingState {
        self.last_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // Only the broadcast engine writes here.
    pub(crate) fn set_last_state(&self, state: PlayingState) {
        *self
            .last_state
            .write()
            .unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Queues a snapshot for broadcast, waiting while the queue is full
    pub async fn enqueue(
        &self,
        state: PlayingState,
    ) -> Result<(), mpsc::error::SendError<PlayingState>> {
        self.queue.send(state).await
    }

    /// Greets a new connection with the last known state, then registers it
    ///
    /// A connection that cannot take the greeting is closed and never
    /// registered.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use spotrelay::{ConnectionSink, ConnectionWriteError, RelayContext};
    /// # struct Null;
    /// # #[async_trait::async_trait]
    /// # impl ConnectionSink for Null {
    /// #     async fn send_text(&self, _: String) -> Result<(), ConnectionWriteError> { Ok(()) }
    /// #     async fn close(&self) {}
    /// # }
    /// # tokio_test::block_on(async {
    /// let (ctx, _queue) = RelayContext::new();
    /// let id = ctx.accept(Arc::new(Null)).await.unwrap();
    /// assert!(ctx.registry().contains(id));
    /// # });
    /// ```
    pub async fn accept(
        &self,
        sink: Arc<dyn ConnectionSink>,
    ) -> Result<ConnectionId, ConnectionWriteError> {
        let greeting = serde_json::to_string(&self.last_state())?;
        if let Err(e) = sink.send_text(greeting).await {
            sink.close().await;
            return Err(e);
        }

        let id = self.registry.register(sink);
        debug!(connection = %id, clients = self.registry.len(), "Connection registered");
        Ok(id)
    }

    /// Drops a connection from the registry; no-op if already gone
    pub fn disconnect(&self, id: ConnectionId) {
        if self.registry.unregister(id).is_some() {
            debug!(connection = %id, clients = self.registry.len(), "Connection unregistered");
        }
    }
}
