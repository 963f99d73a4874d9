//! Broadcast engine
//!
//! Single consumer of the broadcast queue. For every dequeued snapshot it
//! updates the last known state, then delivers the snapshot to all
//! registered connections in parallel. Connections that fail are closed and
//! removed; the others are not affected.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::context::RelayContext;
use crate::state::PlayingState;

/// Result of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub retired: usize,
}

pub struct BroadcastEngine {
    ctx: Arc<RelayContext>,
    rx: mpsc::Receiver<PlayingState>,
}

impl BroadcastEngine {
    pub fn new(ctx: Arc<RelayContext>, rx: mpsc::Receiver<PlayingState>) -> Self {
        Self { ctx, rx }
    }

    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(token))
    }

    /// Consumes the queue until `token` is cancelled or every sender is gone
    pub async fn run(mut self, token: CancellationToken) {
        info!("Broadcast engine started");
        loop {
            let state = tokio::select! {
                _ = token.cancelled() => break,
                next = self.rx.recv() => match next {
                    Some(state) => state,
                    None => break,
                },
            };
            broadcast(&self.ctx, state).await;
        }
        info!("Broadcast engine stopped");
    }
}

/// Records `state` as the last known state and sends it to every connection
pub async fn broadcast(ctx: &RelayContext, state: PlayingState) -> BroadcastReport {
    let payload = match serde_json::to_string(&state) {
        Ok(p) => p,
        Err(e) => {
            error!("Cannot serialize playing state: {}", e);
            return BroadcastReport::default();
        }
    };
    ctx.set_last_state(state);

    let connections = ctx.registry().snapshot();
    let deliveries = connections.into_iter().map(|(id, sink)| {
        let payload = payload.clone();
        async move {
            let result = sink.send_text(payload).await;
            (id, sink, result)
        }
    });

    let mut report = BroadcastReport::default();
    for (id, sink, result) in join_all(deliveries).await {
        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                debug!(connection = %id, "Delivery failed: {}", e);
                sink.close().await;
                ctx.disconnect(id);
                report.retired += 1;
            }
        }
    }

    if report.retired > 0 {
        info!(
            retired = report.retired,
            clients = ctx.registry().len(),
            "Dropped failed connections"
        );
    }
    debug!(delivered = report.delivered, "Broadcast done");
    report
}
