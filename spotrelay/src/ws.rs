//! WebSocket accept path
//!
//! Upgrades `GET /ws`, greets the client with the last known state,
//! registers it, then reads until the client goes away. Inbound frames
//! are ignored.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::context::RelayContext;
use crate::error::ConnectionWriteError;
use crate::registry::ConnectionSink;

/// Write half of an axum WebSocket
pub struct WsSink {
    sender: Mutex<SplitSink<WebSocket, Message>>,
}

impl WsSink {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

#[async_trait]
impl ConnectionSink for WsSink {
    async fn send_text(&self, text: String) -> Result<(), ConnectionWriteError> {
        self.sender
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await?;
        Ok(())
    }

    async fn close(&self) {
        let _ = self.sender.lock().await.close().await;
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<RelayContext>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: Arc<RelayContext>) {
    let (sender, mut receiver) = socket.split();
    let sink = Arc::new(WsSink::new(sender));

    let id = match ctx.accept(sink.clone()).await {
        Ok(id) => id,
        Err(e) => {
            debug!("Greeting failed, connection dropped: {}", e);
            return;
        }
    };

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(other) => trace!(connection = %id, "Ignoring inbound frame: {:?}", other),
            Err(e) => {
                debug!(connection = %id, "Read failed: {}", e);
                break;
            }
        }
    }

    ctx.disconnect(id);
    sink.close().await;
}
