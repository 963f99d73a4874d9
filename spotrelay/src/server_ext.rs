//! Extension de spotserver::Server pour le relais
//!
//! Adds the relay routes to a generic [`spotserver::Server`] without
//! `spotserver` knowing about `spotrelay`.
//!
//! ```rust,no_run
//! use spotrelay::{RelayContext, RelayServerExt};
//! use spotserver::ServerBuilder;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let (ctx, _queue) = RelayContext::new();
//! let mut server = ServerBuilder::new("SpotSocket", 8080).build();
//! server.init_relay(ctx).await;
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use spotserver::Server;
use tracing::info;

use crate::api::{create_router, RelayApiState};
use crate::context::RelayContext;

/// Trait d'extension pour ajouter le relais à un serveur spotserver
pub trait RelayServerExt {
    /// Enregistre les routes du relais
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /ws` - WebSocket, one JSON message per broadcast
    /// - `GET /api/state` - Last known state
    /// - `GET /info` - Name, version and client count
    async fn init_relay(&mut self, ctx: Arc<RelayContext>);
}

impl RelayServerExt for Server {
    async fn init_relay(&mut self, ctx: Arc<RelayContext>) {
        let state = RelayApiState {
            ctx,
            name: self.info().name,
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        self.add_router("/", create_router(state)).await;
        info!("Relay endpoints available at /ws, /api/state and /info");
    }
}
