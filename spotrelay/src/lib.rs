//! # spotrelay - Relais temps réel de l'état de lecture
//!
//! Polls the upstream playback API and pushes every new snapshot to all
//! connected WebSocket clients.
//!
//! ```text
//! PollScheduler ──► PlaybackSource ──► reconcile() ──► queue (mpsc, 1)
//!                                                          │
//!                            BroadcastEngine ◄─────────────┘
//!                                  │ last_state, fan-out
//!                                  ▼
//!                          ConnectionRegistry ──► clients (/ws)
//! ```
//!
//! All shared state lives in one [`RelayContext`] passed to each part.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use spotclient::SpotifyConfigExt;
//! use spotconfig::Config;
//! use spotrelay::{BroadcastEngine, PollScheduler, RelayContext, DEFAULT_POLL_INTERVAL};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let client = Arc::new(Config::load_config("")?.build_spotify_client()?);
//! client.refresh_access_token().await?;
//!
//! let token = CancellationToken::new();
//! let (ctx, queue) = RelayContext::new();
//! let broadcaster = BroadcastEngine::new(ctx.clone(), queue).spawn(token.clone());
//! let scheduler = Arc::new(PollScheduler::new(ctx, client, DEFAULT_POLL_INTERVAL))
//!     .spawn(token.clone());
//! # token.cancel();
//! # let _ = tokio::join!(broadcaster, scheduler);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod broadcast;
pub mod context;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod server_ext;
pub mod state;
pub mod ws;

pub use api::RelayInfo;
pub use broadcast::{broadcast, BroadcastEngine, BroadcastReport};
pub use context::{RelayContext, QUEUE_CAPACITY};
pub use error::ConnectionWriteError;
pub use registry::{ConnectionId, ConnectionRegistry, ConnectionSink};
pub use scheduler::{CycleOutcome, PlaybackSource, PollScheduler, DEFAULT_POLL_INTERVAL};
pub use server_ext::RelayServerExt;
pub use state::{reconcile, Image, Music, PlayingState, UNKNOWN_TIME};
pub use ws::WsSink;
