//! # spotserver - Serveur HTTP pour SpotSocket
//!
//! Thin layer over Axum used by the SpotSocket binary and its feature
//! crates:
//!
//! - [`Server`]: route registration, start, graceful stop
//! - [`logs`]: tracing subscriber with an in-memory ring buffer, exposed
//!   over SSE (`/log-sse`), JSON (`/log-dump`) and `/api/log_setup`
//!
//! ```rust,no_run
//! use spotserver::ServerBuilder;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut server = ServerBuilder::new("SpotSocket", 8080).build();
//! server.add_route("/health", || async { "ok" }).await;
//! server.start().await?;
//! server.wait().await;
//! # Ok(())
//! # }
//! ```

pub mod logs;
pub mod server;

pub use logs::{init_logging, log_dump, log_sse, LogEntry, LogState, SseLayer};
pub use server::{Server, ServerBuilder, ServerInfo};
