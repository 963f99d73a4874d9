//! # Module Server - API de haut niveau pour Axum
//!
//! This module wraps an Axum router behind a small builder-style API so
//! that feature crates can mount their routes without knowing about each
//! other.
//!
//! ## Features
//!
//! - **JSON routes**: `add_route()` for closures returning serializable values
//! - **Custom handlers**: WebSocket, SSE, etc. with `add_handler_with_state()`
//! - **Sub-routers**: `add_router()` nests or merges a prepared router
//! - **Graceful shutdown**: on Ctrl+C or when the shutdown token is cancelled

use crate::logs::{create_logs_router, init_logging, log_dump, log_sse, LogState};
use anyhow::{Context, Result};
use axum::handler::Handler;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use spotconfig::Config;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Info serveur sérialisable
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub http_port: u16,
}

/// Serveur principal
pub struct Server {
    name: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    join_handle: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    shutdown: CancellationToken,
    log_state: Option<LogState>,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `http_port` - Port HTTP à écouter (0 for an ephemeral port)
    pub fn new(name: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            join_handle: None,
            local_addr: None,
            shutdown: CancellationToken::new(),
            log_state: None,
        }
    }

    pub fn new_configured(config: &Config) -> Self {
        Self::new("SpotSocket", config.get_http_port())
    }

    async fn mount(&mut self, path: &str, route: Router) {
        let mut r = self.router.write().await;
        *r = if path == "/" {
            std::mem::take(&mut *r).merge(route)
        } else {
            std::mem::take(&mut *r).nest(path, route)
        };
    }

    /// Ajoute une route JSON dynamique
    ///
    /// The closure is called on every GET of `path`.
    ///
    /// ```rust,no_run
    /// # use spotserver::Server;
    /// # #[tokio::main]
    /// # async fn main() {
    /// # let mut server = Server::new("Test", 3000);
    /// server.add_route("/api/status", || async {
    ///     serde_json::json!({"status": "online"})
    /// }).await;
    /// # }
    /// ```
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let handler = move || {
            let f = f.clone();
            async move { Json(f().await) }
        };

        self.mount(path, Router::new().route("/", get(handler))).await;
    }

    /// Ajoute un handler Axum standard
    pub async fn add_handler<H, T>(&mut self, path: &str, handler: H)
    where
        H: Handler<T, ()> + Clone + 'static,
        T: 'static,
    {
        self.mount(path, Router::new().route("/", get(handler))).await;
    }

    /// Ajoute un handler avec état
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S> + Clone + 'static,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route("/", get(handler)).with_state(state);
        self.mount(path, route).await;
    }

    /// Ajoute un sous-router au serveur
    ///
    /// - Si `path` est "/", merge directement au router principal
    /// - Sinon, nest le router sous le chemin donné
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        let normalized = if path == "/" {
            "/".to_string()
        } else {
            format!("/{}", path.trim_start_matches('/'))
        };
        self.mount(&normalized, sub_router).await;
    }

    /// Token cancelled when the server must stop
    ///
    /// Background tasks that should end with the server select on it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Démarre le serveur HTTP
    ///
    /// Binds `0.0.0.0:<port>`, serves the router in a background task and
    /// installs a Ctrl+C handler that cancels the shutdown token.
    pub async fn start(&mut self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        info!("Server {} running at http://{}", self.name, local_addr);

        let router = self.router.read().await.clone();
        let token = self.shutdown.clone();
        let server_task = tokio::spawn(async move {
            let graceful = token.clone().cancelled_owned();
            if let Err(e) = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(graceful)
                .await
            {
                error!("HTTP server error: {}", e);
            }
            // the accept loop may also end on its own
            token.cancel();
        });

        let token = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                res = signal::ctrl_c() => {
                    if res.is_ok() {
                        info!("Ctrl+C reçu, arrêt gracieux");
                        token.cancel();
                    }
                }
                _ = token.cancelled() => {}
            }
        });

        self.join_handle = Some(server_task);
        Ok(())
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    /// Requests a graceful stop
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Address actually bound, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Récupère les infos du serveur
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            http_port: self.local_addr.map(|a| a.port()).unwrap_or(self.http_port),
        }
    }

    pub fn log_state(&self) -> Option<&LogState> {
        self.log_state.as_ref()
    }

    /// Initialise le système de logging et enregistre les routes de logs
    ///
    /// Installs the global tracing subscriber, then registers
    /// `/log-sse`, `/log-dump` and `/api/log_setup`.
    pub async fn init_logging(&mut self, config: &Config) -> LogState {
        let log_state = init_logging(config);
        self.register_log_routes(log_state.clone()).await;
        log_state
    }

    /// Registers the log routes for an existing [`LogState`]
    pub async fn register_log_routes(&mut self, log_state: LogState) {
        self.add_handler_with_state("/log-sse", log_sse, log_state.clone())
            .await;
        self.add_handler_with_state("/log-dump", log_dump, log_state.clone())
            .await;
        self.add_router("/", create_logs_router(log_state.clone()))
            .await;
        self.log_state = Some(log_state);
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    http_port: u16,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            http_port,
        }
    }

    pub fn new_configured(config: &Config) -> Self {
        Self::new("SpotSocket", config.get_http_port())
    }

    /// Construit le serveur
    pub fn build(self) -> Server {
        Server::new(self.name, self.http_port)
    }
}
