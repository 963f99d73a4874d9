use std::sync::Arc;

use anyhow::{Context, Result};
use spotclient::SpotifyConfigExt;
use spotconfig::Config;
use spotrelay::{BroadcastEngine, PollScheduler, RelayContext, RelayServerExt};
use spotserver::ServerBuilder;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // ========== PHASE 1 : Configuration et logs ==========

    let config = Config::load_config("").context("Failed to load configuration")?;

    let mut server = ServerBuilder::new_configured(&config).build();
    server.init_logging(&config).await;

    if let Some(path) = config.path() {
        info!("Configuration file: {}", path.display());
    }

    // ========== PHASE 2 : Client Spotify ==========

    // Missing secrets and a failed first refresh are the only fatal errors.
    let client = config
        .build_spotify_client()
        .context("Cannot build Spotify client")?;
    client
        .refresh_access_token()
        .await
        .context("Initial Spotify token refresh failed")?;
    info!("Spotify credentials accepted");

    // ========== PHASE 3 : Relais ==========

    let poll_interval = config.get_poll_interval()?;
    let shutdown = server.shutdown_token();
    let (ctx, queue) = RelayContext::new();

    let broadcaster = BroadcastEngine::new(ctx.clone(), queue).spawn(shutdown.clone());
    let scheduler =
        Arc::new(PollScheduler::new(ctx.clone(), Arc::new(client), poll_interval))
            .spawn(shutdown.clone());

    server.init_relay(ctx).await;

    // ========== PHASE 4 : Démarrage du serveur ==========

    info!("Starting HTTP server...");
    if let Err(e) = server.start().await {
        error!("Server failed to start: {:#}", e);
        shutdown.cancel();
        let _ = tokio::join!(broadcaster, scheduler);
        return Err(e);
    }

    info!("SpotSocket is ready on port {}", server.info().http_port);
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    shutdown.cancel();
    let (broadcaster, scheduler) = tokio::join!(broadcaster, scheduler);
    broadcaster.context("Broadcast engine task failed")?;
    scheduler.context("Poll scheduler task failed")?;

    info!("SpotSocket stopped");
    Ok(())
}
