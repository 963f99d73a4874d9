//! Poll scheduler
//!
//! Fires on a fixed interval. Each tick spawns one fetch cycle; a cycle
//! only runs if no other is in flight, otherwise the tick is dropped.
//!
//! A cycle fetches the playback state, reconciles it against the last known
//! state and queues the result for broadcast. An expired token triggers one
//! refresh and nothing is queued; any other failure is logged and the cycle
//! ends without output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use spotclient::{ErrorKind, SpotifyClient, SpotifyError, TrackResponse};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::RelayContext;
use crate::state::{reconcile, PlayingState};

/// Default polling period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Upstream the scheduler polls
#[async_trait]
pub trait PlaybackSource: Send + Sync {
    /// `Ok(None)` when nothing is playing
    async fn currently_playing(&self) -> spotclient::Result<Option<TrackResponse>>;

    /// Replaces the access token
    async fn refresh(&self) -> spotclient::Result<()>;
}

#[async_trait]
impl PlaybackSource for SpotifyClient {
    async fn currently_playing(&self) -> spotclient::Result<Option<TrackResponse>> {
        self.get_currently_playing().await
    }

    async fn refresh(&self) -> spotclient::Result<()> {
        self.refresh_access_token().await
    }
}

/// What one cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Another cycle was in flight
    Skipped,
    /// A snapshot was queued for broadcast
    Broadcast(PlayingState),
    /// Token expired and was refreshed
    Refreshed,
    /// Token expired and the refresh failed
    RefreshFailed,
    /// Fetch failed; nothing queued
    Failed(ErrorKind),
    /// The broadcast engine is gone
    QueueClosed,
}

/// Holds the in-flight flag; clears it on drop
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct PollScheduler {
    ctx: Arc<RelayContext>,
    source: Arc<dyn PlaybackSource>,
    interval: Duration,
    fetching: AtomicBool,
}

impl PollScheduler {
    pub fn new(
        ctx: Arc<RelayContext>,
        source: Arc<dyn PlaybackSource>,
        interval: Duration,
    ) -> Self {
        Self {
            ctx,
            source,
            interval,
            fetching: AtomicBool::new(false),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True while a cycle is between its start and its outcome
    pub fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::Acquire)
    }

    /// Runs one fetch-reconcile-enqueue cycle
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.fetching) else {
            debug!("Previous fetch still in flight, tick skipped");
            return CycleOutcome::Skipped;
        };

        match self.source.currently_playing().await {
            Ok(payload) => {
                let state = reconcile(payload.as_ref(), &self.ctx.last_state());
                if state.is_degraded() {
                    debug!("No conclusive playback state, sending degraded snapshot");
                }
                match self.ctx.enqueue(state.clone()).await {
                    Ok(()) => CycleOutcome::Broadcast(state),
                    Err(_) => {
                        error!("Broadcast queue closed, snapshot dropped");
                        CycleOutcome::QueueClosed
                    }
                }
            }
            Err(err) => self.handle_failure(err).await,
        }
    }

    async fn handle_failure(&self, err: SpotifyError) -> CycleOutcome {
        let kind = err.kind();
        match kind {
            ErrorKind::ExpiredToken => {
                info!("Access token expired, refreshing");
                match self.source.refresh().await {
                    Ok(()) => {
                        info!("Access token refreshed");
                        CycleOutcome::Refreshed
                    }
                    Err(e) => {
                        error!(kind = %e.kind(), "Token refresh failed: {}", e);
                        CycleOutcome::RefreshFailed
                    }
                }
            }
            ErrorKind::RateLimited => {
                if let SpotifyError::RateLimited {
                    retry_after: Some(secs),
                } = err
                {
                    warn!(kind = %kind, retry_after = secs, "Rate limited, cycle skipped");
                } else {
                    warn!(kind = %kind, "Rate limited, cycle skipped");
                }
                CycleOutcome::Failed(kind)
            }
            ErrorKind::Transport
            | ErrorKind::BadOAuthRequest
            | ErrorKind::Upstream
            | ErrorKind::Decode
            | ErrorKind::AuthExchange
            | ErrorKind::Configuration => {
                warn!(kind = %kind, "Fetch failed, cycle skipped: {}", err);
                CycleOutcome::Failed(kind)
            }
        }
    }

    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(token))
    }

    /// Ticks until `token` is cancelled
    ///
    /// Cycles still running at cancellation are abandoned and awaited.
    pub async fn run(self: Arc<Self>, token: CancellationToken) {
        info!(interval = ?self.interval, "Poll scheduler started");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = JoinSet::new();

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let scheduler = self.clone();
                    let cycle_token = token.clone();
                    cycles.spawn(async move {
                        tokio::select! {
                            _ = cycle_token.cancelled() => {}
                            _ = scheduler.run_cycle() => {}
                        }
                    });
                }
                Some(done) = cycles.join_next(), if !cycles.is_empty() => {
                    log_cycle_panic(done);
                }
            }
        }

        while let Some(done) = cycles.join_next().await {
            log_cycle_panic(done);
        }
        info!("Poll scheduler stopped");
    }
}

fn log_cycle_panic(done: Result<(), tokio::task::JoinError>) {
    if let Err(e) = done {
        if e.is_panic() {
            error!("Poll cycle panicked: {}", e);
        }
    }
}
