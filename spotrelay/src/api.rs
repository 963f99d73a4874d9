//! HTTP routes of the relay
//!
//! - `GET /ws` - real-time stream of [`PlayingState`] messages
//! - `GET /api/state` - last known state
//! - `GET /info` - service name, version and connected client count

use std::sync::Arc;

use axum::extract::{FromRef, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::context::RelayContext;
use crate::state::PlayingState;
use crate::ws::ws_handler;

#[derive(Clone)]
pub struct RelayApiState {
    pub ctx: Arc<RelayContext>,
    pub name: String,
    pub version: String,
}

impl FromRef<RelayApiState> for Arc<RelayContext> {
    fn from_ref(state: &RelayApiState) -> Self {
        state.ctx.clone()
    }
}

/// Response of `GET /info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayInfo {
    pub name: String,
    pub version: String,
    pub clients: usize,
}

async fn get_state(State(ctx): State<Arc<RelayContext>>) -> Json<PlayingState> {
    Json(ctx.last_state())
}

async fn get_info(State(state): State<RelayApiState>) -> Json<RelayInfo> {
    Json(RelayInfo {
        name: state.name.clone(),
        version: state.version.clone(),
        clients: state.ctx.registry().len(),
    })
}

/// Router with every relay route, to be merged at the root
pub fn create_router(state: RelayApiState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/state", get(get_state))
        .route("/info", get(get_info))
        .with_state(state)
}
