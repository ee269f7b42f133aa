//! HTTP routing for the two endpoints.
//!
//! # Player endpoint
//!
//! | Method | Path        | Description                       |
//! |--------|-------------|-----------------------------------|
//! | `GET`  | `/`, `/ws`  | WebSocket upgrade for players     |
//!
//! # Admin endpoint
//!
//! | Method | Path           | Description                       |
//! |--------|----------------|-----------------------------------|
//! | `GET`  | `/`, `/ws`     | WebSocket upgrade for admins      |
//! | `GET`  | `/api/players` | Current roster (JSON)             |

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use impostor_core::protocol::RosterEntry;
use tower_http::cors::CorsLayer;

use crate::orchestrator::SharedOrchestrator;
use crate::ws_handler;

/// Shared application state available to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: SharedOrchestrator,
}

pub fn player_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(player_ws))
        .route("/ws", get(player_ws))
        .with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(admin_ws))
        .route("/ws", get(admin_ws))
        .route("/api/players", get(players_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn player_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_handler::handle_player_socket(socket, state.orchestrator))
}

async fn admin_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_handler::handle_admin_socket(socket, state.orchestrator))
}

/// `GET /api/players`: the roster admins also receive by push.
async fn players_handler(State(state): State<AppState>) -> Json<Vec<RosterEntry>> {
    Json(state.orchestrator.lock().await.roster())
}
