//! WebSocket upgrade endpoints.
//!
//! # Responsibilities
//! - Accept upgrades on `/ws` and on `/` (browser clients connect to the bare host)
//! - Hand each upgraded socket to a bookmark session task
//! - Serve the client shell for plain `GET /`

use axum::body::Body;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::http::server::AppState;
use crate::realtime::run_session;

/// `GET /ws`
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    upgrade(state, ws)
}

/// `GET /`: upgrade when asked to, otherwise the application shell.
pub async fn root_handler(
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    request: Request<Body>,
) -> Response {
    match ws {
        Ok(ws) => upgrade(state, ws),
        Err(_) => {
            let index = state.shell_path();
            match ServeFile::new(index).oneshot(request).await {
                Ok(response) => response.into_response(),
                Err(never) => match never {},
            }
        }
    }
}

fn upgrade(state: AppState, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| async move {
        run_session(
            socket,
            state.sessions.clone(),
            state.store.clone(),
            state.shutdown.subscribe(),
        )
        .await;
    })
}
