//! HTTP and WebSocket front end for practice sessions.

mod error;
mod routes;
mod ws;

pub use error::ApiError;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::audio::AudioSource;
use crate::corpus::SongCatalog;
use crate::practice::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub catalog: Arc<dyn SongCatalog>,
    pub audio: Arc<dyn AudioSource>,
}

impl AppState {
    pub fn new(
        registry: SessionRegistry,
        catalog: Arc<dyn SongCatalog>,
        audio: Arc<dyn AudioSource>,
    ) -> Self {
        Self {
            registry,
            catalog,
            audio,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(routes::health))
        .route("/songs", get(routes::list_songs))
        .route("/songs/:song_id", get(routes::song_detail))
        .route("/song/:song_id", get(routes::song_detail))
        .route("/pronounce/:word", get(routes::pronounce))
        .route(
            "/sessions/:session_id",
            get(routes::session_snapshot).delete(routes::remove_session),
        )
        .route("/sessions/:session_id/events", post(routes::post_event))
        .route("/ws/practice/:song_id", get(ws::practice_socket))
        .with_state(state)
}

/// Binds `addr` and serves until ctrl-c.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local_addr = listener.local_addr().context("listener has no local address")?;
    info!(target: "transport", %local_addr, "practice server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("practice server terminated unexpectedly")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(target: "transport", "shutdown requested");
    }
}
