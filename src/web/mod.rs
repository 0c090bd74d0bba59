//! Manual override web surface.
//!
//! - `GET /` dashboard with climate, solar times, pending jobs and buttons
//! - `GET /api/status` the same data as JSON
//! - `GET /manual<device><action>` one route per [`Command`], answering
//!   `{"result": "..."}` with 200 when it ran, 409 when the door was busy and
//!   500 when the output failed
//!
//! Handlers run the blocking gateway and sensor calls on tokio's blocking pool.

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::routing::get;
use chrono_tz::Tz;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::actuator::Command;
use crate::gateway::OverrideGateway;
use crate::scheduler::DailyScheduler;
use crate::sensors::ClimateSensor;
use crate::time_source::TimeSource;

mod dashboard;
mod error;
mod routes;

pub use dashboard::{JobView, StatusSnapshot};
pub use error::AppError;

const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<OverrideGateway>,
    pub scheduler: Arc<DailyScheduler>,
    pub sensor: Option<Arc<dyn ClimateSensor>>,
    pub clock: Arc<dyn TimeSource>,
    pub tz: Tz,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/", get(routes::index))
        .route("/api/status", get(routes::status));

    for command in Command::ALL {
        router = router.route(
            &format!("/{}", command.route()),
            get(move |State(state): State<AppState>| routes::manual(state, command)),
        );
    }

    router.layer(cors).with_state(state)
}

/// Serve on `listen` until `running` is cleared.
pub async fn serve(listen: &str, state: AppState, running: Arc<AtomicBool>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind web server to {listen}"))?;
    serve_on(listener, state, running).await
}

/// Serve on a pre-bound listener (port 0 in tests).
pub async fn serve_on(
    listener: tokio::net::TcpListener,
    state: AppState,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let addr = listener.local_addr()?;
    log_decorated!("Web control listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            while running.load(Ordering::SeqCst) {
                tokio::time::sleep(SHUTDOWN_POLL).await;
            }
        })
        .await
        .context("Web server failed")?;
    Ok(())
}

#[cfg(test)]
mod tests;
