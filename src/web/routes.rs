use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;

use super::dashboard::{StatusSnapshot, render_dashboard};
use super::{AppError, AppState};
use crate::actuator::{Command, Outcome};
use crate::gateway::Source;

pub(super) async fn manual(
    state: AppState,
    command: Command,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let gateway = state.gateway.clone();
    let reply = tokio::task::spawn_blocking(move || gateway.handle(command, Source::Web))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))?;

    let status = match reply.outcome {
        Outcome::Completed => StatusCode::OK,
        Outcome::Skipped => StatusCode::CONFLICT,
        Outcome::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(serde_json::json!({ "result": reply.result }))))
}

pub(super) async fn status(State(state): State<AppState>) -> Result<Json<StatusSnapshot>, AppError> {
    Ok(Json(snapshot(state).await?))
}

pub(super) async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let snapshot = snapshot(state).await?;
    Ok(Html(render_dashboard(&snapshot)))
}

async fn snapshot(state: AppState) -> Result<StatusSnapshot, AppError> {
    tokio::task::spawn_blocking(move || StatusSnapshot::collect(&state))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))
}
