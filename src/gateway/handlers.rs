use super::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};

/// GET /health — liveness probe.
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /urllog/{channel} — the channel's ledger as structured data.
///
/// Unknown channels return an empty list rather than 404; an empty ledger
/// and a never-seen channel are indistinguishable by design.
pub(super) async fn handle_channel_log(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> impl IntoResponse {
    match state.store.entries(&channel).await {
        Ok(entries) => (
            StatusCode::OK,
            Json(serde_json::json!({ "channel": channel, "urls": entries })),
        ),
        Err(e) => {
            tracing::error!(channel = %channel, error = %e, "ledger read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
        }
    }
}
