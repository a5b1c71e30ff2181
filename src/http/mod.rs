use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, get_service, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::app::AppContext;
use crate::ticker::{DETECTOR_LOOP, SIMULATOR_LOOP};

const LOOP_NAMES: &[&str] = &[SIMULATOR_LOOP, DETECTOR_LOOP];

pub fn create_router(ctx: AppContext) -> Router {
    let static_dir = ctx.config.http.static_dir.clone();

    let asset_service = get_service(ServeDir::new(static_dir));

    let api = Router::new()
        .route("/alerts", get(list_alerts))
        .route("/alerts/read-all", post(mark_all_read))
        .route("/alerts/read", delete(clear_read))
        .route("/alerts/:id", delete(dismiss_alert))
        .route("/alerts/:id/read", post(mark_read))
        .route("/alerts/:id/resolve", post(resolve_alert))
        .route("/machines", get(list_machines))
        .route(
            "/config/idle-threshold",
            get(get_idle_threshold).put(put_idle_threshold),
        );

    Router::new()
        .route("/healthz", get(get_healthz))
        .route("/metrics", get(get_metrics))
        .nest("/api/v1", api)
        .fallback_service(asset_service)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn get_healthz(State(ctx): State<AppContext>) -> StatusCode {
    let is_ready = ctx.state.is_ready(LOOP_NAMES, Duration::from_secs(60)).await;

    if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn get_metrics(State(ctx): State<AppContext>) -> Response {
    match ctx.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => {
            warn!(error = ?err, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

async fn list_alerts(State(ctx): State<AppContext>) -> Json<Vec<crate::alert::Alert>> {
    Json(ctx.state.alerts().await)
}

async fn list_machines(State(ctx): State<AppContext>) -> Json<Vec<crate::state::MachineSnapshot>> {
    let now = chrono::Utc::now();
    Json(ctx.state.machine_snapshots(&ctx.registry, now).await)
}

async fn mark_read(State(ctx): State<AppContext>, Path(id): Path<String>) -> StatusCode {
    if ctx.state.mark_read(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn mark_all_read(State(ctx): State<AppContext>) -> StatusCode {
    ctx.state.mark_all_read().await;
    StatusCode::NO_CONTENT
}

async fn resolve_alert(State(ctx): State<AppContext>, Path(id): Path<String>) -> StatusCode {
    if ctx.state.resolve(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn dismiss_alert(State(ctx): State<AppContext>, Path(id): Path<String>) -> StatusCode {
    if ctx.state.dismiss(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Serialize)]
struct ClearedResponse {
    removed: usize,
}

async fn clear_read(State(ctx): State<AppContext>) -> Json<ClearedResponse> {
    let removed = ctx.state.clear_read().await;
    Json(ClearedResponse { removed })
}

#[derive(Serialize)]
struct ThresholdView {
    idle_threshold_minutes: u64,
}

async fn get_idle_threshold(State(ctx): State<AppContext>) -> Json<ThresholdView> {
    Json(ThresholdView {
        idle_threshold_minutes: ctx.state.idle_threshold_minutes().await,
    })
}

#[derive(Deserialize)]
struct ThresholdUpdate {
    idle_threshold_minutes: i64,
}

/// Live threshold edit. Values below one minute are clamped, not rejected;
/// the new threshold applies on the next detector tick.
async fn put_idle_threshold(
    State(ctx): State<AppContext>,
    Json(update): Json<ThresholdUpdate>,
) -> Json<ThresholdView> {
    let applied = ctx
        .state
        .set_idle_threshold_minutes(update.idle_threshold_minutes)
        .await;
    Json(ThresholdView {
        idle_threshold_minutes: applied,
    })
}
