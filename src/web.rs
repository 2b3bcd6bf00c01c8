//! Minimal web API: trigger a fetch on demand and manage the historical
//! ledger. Thin request/response glue; all decisions live in the pipeline
//! and the ledger, which are injected through [`AppState`].

use crate::config::MeterConfig;
use crate::ledger::HistoricalLedger;
use crate::pipeline::FetchPipeline;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_derive::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FetchPipeline>,
    pub ledger: Arc<HistoricalLedger>,
    pub meters: MeterConfig,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/fetch", post(fetch))
        .route("/config", get(config))
        .route("/historical/add", post(historical_add))
        .route("/historical/delete", post(historical_delete))
        .route("/historical/list", get(historical_list))
        .with_state(state)
}

/// Serves the API on an already-bound listener until the process exits.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) {
    if let Err(e) = axum::serve(listener, router(state).into_make_service()).await {
        tracing::error!("Web server error: {}", e);
    }
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "last_fetch": state.pipeline.last_fetch().map(|t| t.to_rfc3339()),
    }))
}

async fn fetch(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    if state.pipeline.run().await {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Readings fetched successfully",
            })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": "Failed to fetch readings. Check the add-on logs for details.",
            })),
        )
    }
}

async fn config(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "main_meter_number": state.meters.main_meter_number,
        "main_meter_name": state.meters.main_meter_name,
        "garden_meter_number": state.meters.garden_meter_number,
        "garden_meter_name": state.meters.garden_meter_name,
    }))
}

fn default_reading_type() -> String {
    "Manual Entry".to_string()
}

#[derive(Deserialize)]
struct AddRequest {
    meter_number: String,
    date: String,
    reading: f64,
    consumption: Option<f64>,
    #[serde(default = "default_reading_type")]
    reading_type: String,
}

async fn historical_add(
    State(state): State<AppState>,
    Json(request): Json<AddRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let added = state.ledger.add(
        &request.meter_number,
        &request.date,
        request.reading,
        request.consumption,
        &request.reading_type,
    );
    if added {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Historical reading added successfully",
            })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": "Failed to add reading",
            })),
        )
    }
}

#[derive(Deserialize)]
struct DeleteRequest {
    meter_number: String,
    date: String,
}

async fn historical_delete(
    State(state): State<AppState>,
    Json(request): Json<DeleteRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    if state.ledger.delete(&request.meter_number, &request.date) {
        (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Historical reading deleted successfully",
            })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "message": "Failed to delete reading",
            })),
        )
    }
}

async fn historical_list(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "readings": state.ledger.get_all(),
    }))
}
