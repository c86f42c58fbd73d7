use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;

use crate::client::HttpPixelClient;
use crate::scanner::{self, ScanRequest};
use crate::state::{AppState, StatusEvent};

pub fn router(
    state: AppState,
    client: Arc<HttpPixelClient>,
    events: UnboundedSender<StatusEvent>,
) -> Router {
    Router::new()
        .route("/start", post(start_scan))
        .route("/stop", post(stop_scan))
        .route("/status", get(get_status))
        .route("/matches", get(get_matches))
        .with_state(ApiState {
            app: state,
            client,
            events,
        })
}

#[derive(Clone)]
struct ApiState {
    app: AppState,
    client: Arc<HttpPixelClient>,
    events: UnboundedSender<StatusEvent>,
}

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), StatusCode> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if let Some(token) = auth.strip_prefix("Bearer ")
        && token == expected_token
    {
        return Ok(());
    }

    Err(StatusCode::UNAUTHORIZED)
}

#[derive(Deserialize)]
struct StartParams {
    user: String,
    center_qx: i32,
    center_qy: i32,
    radius: i32,
}

async fn start_scan(
    State(api): State<ApiState>,
    headers: HeaderMap,
    Json(params): Json<StartParams>,
) -> Result<impl IntoResponse, StatusCode> {
    let token = {
        let state = api.app.lock().await;
        state.config.auth_token.clone()
    };
    check_auth(&headers, &token)?;

    let request = ScanRequest {
        user: params.user.trim().to_owned(),
        center_qx: params.center_qx,
        center_qy: params.center_qy,
        radius: params.radius,
    };

    match scanner::start_scan(&api.app, api.client.clone(), &api.events, request).await {
        Ok(()) => Ok(Json(json!({"status": "started"}))),
        Err(e) => {
            tracing::warn!("scan request rejected: {e}");
            Err(StatusCode::BAD_REQUEST)
        }
    }
}

async fn stop_scan(
    State(api): State<ApiState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let token = {
        let state = api.app.lock().await;
        state.config.auth_token.clone()
    };
    check_auth(&headers, &token)?;

    if scanner::stop_scan(&api.app, &api.events).await {
        Ok(Json(json!({"status": "stopped"})))
    } else {
        Ok(Json(json!({"status": "idle"})))
    }
}

#[derive(Serialize)]
struct StatusResponse {
    running: bool,
    user: Option<String>,
    pixels_found: u64,
    last_status: Option<StatusEvent>,
}

async fn get_status(
    State(api): State<ApiState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let state = api.app.lock().await;
    check_auth(&headers, &state.config.auth_token)?;

    Ok(Json(StatusResponse {
        running: state.running,
        user: state.request.as_ref().map(|r| r.user.clone()),
        pixels_found: state.pixels_found,
        last_status: state.last_status.clone(),
    }))
}

async fn get_matches(
    State(api): State<ApiState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let state = api.app.lock().await;
    check_auth(&headers, &state.config.auth_token)?;

    Ok(Json(state.matches.clone()))
}
