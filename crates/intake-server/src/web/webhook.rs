//! Telegram webhook endpoint

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};
use tracing::warn;

use super::error::ApiError;
use crate::app::SharedState;
use crate::telegram::Update;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// POST /telegram/webhook
///
/// Unparseable updates are acknowledged so Telegram does not redeliver them.
pub async fn receive(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let Some(bot) = state.telegram.clone() else {
        return Err(ApiError::not_found("Telegram bot is not enabled"));
    };

    let secret = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !bot.verify_secret(secret) {
        warn!("Telegram webhook rejected: bad secret token");
        return Err(ApiError::unauthorized("Invalid webhook secret"));
    }

    match serde_json::from_value::<Update>(body) {
        Ok(update) => bot.handle_update(update).await,
        Err(e) => warn!(error = %e, "Ignoring malformed Telegram update"),
    }
    Ok(Json(json!({ "ok": true })))
}

/// GET /telegram/webhook
pub async fn status(State(state): State<SharedState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "enabled": state.telegram.is_some(),
        })),
    )
}
