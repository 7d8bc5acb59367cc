//! HTTP surface: JSON API and the Telegram webhook

pub mod api;
pub mod error;
pub mod webhook;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::app::SharedState;

pub use error::{ApiError, ApiResult};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/tasks", post(api::create_task))
        .route("/api/answers", post(api::submit_answer))
        .route("/api/actions", post(api::submit_action))
        .route("/api/edit-task", post(api::edit_task))
        .route("/api/teams", get(api::list_teams))
        .route("/api/teams/:team/template", put(api::update_team_template))
        .route(
            "/api/teams/:team/template/reset",
            post(api::reset_team_template),
        )
        .route(
            "/api/teams/:team/subtypes/:subtype/template",
            put(api::update_subtype_template),
        )
        .route(
            "/api/teams/:team/subtypes/:subtype/template/reset",
            post(api::reset_subtype_template),
        )
        .route(
            "/api/history",
            get(api::list_history).delete(api::clear_history),
        )
        .route("/api/history/:id", delete(api::delete_history_item))
        .route(
            "/telegram/webhook",
            post(webhook::receive).get(webhook::status),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
