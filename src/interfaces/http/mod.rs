//! HTTP surface.

use crate::application::engine::EscrowEngine;
use axum::Router;
use axum::routing::{get, patch, post};
use tower_http::trace::TraceLayer;

pub mod applications;
pub mod caller;
pub mod connects;
pub mod error;
pub mod health;
pub mod requests;
pub mod users;
pub mod webhook;

#[derive(Clone)]
pub struct AppState {
    pub engine: EscrowEngine,
}

impl AppState {
    pub fn new(engine: EscrowEngine) -> Self {
        Self { engine }
    }
}

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/payments/webhook",
            get(webhook::callback_get).post(webhook::callback_post),
        )
        .route("/users", post(users::register))
        .route("/users/me", get(users::me))
        .route("/users/{user_id}/deactivate", post(users::deactivate))
        .route("/requests", post(requests::create_request))
        .route(
            "/requests/{request_id}",
            get(requests::get_request).patch(requests::update_request),
        )
        .route(
            "/requests/{request_id}/applications",
            get(requests::list_applications),
        )
        .route("/applications", post(applications::apply))
        .route("/applications/mine", get(applications::list_mine))
        .route("/applications/{application_id}", patch(applications::revise))
        .route(
            "/applications/{application_id}/reject",
            post(applications::reject),
        )
        .route(
            "/applications/{application_id}/accept",
            post(applications::accept),
        )
        .route("/connects/purchase", post(connects::purchase))
        .route("/connects/balance", get(connects::balance))
        .route("/chat-rooms", get(connects::chat_rooms))
        .with_state(state);

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", v1_routes)
        .layer(TraceLayer::new_for_http())
}
