use super::AppState;
use super::caller::Caller;
use super::error::ApiError;
use crate::domain::application::Application;
use crate::domain::ids::RequestId;
use crate::domain::request::{NewRequest, RequestUpdate, ServiceRequest};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

pub async fn create_request(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<NewRequest>,
) -> Result<(StatusCode, Json<ServiceRequest>), ApiError> {
    let request = state.engine.requests.create(caller, body).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn update_request(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(request_id): Path<RequestId>,
    Json(body): Json<RequestUpdate>,
) -> Result<Json<ServiceRequest>, ApiError> {
    let request = state
        .engine
        .requests
        .update(caller, request_id, body)
        .await?;
    Ok(Json(request))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<RequestId>,
) -> Result<Json<ServiceRequest>, ApiError> {
    Ok(Json(state.engine.requests.get(request_id).await?))
}

pub async fn list_applications(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(request_id): Path<RequestId>,
) -> Result<Json<Vec<Application>>, ApiError> {
    let applications = state
        .engine
        .applications
        .list_for_request(caller, request_id)
        .await?;
    Ok(Json(applications))
}
