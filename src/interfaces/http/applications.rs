use super::AppState;
use super::caller::Caller;
use super::error::ApiError;
use crate::application::applications::{Acceptance, ApplicationRevision, NewApplication};
use crate::domain::application::Application;
use crate::domain::ids::ApplicationId;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

pub async fn apply(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<NewApplication>,
) -> Result<(StatusCode, Json<Application>), ApiError> {
    let application = state.engine.applications.apply(caller, body).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub async fn list_mine(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<Application>>, ApiError> {
    Ok(Json(state.engine.applications.list_by_officer(caller).await?))
}

pub async fn revise(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(application_id): Path<ApplicationId>,
    Json(body): Json<ApplicationRevision>,
) -> Result<Json<Application>, ApiError> {
    let application = state
        .engine
        .applications
        .revise(caller, application_id, body)
        .await?;
    Ok(Json(application))
}

pub async fn reject(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(application_id): Path<ApplicationId>,
) -> Result<Json<Application>, ApiError> {
    let application = state
        .engine
        .applications
        .reject(caller, application_id)
        .await?;
    Ok(Json(application))
}

pub async fn accept(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(application_id): Path<ApplicationId>,
) -> Result<Json<Acceptance>, ApiError> {
    let acceptance = state
        .engine
        .applications
        .accept(caller, application_id)
        .await?;
    Ok(Json(acceptance))
}
