use super::AppState;
use super::caller::Caller;
use super::error::ApiError;
use crate::application::users::NewUser;
use crate::domain::ids::UserId;
use crate::domain::user::{Role, User};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.engine.users.register(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn me(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.engine.users.get(caller).await?))
}

/// Users may deactivate themselves; admins may deactivate anyone.
pub async fn deactivate(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(user_id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
    if caller != user_id {
        let acting = state.engine.users.get(caller).await?;
        if acting.role != Role::Admin {
            return Err(ApiError::new(
                StatusCode::FORBIDDEN,
                "only admins can deactivate other users",
            ));
        }
    }
    Ok(Json(state.engine.users.deactivate(user_id).await?))
}
