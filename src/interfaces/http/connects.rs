use super::AppState;
use super::caller::Caller;
use super::error::ApiError;
use crate::application::connects::PurchaseCheckout;
use crate::domain::chat::ChatRoom;
use crate::domain::ids::UserId;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PurchaseBody {
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user: UserId,
    pub connects: u32,
}

pub async fn purchase(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(body): Json<PurchaseBody>,
) -> Result<Json<PurchaseCheckout>, ApiError> {
    let checkout = state
        .engine
        .purchases
        .purchase(caller, body.quantity)
        .await?;
    Ok(Json(checkout))
}

pub async fn balance(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<BalanceResponse>, ApiError> {
    let connects = state.engine.ledger.balance(caller).await?;
    Ok(Json(BalanceResponse {
        user: caller,
        connects,
    }))
}

pub async fn chat_rooms(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> Result<Json<Vec<ChatRoom>>, ApiError> {
    Ok(Json(state.engine.chat_rooms(caller).await?))
}
