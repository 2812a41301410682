use super::AppState;
use super::error::ApiError;
use crate::application::reconciler::Reconciliation;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use serde::Deserialize;
use tracing::debug;

/// The reference the provider echoes back. Different delivery paths use
/// different field names for it.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    tx_ref: Option<String>,
    #[serde(default)]
    trx_ref: Option<String>,
}

impl CallbackParams {
    fn reference(self) -> Option<String> {
        self.trx_ref
            .into_iter()
            .chain(self.tx_ref)
            .find(|r| !r.trim().is_empty())
    }
}

/// Browser redirect / GET callback.
pub async fn callback_get(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<Reconciliation>, ApiError> {
    let reference = params
        .reference()
        .ok_or_else(|| ApiError::bad_request("missing tx_ref"))?;
    reconcile(&state, &reference).await
}

/// Server-to-server POST callback. The reference may come in the query
/// string or in a JSON body; anything else in the body is ignored.
pub async fn callback_post(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
    body: Bytes,
) -> Result<Json<Reconciliation>, ApiError> {
    let reference = params
        .reference()
        .or_else(|| {
            serde_json::from_slice::<CallbackParams>(&body)
                .inspect_err(|e| debug!(error = %e, "callback body is not JSON"))
                .ok()
                .and_then(CallbackParams::reference)
        })
        .ok_or_else(|| ApiError::bad_request("missing tx_ref"))?;
    reconcile(&state, &reference).await
}

async fn reconcile(state: &AppState, reference: &str) -> Result<Json<Reconciliation>, ApiError> {
    let outcome = state.engine.reconciler.reconcile(reference).await?;
    Ok(Json(outcome))
}
