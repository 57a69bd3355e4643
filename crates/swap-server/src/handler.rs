use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use swap_match::{MatchQuery, MatchResult};
use swap_types::{NewSwapRequest, SwapRequest};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Optional query string of the find-matches endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ContactParams {
    #[serde(default, alias = "whatsappNumber")]
    pub contact: Option<String>,
}

/// Run a store operation off the async executor; the file backend may fsync.
async fn blocking<T, F>(f: F) -> ServerResult<T>
where
    F: FnOnce() -> ServerResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
}

/// Health check handler.
pub async fn health_handler(State(state): State<AppState>) -> ServerResult<Json<serde_json::Value>> {
    let records = blocking(move || Ok(state.store.len()?)).await?;
    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "records": records,
    })))
}

/// `POST /api/swap-requests`
pub async fn submit_handler(
    State(state): State<AppState>,
    payload: Result<Json<NewSwapRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<SwapRequest>)> {
    let Json(request) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let record = blocking(move || Ok(state.store.insert(request)?)).await?;
    tracing::info!(id = %record.id, "swap request submitted");
    Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /api/swap-requests`
pub async fn list_handler(State(state): State<AppState>) -> ServerResult<Json<Vec<SwapRequest>>> {
    let records = blocking(move || Ok(state.store.list_all()?)).await?;
    Ok(Json(records))
}

/// `GET /api/find-matches/:currentSection/:desiredSection`
pub async fn find_matches_handler(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    params: Result<Query<ContactParams>, QueryRejection>,
) -> ServerResult<Json<MatchResult>> {
    let Path((current, desired)) = path.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let Query(params) = params.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let mut query = MatchQuery::new(current, desired);
    if let Some(contact) = params.contact {
        query = query.with_contact(contact);
    }
    let result = blocking(move || Ok(state.matcher.find_matches(&query)?)).await?;
    Ok(Json(result))
}
