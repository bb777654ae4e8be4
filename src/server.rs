//! HTTP surface for the donor task integration.
//!
//! Translates cache outcomes into transport status codes: reads are
//! tolerant (stale data over errors), writes are strict (a failed push is a
//! 502, never a masked success).

use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::donor::types::{ConsistencyReport, GtdStatus, MappedTask};
use crate::donor::{DonorApi, DonorCache, UpdateOutcome};

#[derive(Clone)]
pub struct AppState<C> {
  pub cache: DonorCache<C>,
  /// Local API key required on inbound requests; None disables the check.
  pub api_key: Option<String>,
}

impl<C> AppState<C> {
  pub fn new(cache: DonorCache<C>, api_key: Option<String>) -> Self {
    Self { cache, api_key }
  }
}

pub fn router<C>(state: AppState<C>) -> Router
where
  C: DonorApi + Clone + 'static,
{
  let api_key = state.api_key.clone();
  Router::new()
    .route("/donor-tasks", get(list_donor_tasks::<C>))
    .route("/donor-tasks/consistency", get(check_consistency::<C>))
    .route("/donor-tasks/{id}", get(get_donor_task::<C>))
    .route("/donor-tasks/{id}/status", patch(update_donor_task_status::<C>))
    .layer(middleware::from_fn_with_state(api_key, require_api_key))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListParams {
  /// Filter by donor status code ("pending", "completed", "cancelled").
  status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdate {
  status: GtdStatus,
}

/// List donor tasks, always served through the cache.
async fn list_donor_tasks<C: DonorApi>(
  State(state): State<AppState<C>>,
  Query(params): Query<ListParams>,
) -> Json<Vec<MappedTask>> {
  Json(state.cache.fetch_tasks(params.status.as_deref()).await)
}

/// Fetch a single donor task live, bypassing the cache.
async fn get_donor_task<C: DonorApi>(
  State(state): State<AppState<C>>,
  Path(id): Path<u64>,
) -> Result<Json<MappedTask>, (StatusCode, String)> {
  match state.cache.get_task(id).await {
    Ok(Some(task)) => Ok(Json(task)),
    Ok(None) => Err((
      StatusCode::NOT_FOUND,
      format!("Donor task {} not found", id),
    )),
    Err(err) => Err((StatusCode::BAD_GATEWAY, err.to_string())),
  }
}

/// Push a status change back to the donor DB.
///
/// Accepted values: "completed", "deleted" (maps to "cancelled" upstream).
async fn update_donor_task_status<C: DonorApi>(
  State(state): State<AppState<C>>,
  Path(id): Path<u64>,
  Json(body): Json<StatusUpdate>,
) -> Result<Json<MappedTask>, (StatusCode, String)> {
  match state.cache.update_status(id, body.status).await {
    UpdateOutcome::Updated(task) => Ok(Json(task)),
    UpdateOutcome::Unsupported => Err((
      StatusCode::UNPROCESSABLE_ENTITY,
      "status must be 'completed' or 'deleted'".to_string(),
    )),
    UpdateOutcome::Failed => Err((
      StatusCode::BAD_GATEWAY,
      "Failed to update status in donor DB".to_string(),
    )),
  }
}

/// Compare cached donor tasks against a live fetch from the donor DB.
async fn check_consistency<C: DonorApi>(
  State(state): State<AppState<C>>,
) -> Json<ConsistencyReport> {
  let report = state.cache.check_consistency().await;
  info!(
    "consistency check: {} checked, {} inconsistencies",
    report.checked_count,
    report.inconsistencies.len()
  );
  Json(report)
}

async fn require_api_key(
  State(api_key): State<Option<String>>,
  req: Request,
  next: Next,
) -> Response {
  if let Some(expected) = &api_key {
    let provided = req
      .headers()
      .get("X-API-Key")
      .and_then(|value| value.to_str().ok());
    if provided != Some(expected.as_str()) {
      return (StatusCode::UNAUTHORIZED, "Invalid or missing API key").into_response();
    }
  }
  next.run(req).await
}
