//! Liveness and store statistics.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/health` | Always 200 while the process serves requests |
//! | `GET`  | `/stats`  | Document counts per collection |

use std::sync::Arc;

use axum::{Json, extract::State};
use fse_core::store::{ObservationStore, SubjectStore};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{ApiState, error::ApiError};

/// `GET /health`
pub async fn health() -> Json<Value> {
  Json(json!({ "status": "healthy" }))
}

#[derive(Debug, Serialize)]
pub struct Stats {
  pub subjects:     usize,
  pub observations: usize,
}

/// `GET /stats`
pub async fn stats<S>(
  State(state): State<Arc<ApiState<S>>>,
) -> Result<Json<Stats>, ApiError>
where
  S: SubjectStore + ObservationStore + 'static,
{
  let subjects = state
    .store
    .count_subjects()
    .await
    .map_err(ApiError::store)?;
  let observations = state
    .store
    .count_observations()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Stats {
    subjects,
    observations,
  }))
}
