//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects` | Optional `?q=` substring filter |
//! | `GET`    | `/subjects/{id}` | 404 if not found |
//! | `DELETE` | `/subjects/{id}` | 204, or 404 if not found |
//! | `GET`    | `/subjects/{id}/observations` | 404 if the subject is unknown |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use fse_core::{
  observation::Observation,
  store::{ObservationStore, SubjectStore},
  subject::Subject,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub q: Option<String>,
}

/// `GET /subjects[?q=<text>]`
pub async fn list<S>(
  State(state): State<Arc<ApiState<S>>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Subject>>, ApiError>
where
  S: SubjectStore + ObservationStore + 'static,
{
  let mut subjects = state
    .store
    .list_subjects()
    .await
    .map_err(ApiError::store)?;

  if let Some(q) = params.q.as_deref().map(str::trim)
    && !q.is_empty()
  {
    subjects.retain(|s| s.matches_query(q));
  }
  Ok(Json(subjects))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /subjects/{id}`
pub async fn get_one<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Subject>, ApiError>
where
  S: SubjectStore + ObservationStore + 'static,
{
  let subject = state
    .store
    .find_subject_by_id(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::SubjectNotFound(id))?;
  Ok(Json(subject))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /subjects/{id}`: removes the subject and its observations.
pub async fn delete_one<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: SubjectStore + ObservationStore + 'static,
{
  let deleted = state
    .store
    .delete_subject(id)
    .await
    .map_err(ApiError::store)?;
  if !deleted {
    return Err(ApiError::SubjectNotFound(id));
  }
  tracing::info!(subject_id = %id, "deleted subject");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Observations ─────────────────────────────────────────────────────────────

/// `GET /subjects/{id}/observations`
pub async fn observations<S>(
  State(state): State<Arc<ApiState<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Observation>>, ApiError>
where
  S: SubjectStore + ObservationStore + 'static,
{
  state
    .store
    .find_subject_by_id(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::SubjectNotFound(id))?;

  let observations = state
    .store
    .list_observations(id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(observations))
}
