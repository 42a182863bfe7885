//! Handlers for `POST /messages` (HL7 upload) and `POST /messages/preview`.
//!
//! Body: `{"hl7_message": "MSH|...", "delimiters": {...}}`, where
//! `delimiters` is optional and overrides the configured encoding
//! characters for this message only.
//!
//! A preview converts the message and returns the unresolved subject and
//! observations, or the failure with 422. Nothing is read from or written to
//! the store.
//!
//! | Outcome | Status |
//! |---------|--------|
//! | converted and stored | 200 |
//! | message unusable | 422 |
//! | store failure | 500 |
//! | blank message | 400 |
//!
//! Every status except 400 carries the ingest outcome as its body.

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use fse_core::store::{ObservationStore, SubjectStore};
use fse_hl7::Delimiters;
use fse_ingest::{
  IngestFailure, IngestOptions, IngestOutcome, ingest, preview,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct UploadBody {
  pub hl7_message: String,
  #[serde(default)]
  pub delimiters:  Option<Delimiters>,
}

impl UploadBody {
  /// The configured options with this request's delimiter override applied.
  /// Fails on a blank message.
  fn options(
    &self,
    configured: IngestOptions,
  ) -> Result<IngestOptions, ApiError> {
    if self.hl7_message.trim().is_empty() {
      return Err(ApiError::EmptyMessage);
    }
    Ok(IngestOptions {
      delimiters: self.delimiters.unwrap_or(configured.delimiters),
      ..configured
    })
  }
}

/// `POST /messages`
pub async fn upload<S>(
  State(state): State<Arc<ApiState<S>>>,
  Json(body): Json<UploadBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SubjectStore + ObservationStore + 'static,
{
  let options = body.options(state.options)?;
  let outcome = ingest(&body.hl7_message, &options, state.store.as_ref()).await;

  let status = match &outcome {
    IngestOutcome::Success(_) => StatusCode::OK,
    IngestOutcome::Failure(f) if f.error_kind.is_conversion() => {
      StatusCode::UNPROCESSABLE_ENTITY
    }
    IngestOutcome::Failure(_) => StatusCode::INTERNAL_SERVER_ERROR,
  };
  Ok((status, Json(outcome)))
}

/// `POST /messages/preview`
pub async fn preview_upload<S>(
  State(state): State<Arc<ApiState<S>>>,
  Json(body): Json<UploadBody>,
) -> Result<Response, ApiError>
where
  S: SubjectStore + ObservationStore + 'static,
{
  let options = body.options(state.options)?;
  let response = match preview(&body.hl7_message, &options) {
    Ok(converted) => Json(converted).into_response(),
    Err(error) => (
      StatusCode::UNPROCESSABLE_ENTITY,
      Json(IngestFailure::from(&error)),
    )
      .into_response(),
  };
  Ok(response)
}
