//! API error type and its JSON rendering.
//!
//! Ingest failures are not errors at this layer: `POST /messages` returns the
//! outcome itself. What ends up here is request-level trouble.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("subject {0} not found")]
  SubjectNotFound(Uuid),

  #[error("hl7_message is empty")]
  EmptyMessage,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  fn status(&self) -> StatusCode {
    match self {
      Self::SubjectNotFound(_) => StatusCode::NOT_FOUND,
      Self::EmptyMessage => StatusCode::BAD_REQUEST,
      Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    if let Self::Store(e) = &self {
      tracing::error!(error = %e, "store error while serving request");
    }
    (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
  }
}
