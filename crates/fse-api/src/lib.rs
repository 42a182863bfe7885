//! JSON REST API for FSE.
//!
//! Exposes an axum [`Router`] backed by any store implementing
//! [`SubjectStore`] and [`ObservationStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", fse_api::api_router(store.clone(), options))
//! ```

pub mod error;
pub mod messages;
pub mod status;
pub mod subjects;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use fse_core::store::{ObservationStore, SubjectStore};
use fse_ingest::IngestOptions;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:   Arc<S>,
  /// Applied to every upload unless the request overrides the delimiters.
  pub options: IngestOptions,
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, options: IngestOptions) -> Router<()>
where
  S: SubjectStore + ObservationStore + 'static,
{
  let state = Arc::new(ApiState { store, options });
  Router::new()
    .route("/health", get(status::health))
    .route("/stats", get(status::stats::<S>))
    // Upload
    .route("/messages", post(messages::upload::<S>))
    .route("/messages/preview", post(messages::preview_upload::<S>))
    // Subjects
    .route("/subjects", get(subjects::list::<S>))
    .route(
      "/subjects/{id}",
      get(subjects::get_one::<S>).delete(subjects::delete_one::<S>),
    )
    .route("/subjects/{id}/observations", get(subjects::observations::<S>))
    .with_state(state)
}
