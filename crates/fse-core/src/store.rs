//! The persistence collaborator traits.
//!
//! Implemented by storage backends (e.g. `fse-store-sqlite`, or
//! [`MemoryStore`](crate::memory::MemoryStore) in tests). The resolver, the
//! deduplication gate and the ingest layer depend on these abstractions, never
//! on a concrete backend.
//!
//! No transactional guarantees are assumed beyond per-document atomicity.
//! Backends should still enforce identifier-value uniqueness and the
//! observation natural key as constraints; the in-core checks are an
//! optimisation on top of them.

use std::future::Future;

use uuid::Uuid;

use crate::{observation::Observation, subject::Subject};

/// Storage for [`Subject`] documents.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SubjectStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Find the subject owning an identifier with exactly this value.
  fn find_subject_by_identifier<'a>(
    &'a self,
    value: &'a str,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + 'a;

  /// Retrieve a subject by its surrogate key. Returns `None` if not found.
  fn find_subject_by_id(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// Insert or replace a subject document and return its key.
  ///
  /// - `key == None`: insert. The document is stored under `subject.id`, or
  ///   under a freshly minted id when `subject.id` is nil.
  /// - `key == Some(k)`: replace the whole document stored at `k`.
  fn upsert_subject(
    &self,
    key: Option<Uuid>,
    subject: Subject,
  ) -> impl Future<Output = Result<Uuid, Self::Error>> + Send + '_;

  /// List every stored subject.
  fn list_subjects(
    &self,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  /// Delete a subject and its observations. Returns `false` if not found.
  fn delete_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Number of stored subjects.
  fn count_subjects(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

/// Storage for [`Observation`] documents. Observations are append-only.
pub trait ObservationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Find a stored observation by its natural key.
  fn find_observation<'a>(
    &'a self,
    subject_ref: Uuid,
    code: &'a str,
    issued_at: &'a str,
  ) -> impl Future<Output = Result<Option<Observation>, Self::Error>> + Send + 'a;

  /// Persist a new observation.
  fn insert_observation(
    &self,
    observation: Observation,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All observations of a subject, in insertion order.
  fn list_observations(
    &self,
    subject_ref: Uuid,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + '_;

  /// Number of stored observations, across all subjects.
  fn count_observations(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
