//! Deduplication gate for observations.
//!
//! An observation is a duplicate when a stored one shares its natural key
//! `(subject_ref, code.value, issued_at)`. Duplicates are skipped, not merged.
//! Like identity resolution this is a best-effort check-then-act; the store's
//! unique index remains the source of truth under concurrency.

use crate::{observation::Observation, store::ObservationStore};

/// Whether `candidate` should be persisted.
///
/// Observations without a code bypass the check and are always persisted.
pub async fn should_persist<S: ObservationStore>(
  candidate: &Observation,
  store: &S,
) -> Result<bool, S::Error> {
  let Some(key) = candidate.natural_key() else {
    return Ok(true);
  };

  let existing = store
    .find_observation(key.subject_ref, &key.code, &key.issued_at)
    .await?;

  if existing.is_some() {
    tracing::debug!(
      subject_ref = %key.subject_ref,
      code = %key.code,
      issued_at = %key.issued_at,
      "skipping duplicate observation"
    );
  }
  Ok(existing.is_none())
}
