//! An in-memory [`SubjectStore`] + [`ObservationStore`].
//!
//! Used by tests across the workspace and by the server's `--in-memory` mode.
//! It enforces the same constraints a persistent backend should: identifier
//! values are unique across subjects, and observation natural keys are unique.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::{
  Error, Result,
  observation::Observation,
  store::{ObservationStore, SubjectStore},
  subject::Subject,
};

#[derive(Default)]
struct Inner {
  subjects:     Vec<Subject>,
  observations: Vec<Observation>,
}

/// A store backed by two vectors behind a mutex.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl Inner {
  /// Reject identifier values already owned by a different subject.
  fn check_identifiers(&self, key: Uuid, subject: &Subject) -> Result<()> {
    for identifier in &subject.identifiers {
      let owner = self
        .subjects
        .iter()
        .find(|s| s.id != key && s.has_identifier_value(&identifier.value));
      if let Some(owner) = owner {
        return Err(Error::IdentifierConflict {
          value: identifier.value.clone(),
          owner: owner.id,
        });
      }
    }
    Ok(())
  }
}

impl SubjectStore for MemoryStore {
  type Error = Error;

  async fn find_subject_by_identifier(
    &self,
    value: &str,
  ) -> Result<Option<Subject>> {
    let inner = self.lock();
    Ok(
      inner
        .subjects
        .iter()
        .find(|s| s.has_identifier_value(value))
        .cloned(),
    )
  }

  async fn find_subject_by_id(&self, id: Uuid) -> Result<Option<Subject>> {
    let inner = self.lock();
    Ok(inner.subjects.iter().find(|s| s.id == id).cloned())
  }

  async fn upsert_subject(
    &self,
    key: Option<Uuid>,
    mut subject: Subject,
  ) -> Result<Uuid> {
    let mut inner = self.lock();
    match key {
      Some(key) => {
        let pos = inner
          .subjects
          .iter()
          .position(|s| s.id == key)
          .ok_or(Error::SubjectNotFound(key))?;
        inner.check_identifiers(key, &subject)?;
        subject.id = key;
        inner.subjects[pos] = subject;
        Ok(key)
      }
      None => {
        if subject.id.is_nil() {
          subject.id = Uuid::new_v4();
        }
        let id = subject.id;
        inner.check_identifiers(id, &subject)?;
        inner.subjects.push(subject);
        Ok(id)
      }
    }
  }

  async fn list_subjects(&self) -> Result<Vec<Subject>> {
    Ok(self.lock().subjects.clone())
  }

  async fn delete_subject(&self, id: Uuid) -> Result<bool> {
    let mut inner = self.lock();
    let before = inner.subjects.len();
    inner.subjects.retain(|s| s.id != id);
    if inner.subjects.len() == before {
      return Ok(false);
    }
    inner.observations.retain(|o| o.subject_ref != id);
    Ok(true)
  }

  async fn count_subjects(&self) -> Result<usize> {
    Ok(self.lock().subjects.len())
  }
}

impl ObservationStore for MemoryStore {
  type Error = Error;

  async fn find_observation(
    &self,
    subject_ref: Uuid,
    code: &str,
    issued_at: &str,
  ) -> Result<Option<Observation>> {
    let inner = self.lock();
    Ok(
      inner
        .observations
        .iter()
        .find(|o| {
          o.subject_ref == subject_ref
            && o.code.value == code
            && o.issued_at == issued_at
        })
        .cloned(),
    )
  }

  async fn insert_observation(&self, observation: Observation) -> Result<()> {
    let mut inner = self.lock();
    if let Some(key) = observation.natural_key() {
      let taken = inner
        .observations
        .iter()
        .any(|o| o.natural_key().as_ref() == Some(&key));
      if taken {
        return Err(Error::DuplicateObservation {
          subject_ref: key.subject_ref,
          code:        key.code,
          issued_at:   key.issued_at,
        });
      }
    }
    inner.observations.push(observation);
    Ok(())
  }

  async fn list_observations(&self, subject_ref: Uuid) -> Result<Vec<Observation>> {
    let inner = self.lock();
    Ok(
      inner
        .observations
        .iter()
        .filter(|o| o.subject_ref == subject_ref)
        .cloned()
        .collect(),
    )
  }

  async fn count_observations(&self) -> Result<usize> {
    Ok(self.lock().observations.len())
  }
}
