//! Identity resolution: does an incoming subject already exist?
//!
//! The candidate's primary identifier (see
//! [`Subject::primary_identifier`]) is looked up by exact value. A match turns
//! the candidate into a wholesale replacement of the stored document under its
//! existing key; no match mints a new random key.
//!
//! This is a read-then-write against shared state. Two concurrent conversions
//! for the same identifier can both observe "not found"; callers that need
//! at-most-once inserts must serialise per matching key or rely on the store's
//! uniqueness constraint and retry the losing insert as an update.

use uuid::Uuid;

use crate::{store::SubjectStore, subject::Subject};

/// What to do with a resolved candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAction {
  /// No stored subject matched; `Subject::id` holds a freshly minted key.
  Insert(Subject),
  /// A stored subject matched. The candidate replaces it under `key`.
  Update(Uuid, Subject),
}

impl ResolvedAction {
  /// The key the subject will be stored under.
  pub fn subject_id(&self) -> Uuid {
    match self {
      Self::Insert(s) => s.id,
      Self::Update(key, _) => *key,
    }
  }

  pub fn subject(&self) -> &Subject {
    match self {
      Self::Insert(s) | Self::Update(_, s) => s,
    }
  }

  pub fn is_update(&self) -> bool { matches!(self, Self::Update(..)) }

  /// Persist the action through the collaborator and return the stored key.
  pub async fn apply<S: SubjectStore>(self, store: &S) -> Result<Uuid, S::Error> {
    match self {
      Self::Insert(subject) => store.upsert_subject(None, subject).await,
      Self::Update(key, subject) => store.upsert_subject(Some(key), subject).await,
    }
  }
}

/// Decide whether `candidate` creates a new subject or replaces a stored one.
pub async fn resolve<S: SubjectStore>(
  mut candidate: Subject,
  store: &S,
) -> Result<ResolvedAction, S::Error> {
  let matching_key = candidate.primary_identifier().map(|i| i.value.clone());

  let existing = match matching_key.as_deref() {
    Some(value) => store.find_subject_by_identifier(value).await?,
    None => None,
  };

  match existing {
    Some(stored) => {
      tracing::debug!(
        subject_id = %stored.id,
        identifier = matching_key.as_deref().unwrap_or_default(),
        "matched existing subject"
      );
      candidate.id = stored.id;
      Ok(ResolvedAction::Update(stored.id, candidate))
    }
    None => {
      candidate.id = Uuid::new_v4();
      tracing::debug!(subject_id = %candidate.id, "minted new subject");
      Ok(ResolvedAction::Insert(candidate))
    }
  }
}
