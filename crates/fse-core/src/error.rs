//! Error types for `fse-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("identifier {value:?} already belongs to subject {owner}")]
  IdentifierConflict { value: String, owner: Uuid },

  #[error("observation already recorded for {subject_ref} / {code} at {issued_at:?}")]
  DuplicateObservation {
    subject_ref: Uuid,
    code:        String,
    issued_at:   String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
