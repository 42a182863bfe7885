//! Error type for `fse-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[source] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  /// A constraint rejected the write: an identifier value owned by another
  /// subject, a natural key already stored, or an unknown subject reference.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("subject not found: {0}")]
  SubjectNotFound(uuid::Uuid),
}

impl From<tokio_rusqlite::Error> for Error {
  fn from(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
        code,
        message,
      )) if code.code == rusqlite::ErrorCode::ConstraintViolation => {
        Self::Conflict(message.unwrap_or_else(|| code.to_string()))
      }
      other => Self::Database(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
