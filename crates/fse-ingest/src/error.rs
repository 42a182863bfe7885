//! Failures of a single ingestion, before they are folded into an outcome.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Convert(#[from] fse_hl7::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
