//! Error types for the fse-hl7 codec.

use thiserror::Error;

/// Structural failures of the tokenizer and classifier.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
  #[error("message contains no segments")]
  Empty,

  /// Only raised when the caller asks for a recognised message kind.
  #[error("unrecognised message kind in header {0:?}")]
  UnknownMessageKind(String),
}

/// Failures building a subject from the identification segment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingError {
  #[error("no usable patient identifier in message")]
  NoIdentifiers,

  #[error("identification segment is truncated before its identifier field")]
  MissingIdentificationSegment,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
  #[error(transparent)]
  Parse(#[from] ParseError),

  #[error(transparent)]
  Mapping(#[from] MappingError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
