//! The discriminated result of ingesting one message.
//!
//! Serialises as either
//! `{"success":true,"subjectId":..,"observationsPersisted":..,...}` or
//! `{"success":false,"errorKind":..,"message":..}`.

use fse_hl7::{MappingError, MessageKind, ParseError};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::Error;

/// Whether identity resolution created or replaced the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectAction {
  Inserted,
  Updated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
  pub subject_id:             Uuid,
  pub observations_persisted: usize,
  pub duplicates_skipped:     usize,
  pub message_kind:           MessageKind,
  pub action:                 SubjectAction,
  pub control_id:             String,
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Empty,
  UnknownMessageKind,
  NoIdentifiers,
  MissingIdentificationSegment,
  Persistence,
}

impl ErrorKind {
  /// Failures caused by the message itself rather than the store.
  pub fn is_conversion(self) -> bool { self != Self::Persistence }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestFailure {
  pub error_kind: ErrorKind,
  pub message:    String,
}

impl From<&Error> for IngestFailure {
  fn from(error: &Error) -> Self {
    let error_kind = match error {
      Error::Convert(fse_hl7::Error::Parse(ParseError::Empty)) => {
        ErrorKind::Empty
      }
      Error::Convert(fse_hl7::Error::Parse(
        ParseError::UnknownMessageKind(_),
      )) => ErrorKind::UnknownMessageKind,
      Error::Convert(fse_hl7::Error::Mapping(MappingError::NoIdentifiers)) => {
        ErrorKind::NoIdentifiers
      }
      Error::Convert(fse_hl7::Error::Mapping(
        MappingError::MissingIdentificationSegment,
      )) => ErrorKind::MissingIdentificationSegment,
      Error::Store(_) => ErrorKind::Persistence,
    };
    Self {
      error_kind,
      message: error.to_string(),
    }
  }
}

/// Exactly one outcome is produced per input message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
  Success(IngestReport),
  Failure(IngestFailure),
}

impl IngestOutcome {
  pub fn is_success(&self) -> bool { matches!(self, Self::Success(_)) }

  pub fn report(&self) -> Option<&IngestReport> {
    match self {
      Self::Success(report) => Some(report),
      Self::Failure(_) => None,
    }
  }

  pub fn failure(&self) -> Option<&IngestFailure> {
    match self {
      Self::Success(_) => None,
      Self::Failure(failure) => Some(failure),
    }
  }
}

#[derive(Serialize)]
struct Flagged<'a, T> {
  success: bool,
  #[serde(flatten)]
  body:    &'a T,
}

impl Serialize for IngestOutcome {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Success(report) => Flagged {
        success: true,
        body:    report,
      }
      .serialize(serializer),
      Self::Failure(failure) => Flagged {
        success: false,
        body:    failure,
      }
      .serialize(serializer),
    }
  }
}
