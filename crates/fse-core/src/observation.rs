//! Observation: the canonical laboratory-result resource.
//!
//! Observations are immutable once persisted. A resubmitted result with the
//! same natural key is dropped, never merged.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A coded concept: the test that was performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
  pub value:   String,
  pub display: String,
}

impl Code {
  pub fn is_empty(&self) -> bool { self.value.is_empty() }
}

/// The reported result value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationValue {
  Number(f64),
  Text(String),
}

impl Default for ObservationValue {
  fn default() -> Self { Self::Text(String::new()) }
}

/// Result status, as reported by the filler.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ObservationStatus {
  Final,
  Preliminary,
  #[default]
  Unknown,
}

/// The laboratory-result resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
  /// The owning subject; [`Uuid::nil()`] until identity is resolved.
  pub subject_ref:     Uuid,
  pub code:            Code,
  pub value:           ObservationValue,
  pub unit:            Option<String>,
  pub reference_range: Option<String>,
  /// Raw HL7 timestamp of the result.
  pub issued_at:       String,
  pub status:          ObservationStatus,
  /// Specimen type of the enclosing specimen group, when the message has one.
  pub specimen:        Option<String>,
}

/// The triple that defines duplicate identity for observations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
  pub subject_ref: Uuid,
  pub code:        String,
  pub issued_at:   String,
}

impl Observation {
  /// `None` when the code is empty; such observations have no reliable key.
  pub fn natural_key(&self) -> Option<NaturalKey> {
    if self.code.is_empty() {
      return None;
    }
    Some(NaturalKey {
      subject_ref: self.subject_ref,
      code:        self.code.value.clone(),
      issued_at:   self.issued_at.clone(),
    })
  }
}
