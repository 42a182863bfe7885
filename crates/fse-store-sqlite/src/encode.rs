//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs are hyphenated lowercase strings
//! and documents are compact JSON.

use chrono::{DateTime, Utc};
use fse_core::{
  identifier::IdentifierScheme,
  observation::Observation,
  subject::Subject,
};
use uuid::Uuid;

use crate::Result;

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_scheme(scheme: IdentifierScheme) -> &'static str {
  match scheme {
    IdentifierScheme::NationalTaxCode => "national_tax_code",
    IdentifierScheme::HealthCardNumber => "health_card_number",
    IdentifierScheme::LocalFacilityId => "local_facility_id",
    IdentifierScheme::Other => "other",
  }
}

// ─── Documents ───────────────────────────────────────────────────────────────

pub fn encode_subject(subject: &Subject) -> Result<String> {
  Ok(serde_json::to_string(subject)?)
}

pub fn encode_observation(observation: &Observation) -> Result<String> {
  Ok(serde_json::to_string(observation)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub document:   String,
}

impl RawSubject {
  /// The row key wins over whatever id the document carries.
  pub fn into_subject(self) -> Result<Subject> {
    let mut subject: Subject = serde_json::from_str(&self.document)?;
    subject.id = decode_uuid(&self.subject_id)?;
    Ok(subject)
  }
}

/// Raw strings read directly from an `observations` row.
pub struct RawObservation {
  pub subject_id: String,
  pub document:   String,
}

impl RawObservation {
  pub fn into_observation(self) -> Result<Observation> {
    let mut observation: Observation = serde_json::from_str(&self.document)?;
    observation.subject_ref = decode_uuid(&self.subject_id)?;
    Ok(observation)
  }
}
