//! Subject: the canonical clinical-person resource.
//!
//! A subject is built from the identification segment of a message and is
//! replaced wholesale whenever a later message refers to the same person.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifier::Identifier;

/// Administrative gender, as normalised from the HL7 sex code.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
  Other,
  #[default]
  Unknown,
}

/// A structured person name. Only the first given name is modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanName {
  pub family: String,
  pub given:  Vec<String>,
}

/// A contact point. Every telecom mapped from HL7 is a `phone`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telecom {
  pub system: String,
  pub value:  String,
}

impl Telecom {
  pub fn phone(value: impl Into<String>) -> Self {
    Self {
      system: "phone".to_string(),
      value:  value.into(),
    }
  }
}

/// A postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  #[serde(rename = "use")]
  pub use_:        String,
  pub line:        Vec<String>,
  pub city:        String,
  pub postal_code: String,
  /// ISO country code.
  pub country:     String,
}

/// The clinical-person resource.
///
/// Freshly mapped subjects carry [`Uuid::nil()`] as their `id`; identity
/// resolution assigns either the stored key or a newly minted one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
  pub id:          Uuid,
  /// Never empty for a subject built from a valid message.
  pub identifiers: Vec<Identifier>,
  pub names:       Vec<HumanName>,
  /// ISO-8601 date, the raw HL7 token when it could not be normalised, or
  /// empty.
  pub birth_date:  String,
  pub gender:      Gender,
  pub telecoms:    Vec<Telecom>,
  pub addresses:   Vec<Address>,
}

impl Subject {
  /// An empty, unresolved subject.
  pub fn new() -> Self {
    Self {
      id:          Uuid::nil(),
      identifiers: Vec::new(),
      names:       Vec::new(),
      birth_date:  String::new(),
      gender:      Gender::Unknown,
      telecoms:    Vec::new(),
      addresses:   Vec::new(),
    }
  }

  /// Add an identifier unless an identical `(system, value)` pair is present.
  pub fn add_identifier(&mut self, identifier: Identifier) {
    let exists = self
      .identifiers
      .iter()
      .any(|i| i.system == identifier.system && i.value == identifier.value);
    if !exists {
      self.identifiers.push(identifier);
    }
  }

  /// The identifier used as the matching key: the national tax code when
  /// present, otherwise the first identifier.
  pub fn primary_identifier(&self) -> Option<&Identifier> {
    self
      .identifiers
      .iter()
      .find(|i| i.is_national_tax_code())
      .or_else(|| self.identifiers.first())
  }

  /// Whether any identifier of this subject has exactly `value`.
  pub fn has_identifier_value(&self, value: &str) -> bool {
    self.identifiers.iter().any(|i| i.value == value)
  }

  /// Case-insensitive substring match over identifier values, family names
  /// and first given names. An empty query matches everything.
  pub fn matches_query(&self, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
      return true;
    }
    let in_ids = self
      .identifiers
      .iter()
      .any(|i| i.value.to_lowercase().contains(&query));
    let in_names = self.names.iter().any(|n| {
      n.family.to_lowercase().contains(&query)
        || n
          .given
          .first()
          .is_some_and(|g| g.to_lowercase().contains(&query))
    });
    in_ids || in_names
  }
}

impl Default for Subject {
  fn default() -> Self { Self::new() }
}
