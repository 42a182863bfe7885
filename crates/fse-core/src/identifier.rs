//! Subject identifiers and the coding-system namespaces they live in.
//!
//! HL7 `CX` identifiers carry their assigning coding system as a short code
//! (`CF`, `SS`, `PI`, ...). Each code maps to a namespace URI and to a coarse
//! [`IdentifierScheme`] used when choosing the matching key for a subject.

use serde::{Deserialize, Serialize};

/// Namespace of the Italian national tax code (codice fiscale).
pub const TAX_CODE_SYSTEM: &str = "http://hl7.it/sid/codiceFiscale";

/// Namespace of the national health-card number (tessera sanitaria).
pub const HEALTH_CARD_SYSTEM: &str = "http://hl7.it/sid/tessera-sanitaria";

/// Prefix for identifiers assigned by a local system; the raw coding-system
/// code is appended.
pub const LOCAL_SYSTEM_PREFIX: &str = "http://sistema.locale/";

/// The kind of authority that issued an identifier.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierScheme {
  NationalTaxCode,
  HealthCardNumber,
  LocalFacilityId,
  #[default]
  Other,
}

impl IdentifierScheme {
  /// Classify an HL7 coding-system code. Unrecognised codes are `Other`.
  pub fn from_code(code: &str) -> Self {
    match code.trim().to_ascii_uppercase().as_str() {
      "CF" => Self::NationalTaxCode,
      "SS" => Self::HealthCardNumber,
      "PI" | "MR" => Self::LocalFacilityId,
      _ => Self::Other,
    }
  }
}

/// Namespace URI for an HL7 coding-system code.
///
/// Recognition is case-insensitive, like [`IdentifierScheme::from_code`];
/// local namespaces keep the code as sent.
pub fn system_uri(code: &str) -> String {
  match IdentifierScheme::from_code(code) {
    IdentifierScheme::NationalTaxCode => TAX_CODE_SYSTEM.to_string(),
    IdentifierScheme::HealthCardNumber => HEALTH_CARD_SYSTEM.to_string(),
    _ => format!("{LOCAL_SYSTEM_PREFIX}{}", code.trim()),
  }
}

/// A single identifier of a subject. `value` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
  pub scheme: IdentifierScheme,
  /// Namespace URI the value is unique within.
  pub system: String,
  pub value:  String,
}

impl Identifier {
  /// Build an identifier from its value and HL7 coding-system code.
  ///
  /// Returns `None` when `value` is blank.
  pub fn from_coding_system(value: &str, code: &str) -> Option<Self> {
    let value = value.trim();
    if value.is_empty() {
      return None;
    }
    Some(Self {
      scheme: IdentifierScheme::from_code(code),
      system: system_uri(code),
      value:  value.to_string(),
    })
  }

  pub fn is_national_tax_code(&self) -> bool {
    self.scheme == IdentifierScheme::NationalTaxCode
  }
}
