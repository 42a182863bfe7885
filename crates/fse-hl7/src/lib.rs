//! HL7 v2 pipe/caret codec for FSE.
//!
//! A pure, synchronous pipeline from raw message text to unresolved
//! [`Subject`] and [`Observation`] resources:
//!
//! ```text
//! text ─ tokenize ─▶ ParsedMessage ─ classify ─▶ MessageKind
//!                          │
//!                          └─ segments::* ─ map::* ─▶ Subject + Vec<Observation>
//! ```
//!
//! No I/O and no shared state; conversions may run concurrently.
//!
//! # Quick start
//!
//! ```
//! use fse_hl7::{Delimiters, PairingRule, convert};
//!
//! let text = "MSH|^~\\&|LAB|OSP|FSE|REG|20250530||ORU^R01|42|P|2.5\r\
//!             PID|1||RSSMRA85M01H501Z^^^^CF||ROSSI^MARIO||19850801|M\r\
//!             OBR|1|||NA^SODIO|||20250530081500\r\
//!             OBX|1|NM|NA^SODIO||138|mmol/L|135-145||||F";
//!
//! let converted =
//!   convert(text, &Delimiters::default(), PairingRule::default()).unwrap();
//! assert_eq!(converted.kind.code(), "ORU");
//! assert_eq!(converted.header.control_id, "42");
//! assert_eq!(converted.subject.birth_date, "1985-08-01");
//! assert_eq!(converted.observations[0].code.value, "NA");
//! ```

pub mod classify;
pub mod error;
pub mod map;
pub mod segments;
pub mod tokenize;

use fse_core::{observation::Observation, subject::Subject};
use serde::Serialize;

pub use self::{
  classify::{MessageKind, classify, classify_message_type},
  error::{Error, MappingError, ParseError, Result},
  map::PairingRule,
  tokenize::{Delimiters, ParsedMessage, RawSegment, tokenize},
};

/// The header details kept after conversion, for logging and reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
  pub control_id:          String,
  /// Raw MSH-9, e.g. `ORU^R01^ORU_R01`.
  pub message_type:        String,
  pub sending_application: String,
  pub sending_facility:    String,
  pub date_time:           String,
  pub version:             String,
}

impl MessageInfo {
  fn from_message(message: &ParsedMessage) -> Self {
    let Some(segment) = message.header() else {
      return Self::default();
    };
    let h = segments::header(segment);
    Self {
      control_id:          h.control_id.to_string(),
      message_type:        h.message_type.to_string(),
      sending_application: h.sending_application.to_string(),
      sending_facility:    h.sending_facility.to_string(),
      date_time:           h.date_time.to_string(),
      version:             h.version.to_string(),
    }
  }
}

/// One message, converted but not yet resolved against a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedMessage {
  pub kind:         MessageKind,
  pub header:       MessageInfo,
  /// Carries a nil id until identity resolution.
  pub subject:      Subject,
  /// In result-segment order; every `subject_ref` is nil.
  pub observations: Vec<Observation>,
}

/// Convert raw HL7 text into an unresolved subject and its observations.
///
/// An unrecognised message kind is reported as [`MessageKind::Unknown`], not
/// as an error.
pub fn convert(
  text: &str,
  delimiters: &Delimiters,
  pairing: PairingRule,
) -> Result<ConvertedMessage> {
  let message = tokenize(text, delimiters)?;
  let kind = classify(&message, delimiters);
  let subject = map::subject_from_message(&message, delimiters)?;
  let observations =
    map::observations_from_message(&message, pairing, delimiters);

  tracing::debug!(
    %kind,
    segments = message.len(),
    observations = observations.len(),
    "converted message"
  );

  Ok(ConvertedMessage {
    kind,
    header: MessageInfo::from_message(&message),
    subject,
    observations,
  })
}
