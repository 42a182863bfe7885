//! Message-kind detection from the `MSH` header.
//!
//! Senders disagree about where the message type lives, so detection is an
//! ordered list of [`DetectionStrategy`] values tried in turn. The first one
//! that recognises a kind wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tokenize::{Delimiters, ParsedMessage, RawSegment};

/// The kind of an HL7 message, from the first component of its type code.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
  /// `ORU`: unsolicited observation result.
  ResultReport,
  /// `MDM`: medical document management.
  DocumentManagement,
  /// `OUL`: unsolicited laboratory observation.
  LabOrder,
  /// `ADT`: admission, discharge, transfer.
  Admission,
  /// `ORM`: order message.
  Order,
  /// `ACK`: general acknowledgement.
  Acknowledgement,
  #[default]
  Unknown,
}

/// Every recognised kind, in component-scan order.
const KNOWN: [MessageKind; 6] = [
  MessageKind::DocumentManagement,
  MessageKind::LabOrder,
  MessageKind::ResultReport,
  MessageKind::Admission,
  MessageKind::Order,
  MessageKind::Acknowledgement,
];

/// Kinds the prefix scan looks for.
const PREFIXED: [MessageKind; 3] = [
  MessageKind::DocumentManagement,
  MessageKind::LabOrder,
  MessageKind::ResultReport,
];

impl MessageKind {
  /// Parse a 3-letter type code. Anything unrecognised is `Unknown`.
  pub fn from_code(code: &str) -> Self {
    KNOWN
      .into_iter()
      .find(|k| k.code() == code.trim())
      .unwrap_or_default()
  }

  /// The 3-letter HL7 code, or `"UNKNOWN"`.
  pub fn code(self) -> &'static str {
    match self {
      Self::ResultReport => "ORU",
      Self::DocumentManagement => "MDM",
      Self::LabOrder => "OUL",
      Self::Admission => "ADT",
      Self::Order => "ORM",
      Self::Acknowledgement => "ACK",
      Self::Unknown => "UNKNOWN",
    }
  }

  pub fn is_known(self) -> bool { self != Self::Unknown }
}

impl fmt::Display for MessageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

// ─── Strategies ──────────────────────────────────────────────────────────────

/// One way of finding the message type in a header segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStrategy {
  /// The first component of a fixed header field.
  HeaderField(usize),
  /// Any field whose first component names a known kind.
  ComponentScan,
  /// Any field that starts with the code of a prefixed kind.
  PrefixScan,
}

/// Strategies in the order they are tried: MSH-9, then MSH-10 (which some
/// senders shift the type into), then the two scans.
pub const STRATEGIES: [DetectionStrategy; 4] = [
  DetectionStrategy::HeaderField(8),
  DetectionStrategy::HeaderField(9),
  DetectionStrategy::ComponentScan,
  DetectionStrategy::PrefixScan,
];

impl DetectionStrategy {
  pub fn detect(
    self,
    header: &RawSegment,
    delimiters: &Delimiters,
  ) -> Option<MessageKind> {
    let known = |kind: MessageKind| kind.is_known().then_some(kind);
    match self {
      Self::HeaderField(index) => {
        let value = header.field(index);
        known(MessageKind::from_code(delimiters.first_component(value)))
      }
      Self::ComponentScan => header
        .fields
        .iter()
        .filter(|f| f.contains(delimiters.component))
        .find_map(|f| {
          known(MessageKind::from_code(delimiters.first_component(f)))
        }),
      Self::PrefixScan => header.fields.iter().find_map(|f| {
        PREFIXED.into_iter().find(|k| f.starts_with(k.code()))
      }),
    }
  }
}

/// Detect the kind of a message from its header segment.
///
/// Returns [`MessageKind::Unknown`] when no strategy matches; whether that is
/// fatal is the caller's decision.
pub fn classify_message_type(
  header: &RawSegment,
  delimiters: &Delimiters,
) -> MessageKind {
  STRATEGIES
    .into_iter()
    .find_map(|s| s.detect(header, delimiters))
    .unwrap_or_default()
}

/// [`classify_message_type`] over a whole message; no header means `Unknown`.
pub fn classify(
  message: &ParsedMessage,
  delimiters: &Delimiters,
) -> MessageKind {
  message
    .header()
    .map(|h| classify_message_type(h, delimiters))
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tokenize::tokenize;

  fn kind_of(header: &str) -> MessageKind {
    let d = Delimiters::default();
    classify(&tokenize(header, &d).unwrap(), &d)
  }

  #[test]
  fn standard_msh9() {
    assert_eq!(
      kind_of("MSH|^~\\&|LAB|OSP|FSE|REG|20250530||ORU^R01^ORU_R01|M1|P|2.5"),
      MessageKind::ResultReport
    );
    assert_eq!(
      kind_of("MSH|^~\\&|A|B|C|D|20250101||ADT^A08|1|P|2.5"),
      MessageKind::Admission
    );
  }

  #[test]
  fn bare_code_without_components() {
    assert_eq!(
      kind_of("MSH|^~\\&|A|B|C|D|20250101||ACK|1|P|2.5"),
      MessageKind::Acknowledgement
    );
  }

  #[test]
  fn type_shifted_into_msh10() {
    // An extra empty field before the type pushes it into MSH-10.
    assert_eq!(
      kind_of("MSH|^~\\&|A|B|C|D|20250101|||MDM^T02|1|P"),
      MessageKind::DocumentManagement
    );
  }

  #[test]
  fn component_scan_finds_type_anywhere() {
    assert_eq!(
      kind_of("MSH|^~\\&|A|B|C|D|20250101|x|y|z|OUL^R22|2.5"),
      MessageKind::LabOrder
    );
  }

  #[test]
  fn prefix_scan_is_last_resort() {
    assert_eq!(
      kind_of("MSH|^~\\&|A|B|C|D|20250101|||ORUR01|P"),
      MessageKind::ResultReport
    );
  }

  #[test]
  fn nothing_recognisable_is_unknown() {
    assert_eq!(
      kind_of("MSH|^~\\&|A|B|C|D|20250101||ZZZ^Z01|1|P"),
      MessageKind::Unknown
    );
    assert_eq!(kind_of("PID|||1^^^X^CF"), MessageKind::Unknown);
  }

  #[test]
  fn strategies_run_in_order() {
    let d = Delimiters::default();
    let msg = tokenize("MSH|^~\\&|A|B|C|D|E||ADT^A01|ORU^R01", &d).unwrap();
    let header = msg.header().unwrap();
    assert_eq!(
      DetectionStrategy::HeaderField(9).detect(header, &d),
      Some(MessageKind::ResultReport)
    );
    assert_eq!(classify_message_type(header, &d), MessageKind::Admission);
  }

  #[test]
  fn codes_round_trip() {
    for kind in KNOWN {
      assert_eq!(MessageKind::from_code(kind.code()), kind);
    }
    assert_eq!(MessageKind::ResultReport.to_string(), "ORU");
  }
}
