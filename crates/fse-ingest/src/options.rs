//! Per-deployment knobs for ingestion.

use fse_hl7::{Delimiters, PairingRule};
use serde::Deserialize;

/// How incoming messages are converted.
///
/// Every field has a default, so an empty config section is valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
  /// Encoding characters. Senders that deviate from `|^~\&` must be
  /// configured explicitly; the header is not sniffed.
  pub delimiters:         Delimiters,
  pub pairing:            PairingRule,
  /// Reject messages whose kind cannot be determined instead of converting
  /// them anyway.
  pub require_known_kind: bool,
}
