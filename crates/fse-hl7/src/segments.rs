//! Named-field views over raw segments.
//!
//! One total extractor per segment type: every record field borrows the raw
//! field text, and a field missing from the segment reads as `""`. No
//! splitting or unescaping happens here; that is the mapper's job.

use crate::tokenize::RawSegment;

/// Segment type tokens consumed by the mapper.
pub mod kind {
  pub const HEADER: &str = "MSH";
  pub const IDENTIFICATION: &str = "PID";
  pub const SPECIMEN: &str = "SPM";
  pub const ORDER: &str = "OBR";
  pub const RESULT: &str = "OBX";
}

/// Field positions of the identification (`PID`) segment.
pub mod pid {
  pub const IDENTIFIERS: usize = 3;
  pub const NAME: usize = 5;
  pub const BIRTH_DATE: usize = 7;
  pub const SEX: usize = 8;
  pub const ADDRESS: usize = 11;
  pub const TELECOM: usize = 13;
}

// ─── Header ──────────────────────────────────────────────────────────────────

/// `MSH`. Only used for logging and the conversion summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderFields<'a> {
  pub sending_application:   &'a str,
  pub sending_facility:      &'a str,
  pub receiving_application: &'a str,
  pub receiving_facility:    &'a str,
  pub date_time:             &'a str,
  pub message_type:          &'a str,
  pub control_id:            &'a str,
  pub processing_id:         &'a str,
  pub version:               &'a str,
}

pub fn header(segment: &RawSegment) -> HeaderFields<'_> {
  HeaderFields {
    sending_application:   segment.field(2),
    sending_facility:      segment.field(3),
    receiving_application: segment.field(4),
    receiving_facility:    segment.field(5),
    date_time:             segment.field(6),
    message_type:          segment.field(8),
    control_id:            segment.field(9),
    processing_id:         segment.field(10),
    version:               segment.field(11),
  }
}

// ─── Identification ──────────────────────────────────────────────────────────

/// `PID`: patient identity and demographics, all raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdentificationFields<'a> {
  /// Repetition list of `CX` identifiers.
  pub identifiers: &'a str,
  /// `family^given`.
  pub name:        &'a str,
  /// `YYYYMMDD`, possibly with a time suffix.
  pub birth_date:  &'a str,
  pub sex:         &'a str,
  /// Repetition list of `XAD` addresses.
  pub address:     &'a str,
  /// Repetition list of `XTN` contact points.
  pub telecom:     &'a str,
}

pub fn identification(segment: &RawSegment) -> IdentificationFields<'_> {
  IdentificationFields {
    identifiers: segment.field(pid::IDENTIFIERS),
    name:        segment.field(pid::NAME),
    birth_date:  segment.field(pid::BIRTH_DATE),
    sex:         segment.field(pid::SEX),
    address:     segment.field(pid::ADDRESS),
    telecom:     segment.field(pid::TELECOM),
  }
}

// ─── Specimen / order / result ───────────────────────────────────────────────

/// `SPM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecimenFields<'a> {
  pub set_id:              &'a str,
  pub specimen_id:         &'a str,
  pub specimen_type:       &'a str,
  pub collection_datetime: &'a str,
}

pub fn specimen(segment: &RawSegment) -> SpecimenFields<'_> {
  SpecimenFields {
    set_id:              segment.field(1),
    specimen_id:         segment.field(2),
    specimen_type:       segment.field(4),
    collection_datetime: segment.field(17),
  }
}

/// `OBR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderFields<'a> {
  pub set_id:               &'a str,
  pub placer_order_number:  &'a str,
  pub filler_order_number:  &'a str,
  /// `code^display`.
  pub service_id:           &'a str,
  pub observation_datetime: &'a str,
  pub result_status:        &'a str,
}

pub fn order(segment: &RawSegment) -> OrderFields<'_> {
  OrderFields {
    set_id:               segment.field(1),
    placer_order_number:  segment.field(2),
    filler_order_number:  segment.field(3),
    service_id:           segment.field(4),
    observation_datetime: segment.field(7),
    result_status:        segment.field(25),
  }
}

/// `OBX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultFields<'a> {
  pub set_id:               &'a str,
  /// `NM`, `ST`, `CE`, ...
  pub value_type:           &'a str,
  /// `code^display`.
  pub identifier:           &'a str,
  pub value:                &'a str,
  pub units:                &'a str,
  /// Usually `low-high`.
  pub reference_range:      &'a str,
  pub status:               &'a str,
  pub observation_datetime: &'a str,
}

pub fn result(segment: &RawSegment) -> ResultFields<'_> {
  ResultFields {
    set_id:               segment.field(1),
    value_type:           segment.field(2),
    identifier:           segment.field(3),
    value:                segment.field(5),
    units:                segment.field(6),
    reference_range:      segment.field(7),
    status:               segment.field(11),
    observation_datetime: segment.field(14),
  }
}
