//! Field records → [`Subject`] and [`Observation`] resources.
//!
//! Mapping is lenient: malformed repetitions are skipped and short
//! components read as empty. The only hard failures are a subject with no
//! usable identifier and a truncated identification segment.
//!
//! Every resource produced here carries [`Uuid::nil()`] as its key or
//! subject reference; identity resolution fills in the real one.

use fse_core::{
  identifier::{Identifier, IdentifierScheme},
  observation::{Code, Observation, ObservationStatus, ObservationValue},
  subject::{Address, Gender, HumanName, Subject, Telecom},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  error::MappingError,
  segments::{self, IdentificationFields, kind, pid},
  tokenize::{Delimiters, ParsedMessage, RawSegment},
};

/// ISO country assumed for addresses that do not name one.
pub const DEFAULT_COUNTRY: &str = "IT";

// ─── Subject ─────────────────────────────────────────────────────────────────

/// Parse the `CX` repetitions of an identifier field.
///
/// A repetition needs at least five components: the value in the first and
/// the coding-system code in the fifth. Some senders put `CF`/`SS` in the
/// fourth component (assigning authority) and a generic type code in the
/// fifth; in that case the national code wins.
pub fn extract_identifiers(
  field: &str,
  delimiters: &Delimiters,
) -> Vec<Identifier> {
  let mut identifiers = Vec::new();
  for repetition in delimiters.repetitions(field) {
    let components = delimiters.components(repetition);
    if components.len() < 5 {
      tracing::debug!(repetition, "dropping identifier with too few components");
      continue;
    }
    let value = delimiters.unescape(components[0]);
    let code = coding_system_code(components[3], components[4]);
    match Identifier::from_coding_system(&value, code) {
      Some(identifier) => identifiers.push(identifier),
      None => tracing::debug!(repetition, "dropping identifier with empty value"),
    }
  }
  identifiers
}

fn coding_system_code<'a>(authority: &'a str, type_code: &'a str) -> &'a str {
  let national = |code: &str| {
    matches!(
      IdentifierScheme::from_code(code),
      IdentifierScheme::NationalTaxCode | IdentifierScheme::HealthCardNumber
    )
  };
  if !national(type_code) && national(authority) {
    authority
  } else {
    type_code
  }
}

/// `family^given`. Further given-name components are not modelled.
pub fn extract_names(field: &str, delimiters: &Delimiters) -> Vec<HumanName> {
  let components = delimiters.components(field);
  let family = delimiters.unescape(components[0].trim());
  let given = components
    .get(1)
    .map(|g| delimiters.unescape(g.trim()))
    .unwrap_or_default();

  if family.is_empty() && given.is_empty() {
    return Vec::new();
  }
  vec![HumanName {
    family,
    given: if given.is_empty() { Vec::new() } else { vec![given] },
  }]
}

/// `YYYYMMDD` → `YYYY-MM-DD`. Anything else is returned unchanged.
pub fn normalize_date(raw: &str) -> String {
  let raw = raw.trim();
  if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
    format!("{}-{}-{}", &raw[..4], &raw[4..6], &raw[6..])
  } else {
    raw.to_string()
  }
}

/// HL7 administrative sex → [`Gender`], case-insensitively.
pub fn normalize_gender(raw: &str) -> Gender {
  match raw.trim().to_ascii_uppercase().as_str() {
    "M" => Gender::Male,
    "F" => Gender::Female,
    "O" => Gender::Other,
    _ => Gender::Unknown,
  }
}

/// Parse `XAD` repetitions. Repetitions with fewer than seven components are
/// skipped.
pub fn extract_addresses(field: &str, delimiters: &Delimiters) -> Vec<Address> {
  delimiters
    .repetitions(field)
    .into_iter()
    .filter_map(|repetition| {
      let c = delimiters.components(repetition);
      if c.len() < 7 {
        tracing::debug!(repetition, "dropping address with too few components");
        return None;
      }
      let leaf = |i: usize| delimiters.unescape(c[i].trim());
      let street = leaf(0);
      let country = leaf(6);
      Some(Address {
        use_:        "home".to_string(),
        line:        if street.is_empty() { Vec::new() } else { vec![street] },
        city:        leaf(2),
        postal_code: leaf(4),
        country:     if country.is_empty() {
          DEFAULT_COUNTRY.to_string()
        } else {
          country
        },
      })
    })
    .collect()
}

/// Every repetition with a non-empty first component becomes a phone.
pub fn extract_telecoms(field: &str, delimiters: &Delimiters) -> Vec<Telecom> {
  delimiters
    .repetitions(field)
    .into_iter()
    .map(|r| delimiters.unescape(delimiters.first_component(r).trim()))
    .filter(|number| !number.is_empty())
    .map(Telecom::phone)
    .collect()
}

/// Build an unresolved subject from the identification fields.
pub fn map_to_subject(
  fields: &IdentificationFields<'_>,
  delimiters: &Delimiters,
) -> Result<Subject, MappingError> {
  let mut subject = Subject::new();
  for identifier in extract_identifiers(fields.identifiers, delimiters) {
    subject.add_identifier(identifier);
  }
  if subject.identifiers.is_empty() {
    return Err(MappingError::NoIdentifiers);
  }

  subject.names = extract_names(fields.name, delimiters);
  subject.birth_date = normalize_date(fields.birth_date);
  subject.gender = normalize_gender(fields.sex);
  subject.addresses = extract_addresses(fields.address, delimiters);
  subject.telecoms = extract_telecoms(fields.telecom, delimiters);
  Ok(subject)
}

/// Locate the identification segment of `message` and map it.
pub fn subject_from_message(
  message: &ParsedMessage,
  delimiters: &Delimiters,
) -> Result<Subject, MappingError> {
  let segment = message
    .first(kind::IDENTIFICATION)
    .ok_or(MappingError::NoIdentifiers)?;
  if !segment.has_field(pid::IDENTIFIERS) {
    return Err(MappingError::MissingIdentificationSegment);
  }
  map_to_subject(&segments::identification(segment), delimiters)
}

// ─── Observations ────────────────────────────────────────────────────────────

/// How result segments find their order segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingRule {
  /// The n-th result pairs with the n-th order, if there is one. Matches the
  /// feeds that send one `OBR` per `OBX`.
  #[default]
  Positional,
  /// Each result pairs with the closest order before it in the message.
  Enclosing,
}

impl PairingRule {
  fn pair<'a>(
    self,
    index: usize,
    result: &RawSegment,
    orders: &'a [RawSegment],
  ) -> Option<&'a RawSegment> {
    match self {
      Self::Positional => orders.get(index),
      Self::Enclosing => preceding(orders, result),
    }
  }
}

/// The last segment of `candidates` positioned before `segment`.
fn preceding<'a>(
  candidates: &'a [RawSegment],
  segment: &RawSegment,
) -> Option<&'a RawSegment> {
  candidates
    .iter()
    .take_while(|c| c.position < segment.position)
    .last()
}

/// Code of an observation: the result's own identifier, else the order's
/// service id, preferring whichever is fully coded as `code^display`.
fn select_code(service_id: &str, identifier: &str, d: &Delimiters) -> Code {
  let coded = |field: &str| {
    let c = d.components(field);
    let value = c[0].trim();
    let display = c.get(1).map(|s| s.trim()).unwrap_or_default();
    (!value.is_empty() && !display.is_empty()).then(|| Code {
      value:   d.unescape(value),
      display: d.unescape(display),
    })
  };
  let partial = |field: &str| {
    let c = d.components(field);
    let value = c[0].trim();
    (!value.is_empty()).then(|| Code {
      value:   d.unescape(value),
      display: c.get(1).map(|s| d.unescape(s.trim())).unwrap_or_default(),
    })
  };

  coded(identifier)
    .or_else(|| coded(service_id))
    .or_else(|| partial(identifier))
    .or_else(|| partial(service_id))
    .unwrap_or_default()
}

fn map_value(value_type: &str, raw: &str, d: &Delimiters) -> ObservationValue {
  if value_type.trim().eq_ignore_ascii_case("NM")
    && let Ok(number) = raw.trim().parse::<f64>()
    && number.is_finite()
  {
    return ObservationValue::Number(number);
  }
  ObservationValue::Text(d.unescape(raw))
}

fn map_status(raw: &str) -> ObservationStatus {
  match raw.trim().to_ascii_uppercase().as_str() {
    "F" | "C" => ObservationStatus::Final,
    "P" => ObservationStatus::Preliminary,
    _ => ObservationStatus::Unknown,
  }
}

fn non_empty(value: String) -> Option<String> {
  (!value.is_empty()).then_some(value)
}

fn specimen_label(segment: &RawSegment, d: &Delimiters) -> Option<String> {
  let c = d.components(segments::specimen(segment).specimen_type);
  let display = c.get(1).map(|s| s.trim()).unwrap_or_default();
  let label = if display.is_empty() { c[0].trim() } else { display };
  non_empty(d.unescape(label))
}

/// Map every result segment to an observation.
///
/// `specimens` may be empty; when present, each observation records the
/// specimen type of the closest `SPM` before its result segment.
pub fn map_to_observations(
  orders: &[RawSegment],
  results: &[RawSegment],
  specimens: &[RawSegment],
  pairing: PairingRule,
  delimiters: &Delimiters,
) -> Vec<Observation> {
  results
    .iter()
    .enumerate()
    .map(|(index, segment)| {
      let result = segments::result(segment);
      let order = pairing
        .pair(index, segment, orders)
        .map(segments::order)
        .unwrap_or_default();

      let issued_at = if result.observation_datetime.trim().is_empty() {
        order.observation_datetime
      } else {
        result.observation_datetime
      };

      Observation {
        subject_ref:     Uuid::nil(),
        code:            select_code(
          order.service_id,
          result.identifier,
          delimiters,
        ),
        value:           map_value(result.value_type, result.value, delimiters),
        unit:            non_empty(delimiters.unescape(
          delimiters.first_component(result.units).trim(),
        )),
        reference_range: non_empty(
          delimiters.unescape(result.reference_range.trim()),
        ),
        issued_at:       issued_at.trim().to_string(),
        status:          map_status(result.status),
        specimen:        preceding(specimens, segment)
          .and_then(|s| specimen_label(s, delimiters)),
      }
    })
    .collect()
}

/// [`map_to_observations`] over the order, result and specimen groups of
/// `message`.
pub fn observations_from_message(
  message: &ParsedMessage,
  pairing: PairingRule,
  delimiters: &Delimiters,
) -> Vec<Observation> {
  map_to_observations(
    message.segments(kind::ORDER),
    message.segments(kind::RESULT),
    message.segments(kind::SPECIMEN),
    pairing,
    delimiters,
  )
}
