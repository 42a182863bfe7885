//! HL7 v2 pipe/caret tokenizer.
//!
//! Pipeline:
//!   raw &str
//!     └─ split_lines()      → primary lines + recovered fragments
//!          └─ RawSegment     → fields split on the field delimiter
//!               └─ ParsedMessage (grouped by segment type)
//!
//! No content validation happens here: only delimiter splitting.

use serde::Deserialize;

use crate::error::ParseError;

// ─── Delimiters ──────────────────────────────────────────────────────────────

/// The five encoding characters of a message. Defaults to `|^~\&`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Delimiters {
  pub field:        char,
  pub component:    char,
  pub repetition:   char,
  pub escape:       char,
  pub subcomponent: char,
}

impl Default for Delimiters {
  fn default() -> Self {
    Self {
      field:        '|',
      component:    '^',
      repetition:   '~',
      escape:       '\\',
      subcomponent: '&',
    }
  }
}

impl Delimiters {
  /// Split a field into its repetitions. An empty field has none.
  pub fn repetitions<'a>(&self, field: &'a str) -> Vec<&'a str> {
    if field.is_empty() {
      return Vec::new();
    }
    field.split(self.repetition).collect()
  }

  /// Split a field (or one repetition of it) into components.
  pub fn components<'a>(&self, field: &'a str) -> Vec<&'a str> {
    field.split(self.component).collect()
  }

  /// Split a component into sub-components.
  pub fn subcomponents<'a>(&self, component: &'a str) -> Vec<&'a str> {
    component.split(self.subcomponent).collect()
  }

  /// The first component of a field, or the whole field when it has none.
  pub fn first_component<'a>(&self, field: &'a str) -> &'a str {
    field.split(self.component).next().unwrap_or_default()
  }

  /// Decode HL7 escape sequences in a leaf value.
  ///
  /// `\F\ \S\ \T\ \R\ \E\` become the corresponding delimiter; `\.br\`,
  /// `\X0A\` and `\X0D\` become a newline. Unknown or unterminated
  /// sequences are kept verbatim.
  pub fn unescape(&self, value: &str) -> String {
    if !value.contains(self.escape) {
      return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find(self.escape) {
      out.push_str(&rest[..start]);
      let after = &rest[start + self.escape.len_utf8()..];
      let Some(end) = after.find(self.escape) else {
        out.push_str(&rest[start..]);
        return out;
      };
      let sequence = &after[..end];
      match sequence {
        "F" => out.push(self.field),
        "S" => out.push(self.component),
        "T" => out.push(self.subcomponent),
        "R" => out.push(self.repetition),
        "E" => out.push(self.escape),
        ".br" | "X0A" | "X0D" => out.push('\n'),
        _ => {
          out.push(self.escape);
          out.push_str(sequence);
          out.push(self.escape);
        }
      }
      rest = &after[end + self.escape.len_utf8()..];
    }
    out.push_str(rest);
    out
  }
}

// ─── Segments ────────────────────────────────────────────────────────────────

/// One line of a message.
///
/// `fields[0]` is the segment type token, so `field(n)` is HL7 field `n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment {
  /// The 3-letter segment type.
  pub kind:     String,
  /// Zero-based position within the message, recovered segments included.
  pub position: usize,
  pub fields:   Vec<String>,
}

impl RawSegment {
  fn from_line(line: &str, position: usize, delimiters: &Delimiters) -> Self {
    Self {
      kind: line.chars().take(3).collect(),
      position,
      fields: line.split(delimiters.field).map(str::to_string).collect(),
    }
  }

  /// Field `index`, or the empty string past the end of the segment.
  pub fn field(&self, index: usize) -> &str {
    self.fields.get(index).map(String::as_str).unwrap_or_default()
  }

  /// Whether the segment physically carries field `index`.
  pub fn has_field(&self, index: usize) -> bool { index < self.fields.len() }
}

/// All segments of one message, grouped by type.
///
/// Groups appear in first-occurrence order; segments inside a group keep
/// message order, which matters for repeated order and result segments.
#[derive(Debug, Clone, Default)]
pub struct ParsedMessage {
  groups: Vec<(String, Vec<RawSegment>)>,
  len:    usize,
}

impl ParsedMessage {
  fn push(&mut self, segment: RawSegment) {
    self.len += 1;
    match self.groups.iter_mut().find(|(k, _)| *k == segment.kind) {
      Some((_, group)) => group.push(segment),
      None => self.groups.push((segment.kind.clone(), vec![segment])),
    }
  }

  /// All segments of type `kind`, in message order.
  pub fn segments(&self, kind: &str) -> &[RawSegment] {
    self
      .groups
      .iter()
      .find(|(k, _)| k == kind)
      .map(|(_, group)| group.as_slice())
      .unwrap_or_default()
  }

  pub fn first(&self, kind: &str) -> Option<&RawSegment> {
    self.segments(kind).first()
  }

  /// The message header (`MSH`) segment.
  pub fn header(&self) -> Option<&RawSegment> { self.first("MSH") }

  /// Segment types in order of first appearance.
  pub fn kinds(&self) -> impl Iterator<Item = &str> {
    self.groups.iter().map(|(k, _)| k.as_str())
  }

  /// Every segment, in message order.
  pub fn in_order(&self) -> Vec<&RawSegment> {
    let mut all: Vec<&RawSegment> =
      self.groups.iter().flat_map(|(_, g)| g.iter()).collect();
    all.sort_by_key(|s| s.position);
    all
  }

  pub fn len(&self) -> usize { self.len }

  pub fn is_empty(&self) -> bool { self.len == 0 }
}

// ─── Tokenizer ───────────────────────────────────────────────────────────────

/// Split raw text into primary lines and fragments recovered from embedded
/// terminators.
///
/// When the text has a bare carriage return (one not followed by `\n`), `\r`
/// (or `\r\n`) ends a segment and a bare `\n` inside a line is an embedded
/// terminator left behind by feeds that concatenate messages. Otherwise `\n`
/// ends a segment and a `\r` before it is part of the terminator.
fn split_lines(input: &str) -> (Vec<&str>, Vec<&str>) {
  let bare_cr = input
    .match_indices('\r')
    .any(|(i, _)| !input[i + 1..].starts_with('\n'));
  if !bare_cr {
    let lines = input
      .split('\n')
      .map(|line| line.strip_suffix('\r').unwrap_or(line))
      .collect();
    return (lines, Vec::new());
  }

  let mut primary = Vec::new();
  let mut recovered = Vec::new();
  for raw in input.split('\r') {
    let line = raw.strip_prefix('\n').unwrap_or(raw);
    let mut fragments = line.split('\n');
    primary.push(fragments.next().unwrap_or_default());
    recovered.extend(fragments);
  }
  (primary, recovered)
}

/// Tokenize `input` into a [`ParsedMessage`].
///
/// Blank lines are discarded. Segments recovered from embedded terminators
/// are appended after every primary segment, in the order they were found.
pub fn tokenize(
  input: &str,
  delimiters: &Delimiters,
) -> Result<ParsedMessage, ParseError> {
  let (primary, recovered) = split_lines(input);

  let mut message = ParsedMessage::default();
  let mut position = 0;
  let mut recovered_count = 0;

  for (line, is_recovered) in primary
    .into_iter()
    .map(|l| (l, false))
    .chain(recovered.into_iter().map(|l| (l, true)))
  {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    message.push(RawSegment::from_line(line, position, delimiters));
    position += 1;
    if is_recovered {
      recovered_count += 1;
    }
  }

  if message.is_empty() {
    return Err(ParseError::Empty);
  }
  if recovered_count > 0 {
    tracing::debug!(
      recovered = recovered_count,
      "recovered segments from embedded line terminators"
    );
  }
  Ok(message)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tok(input: &str) -> ParsedMessage {
    tokenize(input, &Delimiters::default()).unwrap()
  }

  #[test]
  fn blank_input_is_empty_error() {
    let d = Delimiters::default();
    assert_eq!(tokenize("", &d).unwrap_err(), ParseError::Empty);
    assert_eq!(tokenize(" \r\n \n\r", &d).unwrap_err(), ParseError::Empty);
  }

  #[test]
  fn accepts_lf_cr_and_crlf_terminators() {
    for sep in ["\n", "\r", "\r\n"] {
      let input = format!("MSH|^~\\&|A{sep}PID|||1^^^X^CF{sep}{sep}OBX|1|NM");
      let msg = tok(&input);
      assert_eq!(msg.len(), 3, "separator {sep:?}");
      assert_eq!(msg.kinds().collect::<Vec<_>>(), ["MSH", "PID", "OBX"]);
    }
  }

  #[test]
  fn fields_are_indexed_from_segment_type() {
    let msg = tok("PID|||383378^^^CS^SS||ROSSI^MARIO");
    let pid = msg.first("PID").unwrap();
    assert_eq!(pid.field(0), "PID");
    assert_eq!(pid.field(3), "383378^^^CS^SS");
    assert_eq!(pid.field(5), "ROSSI^MARIO");
  }

  #[test]
  fn field_access_past_end_is_empty() {
    let msg = tok("PID|1");
    let pid = msg.first("PID").unwrap();
    assert_eq!(pid.field(1), "1");
    assert_eq!(pid.field(2), "");
    assert_eq!(pid.field(500), "");
    assert!(!pid.has_field(2));
  }

  #[test]
  fn repeated_segments_keep_order() {
    let msg = tok("OBR|1\rOBX|1|NM|K\rOBX|2|NM|NA\rOBR|2\rOBX|3|NM|CL");
    let obx: Vec<&str> =
      msg.segments("OBX").iter().map(|s| s.field(3)).collect();
    assert_eq!(obx, ["K", "NA", "CL"]);
    assert_eq!(msg.segments("OBR").len(), 2);
    assert_eq!(msg.segments("OBX")[2].position, 4);
    assert!(msg.segments("SPM").is_empty());
  }

  #[test]
  fn embedded_terminator_recovers_trailing_segments() {
    let input = concat!(
      "MSH|^~\\&|LAB\r",
      "PID|||1^^^X^CF\r",
      "OBX|1|NM|K^POTASSIO||3.9\nOBX|2|NM|NA^SODIO||138\nOBX|3|NM|CL^CLORO||101\r",
    );
    let msg = tok(input);

    let obx = msg.segments("OBX");
    assert_eq!(obx.len(), 3);
    // The original segment keeps the first fragment as its field value.
    assert_eq!(obx[0].field(5), "3.9");
    assert_eq!(obx[0].fields.len(), 6);
    // Recovered segments follow the primary ones.
    assert_eq!(obx[1].field(3), "NA^SODIO");
    assert_eq!(obx[2].field(5), "101");
    assert!(obx[1].position > obx[0].position);
    assert_eq!(msg.len(), 5);
  }

  #[test]
  fn recovered_segments_come_after_all_primary_segments() {
    let input = "MSH|^~\\&\rOBX|1|ST|A||x\nNTE|1||note\rOBX|2|ST|B||y";
    let msg = tok(input);
    let order: Vec<&str> =
      msg.in_order().iter().map(|s| s.kind.as_str()).collect();
    assert_eq!(order, ["MSH", "OBX", "OBX", "NTE"]);
  }

  #[test]
  fn stray_crlf_in_lf_text_keeps_message_order() {
    let input = concat!(
      "MSH|^~\\&|LAB\n",
      "OBR|1|||PAN^PANNELLO\r\n",
      "SPM|1|S1||SER^SIERO\n",
      "OBX|1|NM|K^POTASSIO||3.9\n",
      "OBR|2|||EMO^EMOCROMO\n",
      "OBX|2|NM|HB^EMOGLOBINA||13.5\n",
    );
    let msg = tok(input);
    let order: Vec<&str> =
      msg.in_order().iter().map(|s| s.kind.as_str()).collect();
    assert_eq!(order, ["MSH", "OBR", "SPM", "OBX", "OBR", "OBX"]);
    assert_eq!(msg.first("OBR").unwrap().field(4), "PAN^PANNELLO");
  }

  #[test]
  fn custom_field_delimiter() {
    let d = Delimiters {
      field: '#',
      ..Delimiters::default()
    };
    let msg = tokenize("PID###ABC^^^^CF", &d).unwrap();
    assert_eq!(msg.first("PID").unwrap().field(3), "ABC^^^^CF");
  }

  #[test]
  fn splitting_helpers() {
    let d = Delimiters::default();
    assert_eq!(d.repetitions("a~b~"), ["a", "b", ""]);
    assert!(d.repetitions("").is_empty());
    assert_eq!(d.components("a^^c"), ["a", "", "c"]);
    assert_eq!(d.subcomponents("x&y"), ["x", "y"]);
    assert_eq!(d.first_component("ORU^R01"), "ORU");
    assert_eq!(d.first_component(""), "");
  }

  #[test]
  fn unescape_known_sequences() {
    let d = Delimiters::default();
    assert_eq!(d.unescape("A\\F\\B\\S\\C"), "A|B^C");
    assert_eq!(d.unescape("x\\T\\y\\R\\z\\E\\"), "x&y~z\\");
    assert_eq!(d.unescape("line1\\.br\\line2"), "line1\nline2");
    assert_eq!(d.unescape("keep \\Z99\\ this"), "keep \\Z99\\ this");
    assert_eq!(d.unescape("dangling \\F"), "dangling \\F");
    assert_eq!(d.unescape("plain"), "plain");
  }
}
