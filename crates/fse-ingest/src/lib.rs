//! Message ingestion: convert, resolve, deduplicate, persist.
//!
//! [`ingest`] is the boundary between raw HL7 text and a store. It never
//! returns an error: every failure, whether the message is unusable or the
//! store rejected a write, is reported as an [`IngestOutcome::Failure`].
//!
//! The subject is written before any observation. A store failure part-way
//! through the observations leaves the subject and the observations already
//! written in place; a resubmission completes the rest, since duplicates are
//! skipped.

pub mod error;
pub mod options;
pub mod outcome;

use fse_core::{
  dedup::should_persist,
  resolve::resolve,
  store::{ObservationStore, SubjectStore},
};
use fse_hl7::{ConvertedMessage, MessageKind, ParseError, convert};

pub use self::{
  error::{Error, Result},
  options::IngestOptions,
  outcome::{
    ErrorKind, IngestFailure, IngestOutcome, IngestReport, SubjectAction,
  },
};

/// Ingest one raw message into `store`.
pub async fn ingest<S>(
  text: &str,
  options: &IngestOptions,
  store: &S,
) -> IngestOutcome
where
  S: SubjectStore + ObservationStore,
{
  match try_ingest(text, options, store).await {
    Ok(report) => {
      tracing::info!(
        control_id = %report.control_id,
        kind = %report.message_kind,
        subject_id = %report.subject_id,
        persisted = report.observations_persisted,
        skipped = report.duplicates_skipped,
        "ingested message"
      );
      IngestOutcome::Success(report)
    }
    Err(error) => {
      let failure = IngestFailure::from(&error);
      tracing::warn!(
        kind = ?failure.error_kind,
        error = %error,
        "failed to ingest message"
      );
      IngestOutcome::Failure(failure)
    }
  }
}

/// Convert one raw message under `options` without touching a store.
///
/// Applies the same rules as [`ingest`], so a preview fails exactly when the
/// conversion step of an ingest would.
pub fn preview(text: &str, options: &IngestOptions) -> Result<ConvertedMessage> {
  let converted = convert(text, &options.delimiters, options.pairing)?;
  if options.require_known_kind && converted.kind == MessageKind::Unknown {
    return Err(
      fse_hl7::Error::from(ParseError::UnknownMessageKind(
        converted.header.message_type,
      ))
      .into(),
    );
  }
  Ok(converted)
}

async fn try_ingest<S>(
  text: &str,
  options: &IngestOptions,
  store: &S,
) -> Result<IngestReport>
where
  S: SubjectStore + ObservationStore,
{
  let converted = preview(text, options)?;

  let action = resolve(converted.subject, store)
    .await
    .map_err(Error::store)?;
  let action_kind = if action.is_update() {
    SubjectAction::Updated
  } else {
    SubjectAction::Inserted
  };
  let subject_id = action.apply(store).await.map_err(Error::store)?;

  let mut persisted = 0;
  let mut skipped = 0;
  for mut observation in converted.observations {
    observation.subject_ref = subject_id;
    if should_persist(&observation, store)
      .await
      .map_err(Error::store)?
    {
      store
        .insert_observation(observation)
        .await
        .map_err(Error::store)?;
      persisted += 1;
    } else {
      skipped += 1;
    }
  }

  Ok(IngestReport {
    subject_id,
    observations_persisted: persisted,
    duplicates_skipped: skipped,
    message_kind: converted.kind,
    action: action_kind,
    control_id: converted.header.control_id,
  })
}

#[cfg(test)]
mod tests {
  use fse_core::{
    memory::MemoryStore,
    observation::ObservationValue,
    subject::Gender,
  };

  use fse_hl7::PairingRule;

  use super::*;

  const REPORT: &str = concat!(
    "MSH|^~\\&|LAB|OSP|FSE|REG|20250530154128||ORU^R01|MSG0001|P|2.5\r",
    "PID|1||383378^^^CS^SS~RSSMRA85M01H501Z^^^CF^NN||ROSSI^MARIO||19850801|M\r",
    "OBR|1|||K^POTASSIO|||20250530081500\r",
    "OBX|1|NM|K^POTASSIO||3.9|mmol/L|3.5-5.1||||F|||20250530154128\r",
    "OBR|2|||NA^SODIO|||20250530081500\r",
    "OBX|2|NM|NA^SODIO||138|mmol/L|135-145||||F|||20250530154128\r",
  );

  fn options() -> IngestOptions { IngestOptions::default() }

  fn expect_success(outcome: IngestOutcome) -> IngestReport {
    match outcome {
      IngestOutcome::Success(report) => report,
      IngestOutcome::Failure(f) => panic!("expected success, got {f:?}"),
    }
  }

  fn expect_failure(outcome: IngestOutcome) -> IngestFailure {
    match outcome {
      IngestOutcome::Failure(failure) => failure,
      IngestOutcome::Success(r) => panic!("expected failure, got {r:?}"),
    }
  }

  #[tokio::test]
  async fn first_submission_inserts_everything() {
    let store = MemoryStore::new();
    let report = expect_success(ingest(REPORT, &options(), &store).await);

    assert_eq!(report.action, SubjectAction::Inserted);
    assert_eq!(report.message_kind, MessageKind::ResultReport);
    assert_eq!(report.observations_persisted, 2);
    assert_eq!(report.duplicates_skipped, 0);
    assert_eq!(report.control_id, "MSG0001");

    let observations =
      store.list_observations(report.subject_id).await.unwrap();
    assert_eq!(observations.len(), 2);
    assert!(observations.iter().all(|o| o.subject_ref == report.subject_id));
    assert_eq!(observations[0].value, ObservationValue::Number(3.9));
  }

  #[tokio::test]
  async fn resubmission_is_idempotent() {
    let store = MemoryStore::new();
    let first = expect_success(ingest(REPORT, &options(), &store).await);
    let second = expect_success(ingest(REPORT, &options(), &store).await);

    assert_eq!(second.subject_id, first.subject_id);
    assert_eq!(second.action, SubjectAction::Updated);
    assert_eq!(second.observations_persisted, 0);
    assert_eq!(second.duplicates_skipped, 2);
    assert_eq!(store.list_subjects().await.unwrap().len(), 1);
    assert_eq!(
      store.list_observations(first.subject_id).await.unwrap().len(),
      2
    );
  }

  #[tokio::test]
  async fn second_message_replaces_demographics() {
    let store = MemoryStore::new();
    let first = expect_success(ingest(REPORT, &options(), &store).await);

    let corrected =
      REPORT.replace("ROSSI^MARIO||19850801|M", "ROSSI^MARIA||19850801|F");
    let second = expect_success(ingest(&corrected, &options(), &store).await);
    assert_eq!(second.subject_id, first.subject_id);

    let stored = store
      .find_subject_by_id(first.subject_id)
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stored.names[0].given, ["MARIA"]);
    assert_eq!(stored.gender, Gender::Female);
  }

  #[tokio::test]
  async fn panel_results_are_not_mistaken_for_duplicates() {
    let text = concat!(
      "MSH|^~\\&|LAB|OSP|FSE|REG|20250530154128||ORU^R01|MSG0002|P|2.5\r",
      "PID|1||RSSMRA85M01H501Z^^^^CF||ROSSI^MARIO\r",
      "OBR|1|||PAN^PANNELLO ELETTROLITI|||20250530081500\r",
      "OBX|1|NM|K^POTASSIO||3.9|mmol/L|||||F|||20250530154128\r",
      "OBX|2|NM|NA^SODIO||138|mmol/L|||||F|||20250530154128\r",
    );
    for pairing in [PairingRule::Positional, PairingRule::Enclosing] {
      let store = MemoryStore::new();
      let opts = IngestOptions {
        pairing,
        ..options()
      };
      let report = expect_success(ingest(text, &opts, &store).await);
      assert_eq!(report.observations_persisted, 2, "{pairing:?}");
      assert_eq!(report.duplicates_skipped, 0, "{pairing:?}");

      let codes: Vec<String> = store
        .list_observations(report.subject_id)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.code.value)
        .collect();
      assert_eq!(codes, ["K", "NA"]);
    }
  }

  #[tokio::test]
  async fn missing_identification_persists_nothing() {
    let store = MemoryStore::new();
    let text = "MSH|^~\\&|LAB|||||ORU^R01|2\rOBX|1|NM|K^POTASSIO||3.9";
    let failure = expect_failure(ingest(text, &options(), &store).await);

    assert_eq!(failure.error_kind, ErrorKind::NoIdentifiers);
    assert!(store.list_subjects().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn blank_message_is_empty() {
    let store = MemoryStore::new();
    let failure = expect_failure(ingest("  \r\n", &options(), &store).await);
    assert_eq!(failure.error_kind, ErrorKind::Empty);
  }

  #[tokio::test]
  async fn unknown_kind_is_fatal_only_when_required() {
    let text = "MSH|^~\\&|X|||||ZZZ^Z01|3\rPID|||A^^^^CF";

    let store = MemoryStore::new();
    assert!(ingest(text, &options(), &store).await.is_success());

    let strict = IngestOptions {
      require_known_kind: true,
      ..options()
    };
    let store = MemoryStore::new();
    let failure = expect_failure(ingest(text, &strict, &store).await);
    assert_eq!(failure.error_kind, ErrorKind::UnknownMessageKind);
    assert!(failure.message.contains("ZZZ^Z01"));
    assert!(store.list_subjects().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn store_conflict_is_a_persistence_failure() {
    let store = MemoryStore::new();
    expect_success(ingest(REPORT, &options(), &store).await);

    // Same health-card number, different tax code: resolution finds no
    // match, and the store rejects the second owner of "383378".
    let clash = REPORT.replace("RSSMRA85M01H501Z", "BNCLGU70A01F205X");
    let failure = expect_failure(ingest(&clash, &options(), &store).await);
    assert_eq!(failure.error_kind, ErrorKind::Persistence);
    assert!(!failure.error_kind.is_conversion());
  }

  #[test]
  fn preview_converts_without_a_store() {
    let converted = preview(REPORT, &options()).unwrap();
    assert_eq!(converted.kind, MessageKind::ResultReport);
    assert!(converted.subject.id.is_nil());
    assert_eq!(converted.observations.len(), 2);

    let strict = IngestOptions {
      require_known_kind: true,
      ..options()
    };
    let err = preview("MSH|^~\\&|X|||||ZZZ^Z01|3\rPID|||A^^^^CF", &strict)
      .unwrap_err();
    assert_eq!(
      IngestFailure::from(&err).error_kind,
      ErrorKind::UnknownMessageKind
    );
  }

  #[tokio::test]
  async fn outcome_json_shape() {
    let store = MemoryStore::new();
    let ok = ingest(REPORT, &options(), &store).await;
    let json = serde_json::to_value(&ok).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["observationsPersisted"], 2);
    assert_eq!(json["duplicatesSkipped"], 0);
    assert_eq!(json["messageKind"], "result_report");
    assert_eq!(json["action"], "inserted");
    assert!(json["subjectId"].is_string());

    let err = ingest("", &options(), &store).await;
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["errorKind"], "empty");
    assert!(json["message"].is_string());
  }
}
