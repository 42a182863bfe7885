//! Integration tests for `SqliteStore` against an in-memory database.

use fse_core::{
  dedup::should_persist,
  identifier::Identifier,
  observation::{Code, Observation, ObservationStatus, ObservationValue},
  resolve::resolve,
  store::{ObservationStore, SubjectStore},
  subject::{Gender, HumanName, Subject},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn subject(tax_code: &str, family: &str) -> Subject {
  let mut s = Subject::new();
  s.add_identifier(Identifier::from_coding_system("383378", "SS").unwrap());
  s.add_identifier(Identifier::from_coding_system(tax_code, "CF").unwrap());
  s.names.push(HumanName {
    family: family.to_string(),
    given:  vec!["MARIO".to_string()],
  });
  s.birth_date = "1985-08-01".to_string();
  s.gender = Gender::Male;
  s
}

fn observation(subject_ref: Uuid, code: &str, issued_at: &str) -> Observation {
  Observation {
    subject_ref,
    code: Code {
      value:   code.to_string(),
      display: "SODIO".to_string(),
    },
    value: ObservationValue::Number(138.0),
    unit: Some("mmol/L".to_string()),
    reference_range: Some("135-145".to_string()),
    issued_at: issued_at.to_string(),
    status: ObservationStatus::Final,
    specimen: None,
  }
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_find_subject() {
  let s = store().await;

  let id = s.upsert_subject(None, subject("CF1", "ROSSI")).await.unwrap();
  assert!(!id.is_nil());

  let by_id = s.find_subject_by_id(id).await.unwrap().unwrap();
  assert_eq!(by_id.id, id);
  assert_eq!(by_id.names[0].family, "ROSSI");
  assert_eq!(by_id.gender, Gender::Male);

  let by_identifier = s.find_subject_by_identifier("CF1").await.unwrap();
  assert_eq!(by_identifier, Some(by_id.clone()));
  let by_card = s.find_subject_by_identifier("383378").await.unwrap();
  assert_eq!(by_card.map(|s| s.id), Some(id));
}

#[tokio::test]
async fn missing_subject_returns_none() {
  let s = store().await;
  assert!(s.find_subject_by_id(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.find_subject_by_identifier("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn insert_keeps_preassigned_id() {
  let s = store().await;
  let mut candidate = subject("CF1", "ROSSI");
  let wanted = Uuid::new_v4();
  candidate.id = wanted;
  assert_eq!(s.upsert_subject(None, candidate).await.unwrap(), wanted);
}

#[tokio::test]
async fn replace_swaps_document_and_identifiers() {
  let s = store().await;
  let id = s.upsert_subject(None, subject("CF1", "ROSSI")).await.unwrap();

  let mut replacement = Subject::new();
  replacement.add_identifier(Identifier::from_coding_system("CF1", "CF").unwrap());
  let returned = s.upsert_subject(Some(id), replacement).await.unwrap();
  assert_eq!(returned, id);

  let stored = s.find_subject_by_id(id).await.unwrap().unwrap();
  assert!(stored.names.is_empty());
  assert_eq!(stored.gender, Gender::Unknown);
  // The health-card number was dropped along with the old document.
  assert!(s.find_subject_by_identifier("383378").await.unwrap().is_none());
}

#[tokio::test]
async fn replace_missing_subject_fails() {
  let s = store().await;
  let key = Uuid::new_v4();
  let err = s
    .upsert_subject(Some(key), subject("CF1", "ROSSI"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::SubjectNotFound(k) if k == key));
}

#[tokio::test]
async fn identifier_owned_by_another_subject_conflicts() {
  let s = store().await;
  s.upsert_subject(None, subject("CF1", "ROSSI")).await.unwrap();

  // Shares the health-card number "383378".
  let err = s
    .upsert_subject(None, subject("CF2", "BIANCHI"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)), "got {err:?}");
  assert_eq!(s.list_subjects().await.unwrap().len(), 1);
}

#[tokio::test]
async fn same_value_under_two_systems_is_allowed() {
  let s = store().await;
  let mut candidate = Subject::new();
  candidate.add_identifier(Identifier::from_coding_system("777", "SS").unwrap());
  candidate.add_identifier(Identifier::from_coding_system("777", "PI").unwrap());
  let id = s.upsert_subject(None, candidate).await.unwrap();

  let stored = s.find_subject_by_id(id).await.unwrap().unwrap();
  assert_eq!(stored.identifiers.len(), 2);
}

#[tokio::test]
async fn list_and_delete_subjects() {
  let s = store().await;
  let a = s.upsert_subject(None, subject("CF1", "ROSSI")).await.unwrap();
  let mut other = Subject::new();
  other.add_identifier(Identifier::from_coding_system("CF2", "CF").unwrap());
  let b = s.upsert_subject(None, other).await.unwrap();

  s.insert_observation(observation(a, "NA", "20250530"))
    .await
    .unwrap();

  let ids: Vec<Uuid> =
    s.list_subjects().await.unwrap().iter().map(|s| s.id).collect();
  assert_eq!(ids, [a, b]);

  assert_eq!(s.count_subjects().await.unwrap(), 2);
  assert_eq!(s.count_observations().await.unwrap(), 1);

  assert!(s.delete_subject(a).await.unwrap());
  assert!(!s.delete_subject(a).await.unwrap());
  assert_eq!(s.count_observations().await.unwrap(), 0);
  assert!(s.list_observations(a).await.unwrap().is_empty());
  assert!(s.find_subject_by_identifier("CF1").await.unwrap().is_none());
  assert_eq!(s.list_subjects().await.unwrap().len(), 1);
}

// ─── Observations ────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_find_and_list_observations() {
  let s = store().await;
  let id = s.upsert_subject(None, subject("CF1", "ROSSI")).await.unwrap();

  s.insert_observation(observation(id, "NA", "20250530154128"))
    .await
    .unwrap();
  s.insert_observation(observation(id, "K", "20250530154128"))
    .await
    .unwrap();

  let found = s
    .find_observation(id, "NA", "20250530154128")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found, observation(id, "NA", "20250530154128"));
  assert!(
    s.find_observation(id, "NA", "20250601000000")
      .await
      .unwrap()
      .is_none()
  );

  let codes: Vec<String> = s
    .list_observations(id)
    .await
    .unwrap()
    .into_iter()
    .map(|o| o.code.value)
    .collect();
  assert_eq!(codes, ["NA", "K"]);
}

#[tokio::test]
async fn natural_key_is_enforced() {
  let s = store().await;
  let id = s.upsert_subject(None, subject("CF1", "ROSSI")).await.unwrap();
  s.insert_observation(observation(id, "NA", "20250530"))
    .await
    .unwrap();

  let err = s
    .insert_observation(observation(id, "NA", "20250530"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn uncoded_observations_are_not_unique() {
  let s = store().await;
  let id = s.upsert_subject(None, subject("CF1", "ROSSI")).await.unwrap();
  s.insert_observation(observation(id, "", "20250530"))
    .await
    .unwrap();
  s.insert_observation(observation(id, "", "20250530"))
    .await
    .unwrap();
  assert_eq!(s.list_observations(id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn observation_for_unknown_subject_is_rejected() {
  let s = store().await;
  let err = s
    .insert_observation(observation(Uuid::new_v4(), "NA", "20250530"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)), "got {err:?}");
}

// ─── Resolver and gate over SQLite ───────────────────────────────────────────

#[tokio::test]
async fn resolver_and_gate_work_against_sqlite() {
  let s = store().await;

  let first = resolve(subject("CF1", "ROSSI"), &s)
    .await
    .unwrap()
    .apply(&s)
    .await
    .unwrap();
  let action = resolve(subject("CF1", "ROSSI"), &s).await.unwrap();
  assert!(action.is_update());
  assert_eq!(action.apply(&s).await.unwrap(), first);

  let obs = observation(first, "NA", "20250530");
  assert!(should_persist(&obs, &s).await.unwrap());
  s.insert_observation(obs.clone()).await.unwrap();
  assert!(!should_persist(&obs, &s).await.unwrap());
}
