//! [`SqliteStore`]: the SQLite implementation of the FSE store traits.

use std::path::Path;

use chrono::Utc;
use fse_core::{
  observation::Observation,
  store::{ObservationStore, SubjectStore},
  subject::Subject,
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawObservation, RawSubject, encode_dt, encode_observation, encode_scheme,
    encode_subject, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An FSE store backed by a single SQLite file.
///
/// Clones share the same connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Why a subject write was refused before touching the tables.
enum Rejected {
  Missing,
  Owned { value: String, owner: String },
}

impl Rejected {
  fn into_error(self, key: Uuid) -> Error {
    match self {
      Rejected::Missing => Error::SubjectNotFound(key),
      Rejected::Owned { value, owner } => Error::Conflict(format!(
        "identifier {value:?} already belongs to subject {owner}"
      )),
    }
  }
}

/// Identifier columns of one subject, ready to insert.
struct IdentifierRow {
  value:  String,
  system: String,
  scheme: &'static str,
}

fn identifier_rows(subject: &Subject) -> Vec<IdentifierRow> {
  subject
    .identifiers
    .iter()
    .map(|i| IdentifierRow {
      value:  i.value.clone(),
      system: i.system.clone(),
      scheme: encode_scheme(i.scheme),
    })
    .collect()
}

/// Refuse identifier values already owned by a different subject.
fn check_owners(
  tx: &rusqlite::Transaction<'_>,
  key: &str,
  rows: &[IdentifierRow],
) -> rusqlite::Result<Option<Rejected>> {
  for row in rows {
    let owner: Option<String> = tx
      .query_row(
        "SELECT subject_id FROM subject_identifiers WHERE value = ?1",
        rusqlite::params![row.value],
        |r| r.get(0),
      )
      .optional()?;
    if let Some(owner) = owner.filter(|o| o != key) {
      return Ok(Some(Rejected::Owned {
        value: row.value.clone(),
        owner,
      }));
    }
  }
  Ok(None)
}

/// Insert identifier rows, skipping values this subject already holds under
/// another system.
fn insert_identifiers(
  tx: &rusqlite::Transaction<'_>,
  key: &str,
  rows: &[IdentifierRow],
) -> rusqlite::Result<()> {
  for row in rows {
    tx.execute(
      "INSERT INTO subject_identifiers (value, subject_id, system, scheme)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT (value) DO NOTHING",
      rusqlite::params![row.value, key, row.system, row.scheme],
    )?;
  }
  Ok(())
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests and throwaway servers.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// `SELECT COUNT(*)` over one of the schema's tables.
  async fn count_rows(&self, table: &'static str) -> Result<usize> {
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM {table}"),
          [],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(usize::try_from(n).unwrap_or_default())
  }

  async fn insert_subject(&self, mut subject: Subject) -> Result<Uuid> {
    if subject.id.is_nil() {
      subject.id = Uuid::new_v4();
    }
    let id = subject.id;
    let id_str = encode_uuid(id);
    let document = encode_subject(&subject)?;
    let now = encode_dt(Utc::now());
    let rows = identifier_rows(&subject);

    let rejected = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(rejected) = check_owners(&tx, &id_str, &rows)? {
          return Ok(Some(rejected));
        }
        tx.execute(
          "INSERT INTO subjects (subject_id, document, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?3)",
          rusqlite::params![id_str, document, now],
        )?;
        insert_identifiers(&tx, &id_str, &rows)?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match rejected {
      Some(rejected) => Err(rejected.into_error(id)),
      None => Ok(id),
    }
  }

  async fn replace_subject(&self, key: Uuid, mut subject: Subject) -> Result<Uuid> {
    subject.id = key;
    let key_str = encode_uuid(key);
    let document = encode_subject(&subject)?;
    let now = encode_dt(Utc::now());
    let rows = identifier_rows(&subject);

    let rejected = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM subjects WHERE subject_id = ?1",
            rusqlite::params![key_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(Some(Rejected::Missing));
        }
        if let Some(rejected) = check_owners(&tx, &key_str, &rows)? {
          return Ok(Some(rejected));
        }
        tx.execute(
          "UPDATE subjects SET document = ?2, updated_at = ?3
           WHERE subject_id = ?1",
          rusqlite::params![key_str, document, now],
        )?;
        tx.execute(
          "DELETE FROM subject_identifiers WHERE subject_id = ?1",
          rusqlite::params![key_str],
        )?;
        insert_identifiers(&tx, &key_str, &rows)?;
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match rejected {
      Some(rejected) => Err(rejected.into_error(key)),
      None => Ok(key),
    }
  }
}

// ─── SubjectStore impl ───────────────────────────────────────────────────────

impl SubjectStore for SqliteStore {
  type Error = Error;

  async fn find_subject_by_identifier(
    &self,
    value: &str,
  ) -> Result<Option<Subject>> {
    let value = value.to_owned();

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT s.subject_id, s.document
               FROM subject_identifiers i
               JOIN subjects s ON s.subject_id = i.subject_id
               WHERE i.value = ?1",
              rusqlite::params![value],
              |row| {
                Ok(RawSubject {
                  subject_id: row.get(0)?,
                  document:   row.get(1)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn find_subject_by_id(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, document FROM subjects WHERE subject_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawSubject {
                  subject_id: row.get(0)?,
                  document:   row.get(1)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn upsert_subject(
    &self,
    key: Option<Uuid>,
    subject: Subject,
  ) -> Result<Uuid> {
    match key {
      Some(key) => self.replace_subject(key, subject).await,
      None => self.insert_subject(subject).await,
    }
  }

  async fn list_subjects(&self) -> Result<Vec<Subject>> {
    let raws: Vec<RawSubject> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT subject_id, document FROM subjects
           ORDER BY created_at, rowid",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawSubject {
              subject_id: row.get(0)?,
              document:   row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn delete_subject(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM observations WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM subject_identifiers WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )?;
        let n = tx.execute(
          "DELETE FROM subjects WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }

  async fn count_subjects(&self) -> Result<usize> {
    self.count_rows("subjects").await
  }
}

// ─── ObservationStore impl ───────────────────────────────────────────────────

impl ObservationStore for SqliteStore {
  type Error = Error;

  async fn find_observation(
    &self,
    subject_ref: Uuid,
    code: &str,
    issued_at: &str,
  ) -> Result<Option<Observation>> {
    let subject_str = encode_uuid(subject_ref);
    let code = code.to_owned();
    let issued_at = issued_at.to_owned();

    let raw: Option<RawObservation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, document FROM observations
               WHERE subject_id = ?1 AND code = ?2 AND issued_at = ?3
               LIMIT 1",
              rusqlite::params![subject_str, code, issued_at],
              |row| {
                Ok(RawObservation {
                  subject_id: row.get(0)?,
                  document:   row.get(1)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawObservation::into_observation).transpose()
  }

  async fn insert_observation(&self, observation: Observation) -> Result<()> {
    let id_str = encode_uuid(Uuid::new_v4());
    let subject_str = encode_uuid(observation.subject_ref);
    let code = observation.code.value.clone();
    let issued_at = observation.issued_at.clone();
    let document = encode_observation(&observation)?;
    let recorded_at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO observations (
             observation_id, subject_id, code, issued_at, document, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            subject_str,
            code,
            issued_at,
            document,
            recorded_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_observations(&self, subject_ref: Uuid) -> Result<Vec<Observation>> {
    let subject_str = encode_uuid(subject_ref);

    let raws: Vec<RawObservation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT subject_id, document FROM observations
           WHERE subject_id = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![subject_str], |row| {
            Ok(RawObservation {
              subject_id: row.get(0)?,
              document:   row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawObservation::into_observation)
      .collect()
  }

  async fn count_observations(&self) -> Result<usize> {
    self.count_rows("observations").await
  }
}
