//! [`SqliteStore`]: the SQLite implementation of [`AuthorizationStore`] and
//! [`SubjectDirectory`].

use std::path::Path;

use chrono::Utc;
use idcheck_core::{
  document::Scheme,
  fingerprint::{Fingerprint, fingerprint},
  identity::PersonalData,
  lifecycle::{Action, Decision, DecisionKind, TransitionOutcome},
  request::{NewRequest, RequestState, VerificationRequest},
  store::AuthorizationStore,
  subject::{Subject, SubjectDirectory},
};
use rusqlite::{ErrorCode, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{REQUEST_COLUMNS, RawDecision, RawRequest, RawSubject, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Verification requests and subjects backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
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

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  /// Apply a grant or rejection as one immediate transaction, recording the
  /// decision alongside the state change. With `scheme` set, only a request
  /// submitted under that scheme is decided.
  async fn decide(
    &self,
    request_id: Uuid,
    admin_id: Uuid,
    action: Action,
    scheme: Option<Scheme>,
    reason: Option<String>,
  ) -> Result<TransitionOutcome> {
    let id_str = encode_uuid(request_id);
    let admin_str = encode_uuid(admin_id);
    let decision_str = encode_uuid(Uuid::new_v4());
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(current) = select_request(&tx, &id_str)? else {
          return Ok(RawTransition::NotFound);
        };
        let state: RequestState = current.state.parse().map_err(other)?;
        let Some(next) = state.apply(action) else {
          return Ok(RawTransition::InvalidState { request_id: id_str, state });
        };
        if let Some(expected) = scheme {
          let actual = match current.scheme.as_deref() {
            Some(code) => code.parse::<Scheme>().map_err(other)?,
            None => Scheme::Online,
          };
          if actual != expected {
            return Ok(RawTransition::SchemeMismatch(actual));
          }
        }

        let (kind, unique_id) = match next {
          RequestState::Granted => {
            let data: PersonalData = serde_json::from_str(&current.personal_data).map_err(other)?;
            (DecisionKind::Granted, Some(fingerprint(&data).into_string()))
          }
          _ => (DecisionKind::Rejected, None),
        };

        let updated = tx.execute(
          "UPDATE requests
           SET state = ?2, unique_id = ?3, rejection_reason = ?4,
               decided_at = ?5, decided_by = ?6
           WHERE request_id = ?1",
          rusqlite::params![id_str, next.code(), unique_id, reason, at_str, admin_str],
        );
        match updated {
          // The partial unique index on granted fingerprints.
          Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Ok(RawTransition::DuplicateIdentity);
          }
          result => {
            result?;
          }
        }

        tx.execute(
          "INSERT INTO decisions (decision_id, request_id, admin_id, kind, reason, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![decision_str, id_str, admin_str, kind.code(), reason, at_str],
        )?;

        let row = select_request(&tx, &id_str)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(RawTransition::Applied(row))
      })
      .await?;

    raw.into_outcome(request_id)
  }
}

// ─── Transactions ────────────────────────────────────────────────────────────

/// What a transition closure observed, before decoding.
enum RawTransition {
  Applied(RawRequest),
  NotFound,
  InvalidState { request_id: String, state: RequestState },
  DuplicateIdentity,
  SchemeMismatch(Scheme),
}

impl RawTransition {
  fn into_outcome(self, request_id: Uuid) -> Result<TransitionOutcome> {
    Ok(match self {
      Self::Applied(raw) => TransitionOutcome::Applied(raw.into_request()?),
      Self::NotFound => TransitionOutcome::NotFound(request_id),
      Self::InvalidState { request_id, state } => TransitionOutcome::InvalidState {
        request_id: Uuid::parse_str(&request_id)?,
        state,
      },
      Self::DuplicateIdentity => TransitionOutcome::DuplicateIdentity { request_id },
      Self::SchemeMismatch(scheme) => TransitionOutcome::SchemeMismatch { request_id, scheme },
    })
  }
}

fn other<E>(e: E) -> tokio_rusqlite::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  tokio_rusqlite::Error::Other(Box::new(e))
}

fn select_request(
  conn: &rusqlite::Connection,
  request_id: &str,
) -> rusqlite::Result<Option<RawRequest>> {
  conn
    .query_row(
      &format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE request_id = ?1"),
      [request_id],
      RawRequest::from_row,
    )
    .optional()
}

// ─── AuthorizationStore impl ─────────────────────────────────────────────────

impl AuthorizationStore for SqliteStore {
  type Error = Error;

  // ── Transitions ───────────────────────────────────────────────────────

  async fn submit(&self, request: NewRequest) -> Result<TransitionOutcome> {
    let new_id = Uuid::new_v4();
    let new_id_str = encode_uuid(new_id);
    let subject_str = encode_uuid(request.subject_id);
    let scheme = request.scheme.code();
    let personal_data = serde_json::to_string(&request.personal_data)?;
    let document_type = request.document.document_type.code();
    let document_number = request.document.document_number;
    let attachment_ref = request.attachment_ref.map(|r| r.as_str().to_owned());
    let at_str = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<(String, String)> = tx
          .query_row(
            "SELECT request_id, state FROM requests WHERE subject_id = ?1",
            [&subject_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;

        let request_id = match existing {
          None => {
            tx.execute(
              "INSERT INTO requests (
                 request_id, subject_id, scheme, personal_data, document_type,
                 document_number, attachment_ref, state, submitted_at
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)",
              rusqlite::params![
                new_id_str,
                subject_str,
                scheme,
                personal_data,
                document_type,
                document_number,
                attachment_ref,
                at_str,
              ],
            )?;
            new_id_str
          }
          Some((request_id, state)) => {
            let state: RequestState = state.parse().map_err(other)?;
            if !state.permits(Action::Submit) {
              return Ok(RawTransition::InvalidState { request_id, state });
            }
            // Resubmission reuses the record and clears the previous decision.
            tx.execute(
              "UPDATE requests
               SET scheme = ?2, personal_data = ?3, document_type = ?4,
                   document_number = ?5, attachment_ref = ?6, state = 'pending',
                   rejection_reason = NULL, unique_id = NULL, submitted_at = ?7,
                   decided_at = NULL, decided_by = NULL
               WHERE request_id = ?1",
              rusqlite::params![
                request_id,
                scheme,
                personal_data,
                document_type,
                document_number,
                attachment_ref,
                at_str,
              ],
            )?;
            request_id
          }
        };

        let row = select_request(&tx, &request_id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        tx.commit()?;
        Ok(RawTransition::Applied(row))
      })
      .await?;

    raw.into_outcome(new_id)
  }

  async fn grant(
    &self,
    request_id: Uuid,
    admin_id: Uuid,
    scheme: Scheme,
  ) -> Result<TransitionOutcome> {
    self.decide(request_id, admin_id, Action::Grant, Some(scheme), None).await
  }

  async fn reject(
    &self,
    request_id: Uuid,
    admin_id: Uuid,
    reason: Option<String>,
  ) -> Result<TransitionOutcome> {
    self.decide(request_id, admin_id, Action::Reject, None, reason).await
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  async fn get_request(&self, request_id: Uuid) -> Result<Option<VerificationRequest>> {
    let id_str = encode_uuid(request_id);

    let raw = self
      .conn
      .call(move |conn| Ok(select_request(conn, &id_str)?))
      .await?;

    raw.map(RawRequest::into_request).transpose()
  }

  async fn find_by_subject(&self, subject_id: Uuid) -> Result<Option<VerificationRequest>> {
    let subject_str = encode_uuid(subject_id);

    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE subject_id = ?1"),
              [subject_str],
              RawRequest::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRequest::into_request).transpose()
  }

  async fn list_pending(&self, scheme: Option<Scheme>) -> Result<Vec<VerificationRequest>> {
    let scheme_str = scheme.map(Scheme::code);

    let raws: Vec<RawRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REQUEST_COLUMNS} FROM requests
           WHERE state = 'pending'
             AND (?1 IS NULL OR COALESCE(scheme, 'online') = ?1)
           ORDER BY submitted_at, rowid"
        ))?;
        let rows = stmt
          .query_map([scheme_str], RawRequest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRequest::into_request).collect()
  }

  async fn unique_id_for(&self, subject_id: Uuid) -> Result<Option<Fingerprint>> {
    let subject_str = encode_uuid(subject_id);

    let unique_id: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT unique_id FROM requests WHERE subject_id = ?1 AND state = 'granted'",
              [subject_str],
              |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten(),
        )
      })
      .await?;

    Ok(unique_id.map(Fingerprint::from_persisted))
  }

  async fn decisions(&self, request_id: Uuid) -> Result<Vec<Decision>> {
    let id_str = encode_uuid(request_id);

    let raws: Vec<RawDecision> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT decision_id, request_id, admin_id, kind, reason, recorded_at
           FROM decisions
           WHERE request_id = ?1
           ORDER BY recorded_at, rowid",
        )?;
        let rows = stmt
          .query_map([id_str], RawDecision::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDecision::into_decision).collect()
  }
}

// ─── SubjectDirectory impl ───────────────────────────────────────────────────

impl SubjectDirectory for SqliteStore {
  type Error = Error;

  async fn find_subject_by_contact<'a>(&'a self, contact: &'a str) -> Result<Option<Subject>> {
    let contact = contact.to_owned();

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, contact, created_at FROM subjects WHERE contact = ?1",
              [contact],
              RawSubject::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn register_subject(&self, contact: String) -> Result<Subject> {
    let id_str = encode_uuid(Uuid::new_v4());
    let at_str = encode_dt(Utc::now());

    let raw: RawSubject = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (subject_id, contact, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (contact) DO NOTHING",
          rusqlite::params![id_str, contact, at_str],
        )?;
        Ok(conn.query_row(
          "SELECT subject_id, contact, created_at FROM subjects WHERE contact = ?1",
          [&contact],
          RawSubject::from_row,
        )?)
      })
      .await?;

    raw.into_subject()
  }
}
