//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings with a fixed microsecond precision so that
//! lexical order matches chronological order. Personal data is stored as
//! JSON. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use idcheck_core::{
  attachment::AttachmentRef,
  document::{IdentityDocument, Scheme},
  fingerprint::Fingerprint,
  identity::PersonalData,
  lifecycle::{Decision, DecisionKind},
  request::VerificationRequest,
  subject::Subject,
};
use tracing::warn;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Scheme ──────────────────────────────────────────────────────────────────

/// Rows written before the scheme column existed have no scheme; they were
/// all online submissions.
pub fn decode_scheme(s: Option<&str>, request_id: Uuid) -> Result<Scheme> {
  match s {
    Some(code) => Ok(code.parse()?),
    None => {
      warn!(%request_id, "request has no scheme recorded, assuming online");
      Ok(Scheme::Online)
    }
  }
}

// ─── DecisionKind ────────────────────────────────────────────────────────────

pub fn decode_decision_kind(s: &str) -> Result<DecisionKind> {
  match s {
    "granted" => Ok(DecisionKind::Granted),
    "rejected" => Ok(DecisionKind::Rejected),
    other => Err(Error::Core(idcheck_core::Error::UnknownCode {
      kind:  "decision kind",
      value: other.to_owned(),
    })),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching the field order of [`RawRequest`].
pub const REQUEST_COLUMNS: &str = "request_id, subject_id, scheme, personal_data, document_type, \
   document_number, attachment_ref, state, rejection_reason, unique_id, submitted_at, decided_at, \
   decided_by";

/// Raw strings read directly from a `requests` row.
pub struct RawRequest {
  pub request_id:       String,
  pub subject_id:       String,
  pub scheme:           Option<String>,
  pub personal_data:    String,
  pub document_type:    String,
  pub document_number:  String,
  pub attachment_ref:   Option<String>,
  pub state:            String,
  pub rejection_reason: Option<String>,
  pub unique_id:        Option<String>,
  pub submitted_at:     String,
  pub decided_at:       Option<String>,
  pub decided_by:       Option<String>,
}

impl RawRequest {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:       row.get(0)?,
      subject_id:       row.get(1)?,
      scheme:           row.get(2)?,
      personal_data:    row.get(3)?,
      document_type:    row.get(4)?,
      document_number:  row.get(5)?,
      attachment_ref:   row.get(6)?,
      state:            row.get(7)?,
      rejection_reason: row.get(8)?,
      unique_id:        row.get(9)?,
      submitted_at:     row.get(10)?,
      decided_at:       row.get(11)?,
      decided_by:       row.get(12)?,
    })
  }

  pub fn into_request(self) -> Result<VerificationRequest> {
    let request_id = decode_uuid(&self.request_id)?;
    let personal_data: PersonalData = serde_json::from_str(&self.personal_data)?;

    Ok(VerificationRequest {
      request_id,
      subject_id: decode_uuid(&self.subject_id)?,
      scheme: decode_scheme(self.scheme.as_deref(), request_id)?,
      personal_data,
      document: IdentityDocument {
        document_type:   self.document_type.parse()?,
        document_number: self.document_number,
      },
      attachment_ref: self.attachment_ref.map(AttachmentRef::new),
      state: self.state.parse()?,
      rejection_reason: self.rejection_reason,
      unique_id: self.unique_id.map(Fingerprint::from_persisted),
      submitted_at: decode_dt(&self.submitted_at)?,
      decided_at: self.decided_at.as_deref().map(decode_dt).transpose()?,
      decided_by: self.decided_by.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub contact:    String,
  pub created_at: String,
}

impl RawSubject {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { subject_id: row.get(0)?, contact: row.get(1)?, created_at: row.get(2)? })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id: decode_uuid(&self.subject_id)?,
      contact:    self.contact,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `decisions` row.
pub struct RawDecision {
  pub decision_id: String,
  pub request_id:  String,
  pub admin_id:    String,
  pub kind:        String,
  pub reason:      Option<String>,
  pub recorded_at: String,
}

impl RawDecision {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      decision_id: row.get(0)?,
      request_id:  row.get(1)?,
      admin_id:    row.get(2)?,
      kind:        row.get(3)?,
      reason:      row.get(4)?,
      recorded_at: row.get(5)?,
    })
  }

  pub fn into_decision(self) -> Result<Decision> {
    Ok(Decision {
      decision_id: decode_uuid(&self.decision_id)?,
      request_id:  decode_uuid(&self.request_id)?,
      admin_id:    decode_uuid(&self.admin_id)?,
      kind:        decode_decision_kind(&self.kind)?,
      reason:      self.reason,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}
