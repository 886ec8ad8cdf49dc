//! Verification requests.
//!
//! There is at most one request per subject. Resubmitting after a rejection
//! overwrites the same record; no history of earlier attempts is kept beyond
//! the decision audit trail.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error,
  attachment::AttachmentRef,
  document::{IdentityDocument, Scheme},
  fingerprint::{Fingerprint, fingerprint},
  identity::PersonalData,
};

// ─── State ───────────────────────────────────────────────────────────────────

/// Persisted lifecycle state. The implicit initial state (no record) is
/// [`AuthorizationStatus::Unsubmitted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
  Pending,
  Granted,
  Rejected,
}

impl RequestState {
  pub fn code(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Granted => "granted",
      Self::Rejected => "rejected",
    }
  }
}

impl FromStr for RequestState {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(Self::Pending),
      "granted" => Ok(Self::Granted),
      "rejected" => Ok(Self::Rejected),
      other => Err(Error::unknown("request state", other)),
    }
  }
}

impl fmt::Display for RequestState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// Input to [`AuthorizationStore::submit`](crate::store::AuthorizationStore::submit):
/// a validated submission whose attachment, if any, is already stored.
#[derive(Debug, Clone)]
pub struct NewRequest {
  pub subject_id:     Uuid,
  pub scheme:         Scheme,
  pub personal_data:  PersonalData,
  pub document:       IdentityDocument,
  pub attachment_ref: Option<AttachmentRef>,
}

/// A persisted verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
  pub request_id:       Uuid,
  pub subject_id:       Uuid,
  pub scheme:           Scheme,
  pub personal_data:    PersonalData,
  pub document:         IdentityDocument,
  /// Present exactly when `scheme` is [`Scheme::Online`].
  pub attachment_ref:   Option<AttachmentRef>,
  pub state:            RequestState,
  pub rejection_reason: Option<String>,
  /// The fingerprint, persisted only once granted.
  pub unique_id:        Option<Fingerprint>,
  pub submitted_at:     DateTime<Utc>,
  pub decided_at:       Option<DateTime<Utc>>,
  /// Administrator who granted or rejected the current submission.
  pub decided_by:       Option<Uuid>,
}

impl VerificationRequest {
  /// Recomputed from `personal_data` on every call.
  pub fn fingerprint(&self) -> Fingerprint { fingerprint(&self.personal_data) }
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// What collaborators see of a request: the declared data, without the
/// fingerprint or attachment reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequestView {
  pub request_id:       Uuid,
  pub subject_id:       Uuid,
  pub scheme:           Scheme,
  pub state:            RequestState,
  pub personal_data:    PersonalData,
  pub document:         IdentityDocument,
  pub has_attachment:   bool,
  pub rejection_reason: Option<String>,
  pub submitted_at:     DateTime<Utc>,
}

impl From<&VerificationRequest> for VerificationRequestView {
  fn from(r: &VerificationRequest) -> Self {
    Self {
      request_id:       r.request_id,
      subject_id:       r.subject_id,
      scheme:           r.scheme,
      state:            r.state,
      personal_data:    r.personal_data.clone(),
      document:         r.document.clone(),
      has_attachment:   r.attachment_ref.is_some(),
      rejection_reason: r.rejection_reason.clone(),
      submitted_at:     r.submitted_at,
    }
  }
}

/// A subject's position in the lifecycle, including the implicit initial
/// state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthorizationStatus {
  Unsubmitted,
  Pending { request_id: Uuid, scheme: Scheme },
  Granted { request_id: Uuid },
  Rejected { request_id: Uuid, reason: Option<String> },
}

impl From<Option<&VerificationRequest>> for AuthorizationStatus {
  fn from(request: Option<&VerificationRequest>) -> Self {
    match request {
      None => Self::Unsubmitted,
      Some(r) => match r.state {
        RequestState::Pending => Self::Pending { request_id: r.request_id, scheme: r.scheme },
        RequestState::Granted => Self::Granted { request_id: r.request_id },
        RequestState::Rejected => Self::Rejected {
          request_id: r.request_id,
          reason:     r.rejection_reason.clone(),
        },
      },
    }
  }
}
