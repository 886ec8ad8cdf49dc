//! Authorization state machine rules.
//!
//! ```text
//! Unsubmitted ──submit──▶ Pending ──grant──▶ Granted
//!                           ▲  │
//!                    submit │  │ reject
//!                           │  ▼
//!                         Rejected
//! ```
//!
//! Granted is terminal. Storage backends apply each transition as a single
//! atomic read-modify-write and report the result as a [`TransitionOutcome`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  document::Scheme,
  request::{RequestState, VerificationRequest},
};

// ─── Actions ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
  Submit,
  Grant,
  Reject,
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Submit => "submit",
      Self::Grant => "grant",
      Self::Reject => "reject",
    })
  }
}

impl RequestState {
  /// Whether `action` may be applied to a request in this state. A subject
  /// with no request may always submit.
  pub fn permits(self, action: Action) -> bool {
    matches!(
      (self, action),
      (Self::Rejected, Action::Submit)
        | (Self::Pending, Action::Grant)
        | (Self::Pending, Action::Reject)
    )
  }

  /// State reached by applying `action`, or `None` if not permitted.
  pub fn apply(self, action: Action) -> Option<RequestState> {
    if !self.permits(action) {
      return None;
    }
    Some(match action {
      Action::Submit => Self::Pending,
      Action::Grant => Self::Granted,
      Action::Reject => Self::Rejected,
    })
  }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of a storage-level transition. Anything other than `Applied` left
/// the persisted record untouched.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
  Applied(VerificationRequest),
  NotFound(Uuid),
  InvalidState { request_id: Uuid, state: RequestState },
  /// Another subject already holds a granted record with the same
  /// fingerprint.
  DuplicateIdentity { request_id: Uuid },
  /// The request was submitted under `scheme`, which is confirmed through a
  /// different path.
  SchemeMismatch { request_id: Uuid, scheme: Scheme },
}

impl TransitionOutcome {
  pub fn into_result(self, action: Action) -> Result<VerificationRequest> {
    match self {
      Self::Applied(request) => Ok(request),
      Self::NotFound(id) => Err(Error::RequestNotFound(id)),
      Self::InvalidState { request_id, state } => {
        Err(Error::InvalidTransition { request_id, state, action })
      }
      Self::DuplicateIdentity { request_id } => Err(Error::DuplicateIdentity { request_id }),
      Self::SchemeMismatch { request_id, scheme } => {
        Err(Error::SchemeMismatch { request_id, scheme, action })
      }
    }
  }
}

// ─── Audit ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
  Granted,
  Rejected,
}

impl DecisionKind {
  pub fn code(self) -> &'static str {
    match self {
      Self::Granted => "granted",
      Self::Rejected => "rejected",
    }
  }
}

/// Append-only record of an administrator's decision on a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
  pub decision_id: Uuid,
  pub request_id:  Uuid,
  pub admin_id:    Uuid,
  pub kind:        DecisionKind,
  pub reason:      Option<String>,
  pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  const STATES: [RequestState; 3] =
    [RequestState::Pending, RequestState::Granted, RequestState::Rejected];

  #[test]
  fn grant_and_reject_only_from_pending() {
    for state in STATES {
      let expected = state == RequestState::Pending;
      assert_eq!(state.permits(Action::Grant), expected, "{state}");
      assert_eq!(state.permits(Action::Reject), expected, "{state}");
    }
  }

  #[test]
  fn submit_only_after_rejection() {
    assert_eq!(RequestState::Rejected.apply(Action::Submit), Some(RequestState::Pending));
    assert_eq!(RequestState::Pending.apply(Action::Submit), None);
    assert_eq!(RequestState::Granted.apply(Action::Submit), None);
  }

  #[test]
  fn granted_is_terminal() {
    for action in [Action::Submit, Action::Grant, Action::Reject] {
      assert!(RequestState::Granted.apply(action).is_none());
    }
  }

  #[test]
  fn outcome_maps_to_error_taxonomy() {
    let id = Uuid::new_v4();
    let err = TransitionOutcome::InvalidState { request_id: id, state: RequestState::Granted }
      .into_result(Action::Grant)
      .unwrap_err();
    assert!(matches!(
      err,
      Error::InvalidTransition { state: RequestState::Granted, action: Action::Grant, .. }
    ));

    let err = TransitionOutcome::DuplicateIdentity { request_id: id }
      .into_result(Action::Grant)
      .unwrap_err();
    assert!(matches!(err, Error::DuplicateIdentity { request_id } if request_id == id));

    let err = TransitionOutcome::SchemeMismatch { request_id: id, scheme: Scheme::Offline }
      .into_result(Action::Grant)
      .unwrap_err();
    assert!(matches!(
      err,
      Error::SchemeMismatch { scheme: Scheme::Offline, action: Action::Grant, .. }
    ));
  }
}
