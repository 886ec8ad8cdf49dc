//! The `AuthorizationStore` trait.
//!
//! Implemented by storage backends (e.g. `idcheck-store-sqlite`). The
//! [`Workflow`](crate::workflow::Workflow) depends on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  document::Scheme,
  fingerprint::Fingerprint,
  lifecycle::{Decision, TransitionOutcome},
  request::{NewRequest, VerificationRequest},
};

/// Persistence for verification requests, one record per subject.
///
/// Each transition method is a single atomic read-modify-write: it either
/// applies completely and returns [`TransitionOutcome::Applied`], or leaves
/// the record untouched and reports why. Two concurrent `grant` calls on the
/// same request, or on two requests sharing a fingerprint, must never both
/// succeed.
pub trait AuthorizationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Transitions ───────────────────────────────────────────────────────

  /// Store a submission as pending. Creates the subject's record if none
  /// exists, overwrites it if it is rejected, and reports
  /// [`TransitionOutcome::InvalidState`] if it is pending or granted.
  fn submit(
    &self,
    request: NewRequest,
  ) -> impl Future<Output = Result<TransitionOutcome, Self::Error>> + Send + '_;

  /// Grant a pending request submitted under `scheme`: persist its
  /// fingerprint as `unique_id` and record `admin_id`. Reports
  /// [`TransitionOutcome::SchemeMismatch`] if the request was submitted under
  /// another scheme, and [`TransitionOutcome::DuplicateIdentity`] if another
  /// subject already holds a granted record with the same fingerprint.
  fn grant(
    &self,
    request_id: Uuid,
    admin_id: Uuid,
    scheme: Scheme,
  ) -> impl Future<Output = Result<TransitionOutcome, Self::Error>> + Send + '_;

  /// Reject a pending request with an optional participant-facing reason.
  fn reject(
    &self,
    request_id: Uuid,
    admin_id: Uuid,
    reason: Option<String>,
  ) -> impl Future<Output = Result<TransitionOutcome, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a request by id. Returns `None` if not found.
  fn get_request(
    &self,
    request_id: Uuid,
  ) -> impl Future<Output = Result<Option<VerificationRequest>, Self::Error>> + Send + '_;

  /// Retrieve the subject's request, if they have ever submitted.
  fn find_by_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<VerificationRequest>, Self::Error>> + Send + '_;

  /// Pending requests, oldest submission first, optionally restricted to one
  /// scheme.
  fn list_pending(
    &self,
    scheme: Option<Scheme>,
  ) -> impl Future<Output = Result<Vec<VerificationRequest>, Self::Error>> + Send + '_;

  /// The persisted `unique_id` of the subject's granted record.
  fn unique_id_for(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Option<Fingerprint>, Self::Error>> + Send + '_;

  /// Audit trail of decisions taken on a request, oldest first.
  fn decisions(
    &self,
    request_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Decision>, Self::Error>> + Send + '_;
}
