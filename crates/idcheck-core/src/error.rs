//! Error types for `idcheck-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{document::Scheme, lifecycle::Action, request::RequestState, validate::FieldError};

/// A boxed backend error, as carried by [`Error::Store`] and
/// [`Error::Attachment`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// One entry per offending field; never truncated to the first failure.
  #[error("submission has {} invalid field(s)", .0.len())]
  Validation(Vec<FieldError>),

  #[error("cannot {action} request {request_id} while it is {state}")]
  InvalidTransition {
    request_id: Uuid,
    state:      RequestState,
    action:     Action,
  },

  /// Deliberately carries no detail about which field differed.
  #[error("verification doesn't match")]
  VerificationMismatch,

  #[error("identity of request {request_id} is already granted to another subject")]
  DuplicateIdentity { request_id: Uuid },

  #[error("cannot {action} request {request_id} this way: it was submitted for {scheme} verification")]
  SchemeMismatch {
    request_id: Uuid,
    scheme:     Scheme,
    action:     Action,
  },

  #[error("request not found: {0}")]
  RequestNotFound(Uuid),

  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("unknown {kind} code: {value:?}")]
  UnknownCode { kind: &'static str, value: String },

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("attachment error: {0}")]
  Attachment(#[source] BoxError),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  pub(crate) fn attachment<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Attachment(Box::new(e))
  }

  pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
    Self::UnknownCode { kind, value: value.to_owned() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
