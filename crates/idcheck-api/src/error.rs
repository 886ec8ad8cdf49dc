//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body carries a stable machine-readable `error` code and a
//! human-readable `message`. Validation failures additionally list every
//! offending field.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use idcheck_core::validate::FieldError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("submission has {} invalid field(s)", .0.len())]
  Validation(Vec<FieldError>),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("identity of request {0} is already granted to another subject")]
  DuplicateIdentity(Uuid),

  #[error("verification doesn't match")]
  VerificationMismatch,

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<idcheck_core::Error> for ApiError {
  fn from(e: idcheck_core::Error) -> Self {
    use idcheck_core::Error as E;
    match e {
      E::Validation(fields) => Self::Validation(fields),
      E::InvalidTransition { .. } | E::SchemeMismatch { .. } => Self::Conflict(e.to_string()),
      E::DuplicateIdentity { request_id } => Self::DuplicateIdentity(request_id),
      E::VerificationMismatch => Self::VerificationMismatch,
      E::RequestNotFound(_) | E::SubjectNotFound(_) => Self::NotFound(e.to_string()),
      E::UnknownCode { .. } => Self::BadRequest(e.to_string()),
      E::Store(inner) | E::Attachment(inner) => Self::Internal(inner),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { Self::BadRequest(r.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self { Self::BadRequest(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { Self::BadRequest(r.body_text()) }
}

impl ApiError {
  fn code(&self) -> &'static str {
    match self {
      Self::NotFound(_) => "not_found",
      Self::BadRequest(_) => "bad_request",
      Self::Validation(_) => "validation",
      Self::Conflict(_) => "conflict",
      Self::DuplicateIdentity(_) => "duplicate_identity",
      Self::VerificationMismatch => "verification_mismatch",
      Self::Internal(_) => "internal",
    }
  }

  fn status(&self) -> StatusCode {
    match self {
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::Validation(_) | Self::VerificationMismatch => StatusCode::UNPROCESSABLE_ENTITY,
      Self::Conflict(_) | Self::DuplicateIdentity(_) => StatusCode::CONFLICT,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    if let Self::Internal(e) = &self {
      tracing::error!(error = %e, "request failed");
    }
    let body = match &self {
      Self::Validation(fields) => json!({
        "error": self.code(),
        "message": self.to_string(),
        "fields": fields,
      }),
      _ => json!({ "error": self.code(), "message": self.to_string() }),
    };
    (self.status(), Json(body)).into_response()
  }
}
