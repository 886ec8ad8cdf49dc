//! Handlers for `/requests` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/requests` | Submit; attachment as base64 + media type |
//! | `GET`  | `/requests/pending` | Optional `?scheme=online\|offline` |
//! | `GET`  | `/requests/{id}` | 404 if not found |
//! | `GET`  | `/requests/{id}/attachment` | Raw bytes; 404 if none |
//! | `GET`  | `/requests/{id}/decisions` | Audit trail |
//! | `POST` | `/requests/{id}/grant` | Body: `{"admin_id":"..."}` |
//! | `POST` | `/requests/{id}/reject` | Body: `{"admin_id":"...","reason":"..."}` |

use std::sync::Arc;

use axum::{
  extract::State,
  http::{StatusCode, header},
  response::IntoResponse,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use idcheck_core::{
  attachment::{AttachmentStore, AttachmentUpload},
  document::Scheme,
  lifecycle::Decision,
  request::VerificationRequestView,
  store::AuthorizationStore,
  subject::SubjectDirectory,
  validate::{RawIdentity, RawSubmission},
  workflow::Workflow,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Json, Path, Query},
};

// ─── Submit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AttachmentBody {
  pub media_type: String,
  /// Standard base64.
  pub data:       String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
  pub subject_id: Uuid,
  pub scheme:     Option<String>,
  #[serde(default)]
  pub identity:   RawIdentity,
  pub attachment: Option<AttachmentBody>,
}

/// `POST /requests`
pub async fn submit<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  let attachment = body
    .attachment
    .map(|a| {
      STANDARD
        .decode(a.data.as_bytes())
        .map(|bytes| AttachmentUpload { media_type: a.media_type, bytes })
        .map_err(|e| ApiError::BadRequest(format!("attachment is not valid base64: {e}")))
    })
    .transpose()?;

  let view = workflow
    .submit(RawSubmission {
      subject_id: body.subject_id,
      scheme: body.scheme,
      identity: body.identity,
      attachment,
    })
    .await?;
  Ok((StatusCode::CREATED, Json(view)))
}

// ─── Queue ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PendingParams {
  pub scheme: Option<Scheme>,
}

/// `GET /requests/pending[?scheme=<scheme>]`
pub async fn pending<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Query(params): Query<PendingParams>,
) -> Result<Json<Vec<VerificationRequestView>>, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  Ok(Json(workflow.list_pending(params.scheme).await?))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /requests/{id}`
pub async fn get_one<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<VerificationRequestView>, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  Ok(Json(workflow.request(id).await?))
}

/// `GET /requests/{id}/attachment`
pub async fn attachment<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  let stored = workflow
    .attachment(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("request {id} has no attachment")))?;
  Ok(([(header::CONTENT_TYPE, stored.media_type)], stored.bytes))
}

/// `GET /requests/{id}/decisions`
pub async fn decisions<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Decision>>, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  Ok(Json(workflow.decisions(id).await?))
}

// ─── Decisions ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GrantBody {
  pub admin_id: Uuid,
}

/// `POST /requests/{id}/grant`
pub async fn grant<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<GrantBody>,
) -> Result<Json<VerificationRequestView>, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  Ok(Json(workflow.grant(id, body.admin_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  pub admin_id: Uuid,
  pub reason:   Option<String>,
}

/// `POST /requests/{id}/reject`
pub async fn reject<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Path(id): Path<Uuid>,
  Json(body): Json<RejectBody>,
) -> Result<Json<VerificationRequestView>, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  Ok(Json(workflow.reject(id, body.admin_id, body.reason).await?))
}
