//! Handlers for `/subjects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/subjects` | Body: `{"contact":"..."}`; idempotent |
//! | `GET`  | `/subjects/{id}/authorization` | Lifecycle status |
//! | `GET`  | `/subjects/{id}/unique-id` | 404 unless granted |
//! | `GET`  | `/subjects/{id}/prefill` | 404 if never submitted |

use std::sync::Arc;

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use idcheck_core::{
  attachment::AttachmentStore,
  request::AuthorizationStatus,
  store::AuthorizationStore,
  subject::SubjectDirectory,
  workflow::{Prefill, Workflow},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  error::ApiError,
  extract::{Json, Path},
};

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub contact: String,
}

/// `POST /subjects`
pub async fn register<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  if body.contact.trim().is_empty() {
    return Err(ApiError::BadRequest("contact must not be empty".into()));
  }
  let subject = workflow.register_subject(body.contact).await?;
  Ok((StatusCode::CREATED, Json(subject)))
}

// ─── Per-subject views ───────────────────────────────────────────────────────

/// `GET /subjects/{id}/authorization`
pub async fn authorization<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<AuthorizationStatus>, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  Ok(Json(workflow.status(id).await?))
}

#[derive(Debug, Serialize)]
pub struct UniqueIdBody {
  pub subject_id: Uuid,
  pub unique_id:  String,
}

/// `GET /subjects/{id}/unique-id`
pub async fn unique_id<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<UniqueIdBody>, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  let unique_id = workflow
    .unique_id_for(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} has no granted verification")))?;
  Ok(Json(UniqueIdBody { subject_id: id, unique_id: unique_id.into_string() }))
}

/// `GET /subjects/{id}/prefill`
pub async fn prefill<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Prefill>, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  workflow
    .prefill(id)
    .await?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} has not submitted a request")))
}
