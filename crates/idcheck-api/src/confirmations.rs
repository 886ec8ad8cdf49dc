//! `POST /offline-confirmations`: an administrator's re-entry of a document
//! presented in person.
//!
//! On a match the subject's pending offline request is granted. Any mismatch,
//! including an unknown contact, yields 422 with the same message.

use std::sync::Arc;

use axum::extract::State;
use idcheck_core::{
  attachment::AttachmentStore,
  request::VerificationRequestView,
  store::AuthorizationStore,
  subject::SubjectDirectory,
  validate::RawIdentity,
  workflow::{OfflineConfirmation, Workflow},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, extract::Json};

#[derive(Debug, Deserialize)]
pub struct ConfirmationBody {
  pub admin_id: Uuid,
  pub contact:  String,
  #[serde(default)]
  pub identity: RawIdentity,
}

pub async fn create<S, A>(
  State(workflow): State<Arc<Workflow<S, A>>>,
  Json(body): Json<ConfirmationBody>,
) -> Result<Json<VerificationRequestView>, ApiError>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  let view = workflow
    .verify_offline(OfflineConfirmation {
      admin_id: body.admin_id,
      contact:  body.contact,
      identity: body.identity,
    })
    .await?;
  Ok(Json(view))
}
