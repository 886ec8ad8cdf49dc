//! `GET /methods`: what participants may choose from.

use std::sync::Arc;

use axum::{Json, extract::State};
use idcheck_core::{
  attachment::AttachmentStore,
  document::{DocumentType, Scheme},
  identity::FieldSchema,
  store::AuthorizationStore,
  subject::SubjectDirectory,
  workflow::Workflow,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MethodsBody {
  pub enabled_schemes: Vec<Scheme>,
  pub field_schema:    FieldSchema,
  pub document_types:  Vec<DocumentType>,
  /// Shown to participants choosing the offline method.
  pub explanation:     Option<String>,
}

pub async fn list<S, A>(State(workflow): State<Arc<Workflow<S, A>>>) -> Json<MethodsBody>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  let org = workflow.organization();
  Json(MethodsBody {
    enabled_schemes: org.enabled_schemes().into_iter().collect(),
    field_schema:    org.field_schema(),
    document_types:  org.document_types(),
    explanation:     org.explanation_text(),
  })
}
