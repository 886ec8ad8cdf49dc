//! JSON REST API for the identity-verification workflow.
//!
//! Exposes an axum [`Router`] backed by a [`Workflow`] over any
//! [`AuthorizationStore`] and [`AttachmentStore`]. Authentication of
//! participants and administrators, TLS, and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", idcheck_api::api_router(workflow.clone()))
//! ```

pub mod confirmations;
pub mod error;
pub mod extract;
pub mod methods;
pub mod requests;
pub mod subjects;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use idcheck_core::{
  attachment::AttachmentStore, store::AuthorizationStore, subject::SubjectDirectory,
  workflow::Workflow,
};

pub use error::ApiError;

/// Build the API router for `workflow`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, A>(workflow: Arc<Workflow<S, A>>) -> Router<()>
where
  S: AuthorizationStore + SubjectDirectory + 'static,
  A: AttachmentStore + 'static,
{
  Router::new()
    // Subjects
    .route("/subjects", post(subjects::register::<S, A>))
    .route("/subjects/{id}/authorization", get(subjects::authorization::<S, A>))
    .route("/subjects/{id}/unique-id", get(subjects::unique_id::<S, A>))
    .route("/subjects/{id}/prefill", get(subjects::prefill::<S, A>))
    // Requests
    .route("/requests", post(requests::submit::<S, A>))
    .route("/requests/pending", get(requests::pending::<S, A>))
    .route("/requests/{id}", get(requests::get_one::<S, A>))
    .route("/requests/{id}/attachment", get(requests::attachment::<S, A>))
    .route("/requests/{id}/decisions", get(requests::decisions::<S, A>))
    .route("/requests/{id}/grant", post(requests::grant::<S, A>))
    .route("/requests/{id}/reject", post(requests::reject::<S, A>))
    // Offline verification
    .route("/offline-confirmations", post(confirmations::create::<S, A>))
    // Organization
    .route("/methods", get(methods::list::<S, A>))
    .with_state(workflow)
}
