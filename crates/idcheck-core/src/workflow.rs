//! The verification workflow: participant submissions and administrator
//! decisions.
//!
//! [`Workflow`] validates input, drives the store's atomic transitions and,
//! only once a grant or rejection has committed, hands a [`Notification`] to
//! the dispatcher. Dispatch failures are logged and swallowed; retrying
//! delivery is the dispatcher's concern.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  attachment::{AttachmentStore, StoredAttachment},
  document::Scheme,
  fingerprint::{Fingerprint, verification_key},
  lifecycle::{Action, Decision},
  notify::{Notification, NotificationDispatcher, NotificationEvent},
  org::OrganizationConfig,
  request::{AuthorizationStatus, RequestState, VerificationRequest, VerificationRequestView},
  store::AuthorizationStore,
  subject::{Subject, SubjectDirectory},
  validate::{
    BIRTH_DATE_INPUT_FORMAT, RawIdentity, RawSubmission, SubmissionPolicy, validate,
    validate_offline_entry,
  },
};

/// An administrator's in-person confirmation of a subject's document.
#[derive(Debug, Clone)]
pub struct OfflineConfirmation {
  pub admin_id: Uuid,
  /// Contact identifier used to look the subject up in the directory.
  pub contact:  String,
  /// Personal and document data as re-entered from the physical document.
  pub identity: RawIdentity,
}

/// A stored request mapped back into form input, for resubmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefill {
  pub request_id:       Uuid,
  pub state:            RequestState,
  pub scheme:           Scheme,
  pub identity:         RawIdentity,
  pub rejection_reason: Option<String>,
}

pub struct Workflow<S, A> {
  store:        S,
  attachments:  A,
  organization: Arc<dyn OrganizationConfig>,
  dispatcher:   Arc<dyn NotificationDispatcher>,
}

impl<S, A> Workflow<S, A>
where
  S: AuthorizationStore + SubjectDirectory,
  A: AttachmentStore,
{
  pub fn new(
    store: S,
    attachments: A,
    organization: Arc<dyn OrganizationConfig>,
    dispatcher: Arc<dyn NotificationDispatcher>,
  ) -> Self {
    Self { store, attachments, organization, dispatcher }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn organization(&self) -> &dyn OrganizationConfig { self.organization.as_ref() }

  // ── Participant ───────────────────────────────────────────────────────

  /// Validate and store a submission as pending.
  ///
  /// Allowed when the subject has no request yet or their request was
  /// rejected. On any error the subject's state is unchanged.
  pub async fn submit(&self, input: RawSubmission) -> Result<VerificationRequestView> {
    let policy = SubmissionPolicy::from_config(self.organization.as_ref());
    let valid = validate(&input, &policy).map_err(Error::Validation)?;

    // Checked up front so a doomed submission does not leave an orphaned
    // attachment behind; the store re-checks atomically.
    if let Some(existing) = self.store.find_by_subject(valid.subject_id).await.map_err(Error::store)?
      && !existing.state.permits(Action::Submit)
    {
      return Err(Error::InvalidTransition {
        request_id: existing.request_id,
        state:      existing.state,
        action:     Action::Submit,
      });
    }

    // If the store still refuses the submission (a concurrent submit won) the
    // stored attachment is left unreferenced. It is not removed: attachments
    // are content-addressed, so the same object may back another request.
    let (pending, upload) = valid.into_parts();
    let attachment_ref = match upload {
      Some(upload) => Some(self.attachments.store(upload).await.map_err(Error::attachment)?),
      None => None,
    };

    let request = self
      .store
      .submit(pending.into_new_request(attachment_ref))
      .await
      .map_err(Error::store)?
      .into_result(Action::Submit)?;

    info!(
      request_id = %request.request_id,
      subject_id = %request.subject_id,
      scheme = %request.scheme,
      "verification request submitted"
    );
    Ok(VerificationRequestView::from(&request))
  }

  /// The subject's request mapped back into form input.
  pub async fn prefill(&self, subject_id: Uuid) -> Result<Option<Prefill>> {
    let request = self.store.find_by_subject(subject_id).await.map_err(Error::store)?;
    Ok(request.map(|r| prefill_from(&r)))
  }

  pub async fn status(&self, subject_id: Uuid) -> Result<AuthorizationStatus> {
    let request = self.store.find_by_subject(subject_id).await.map_err(Error::store)?;
    Ok(AuthorizationStatus::from(request.as_ref()))
  }

  // ── Administrator ─────────────────────────────────────────────────────

  /// Grant a pending online request after the administrator has inspected
  /// its document image. Offline requests are only granted through
  /// [`Workflow::verify_offline`].
  pub async fn grant(&self, request_id: Uuid, admin_id: Uuid) -> Result<VerificationRequestView> {
    self.commit_grant(request_id, admin_id, Scheme::Online).await
  }

  /// Reject a pending request. The participant may amend and resubmit.
  pub async fn reject(
    &self,
    request_id: Uuid,
    admin_id: Uuid,
    reason: Option<String>,
  ) -> Result<VerificationRequestView> {
    let reason = reason.map(|r| r.trim().to_owned()).filter(|r| !r.is_empty());
    let request = self
      .store
      .reject(request_id, admin_id, reason)
      .await
      .map_err(Error::store)?
      .into_result(Action::Reject)?;

    info!(%request_id, %admin_id, subject_id = %request.subject_id, "verification rejected");
    self.dispatch(NotificationEvent::Rejected, &request);
    Ok(VerificationRequestView::from(&request))
  }

  /// Cross-check an administrator's re-entry of a physical document against
  /// the subject's pending offline request, then grant it.
  ///
  /// A failed lookup and a data mismatch are indistinguishable to the caller:
  /// both yield [`Error::VerificationMismatch`].
  pub async fn verify_offline(
    &self,
    confirmation: OfflineConfirmation,
  ) -> Result<VerificationRequestView> {
    let Some(subject) = self
      .store
      .find_subject_by_contact(confirmation.contact.trim())
      .await
      .map_err(Error::store)?
    else {
      debug!("offline confirmation refused: no subject for contact");
      return Err(Error::VerificationMismatch);
    };

    let request = self.store.find_by_subject(subject.subject_id).await.map_err(Error::store)?;
    let Some(request) = request
      .filter(|r| r.state == RequestState::Pending && r.scheme == Scheme::Offline)
    else {
      debug!(subject_id = %subject.subject_id, "offline confirmation refused: no pending offline request");
      return Err(Error::VerificationMismatch);
    };

    // The re-entry is read with the field set the request was submitted
    // under, which may predate the organization's current settings.
    let mut document_types = self.organization.document_types();
    if !document_types.contains(&request.document.document_type) {
      document_types.push(request.document.document_type);
    }
    let entry = validate_offline_entry(
      &confirmation.identity,
      request.personal_data.schema(),
      &document_types,
    )
    .map_err(Error::Validation)?;

    let stored = verification_key(request.personal_data.identity_fields(), &request.document);
    let entered = verification_key(entry.identity_fields(), &entry.document);
    if stored != entered {
      debug!(request_id = %request.request_id, "offline confirmation refused: data mismatch");
      return Err(Error::VerificationMismatch);
    }

    self.commit_grant(request.request_id, confirmation.admin_id, Scheme::Offline).await
  }

  /// Pending requests, oldest first.
  pub async fn list_pending(&self, scheme: Option<Scheme>) -> Result<Vec<VerificationRequestView>> {
    let requests = self.store.list_pending(scheme).await.map_err(Error::store)?;
    Ok(requests.iter().map(VerificationRequestView::from).collect())
  }

  pub async fn request(&self, request_id: Uuid) -> Result<VerificationRequestView> {
    let request = self.require_request(request_id).await?;
    Ok(VerificationRequestView::from(&request))
  }

  /// The uploaded document image of an online request, for side-by-side
  /// review. `None` if the request has no attachment.
  pub async fn attachment(&self, request_id: Uuid) -> Result<Option<StoredAttachment>> {
    let request = self.require_request(request_id).await?;
    let Some(reference) = request.attachment_ref else {
      return Ok(None);
    };
    self.attachments.resolve(reference).await.map_err(Error::attachment)
  }

  /// The granted `unique_id` of a subject, shown in the participant list.
  pub async fn unique_id_for(&self, subject_id: Uuid) -> Result<Option<Fingerprint>> {
    self.store.unique_id_for(subject_id).await.map_err(Error::store)
  }

  pub async fn decisions(&self, request_id: Uuid) -> Result<Vec<Decision>> {
    self.require_request(request_id).await?;
    self.store.decisions(request_id).await.map_err(Error::store)
  }

  pub async fn register_subject(&self, contact: String) -> Result<Subject> {
    self.store.register_subject(contact.trim().to_owned()).await.map_err(Error::store)
  }

  // ── Internals ─────────────────────────────────────────────────────────

  async fn commit_grant(
    &self,
    request_id: Uuid,
    admin_id: Uuid,
    scheme: Scheme,
  ) -> Result<VerificationRequestView> {
    let outcome = self.store.grant(request_id, admin_id, scheme).await.map_err(Error::store)?;
    let request = match outcome.into_result(Action::Grant) {
      Ok(request) => request,
      Err(e @ Error::DuplicateIdentity { .. }) => {
        warn!(%request_id, %admin_id, "grant refused: identity already granted to another subject");
        return Err(e);
      }
      Err(e) => return Err(e),
    };

    info!(%request_id, %admin_id, subject_id = %request.subject_id, %scheme, "verification granted");
    self.dispatch(NotificationEvent::Accepted, &request);
    Ok(VerificationRequestView::from(&request))
  }

  async fn require_request(&self, request_id: Uuid) -> Result<VerificationRequest> {
    self
      .store
      .get_request(request_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RequestNotFound(request_id))
  }

  fn dispatch(&self, event: NotificationEvent, request: &VerificationRequest) {
    let notification = Notification {
      event,
      subject_id: request.subject_id,
      request_id: request.request_id,
      reason: request.rejection_reason.clone(),
    };
    if let Err(e) = self.dispatcher.notify(notification) {
      warn!(
        request_id = %request.request_id,
        event = event.name(),
        error = %e,
        "notification dispatch failed"
      );
    }
  }
}

fn prefill_from(r: &VerificationRequest) -> Prefill {
  let base = r.personal_data.base();
  let affirmations = r.personal_data.affirmations();
  Prefill {
    request_id:       r.request_id,
    state:            r.state,
    scheme:           r.scheme,
    identity:         RawIdentity {
      last_name:               Some(base.last_name.clone()),
      first_name:              Some(base.first_name.clone()),
      birth_date:              Some(base.birth_date.format(BIRTH_DATE_INPUT_FORMAT).to_string()),
      birth_place:             Some(base.birth_place.clone()),
      gender:                  r.personal_data.gender().map(|g| g.code().to_owned()),
      residence_document_type: r
        .personal_data
        .residence_document_type()
        .map(|t| t.code().to_owned()),
      city_resident:           affirmations.map(|a| a.city_resident),
      criminal_record:         affirmations.map(|a| a.criminal_record),
      user_agreement:          affirmations.map(|a| a.user_agreement),
      not_a_member:            affirmations.map(|a| a.not_a_member),
      document_type:           Some(r.document.document_type.code().to_owned()),
      document_number:         Some(r.document.document_number.clone()),
    },
    rejection_reason: r.rejection_reason.clone(),
  }
}
