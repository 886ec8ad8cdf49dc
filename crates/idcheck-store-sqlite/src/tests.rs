//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use idcheck_core::{
  attachment::AttachmentRef,
  document::{DocumentType, IdentityDocument, Scheme},
  identity::{BaseIdentity, PersonalData},
  lifecycle::{DecisionKind, TransitionOutcome},
  request::{NewRequest, RequestState, VerificationRequest},
  store::AuthorizationStore,
  subject::SubjectDirectory,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn personal_data(last_name: &str) -> PersonalData {
  PersonalData::Base(BaseIdentity {
    last_name:   last_name.to_owned(),
    first_name:  "BAR".to_owned(),
    birth_date:  NaiveDate::from_ymd_opt(2003, 6, 12).unwrap(),
    birth_place: "DUMMY 23".to_owned(),
  })
}

fn new_request(subject_id: Uuid, scheme: Scheme) -> NewRequest {
  NewRequest {
    subject_id,
    scheme,
    personal_data: personal_data("EL FOO"),
    document: IdentityDocument {
      document_type:   DocumentType::NationalId,
      document_number: "XXXXXXXXY".to_owned(),
    },
    attachment_ref: (scheme == Scheme::Online).then(|| AttachmentRef::new("mem-0")),
  }
}

fn applied(outcome: TransitionOutcome) -> VerificationRequest {
  match outcome {
    TransitionOutcome::Applied(request) => request,
    other => panic!("expected applied transition, got {other:?}"),
  }
}

async fn submitted(s: &SqliteStore, scheme: Scheme) -> VerificationRequest {
  applied(s.submit(new_request(Uuid::new_v4(), scheme)).await.unwrap())
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_creates_pending_request() {
  let s = store().await;
  let subject = Uuid::new_v4();

  let request = applied(s.submit(new_request(subject, Scheme::Online)).await.unwrap());
  assert_eq!(request.subject_id, subject);
  assert_eq!(request.state, RequestState::Pending);
  assert_eq!(request.attachment_ref, Some(AttachmentRef::new("mem-0")));
  assert!(request.unique_id.is_none());

  let fetched = s.get_request(request.request_id).await.unwrap().unwrap();
  assert_eq!(fetched, request);
  assert_eq!(s.find_by_subject(subject).await.unwrap(), Some(request));
}

#[tokio::test]
async fn missing_request_returns_none() {
  let s = store().await;
  assert!(s.get_request(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.find_by_subject(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn submit_while_pending_is_refused() {
  let s = store().await;
  let subject = Uuid::new_v4();
  let first = applied(s.submit(new_request(subject, Scheme::Online)).await.unwrap());

  let mut changed = new_request(subject, Scheme::Offline);
  changed.personal_data = personal_data("OTHER");
  let outcome = s.submit(changed).await.unwrap();
  assert!(matches!(
    outcome,
    TransitionOutcome::InvalidState { request_id, state: RequestState::Pending }
      if request_id == first.request_id
  ));

  let unchanged = s.get_request(first.request_id).await.unwrap().unwrap();
  assert_eq!(unchanged, first);
}

#[tokio::test]
async fn resubmission_after_rejection_overwrites_record() {
  let s = store().await;
  let subject = Uuid::new_v4();
  let admin = Uuid::new_v4();
  let first = applied(s.submit(new_request(subject, Scheme::Online)).await.unwrap());

  let rejected = applied(
    s.reject(first.request_id, admin, Some("illegible photo".into()))
      .await
      .unwrap(),
  );
  assert_eq!(rejected.state, RequestState::Rejected);
  assert_eq!(rejected.rejection_reason.as_deref(), Some("illegible photo"));
  assert_eq!(rejected.decided_by, Some(admin));

  let mut corrected = new_request(subject, Scheme::Online);
  corrected.attachment_ref = Some(AttachmentRef::new("mem-1"));
  let second = applied(s.submit(corrected).await.unwrap());

  assert_eq!(second.request_id, first.request_id);
  assert_eq!(second.state, RequestState::Pending);
  assert_eq!(second.attachment_ref, Some(AttachmentRef::new("mem-1")));
  assert!(second.rejection_reason.is_none());
  assert!(second.decided_at.is_none());
  assert!(second.decided_by.is_none());
  assert!(second.submitted_at >= first.submitted_at);
}

// ─── Decisions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn grant_persists_unique_id() {
  let s = store().await;
  let admin = Uuid::new_v4();
  let request = submitted(&s, Scheme::Online).await;

  let granted = applied(s.grant(request.request_id, admin, Scheme::Online).await.unwrap());
  assert_eq!(granted.state, RequestState::Granted);
  assert_eq!(granted.decided_by, Some(admin));
  assert!(granted.decided_at.is_some());
  assert_eq!(
    granted.unique_id.as_ref().map(|f| f.as_str()),
    Some("EL-FOO_BAR_12-06-2003_DUMMY-23")
  );

  let unique_id = s.unique_id_for(request.subject_id).await.unwrap();
  assert_eq!(unique_id, granted.unique_id);
}

#[tokio::test]
async fn unique_id_absent_until_granted() {
  let s = store().await;
  let request = submitted(&s, Scheme::Online).await;
  assert!(s.unique_id_for(request.subject_id).await.unwrap().is_none());

  s.reject(request.request_id, Uuid::new_v4(), None).await.unwrap();
  assert!(s.unique_id_for(request.subject_id).await.unwrap().is_none());
}

#[tokio::test]
async fn second_grant_is_invalid() {
  let s = store().await;
  let request = submitted(&s, Scheme::Online).await;
  applied(s.grant(request.request_id, Uuid::new_v4(), Scheme::Online).await.unwrap());

  for outcome in [
    s.grant(request.request_id, Uuid::new_v4(), Scheme::Online).await.unwrap(),
    s.reject(request.request_id, Uuid::new_v4(), None).await.unwrap(),
    s.submit(new_request(request.subject_id, Scheme::Online)).await.unwrap(),
  ] {
    assert!(
      matches!(outcome, TransitionOutcome::InvalidState { state: RequestState::Granted, .. }),
      "{outcome:?}"
    );
  }
}

#[tokio::test]
async fn grant_requires_the_submitted_scheme() {
  let s = store().await;
  let request = submitted(&s, Scheme::Offline).await;

  let outcome = s.grant(request.request_id, Uuid::new_v4(), Scheme::Online).await.unwrap();
  assert!(matches!(
    outcome,
    TransitionOutcome::SchemeMismatch { request_id, scheme: Scheme::Offline }
      if request_id == request.request_id
  ));
  let unchanged = s.get_request(request.request_id).await.unwrap().unwrap();
  assert_eq!(unchanged.state, RequestState::Pending);
  assert!(s.decisions(request.request_id).await.unwrap().is_empty());

  let outcome = s.grant(request.request_id, Uuid::new_v4(), Scheme::Offline).await.unwrap();
  let granted = applied(outcome);
  assert_eq!(granted.state, RequestState::Granted);
}

#[tokio::test]
async fn decision_on_unknown_request_is_not_found() {
  let s = store().await;
  let id = Uuid::new_v4();
  let outcome = s.grant(id, Uuid::new_v4(), Scheme::Online).await.unwrap();
  assert!(matches!(outcome, TransitionOutcome::NotFound(x) if x == id));
}

#[tokio::test]
async fn duplicate_fingerprint_cannot_be_granted() {
  let s = store().await;
  let a = submitted(&s, Scheme::Online).await;
  let b = submitted(&s, Scheme::Offline).await;

  applied(s.grant(a.request_id, Uuid::new_v4(), Scheme::Online).await.unwrap());
  let outcome = s.grant(b.request_id, Uuid::new_v4(), Scheme::Offline).await.unwrap();
  assert!(matches!(
    outcome,
    TransitionOutcome::DuplicateIdentity { request_id } if request_id == b.request_id
  ));

  let b = s.get_request(b.request_id).await.unwrap().unwrap();
  assert_eq!(b.state, RequestState::Pending);
  assert!(b.unique_id.is_none());
  assert!(s.decisions(b.request_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_grants_of_one_identity_admit_exactly_one() {
  let s = store().await;
  let a = submitted(&s, Scheme::Online).await;
  let b = submitted(&s, Scheme::Online).await;

  let (first, second) = tokio::join!(
    s.grant(a.request_id, Uuid::new_v4(), Scheme::Online),
    s.grant(b.request_id, Uuid::new_v4(), Scheme::Online),
  );
  let outcomes = [first.unwrap(), second.unwrap()];

  let granted = outcomes
    .iter()
    .filter(|o| matches!(o, TransitionOutcome::Applied(_)))
    .count();
  let duplicates = outcomes
    .iter()
    .filter(|o| matches!(o, TransitionOutcome::DuplicateIdentity { .. }))
    .count();
  assert_eq!((granted, duplicates), (1, 1));
}

#[tokio::test]
async fn concurrent_grants_of_one_request_admit_exactly_one() {
  let s = store().await;
  let request = submitted(&s, Scheme::Online).await;

  let (first, second) = tokio::join!(
    s.grant(request.request_id, Uuid::new_v4(), Scheme::Online),
    s.grant(request.request_id, Uuid::new_v4(), Scheme::Online),
  );
  let outcomes = [first.unwrap(), second.unwrap()];

  assert_eq!(
    outcomes.iter().filter(|o| matches!(o, TransitionOutcome::Applied(_))).count(),
    1
  );
  assert!(outcomes.iter().any(|o| matches!(
    o,
    TransitionOutcome::InvalidState { state: RequestState::Granted, .. }
  )));
  assert_eq!(s.decisions(request.request_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn decisions_are_recorded_in_order() {
  let s = store().await;
  let admin = Uuid::new_v4();
  let request = submitted(&s, Scheme::Online).await;

  s.reject(request.request_id, admin, Some("blurry".into())).await.unwrap();
  s.submit(new_request(request.subject_id, Scheme::Online)).await.unwrap();
  s.grant(request.request_id, admin, Scheme::Online).await.unwrap();

  let decisions = s.decisions(request.request_id).await.unwrap();
  let kinds: Vec<_> = decisions.iter().map(|d| d.kind).collect();
  assert_eq!(kinds, vec![DecisionKind::Rejected, DecisionKind::Granted]);
  assert_eq!(decisions[0].reason.as_deref(), Some("blurry"));
  assert!(decisions.iter().all(|d| d.admin_id == admin));
}

// ─── Queue ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn pending_queue_is_oldest_first_and_filterable() {
  let s = store().await;
  let first = submitted(&s, Scheme::Online).await;
  let second = submitted(&s, Scheme::Offline).await;
  let third = submitted(&s, Scheme::Online).await;
  let decided = submitted(&s, Scheme::Online).await;
  s.reject(decided.request_id, Uuid::new_v4(), None).await.unwrap();

  let ids = |v: Vec<VerificationRequest>| v.into_iter().map(|r| r.request_id).collect::<Vec<_>>();

  assert_eq!(
    ids(s.list_pending(None).await.unwrap()),
    vec![first.request_id, second.request_id, third.request_id]
  );
  assert_eq!(
    ids(s.list_pending(Some(Scheme::Online)).await.unwrap()),
    vec![first.request_id, third.request_id]
  );
  assert_eq!(
    ids(s.list_pending(Some(Scheme::Offline)).await.unwrap()),
    vec![second.request_id]
  );
}

#[tokio::test]
async fn legacy_row_without_scheme_reads_as_online() {
  let s = store().await;
  let request = submitted(&s, Scheme::Online).await;
  let id = request.request_id.to_string();

  s.connection()
    .call(move |conn| {
      conn.execute("UPDATE requests SET scheme = NULL WHERE request_id = ?1", [id])?;
      Ok(())
    })
    .await
    .unwrap();

  let fetched = s.get_request(request.request_id).await.unwrap().unwrap();
  assert_eq!(fetched.scheme, Scheme::Online);

  let online = s.list_pending(Some(Scheme::Online)).await.unwrap();
  assert_eq!(online.len(), 1);
  assert!(s.list_pending(Some(Scheme::Offline)).await.unwrap().is_empty());
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_subject_is_idempotent_and_case_insensitive() {
  let s = store().await;

  let subject = s.register_subject("user@example.org".into()).await.unwrap();
  let again = s.register_subject("USER@example.org".into()).await.unwrap();
  assert_eq!(again.subject_id, subject.subject_id);
  assert_eq!(again.contact, "user@example.org");

  let found = s.find_subject_by_contact("User@Example.ORG").await.unwrap();
  assert_eq!(found, Some(subject));
}

#[tokio::test]
async fn unknown_contact_returns_none() {
  let s = store().await;
  s.register_subject("user@example.org".into()).await.unwrap();
  assert!(s.find_subject_by_contact("this@doesnt.exist").await.unwrap().is_none());
}
