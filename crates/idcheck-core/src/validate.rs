//! Submission validation.
//!
//! Every rule runs independently and all failures are collected, so a caller
//! can show every problem at once. Each field contributes at most one
//! [`FieldError`].

use std::{collections::BTreeSet, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  attachment::{AttachmentRef, AttachmentUpload},
  document::{DocumentType, IdentityDocument, Scheme, is_valid_document_number},
  fingerprint::{Fingerprint, IdentityFields, fingerprint},
  identity::{
    Affirmations, BaseIdentity, ExtendedIdentity, FieldSchema, Gender, PersonalData,
    ResidenceDocumentType,
  },
  org::OrganizationConfig,
  request::NewRequest,
};

/// Input format of `birth_date`.
pub const BIRTH_DATE_INPUT_FORMAT: &str = "%d/%m/%Y";

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
  LastName,
  FirstName,
  BirthDate,
  BirthPlace,
  Gender,
  ResidenceDocumentType,
  CityResident,
  CriminalRecord,
  UserAgreement,
  NotAMember,
  DocumentType,
  DocumentNumber,
  Scheme,
  Attachment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
  Missing,
  InvalidFormat,
  InvalidEnum,
  NotAccepted,
  TooLarge,
  UnsupportedType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldError {
  pub field: Field,
  pub kind:  FieldErrorKind,
}

#[derive(Default)]
struct Errors(Vec<FieldError>);

impl Errors {
  fn push(&mut self, field: Field, kind: FieldErrorKind) { self.0.push(FieldError { field, kind }); }
}

// ─── Raw input ───────────────────────────────────────────────────────────────

/// Personal and document fields exactly as typed into a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawIdentity {
  pub last_name:               Option<String>,
  pub first_name:              Option<String>,
  /// `DD/MM/YYYY`.
  pub birth_date:              Option<String>,
  pub birth_place:             Option<String>,
  pub gender:                  Option<String>,
  pub residence_document_type: Option<String>,
  pub city_resident:           Option<bool>,
  pub criminal_record:         Option<bool>,
  pub user_agreement:          Option<bool>,
  pub not_a_member:            Option<bool>,
  pub document_type:           Option<String>,
  pub document_number:         Option<String>,
}

/// A participant's submission.
#[derive(Debug, Clone, Default)]
pub struct RawSubmission {
  pub subject_id: Uuid,
  pub scheme:     Option<String>,
  pub identity:   RawIdentity,
  pub attachment: Option<AttachmentUpload>,
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// The organization settings validation depends on, captured once per call.
#[derive(Debug, Clone)]
pub struct SubmissionPolicy {
  pub schema:                   FieldSchema,
  pub enabled_schemes:          BTreeSet<Scheme>,
  pub document_types:           Vec<DocumentType>,
  pub allowed_attachment_types: Vec<String>,
  pub attachment_size_limit:    u64,
}

impl SubmissionPolicy {
  pub fn from_config(config: &dyn OrganizationConfig) -> Self {
    Self {
      schema:                   config.field_schema(),
      enabled_schemes:          config.enabled_schemes(),
      document_types:           config.document_types(),
      allowed_attachment_types: config.allowed_attachment_types(),
      attachment_size_limit:    config.attachment_size_limit(),
    }
  }
}

// ─── Outputs ─────────────────────────────────────────────────────────────────

/// A submission that passed validation, ready to be persisted as pending.
#[derive(Debug, Clone)]
pub struct ValidSubmission {
  pub subject_id:    Uuid,
  pub scheme:        Scheme,
  pub personal_data: PersonalData,
  pub document:      IdentityDocument,
  /// Only ever present for [`Scheme::Online`].
  pub attachment:    Option<AttachmentUpload>,
  pub fingerprint:   Fingerprint,
}

impl ValidSubmission {
  /// Split into the store input and the attachment still to be stored.
  pub fn into_parts(self) -> (PendingSubmission, Option<AttachmentUpload>) {
    let pending = PendingSubmission {
      subject_id:    self.subject_id,
      scheme:        self.scheme,
      personal_data: self.personal_data,
      document:      self.document,
    };
    (pending, self.attachment)
  }
}

/// A validated submission minus its attachment bytes.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
  pub subject_id:    Uuid,
  pub scheme:        Scheme,
  pub personal_data: PersonalData,
  pub document:      IdentityDocument,
}

impl PendingSubmission {
  pub fn into_new_request(self, attachment_ref: Option<AttachmentRef>) -> NewRequest {
    NewRequest {
      subject_id: self.subject_id,
      scheme: self.scheme,
      personal_data: self.personal_data,
      document: self.document,
      attachment_ref,
    }
  }
}

/// An administrator's re-entry of document data during offline verification.
/// Participant declarations (residence document, affirmations) are not
/// re-entered.
#[derive(Debug, Clone)]
pub struct OfflineEntry {
  pub base:     BaseIdentity,
  pub gender:   Option<Gender>,
  pub schema:   FieldSchema,
  pub document: IdentityDocument,
}

impl OfflineEntry {
  pub fn identity_fields(&self) -> IdentityFields<'_> {
    IdentityFields {
      base:   &self.base,
      gender: self.gender,
      order:  self.schema.field_order(),
    }
  }
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Validate a participant submission against the organization's policy.
pub fn validate(
  input: &RawSubmission,
  policy: &SubmissionPolicy,
) -> Result<ValidSubmission, Vec<FieldError>> {
  let mut errors = Errors::default();

  let base = check_base(&input.identity, &mut errors);
  let gender = check_gender(&input.identity, policy.schema, &mut errors);
  let declarations = match policy.schema {
    FieldSchema::Base => None,
    FieldSchema::Extended => Some((
      check_enum::<ResidenceDocumentType>(
        input.identity.residence_document_type.as_deref(),
        Field::ResidenceDocumentType,
        &mut errors,
      ),
      check_affirmations(&input.identity, &mut errors),
    )),
  };
  let document = check_document(&input.identity, &policy.document_types, &mut errors);
  let scheme = check_scheme(input.scheme.as_deref(), &policy.enabled_schemes, &mut errors);
  let attachment = match scheme {
    Some(Scheme::Online) => check_attachment(input.attachment.as_ref(), policy, &mut errors),
    _ => None,
  };

  if !errors.0.is_empty() {
    return Err(errors.0);
  }

  // Every check above succeeded, so each value below is present.
  let missing = Vec::<FieldError>::new;
  let base = base.ok_or_else(missing)?;
  let personal_data = match declarations {
    None => PersonalData::Base(base),
    Some((residence, affirmations)) => PersonalData::Extended(ExtendedIdentity {
      base,
      gender: gender.ok_or_else(missing)?,
      residence_document_type: residence.ok_or_else(missing)?,
      affirmations: affirmations.ok_or_else(missing)?,
    }),
  };
  let fingerprint = fingerprint(&personal_data);

  Ok(ValidSubmission {
    subject_id: input.subject_id,
    scheme: scheme.ok_or_else(missing)?,
    personal_data,
    document: document.ok_or_else(missing)?,
    attachment,
    fingerprint,
  })
}

/// Validate an administrator's offline re-entry. Only the fields that feed the
/// verification key are checked.
pub fn validate_offline_entry(
  input: &RawIdentity,
  schema: FieldSchema,
  document_types: &[DocumentType],
) -> Result<OfflineEntry, Vec<FieldError>> {
  let mut errors = Errors::default();

  let base = check_base(input, &mut errors);
  let gender = check_gender(input, schema, &mut errors);
  let document = check_document(input, document_types, &mut errors);

  match (base, document) {
    (Some(base), Some(document)) if errors.0.is_empty() => {
      Ok(OfflineEntry { base, gender, schema, document })
    }
    _ => Err(errors.0),
  }
}

// ─── Field rules ─────────────────────────────────────────────────────────────

fn present(value: Option<&str>) -> Option<&str> {
  value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_required(value: Option<&str>, field: Field, errors: &mut Errors) -> Option<String> {
  match present(value) {
    Some(v) => Some(v.to_uppercase()),
    None => {
      errors.push(field, FieldErrorKind::Missing);
      None
    }
  }
}

fn check_enum<T: FromStr>(value: Option<&str>, field: Field, errors: &mut Errors) -> Option<T> {
  let Some(v) = present(value) else {
    errors.push(field, FieldErrorKind::Missing);
    return None;
  };
  let parsed = v.parse().ok();
  if parsed.is_none() {
    errors.push(field, FieldErrorKind::InvalidEnum);
  }
  parsed
}

fn check_base(raw: &RawIdentity, errors: &mut Errors) -> Option<BaseIdentity> {
  let last_name = check_required(raw.last_name.as_deref(), Field::LastName, errors);
  let first_name = check_required(raw.first_name.as_deref(), Field::FirstName, errors);
  let birth_date = check_birth_date(raw.birth_date.as_deref(), errors);
  let birth_place = check_required(raw.birth_place.as_deref(), Field::BirthPlace, errors);

  Some(BaseIdentity {
    last_name:   last_name?,
    first_name:  first_name?,
    birth_date:  birth_date?,
    birth_place: birth_place?,
  })
}

fn check_birth_date(value: Option<&str>, errors: &mut Errors) -> Option<NaiveDate> {
  let Some(v) = present(value) else {
    errors.push(Field::BirthDate, FieldErrorKind::Missing);
    return None;
  };
  let parsed = NaiveDate::parse_from_str(v, BIRTH_DATE_INPUT_FORMAT).ok();
  if parsed.is_none() {
    errors.push(Field::BirthDate, FieldErrorKind::InvalidFormat);
  }
  parsed
}

fn check_gender(raw: &RawIdentity, schema: FieldSchema, errors: &mut Errors) -> Option<Gender> {
  match schema {
    FieldSchema::Base => None,
    FieldSchema::Extended => check_enum(raw.gender.as_deref(), Field::Gender, errors),
  }
}

fn check_affirmations(raw: &RawIdentity, errors: &mut Errors) -> Option<Affirmations> {
  let mut accepted = |value: Option<bool>, field: Field| {
    let ok = value == Some(true);
    if !ok {
      errors.push(field, FieldErrorKind::NotAccepted);
    }
    ok
  };
  let city_resident = accepted(raw.city_resident, Field::CityResident);
  let criminal_record = accepted(raw.criminal_record, Field::CriminalRecord);
  let user_agreement = accepted(raw.user_agreement, Field::UserAgreement);
  let not_a_member = accepted(raw.not_a_member, Field::NotAMember);

  (city_resident && criminal_record && user_agreement && not_a_member).then_some(Affirmations {
    city_resident,
    criminal_record,
    user_agreement,
    not_a_member,
  })
}

fn check_document(
  raw: &RawIdentity,
  allowed: &[DocumentType],
  errors: &mut Errors,
) -> Option<IdentityDocument> {
  let document_type = check_enum::<DocumentType>(raw.document_type.as_deref(), Field::DocumentType, errors)
    .and_then(|t| {
      if allowed.contains(&t) {
        Some(t)
      } else {
        errors.push(Field::DocumentType, FieldErrorKind::InvalidEnum);
        None
      }
    });

  let document_number = match present(raw.document_number.as_deref()) {
    None => {
      errors.push(Field::DocumentNumber, FieldErrorKind::Missing);
      None
    }
    Some(n) if !is_valid_document_number(n) => {
      errors.push(Field::DocumentNumber, FieldErrorKind::InvalidFormat);
      None
    }
    Some(n) => Some(n.to_ascii_uppercase()),
  };

  Some(IdentityDocument {
    document_type:   document_type?,
    document_number: document_number?,
  })
}

fn check_scheme(
  value: Option<&str>,
  enabled: &BTreeSet<Scheme>,
  errors: &mut Errors,
) -> Option<Scheme> {
  check_enum::<Scheme>(value, Field::Scheme, errors).and_then(|s| {
    if enabled.contains(&s) {
      Some(s)
    } else {
      errors.push(Field::Scheme, FieldErrorKind::InvalidEnum);
      None
    }
  })
}

fn check_attachment(
  upload: Option<&AttachmentUpload>,
  policy: &SubmissionPolicy,
  errors: &mut Errors,
) -> Option<AttachmentUpload> {
  let Some(upload) = upload.filter(|u| !u.bytes.is_empty()) else {
    errors.push(Field::Attachment, FieldErrorKind::Missing);
    return None;
  };
  let media_type = upload.media_type.trim();
  if !policy
    .allowed_attachment_types
    .iter()
    .any(|allowed| allowed.eq_ignore_ascii_case(media_type))
  {
    errors.push(Field::Attachment, FieldErrorKind::UnsupportedType);
    return None;
  }
  if upload.size() > policy.attachment_size_limit {
    errors.push(Field::Attachment, FieldErrorKind::TooLarge);
    return None;
  }
  Some(upload.clone())
}
