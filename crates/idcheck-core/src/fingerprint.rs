//! The identity normalizer.
//!
//! Turns declared personal data into a canonical fingerprint string; two
//! declarations that differ only by case or by whitespace run-length yield the
//! same fingerprint. Once a request is granted its fingerprint is persisted as
//! `unique_id` and participates in a uniqueness constraint, so every
//! [`FieldOrder`] is a compatibility contract with stored data: add a new
//! version instead of editing an existing one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  document::IdentityDocument,
  identity::{BaseIdentity, Gender, PersonalData},
};

/// Separator between fingerprint segments.
pub const GLUE: &str = "_";

/// Output format of the birth date segment.
const BIRTH_DATE_FORMAT: &str = "%d-%m-%Y";

// ─── Fingerprint ─────────────────────────────────────────────────────────────

/// Canonical identity string, e.g. `EL-FOO_BAR_12-06-2003_DUMMY-23`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
  /// Wrap a value previously produced by [`fingerprint`] and read back from
  /// storage.
  pub fn from_persisted(value: String) -> Self { Self(value) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Field order ─────────────────────────────────────────────────────────────

/// A fingerprint segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
  LastName,
  FirstName,
  Gender,
  BirthDate,
  BirthPlace,
}

/// Versioned segment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOrder {
  /// `last_name _ first_name _ birth_date _ birth_place`
  V1,
  /// `last_name _ first_name _ gender _ birth_date _ birth_place`
  V2,
}

impl FieldOrder {
  pub const fn segments(self) -> &'static [Segment] {
    match self {
      Self::V1 => &[
        Segment::LastName,
        Segment::FirstName,
        Segment::BirthDate,
        Segment::BirthPlace,
      ],
      Self::V2 => &[
        Segment::LastName,
        Segment::FirstName,
        Segment::Gender,
        Segment::BirthDate,
        Segment::BirthPlace,
      ],
    }
  }
}

// ─── Normalizer ──────────────────────────────────────────────────────────────

/// The fields that feed a fingerprint, borrowed from either a stored request
/// or an administrator's re-entry.
#[derive(Debug, Clone, Copy)]
pub struct IdentityFields<'a> {
  pub base:   &'a BaseIdentity,
  pub gender: Option<Gender>,
  pub order:  FieldOrder,
}

/// Fingerprint of declared personal data, using the field order of the schema
/// the data was collected under.
pub fn fingerprint(data: &PersonalData) -> Fingerprint { normalize(data.identity_fields()) }

/// The single normalization routine. A segment whose value is absent (gender
/// under a schema that does not collect it) is skipped, never emitted empty.
pub fn normalize(fields: IdentityFields<'_>) -> Fingerprint {
  let base = fields.base;
  let segments: Vec<String> = fields
    .order
    .segments()
    .iter()
    .filter_map(|segment| match segment {
      Segment::LastName => Some(hyphenate(&base.last_name)),
      Segment::FirstName => Some(collapse(&base.first_name)),
      Segment::Gender => fields.gender.map(|g| g.code().to_uppercase()),
      Segment::BirthDate => Some(base.birth_date.format(BIRTH_DATE_FORMAT).to_string()),
      Segment::BirthPlace => Some(hyphenate(&base.birth_place)),
    })
    .collect();

  Fingerprint(segments.join(GLUE))
}

/// Key compared by the offline cross-check: the fingerprint followed by the
/// document type and number. Both sides of the comparison go through this
/// function.
pub fn verification_key(fields: IdentityFields<'_>, document: &IdentityDocument) -> String {
  let fp = normalize(fields);
  format!(
    "{fp}{GLUE}{}{GLUE}{}",
    document.document_type.code().to_uppercase(),
    document.document_number.trim().to_uppercase()
  )
}

/// Upper-case, with every whitespace run replaced by a single hyphen.
fn hyphenate(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join("-").to_uppercase()
}

/// Upper-case, with every whitespace run collapsed to a single space.
fn collapse(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::{
    document::DocumentType,
    identity::{Affirmations, ExtendedIdentity, ResidenceDocumentType},
  };

  fn base(last: &str, first: &str, place: &str) -> BaseIdentity {
    BaseIdentity {
      last_name:   last.into(),
      first_name:  first.into(),
      birth_date:  NaiveDate::from_ymd_opt(2003, 6, 12).unwrap(),
      birth_place: place.into(),
    }
  }

  fn extended(gender: Gender) -> PersonalData {
    PersonalData::Extended(ExtendedIdentity {
      base: base("El Foo", "Bar", "Dummy 23"),
      gender,
      residence_document_type: ResidenceDocumentType::EnergyBill,
      affirmations: Affirmations {
        city_resident:   true,
        criminal_record: true,
        user_agreement:  true,
        not_a_member:    true,
      },
    })
  }

  #[test]
  fn base_schema_fingerprint() {
    let data = PersonalData::Base(base("El Foo", "Bar", "Dummy 23"));
    assert_eq!(fingerprint(&data).as_str(), "EL-FOO_BAR_12-06-2003_DUMMY-23");
  }

  #[test]
  fn extended_schema_inserts_gender_after_first_name() {
    assert_eq!(
      fingerprint(&extended(Gender::Female)).as_str(),
      "EL-FOO_BAR_FEMALE_12-06-2003_DUMMY-23"
    );
  }

  #[test]
  fn case_and_whitespace_runs_do_not_matter() {
    let a = PersonalData::Base(base("El Foo", "Bar", "Dummy 23"));
    let b = PersonalData::Base(base("  el    FOO ", "bAR", "dummy\t 23"));
    assert_eq!(fingerprint(&a), fingerprint(&b));
  }

  #[test]
  fn changing_gender_changes_only_its_segment() {
    let female = fingerprint(&extended(Gender::Female)).into_string();
    let male = fingerprint(&extended(Gender::Male)).into_string();

    let f: Vec<&str> = female.split(GLUE).collect();
    let m: Vec<&str> = male.split(GLUE).collect();
    assert_eq!(f.len(), m.len());

    let differing: Vec<usize> = (0..f.len()).filter(|&i| f[i] != m[i]).collect();
    assert_eq!(differing, vec![2]);
    assert_eq!(m[2], "MALE");
  }

  #[test]
  fn v1_order_ignores_gender_even_if_supplied() {
    let b = base("El Foo", "Bar", "Dummy 23");
    let fields = IdentityFields { base: &b, gender: Some(Gender::Male), order: FieldOrder::V1 };
    assert_eq!(normalize(fields).as_str(), "EL-FOO_BAR_12-06-2003_DUMMY-23");
  }

  #[test]
  fn verification_key_includes_document() {
    let data = PersonalData::Base(base("El Foo", "Bar", "Dummy 23"));
    let dni = IdentityDocument {
      document_type:   DocumentType::NationalId,
      document_number: "xxxxxxxxy".into(),
    };
    let nie = IdentityDocument { document_type: DocumentType::ForeignResidentId, ..dni.clone() };

    let key = verification_key(data.identity_fields(), &dni);
    assert_eq!(key, "EL-FOO_BAR_12-06-2003_DUMMY-23_DNI_XXXXXXXXY");
    assert_ne!(key, verification_key(data.identity_fields(), &nie));
  }
}
