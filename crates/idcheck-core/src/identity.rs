//! Declared personal data, shaped by the organization's field schema.
//!
//! The set of fields a participant declares is a small closed set of named
//! variants ([`FieldSchema`]) rather than an open key/value map. Each variant
//! owns a versioned fingerprint field order; see [`crate::fingerprint`].

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error,
  fingerprint::{FieldOrder, IdentityFields},
};

// ─── Schema ──────────────────────────────────────────────────────────────────

/// Which personal-data fields the organization collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSchema {
  /// Names, birth date and birth place.
  #[default]
  Base,
  /// [`FieldSchema::Base`] plus gender, a residence document and the four
  /// participation affirmations.
  Extended,
}

impl FieldSchema {
  /// The fingerprint field order bound to this schema.
  pub fn field_order(self) -> FieldOrder {
    match self {
      Self::Base => FieldOrder::V1,
      Self::Extended => FieldOrder::V2,
    }
  }
}

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
}

impl Gender {
  pub fn code(self) -> &'static str {
    match self {
      Self::Male => "male",
      Self::Female => "female",
    }
  }
}

impl FromStr for Gender {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "male" => Ok(Self::Male),
      "female" => Ok(Self::Female),
      _ => Err(Error::unknown("gender", s)),
    }
  }
}

impl fmt::Display for Gender {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

/// Document proving residence in the organization's territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidenceDocumentType {
  EnergyBill,
  WaterBill,
  RentalContract,
  CensusCertificate,
}

impl ResidenceDocumentType {
  pub fn code(self) -> &'static str {
    match self {
      Self::EnergyBill => "energy_bill",
      Self::WaterBill => "water_bill",
      Self::RentalContract => "rental_contract",
      Self::CensusCertificate => "census_certificate",
    }
  }
}

impl FromStr for ResidenceDocumentType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
      "energy_bill" => Ok(Self::EnergyBill),
      "water_bill" => Ok(Self::WaterBill),
      "rental_contract" => Ok(Self::RentalContract),
      "census_certificate" => Ok(Self::CensusCertificate),
      _ => Err(Error::unknown("residence document type", s)),
    }
  }
}

// ─── Personal data ───────────────────────────────────────────────────────────

/// Fields collected under every schema. Text is stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseIdentity {
  pub last_name:   String,
  pub first_name:  String,
  pub birth_date:  NaiveDate,
  pub birth_place: String,
}

/// Participation affirmations. Validation only admits `true` for each, so a
/// stored value records what the participant accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affirmations {
  pub city_resident:   bool,
  pub criminal_record: bool,
  pub user_agreement:  bool,
  pub not_a_member:    bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedIdentity {
  pub base:                    BaseIdentity,
  pub gender:                  Gender,
  pub residence_document_type: ResidenceDocumentType,
  pub affirmations:            Affirmations,
}

/// Personal data tagged by the schema it was collected under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum PersonalData {
  Base(BaseIdentity),
  Extended(ExtendedIdentity),
}

impl PersonalData {
  pub fn schema(&self) -> FieldSchema {
    match self {
      Self::Base(_) => FieldSchema::Base,
      Self::Extended(_) => FieldSchema::Extended,
    }
  }

  pub fn base(&self) -> &BaseIdentity {
    match self {
      Self::Base(b) => b,
      Self::Extended(e) => &e.base,
    }
  }

  pub fn gender(&self) -> Option<Gender> {
    match self {
      Self::Base(_) => None,
      Self::Extended(e) => Some(e.gender),
    }
  }

  pub fn residence_document_type(&self) -> Option<ResidenceDocumentType> {
    match self {
      Self::Base(_) => None,
      Self::Extended(e) => Some(e.residence_document_type),
    }
  }

  pub fn affirmations(&self) -> Option<Affirmations> {
    match self {
      Self::Base(_) => None,
      Self::Extended(e) => Some(e.affirmations),
    }
  }

  /// The subset of fields that participates in the fingerprint.
  pub fn identity_fields(&self) -> IdentityFields<'_> {
    IdentityFields {
      base:   self.base(),
      gender: self.gender(),
      order:  self.schema().field_order(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base() -> BaseIdentity {
    BaseIdentity {
      last_name:   "EL FOO".into(),
      first_name:  "BAR".into(),
      birth_date:  NaiveDate::from_ymd_opt(2003, 6, 12).unwrap(),
      birth_place: "DUMMY 23".into(),
    }
  }

  #[test]
  fn personal_data_is_tagged_by_schema() {
    let data = PersonalData::Extended(ExtendedIdentity {
      base:                    base(),
      gender:                  Gender::Female,
      residence_document_type: ResidenceDocumentType::EnergyBill,
      affirmations:            Affirmations {
        city_resident:   true,
        criminal_record: true,
        user_agreement:  true,
        not_a_member:    true,
      },
    });

    let json = serde_json::to_value(&data).unwrap();
    assert_eq!(json["schema"], "extended");
    assert_eq!(json["gender"], "female");
    assert_eq!(json["residence_document_type"], "energy_bill");

    let back: PersonalData = serde_json::from_value(json).unwrap();
    assert_eq!(back, data);
  }

  #[test]
  fn base_schema_has_no_gender() {
    let data = PersonalData::Base(base());
    assert_eq!(data.schema(), FieldSchema::Base);
    assert_eq!(data.gender(), None);
    assert_eq!(data.identity_fields().order, FieldOrder::V1);
  }

  #[test]
  fn residence_type_accepts_labels() {
    assert_eq!(
      "Energy bill".parse::<ResidenceDocumentType>().unwrap(),
      ResidenceDocumentType::EnergyBill
    );
    assert!("utility".parse::<ResidenceDocumentType>().is_err());
  }
}
