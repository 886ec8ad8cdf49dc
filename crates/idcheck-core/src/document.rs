//! Identity documents and verification schemes.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

// ─── Scheme ──────────────────────────────────────────────────────────────────

/// How a participant proves their identity.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
  /// A scan of the identity document is uploaded and reviewed by an
  /// administrator.
  Online,
  /// The document is presented in person and an administrator re-enters its
  /// data.
  Offline,
}

impl Scheme {
  pub const ALL: [Scheme; 2] = [Scheme::Online, Scheme::Offline];

  pub fn code(self) -> &'static str {
    match self {
      Self::Online => "online",
      Self::Offline => "offline",
    }
  }

  pub fn requires_attachment(self) -> bool { matches!(self, Self::Online) }
}

impl FromStr for Scheme {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "online" => Ok(Self::Online),
      "offline" => Ok(Self::Offline),
      _ => Err(Error::unknown("scheme", s)),
    }
  }
}

impl fmt::Display for Scheme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

// ─── Document type ───────────────────────────────────────────────────────────

/// Kind of identity document. Which of these a deployment accepts is
/// configured per organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
  #[serde(rename = "DNI")]
  NationalId,
  #[serde(rename = "NIE")]
  ForeignResidentId,
  #[serde(rename = "passport")]
  Passport,
  #[serde(rename = "home_insurance_attestation")]
  HomeInsuranceAttestation,
}

impl DocumentType {
  pub fn code(self) -> &'static str {
    match self {
      Self::NationalId => "DNI",
      Self::ForeignResidentId => "NIE",
      Self::Passport => "passport",
      Self::HomeInsuranceAttestation => "home_insurance_attestation",
    }
  }
}

impl FromStr for DocumentType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "dni" => Ok(Self::NationalId),
      "nie" => Ok(Self::ForeignResidentId),
      "passport" => Ok(Self::Passport),
      "home_insurance_attestation" => Ok(Self::HomeInsuranceAttestation),
      _ => Err(Error::unknown("document type", s)),
    }
  }
}

impl fmt::Display for DocumentType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// Document metadata as declared by the participant (or re-entered by an
/// administrator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDocument {
  pub document_type:   DocumentType,
  /// Upper-case ASCII letters and digits only.
  pub document_number: String,
}

/// `true` when `number` matches `^[A-Z0-9]*$` once upper-cased.
pub fn is_valid_document_number(number: &str) -> bool {
  number.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn document_type_codes_parse_case_insensitively() {
    assert_eq!("dni".parse::<DocumentType>().unwrap(), DocumentType::NationalId);
    assert_eq!("NIE".parse::<DocumentType>().unwrap(), DocumentType::ForeignResidentId);
    assert_eq!("Passport".parse::<DocumentType>().unwrap(), DocumentType::Passport);
    assert!("driver's license".parse::<DocumentType>().is_err());
  }

  #[test]
  fn document_number_format() {
    assert!(is_valid_document_number("XXXXXXXXY"));
    assert!(is_valid_document_number("12345678z"));
    assert!(!is_valid_document_number("XXXXXXXX-Y"));
    assert!(!is_valid_document_number("1234 5678"));
  }

  #[test]
  fn scheme_rejects_unknown_codes() {
    assert_eq!("Offline".parse::<Scheme>().unwrap(), Scheme::Offline);
    assert!("invalid type".parse::<Scheme>().is_err());
  }
}
