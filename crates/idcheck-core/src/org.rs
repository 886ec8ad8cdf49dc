//! Organization configuration, consumed through [`OrganizationConfig`].
//!
//! Managing these settings is outside this crate; [`OrganizationSettings`] is
//! the static, deserialisable implementation used by the server binary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{document::DocumentType, document::Scheme, identity::FieldSchema};

/// Default upload ceiling: 10 MiB.
pub const DEFAULT_ATTACHMENT_SIZE_LIMIT: u64 = 10 * 1024 * 1024;

/// Read-only view of the organization's verification settings.
pub trait OrganizationConfig: Send + Sync {
  /// Methods participants may currently choose from.
  fn enabled_schemes(&self) -> BTreeSet<Scheme>;

  /// Which personal-data fields are collected.
  fn field_schema(&self) -> FieldSchema;

  /// Accepted identity document types.
  fn document_types(&self) -> Vec<DocumentType>;

  /// Largest accepted attachment, in bytes.
  fn attachment_size_limit(&self) -> u64;

  /// Accepted attachment media types, e.g. `image/jpeg`.
  fn allowed_attachment_types(&self) -> Vec<String>;

  /// Presentational text shown to participants choosing the offline method.
  fn explanation_text(&self) -> Option<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationSettings {
  #[serde(default = "default_schemes")]
  pub enabled_schemes:          BTreeSet<Scheme>,
  #[serde(default)]
  pub field_schema:             FieldSchema,
  #[serde(default = "default_document_types")]
  pub document_types:           Vec<DocumentType>,
  #[serde(default = "default_attachment_types")]
  pub allowed_attachment_types: Vec<String>,
  #[serde(default = "default_size_limit")]
  pub attachment_size_limit:    u64,
  #[serde(default)]
  pub offline_explanation:      Option<String>,
}

fn default_schemes() -> BTreeSet<Scheme> { BTreeSet::from([Scheme::Online]) }

fn default_document_types() -> Vec<DocumentType> {
  vec![DocumentType::NationalId, DocumentType::ForeignResidentId, DocumentType::Passport]
}

fn default_attachment_types() -> Vec<String> {
  vec!["image/jpeg".to_owned(), "image/png".to_owned()]
}

fn default_size_limit() -> u64 { DEFAULT_ATTACHMENT_SIZE_LIMIT }

impl Default for OrganizationSettings {
  fn default() -> Self {
    Self {
      enabled_schemes:          default_schemes(),
      field_schema:             FieldSchema::default(),
      document_types:           default_document_types(),
      allowed_attachment_types: default_attachment_types(),
      attachment_size_limit:    default_size_limit(),
      offline_explanation:      None,
    }
  }
}

impl OrganizationConfig for OrganizationSettings {
  fn enabled_schemes(&self) -> BTreeSet<Scheme> { self.enabled_schemes.clone() }

  fn field_schema(&self) -> FieldSchema { self.field_schema }

  fn document_types(&self) -> Vec<DocumentType> { self.document_types.clone() }

  fn attachment_size_limit(&self) -> u64 { self.attachment_size_limit }

  fn allowed_attachment_types(&self) -> Vec<String> { self.allowed_attachment_types.clone() }

  fn explanation_text(&self) -> Option<String> { self.offline_explanation.clone() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_keys_fall_back_to_defaults() {
    let settings: OrganizationSettings =
      serde_json::from_str(r#"{"enabled_schemes":["offline"],"field_schema":"extended"}"#).unwrap();

    assert_eq!(settings.enabled_schemes(), BTreeSet::from([Scheme::Offline]));
    assert_eq!(settings.field_schema(), FieldSchema::Extended);
    assert_eq!(settings.attachment_size_limit(), DEFAULT_ATTACHMENT_SIZE_LIMIT);
    assert_eq!(settings.allowed_attachment_types(), vec!["image/jpeg", "image/png"]);
    assert!(settings.document_types().contains(&DocumentType::NationalId));
  }
}
