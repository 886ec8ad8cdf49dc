//! Subjects: participants known to the external directory.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A participant. Only the identifier and a contact handle are known here;
/// everything else lives in the owning directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  /// Contact identifier used for lookups, typically an email address.
  pub contact:    String,
  pub created_at: DateTime<Utc>,
}

/// Lookup into the participant directory.
pub trait SubjectDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Find a subject by contact identifier (case-insensitive). Returns `None`
  /// if no subject matches.
  fn find_subject_by_contact<'a>(
    &'a self,
    contact: &'a str,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + 'a;

  /// Register `contact`, or return the subject already registered under it.
  fn register_subject(
    &self,
    contact: String,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;
}
