//! Decision notifications.
//!
//! Delivery belongs to a separate messaging subsystem. The workflow calls the
//! dispatcher only after a transition has committed, and a dispatch failure
//! never undoes or fails the transition.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BoxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
  Accepted,
  Rejected,
}

impl NotificationEvent {
  /// Event name understood by the messaging subsystem.
  pub fn name(self) -> &'static str {
    match self {
      Self::Accepted => "unique_identity.authorization_accepted",
      Self::Rejected => "unique_identity.authorization_rejected",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub event:      NotificationEvent,
  pub subject_id: Uuid,
  pub request_id: Uuid,
  /// Rejection reason shown to the participant, if any.
  pub reason:     Option<String>,
}

/// Fire-and-forget sink for [`Notification`]s.
pub trait NotificationDispatcher: Send + Sync {
  fn notify(&self, notification: Notification) -> Result<(), BoxError>;
}
