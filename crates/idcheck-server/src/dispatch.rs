//! Channel-backed notification dispatch.
//!
//! [`ChannelDispatcher`] hands notifications to a bounded tokio channel and
//! never waits. The receiving end is drained by a background task; here it
//! logs each delivery, standing in for the messaging subsystem.

use idcheck_core::{
  error::BoxError,
  notify::{Notification, NotificationDispatcher},
};
use thiserror::Error;
use tokio::{
  sync::mpsc::{self, error::TrySendError},
  task::JoinHandle,
};
use tracing::info;

#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("notification queue is full")]
  Full,

  #[error("notification queue is closed")]
  Closed,
}

#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
  tx: mpsc::Sender<Notification>,
}

impl ChannelDispatcher {
  /// A dispatcher and the receiving end of its queue.
  pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (Self { tx }, rx)
  }

  /// A dispatcher whose queue is drained by a spawned delivery task.
  pub fn spawn(capacity: usize) -> (Self, JoinHandle<()>) {
    let (dispatcher, rx) = Self::new(capacity);
    (dispatcher, tokio::spawn(deliver(rx)))
  }
}

impl NotificationDispatcher for ChannelDispatcher {
  fn notify(&self, notification: Notification) -> Result<(), BoxError> {
    self.tx.try_send(notification).map_err(|e| match e {
      TrySendError::Full(_) => DispatchError::Full,
      TrySendError::Closed(_) => DispatchError::Closed,
    })?;
    Ok(())
  }
}

async fn deliver(mut rx: mpsc::Receiver<Notification>) {
  while let Some(n) = rx.recv().await {
    info!(
      event = n.event.name(),
      request_id = %n.request_id,
      subject_id = %n.subject_id,
      "notification delivered"
    );
  }
}

#[cfg(test)]
mod tests {
  use idcheck_core::notify::NotificationEvent;
  use uuid::Uuid;

  use super::*;

  fn accepted() -> Notification {
    Notification {
      event:      NotificationEvent::Accepted,
      subject_id: Uuid::new_v4(),
      request_id: Uuid::new_v4(),
      reason:     None,
    }
  }

  #[tokio::test]
  async fn queued_notification_reaches_receiver() {
    let (dispatcher, mut rx) = ChannelDispatcher::new(4);
    let sent = accepted();
    dispatcher.notify(sent.clone()).unwrap();
    assert_eq!(rx.recv().await, Some(sent));
  }

  #[tokio::test]
  async fn full_queue_is_an_error() {
    let (dispatcher, _rx) = ChannelDispatcher::new(1);
    dispatcher.notify(accepted()).unwrap();
    let err = dispatcher.notify(accepted()).unwrap_err();
    assert_eq!(err.to_string(), "notification queue is full");
  }

  #[tokio::test]
  async fn closed_queue_is_an_error() {
    let (dispatcher, rx) = ChannelDispatcher::new(1);
    drop(rx);
    assert!(dispatcher.notify(accepted()).is_err());
  }
}
