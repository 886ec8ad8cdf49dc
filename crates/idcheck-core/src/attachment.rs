//! Uploaded document images.
//!
//! The core never parses attachment bytes; it only checks media type and size
//! during validation and hands the bytes to an [`AttachmentStore`].

use std::{
  collections::HashMap,
  convert::Infallible,
  fmt,
  future::Future,
  sync::{
    Mutex,
    atomic::{AtomicU64, Ordering},
  },
};

use serde::{Deserialize, Serialize};

/// Opaque reference returned by an [`AttachmentStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentRef(String);

impl AttachmentRef {
  pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for AttachmentRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// An image submitted with an online request, not yet stored.
#[derive(Clone, PartialEq, Eq)]
pub struct AttachmentUpload {
  pub media_type: String,
  pub bytes:      Vec<u8>,
}

impl AttachmentUpload {
  pub fn size(&self) -> u64 { self.bytes.len() as u64 }
}

impl fmt::Debug for AttachmentUpload {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AttachmentUpload")
      .field("media_type", &self.media_type)
      .field("size", &self.bytes.len())
      .finish()
  }
}

/// Bytes resolved from an [`AttachmentRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
  pub media_type: String,
  pub bytes:      Vec<u8>,
}

/// Storage for attachment bytes; an external collaborator.
pub trait AttachmentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `upload` and return a reference to it.
  fn store(
    &self,
    upload: AttachmentUpload,
  ) -> impl Future<Output = Result<AttachmentRef, Self::Error>> + Send + '_;

  /// Load a previously stored attachment. Returns `None` if the reference is
  /// unknown.
  fn resolve(
    &self,
    reference: AttachmentRef,
  ) -> impl Future<Output = Result<Option<StoredAttachment>, Self::Error>> + Send + '_;
}

// ─── In-memory store ─────────────────────────────────────────────────────────

/// Process-local [`AttachmentStore`]; useful for testing.
#[derive(Debug, Default)]
pub struct MemoryAttachmentStore {
  next:  AtomicU64,
  items: Mutex<HashMap<AttachmentRef, StoredAttachment>>,
}

impl MemoryAttachmentStore {
  pub fn new() -> Self { Self::default() }

  pub fn len(&self) -> usize { self.items.lock().map(|m| m.len()).unwrap_or(0) }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl AttachmentStore for MemoryAttachmentStore {
  type Error = Infallible;

  async fn store(&self, upload: AttachmentUpload) -> Result<AttachmentRef, Infallible> {
    let n = self.next.fetch_add(1, Ordering::Relaxed);
    let reference = AttachmentRef::new(format!("mem-{n}"));
    if let Ok(mut items) = self.items.lock() {
      items.insert(reference.clone(), StoredAttachment {
        media_type: upload.media_type,
        bytes:      upload.bytes,
      });
    }
    Ok(reference)
  }

  async fn resolve(&self, reference: AttachmentRef) -> Result<Option<StoredAttachment>, Infallible> {
    Ok(self.items.lock().ok().and_then(|items| items.get(&reference).cloned()))
  }
}
