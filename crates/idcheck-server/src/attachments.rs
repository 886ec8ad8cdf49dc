//! Content-addressed attachment storage on the local filesystem.
//!
//! Each upload is written once to `<root>/<sha256-hex>.<ext>`; identical
//! uploads share a file. The extension records the media type, so no sidecar
//! metadata is kept.

use std::{
  io,
  path::{Path, PathBuf},
};

use idcheck_core::attachment::{AttachmentRef, AttachmentStore, AttachmentUpload, StoredAttachment};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Media types with a dedicated extension. Anything else is stored as `bin`
/// and served back as `application/octet-stream`.
const EXTENSIONS: &[(&str, &str)] = &[
  ("image/jpeg", "jpg"),
  ("image/png", "png"),
  ("image/webp", "webp"),
  ("application/pdf", "pdf"),
];

const FALLBACK: (&str, &str) = ("application/octet-stream", "bin");

#[derive(Debug, Error)]
pub enum AttachmentError {
  #[error("attachment i/o error: {0}")]
  Io(#[from] io::Error),

  #[error("malformed attachment reference: {0:?}")]
  InvalidReference(String),
}

#[derive(Debug, Clone)]
pub struct FsAttachmentStore {
  root: PathBuf,
}

impl FsAttachmentStore {
  /// Use `root` as the storage directory, creating it if needed.
  pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root).await?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path { &self.root }

  fn path_for(&self, reference: &AttachmentRef) -> Result<(PathBuf, &'static str), AttachmentError> {
    let invalid = || AttachmentError::InvalidReference(reference.as_str().to_owned());
    let (digest, ext) = reference.as_str().split_once('.').ok_or_else(invalid)?;
    if digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
      return Err(invalid());
    }
    let media_type = media_type_for(ext).ok_or_else(invalid)?;
    Ok((self.root.join(reference.as_str()), media_type))
  }
}

fn extension_for(media_type: &str) -> &'static str {
  let media_type = media_type.trim().to_ascii_lowercase();
  EXTENSIONS
    .iter()
    .find(|(mt, _)| *mt == media_type)
    .map_or(FALLBACK.1, |&(_, ext)| ext)
}

fn media_type_for(ext: &str) -> Option<&'static str> {
  EXTENSIONS
    .iter()
    .chain(std::iter::once(&FALLBACK))
    .find(|(_, e)| *e == ext)
    .map(|(mt, _)| *mt)
}

impl AttachmentStore for FsAttachmentStore {
  type Error = AttachmentError;

  async fn store(&self, upload: AttachmentUpload) -> Result<AttachmentRef, AttachmentError> {
    let digest = hex::encode(Sha256::digest(&upload.bytes));
    let reference = AttachmentRef::new(format!("{digest}.{}", extension_for(&upload.media_type)));
    let path = self.root.join(reference.as_str());

    if !tokio::fs::try_exists(&path).await? {
      // Write under a name unique to this upload so a reader never sees a
      // partial file and concurrent writers of the same bytes do not collide.
      let partial = self.root.join(format!("{digest}.{}.partial", Uuid::new_v4().simple()));
      tokio::fs::write(&partial, &upload.bytes).await?;
      if let Err(e) = tokio::fs::rename(&partial, &path).await {
        tokio::fs::remove_file(&partial).await.ok();
        // Another writer got there first with the same content.
        if !tokio::fs::try_exists(&path).await? {
          return Err(e.into());
        }
      }
    }
    Ok(reference)
  }

  async fn resolve(
    &self,
    reference: AttachmentRef,
  ) -> Result<Option<StoredAttachment>, AttachmentError> {
    let (path, media_type) = self.path_for(&reference)?;
    match tokio::fs::read(&path).await {
      Ok(bytes) => Ok(Some(StoredAttachment { media_type: media_type.to_owned(), bytes })),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn upload(media_type: &str, bytes: &[u8]) -> AttachmentUpload {
    AttachmentUpload { media_type: media_type.to_owned(), bytes: bytes.to_vec() }
  }

  #[tokio::test]
  async fn store_then_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsAttachmentStore::open(dir.path().join("attachments")).await.unwrap();

    let reference = store.store(upload("image/png", b"\x89PNG")).await.unwrap();
    assert!(reference.as_str().ends_with(".png"));

    let stored = store.resolve(reference).await.unwrap().unwrap();
    assert_eq!(stored.media_type, "image/png");
    assert_eq!(stored.bytes, b"\x89PNG");
  }

  #[tokio::test]
  async fn identical_uploads_share_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsAttachmentStore::open(dir.path()).await.unwrap();

    let a = store.store(upload("image/jpeg", b"same")).await.unwrap();
    let b = store.store(upload("IMAGE/JPEG", b"same")).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(std::fs::read_dir(store.root()).unwrap().count(), 1);
  }

  #[tokio::test]
  async fn concurrent_identical_uploads_both_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsAttachmentStore::open(dir.path()).await.unwrap();

    let (a, b) = tokio::join!(
      store.store(upload("image/jpeg", b"same bytes")),
      store.store(upload("image/jpeg", b"same bytes")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a, b);

    let names: Vec<_> = std::fs::read_dir(store.root())
      .unwrap()
      .map(|e| e.unwrap().file_name().into_string().unwrap())
      .collect();
    assert_eq!(names, vec![a.as_str().to_owned()]);
    assert_eq!(store.resolve(a).await.unwrap().unwrap().bytes, b"same bytes");
  }

  #[tokio::test]
  async fn unknown_media_type_falls_back_to_octet_stream() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsAttachmentStore::open(dir.path()).await.unwrap();

    let reference = store.store(upload("image/gif", b"GIF89a")).await.unwrap();
    let stored = store.resolve(reference).await.unwrap().unwrap();
    assert_eq!(stored.media_type, "application/octet-stream");
  }

  #[tokio::test]
  async fn missing_file_resolves_to_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsAttachmentStore::open(dir.path()).await.unwrap();
    let reference = AttachmentRef::new(format!("{}.jpg", "0".repeat(64)));
    assert!(store.resolve(reference).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn path_like_references_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsAttachmentStore::open(dir.path()).await.unwrap();

    for bad in ["../../etc/passwd", "abc.jpg", "mem-0"] {
      let result = store.resolve(AttachmentRef::new(bad)).await;
      assert!(matches!(result, Err(AttachmentError::InvalidReference(_))), "{bad}");
    }
  }
}
