//! Server wiring for the identity-verification service.
//!
//! Loads [`ServerConfig`], provides the filesystem attachment store and the
//! channel-backed notification dispatcher, and assembles the HTTP
//! application around [`idcheck_api::api_router`].

pub mod attachments;
pub mod dispatch;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use idcheck_core::{org::OrganizationSettings, workflow::Workflow};
use idcheck_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use attachments::FsAttachmentStore;
pub use dispatch::ChannelDispatcher;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `IDCHECK__*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  pub store_path:         PathBuf,
  pub attachment_dir:     PathBuf,
  /// Capacity of the outgoing notification queue.
  #[serde(default = "default_notification_queue")]
  pub notification_queue: usize,
  #[serde(default)]
  pub organization:       OrganizationSettings,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_notification_queue() -> usize { 256 }

/// Layer the TOML file at `path` (optional) under `IDCHECK__*` environment
/// variables, e.g. `IDCHECK__PORT=9000` or `IDCHECK__ORGANIZATION__FIELD_SCHEMA=extended`.
pub fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("IDCHECK").prefix_separator("__").separator("__"))
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ─────────────────────────────────────────────────────────────

pub type AppWorkflow = Workflow<SqliteStore, FsAttachmentStore>;

/// Open the store and attachment directory named in `config` and assemble the
/// workflow. Notifications go to `dispatcher`.
pub async fn build_workflow(
  config: &ServerConfig,
  dispatcher: ChannelDispatcher,
) -> anyhow::Result<AppWorkflow> {
  let store_path = expand_tilde(&config.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let attachment_dir = expand_tilde(&config.attachment_dir);
  let attachments = FsAttachmentStore::open(&attachment_dir)
    .await
    .with_context(|| format!("failed to open attachment directory {attachment_dir:?}"))?;

  Ok(Workflow::new(
    store,
    attachments,
    Arc::new(config.organization.clone()),
    Arc::new(dispatcher),
  ))
}

/// The full HTTP application: the API under `/api`, with request tracing.
pub fn app(workflow: Arc<AppWorkflow>) -> Router {
  Router::new()
    .nest("/api", idcheck_api::api_router(workflow))
    .layer(TraceLayer::new_for_http())
}
