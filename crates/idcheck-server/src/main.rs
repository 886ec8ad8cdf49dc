//! idcheck server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store and attachment directory, and serves the JSON API over HTTP.
//!
//! # Registering subjects
//!
//! Subjects are normally provisioned by the participant directory. To add
//! one by hand and print its id:
//!
//! ```
//! cargo run -p idcheck-server -- --add-subject participant@example.org
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use idcheck_core::subject::SubjectDirectory as _;
use idcheck_server::{ChannelDispatcher, build_workflow, load_config};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Identity verification server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Register a subject with this contact identifier, print its id and exit.
  #[arg(long, value_name = "CONTACT")]
  add_subject: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = load_config(&cli.config)?;

  let (dispatcher, _delivery) = ChannelDispatcher::spawn(server_cfg.notification_queue);
  let workflow = build_workflow(&server_cfg, dispatcher).await?;

  // Helper mode: register a subject and exit.
  if let Some(contact) = cli.add_subject {
    let contact = contact.trim();
    anyhow::ensure!(!contact.is_empty(), "contact must not be empty");
    let subject = workflow
      .store()
      .register_subject(contact.to_owned())
      .await
      .context("failed to register subject")?;
    println!("{}", subject.subject_id);
    return Ok(());
  }

  let app = idcheck_server::app(Arc::new(workflow));
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
