//! Core types and trait definitions for the identity-verification workflow.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the identity normalizer, submission validation, the authorization state
//! rules and the [`workflow::Workflow`] orchestrator; storage backends and
//! transports depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attachment;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod lifecycle;
pub mod notify;
pub mod org;
pub mod request;
pub mod store;
pub mod subject;
pub mod validate;
pub mod workflow;

pub use error::{Error, Result};
