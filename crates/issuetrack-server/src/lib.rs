//! HTTP server for issuetrack.
//!
//! This crate exposes the [`issuetrack`] service over a small REST-style API
//! built on `axum`.
//!
//! # Architecture
//!
//! The router decodes paths, query strings and bodies, hands them to
//! [`IssueService`](issuetrack::service::IssueService) and serializes its
//! reply. The service never fails at the transport level, so every API
//! response is a 200 with a JSON body.
//!
//! # Modules
//!
//! - `config` - layered configuration (defaults, YAML file, flags and env)
//! - `payload` - JSON and form body extraction
//! - `router` - routes and handlers
//! - `server` - storage setup, binding and graceful shutdown

pub mod config;
pub mod error;
pub mod payload;
pub mod router;
pub mod server;

pub use error::{Error, Result};
pub use router::router;
