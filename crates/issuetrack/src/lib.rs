//! Issuetrack - project-scoped issue tracking.
//!
//! This crate provides the issue model, the document store it lives in and
//! the service operations a transport exposes over it. The HTTP server lives
//! in the `issuetrack-server` crate.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod domain;
pub mod error;
pub mod id_generation;
pub mod service;
pub mod storage;
