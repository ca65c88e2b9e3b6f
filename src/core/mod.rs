//! Core types and functionality for WSPM
//!
//! This module is the foundation of the crate's type system: the typed error
//! surface and the conventions the rest of the codebase builds on.
//!
//! # Design Principles
//!
//! ## Error First Design
//! Every operation that can fail returns a [`Result`] with meaningful error
//! information. Lookup misses are not failures (they are `Option` results),
//! so the error type covers genuine faults only (host access, configuration,
//! unsupported surface).
//!
//! ## Quiet Degradation
//! Query failures degrade to empty results rather than propagating errors
//! across the cache boundary. The single intentional exception is the
//! readiness gate on blocking queries, which is awaitable and carries an
//! observable outcome so callers can bound the wait themselves.

pub mod error;

pub use error::{Result, WspmError};
