//! Error handling for WSPM
//!
//! This module provides the typed error surface for the workspace
//! package-management core. The design follows two principles:
//! 1. **Strongly-typed errors** ([`WspmError`]) for precise handling in code
//! 2. **Quiet degradation at the query boundary**: lookup misses are `Option`
//!    results, never errors, and host-event failures are isolated per event
//!
//! # Error Categories
//!
//! - **Host access**: [`WspmError::HostEnumeration`], raised when the host workspace
//!   failed while being walked or queried
//! - **Configuration**: [`WspmError::ConfigParseError`],
//!   [`WspmError::ConfigValidationError`], raised when the solution settings file is
//!   malformed or carries invalid items
//! - **Unsupported surface**: [`WspmError::NotSupported`], where a declared
//!   operation without an implementation fails fast instead of returning a
//!   wrong value
//!
//! # Error Conversion
//!
//! Common standard library and dependency errors convert automatically:
//! - [`std::io::Error`] → [`WspmError::IoError`]
//! - [`toml::de::Error`] → [`WspmError::TomlError`]
//!
//! Fallible host plumbing uses [`anyhow::Result`] with context internally;
//! everything crossing the crate boundary is either a [`WspmError`] or an
//! `Option`/empty sequence.

use thiserror::Error;

/// The main error type for WSPM operations
///
/// Each variant represents a specific failure mode of the solution core.
/// Lookup misses are deliberately absent: "no such project" is an expected
/// outcome and is expressed as `None`, never as an error.
#[derive(Error, Debug)]
pub enum WspmError {
    /// The host workspace failed while enumerating or querying projects
    ///
    /// Raised when the population walk or a per-project query into the host
    /// fails. During background initialization this error is logged and
    /// swallowed so the readiness gate still opens (spec: callers proceed
    /// with whatever partial state resulted).
    ///
    /// # Fields
    /// - `operation`: The host operation that failed (e.g., "enumerate projects")
    /// - `reason`: The host-reported failure
    #[error("Host workspace operation failed: {operation}")]
    HostEnumeration {
        /// The host operation that failed
        operation: String,
        /// The host-reported failure
        reason: String,
    },

    /// A declared operation has no implementation
    ///
    /// `project_safe_name` is declared on the solution manager surface but
    /// intentionally unimplemented; it fails with this variant rather than
    /// silently returning an incorrect value.
    #[error("Operation not supported: {operation}")]
    NotSupported {
        /// The operation that is not supported
        operation: String,
    },

    /// Solution settings parsing error
    #[error("Invalid settings file syntax in {file}")]
    ConfigParseError {
        /// Path to the settings file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// Solution settings validation error
    #[error("Settings validation failed: {reason}")]
    ConfigValidationError {
        /// Reason why validation failed
        reason: String,
    },

    /// IO operation failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing failed
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// Generic error with a custom message
    #[error("{message}")]
    Other {
        /// The error message
        message: String,
    },
}

impl WspmError {
    /// Shorthand for a [`WspmError::NotSupported`] error.
    #[must_use]
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }
}

/// Convenience result alias for WSPM operations.
pub type Result<T, E = WspmError> = std::result::Result<T, E>;
