//! WSPM - Workspace Package Manager core
//!
//! The embeddable core of a package manager that lives inside an open
//! development-environment workspace (a "solution"). It tracks the set of
//! build projects the host reports, maintains a consistent mapping between
//! each host project and an internal package-management handle, and keeps
//! that mapping correct while the host adds, removes, and renames projects
//! asynchronously.
//!
//! # Architecture Overview
//!
//! The crate is organized around one owner and its collaborators:
//!
//! - The [`solution::SolutionManager`] owns the project identity cache and
//!   the default-project name. It subscribes to host lifecycle events,
//!   performs a one-time background initialization per solution session,
//!   and exposes the query surface (`get_project`, `get_all_projects`,
//!   `dependents_of`, ...) the rest of the system addresses projects
//!   through.
//! - The [`host`] module defines the contracts the development
//!   environment's integration layer implements: project capability
//!   queries, solution enumeration, and the event bridge with owned,
//!   drop-released subscriptions.
//! - The [`config`] module loads solution-level settings (`wspm.toml`):
//!   package sources and client-certificate material.
//!
//! ## Key Properties
//!
//! - **No partial views**: queries either wait on the one-shot readiness
//!   gate or answer from a complete snapshot; a closing solution discards
//!   the whole cache atomically.
//! - **Collision-safe addressing**: projects sharing a short name stay
//!   addressable through path-derived custom unique names; an ambiguous
//!   short name deliberately resolves to nothing.
//! - **Isolated failures**: a failed host walk opens the gate with an
//!   observable failure instead of wedging callers; a failed event handler
//!   leaves the cache untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wspm::solution::SolutionManager;
//!
//! // `workspace` and `bridge` come from the host-integration layer.
//! let manager = SolutionManager::new(workspace);
//! manager.attach(&bridge)?;
//! manager.initialize();
//!
//! // Block (boundedly, if desired) until the cache is consistent.
//! let project = manager.get_project("lib/A").await;
//! ```

// Core functionality modules
pub mod config;
pub mod core;
pub mod host;
pub mod solution;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
