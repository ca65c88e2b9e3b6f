//! Solution tracking: the project identity cache and its lifecycle
//! synchronizer.
//!
//! This is the core of the crate. The [`SolutionManager`] subscribes to the
//! host's lifecycle and change events, keeps the name→project cache
//! consistent under the background initialization race, resolves the single
//! default project (with disambiguation when short names collide), and
//! builds the reverse dependency graph on demand.
//!
//! # Components
//!
//! - [`manager`]: the lifecycle synchronizer and query surface
//! - [`project`]: project identity ([`ProjectNames`]) and the
//!   package-management handle ([`ProjectHandle`])
//! - `cache`: the two-map identity cache (crate-internal; owned
//!   exclusively by the manager)
//! - `dependents`: the on-demand reverse reference graph
//! - `gate`: the one-shot readiness gate ([`InitOutcome`])
//!
//! # Consistency model
//!
//! Callers never observe a partially initialized cache: blocking queries
//! await the readiness gate, the non-blocking list query answers "empty"
//! while no solution is open, and every cache mutation happens under the
//! manager's lock on the host's serialized event context.

pub mod manager;
pub mod project;

mod cache;
mod dependents;
mod gate;

pub use gate::InitOutcome;
pub use manager::{SolutionEvent, SolutionManager};
pub use project::{ProjectHandle, ProjectNames};
