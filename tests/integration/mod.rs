//! Integration test suite for WSPM
//!
//! End-to-end scenarios driven through the public API with the in-memory
//! mock host from `wspm::test_utils`.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **solution_lifecycle**: open/close sessions, background
//!   initialization, event-driven cache maintenance, default-project
//!   resolution, dependents queries
//! - **settings**: solution settings discovery through the manager

mod settings;
mod solution_lifecycle;

/// Best-effort tracing setup; repeated calls are fine.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
