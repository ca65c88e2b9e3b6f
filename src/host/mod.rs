//! Host workspace collaborator contracts
//!
//! The solution core never talks to a concrete development environment; it
//! talks to the three contracts in this module, which the host-integration
//! layer implements:
//!
//! - [`HostProject`]: one buildable unit inside the open solution, with
//!   explicit capability queries (supported, references) instead of runtime
//!   type inspection
//! - [`HostWorkspace`]: pull-style enumeration of the open solution, with
//!   open/saved state, project listing, startup-project configuration
//! - [`HostEventBridge`] / [`HostEventSink`]: push-style lifecycle and
//!   change notifications, delivered on the host's own serialized context
//!
//! # Subscription Lifetime
//!
//! [`HostEventBridge::advise`] returns an owned [`HostSubscription`] that
//! releases the registration when dropped. The subscriber holds the handle
//! for as long as it wants events; there is no manual unsubscribe pairing to
//! get wrong, and no reliance on incidental field retention to keep the
//! notification source alive.
//!
//! # Delivery Contract
//!
//! The host delivers events one at a time on a single logical context. Sink
//! implementations may therefore assume no two callbacks run concurrently,
//! which is what lets the solution manager keep cache mutation lock-brief
//! and ordered.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

/// One buildable unit inside the host solution.
///
/// Implementations wrap whatever handle the host environment uses for a
/// project and answer identity and capability queries about it. All methods
/// are snapshots of current host state; the core re-queries rather than
/// caching capability answers.
pub trait HostProject: Send + Sync {
    /// Human-readable project name. Not guaranteed unique across the
    /// solution (the same name can appear under different solution folders).
    fn short_name(&self) -> String;

    /// Host-assigned identifier, unique within the solution. Stable across
    /// renames of sibling projects, but changes if this project itself is
    /// renamed.
    fn unique_name(&self) -> String;

    /// Filesystem location of the project file.
    fn full_path(&self) -> PathBuf;

    /// Whether the package-management surface supports this project type.
    fn is_supported(&self) -> bool;

    /// Whether the project's parent is explicitly marked unsupported.
    ///
    /// Container and solution-folder pseudo-projects report `true` here so
    /// they are never tracked.
    fn is_parent_explicitly_unsupported(&self) -> bool;

    /// Whether this project type can hold references to other projects.
    fn supports_references(&self) -> bool;

    /// The projects this project holds a reference to.
    ///
    /// Only meaningful when [`supports_references`](Self::supports_references)
    /// is `true`; implementations return an empty list otherwise.
    fn referenced_projects(&self) -> Vec<Arc<dyn HostProject>>;
}

impl fmt::Debug for dyn HostProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostProject")
            .field("unique_name", &self.unique_name())
            .finish_non_exhaustive()
    }
}

/// Pull-style view of the host solution.
///
/// The synchronizer uses this contract for its one-time population walk and
/// for the "solution considered open" predicate.
pub trait HostWorkspace: Send + Sync {
    /// Whether the host reports a solution as open.
    ///
    /// This is the raw host flag; callers combine it with
    /// [`is_save_as_required`](Self::is_save_as_required) and
    /// [`is_deferred_save`](Self::is_deferred_save) to decide whether the
    /// solution is *really* open (an in-memory scratch solution is not).
    fn is_open(&self) -> bool;

    /// Path of the solution file, or `None` when the solution exists only
    /// in memory and has never been saved.
    fn solution_file_path(&self) -> Option<PathBuf>;

    /// Whether the solution requires a save-as before it has a real
    /// location (e.g. a scratch solution created by opening a single file).
    fn is_save_as_required(&self) -> bool;

    /// Whether the host is deferring the save of newly created solutions.
    ///
    /// Independent of [`is_save_as_required`](Self::is_save_as_required);
    /// the logical OR of the two means "treat as not really open".
    fn is_deferred_save(&self) -> bool;

    /// Enumerate every project in the open solution.
    ///
    /// # Errors
    ///
    /// Returns an error when the host fails mid-walk. This is the origin of
    /// initialization failures; the synchronizer logs and swallows them so
    /// the readiness gate still opens.
    fn projects(&self) -> Result<Vec<Arc<dyn HostProject>>>;

    /// The host's configured startup projects, in priority order. The first
    /// entry wins when deriving the default project.
    fn startup_project_names(&self) -> Vec<String>;
}

/// Push-style notifications consumed from the host.
///
/// All callbacks fire on the host's own serialized event-delivery context.
/// Implementations must not assume a particular thread, only that no two
/// callbacks overlap.
pub trait HostEventSink: Send + Sync {
    /// A solution finished opening.
    fn solution_opened(&self);

    /// The open solution is about to close.
    fn solution_before_closing(&self);

    /// The solution finished closing.
    fn solution_after_closing(&self);

    /// A project was added to the solution.
    fn project_added(&self, project: Arc<dyn HostProject>);

    /// A project was removed from the solution.
    fn project_removed(&self, project: Arc<dyn HostProject>);

    /// A project was renamed. `old_name` is the name the project was
    /// previously addressable by; it can be empty for unsupported virtual
    /// parents, in which case the sink ignores the event.
    fn project_renamed(&self, project: Arc<dyn HostProject>, old_name: &str);

    /// A host UI context became active. Secondary trigger into the same
    /// idempotent solution-opened entry point, used when the solution was
    /// already open before the subscriber existed.
    fn ui_context_activated(&self);
}

/// Registration point for [`HostEventSink`] implementations.
pub trait HostEventBridge {
    /// Register `sink` for host events.
    ///
    /// The returned [`HostSubscription`] owns the registration; dropping it
    /// unregisters the sink.
    ///
    /// # Errors
    ///
    /// Returns an error when the host refuses the registration.
    fn advise(&self, sink: Arc<dyn HostEventSink>) -> Result<HostSubscription>;
}

/// Owned host event registration, released on drop.
pub struct HostSubscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl HostSubscription {
    /// Wrap a release action to run when the subscription is dropped.
    #[must_use]
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for HostSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for HostSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSubscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}
