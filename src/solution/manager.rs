//! Solution lifecycle synchronizer.
//!
//! [`SolutionManager`] owns the project identity cache and the default
//! project, subscribes to host lifecycle and change events, performs a
//! one-time background initialization per solution session, and exposes the
//! query surface the rest of the package-management system addresses
//! projects through.
//!
//! # Lifecycle
//!
//! The manager moves through `Uninitialized → Initializing → Ready`; the
//! readiness gate is what makes the last transition observable. Closing the
//! solution discards the cache and returns to `Uninitialized` state-wise
//! (a new session can open afterwards), while the gate, once open, stays
//! open for the life of the manager.
//!
//! Host callbacks arrive on the host's serialized event context, so no two
//! mutations race; the internal lock exists to give readers a consistent
//! snapshot (and makes the discard-on-close atomic for them), not to
//! arbitrate writers.
//!
//! # Failure isolation
//!
//! A failure inside the initialization walk is logged and swallowed: the
//! gate still opens (marked failed) and callers proceed against whatever
//! partial cache state resulted. A failure inside an individual event
//! handler leaves the cache unchanged: a failed add or remove has no
//! effect, never a partial mutation.
//!
//! # Example
//!
//! ```rust,no_run
//! # use std::path::PathBuf;
//! # use std::sync::Arc;
//! # use wspm::host::{HostProject, HostWorkspace};
//! # struct NullWorkspace;
//! # impl HostWorkspace for NullWorkspace {
//! #     fn is_open(&self) -> bool { false }
//! #     fn solution_file_path(&self) -> Option<PathBuf> { None }
//! #     fn is_save_as_required(&self) -> bool { false }
//! #     fn is_deferred_save(&self) -> bool { false }
//! #     fn projects(&self) -> anyhow::Result<Vec<Arc<dyn HostProject>>> { Ok(Vec::new()) }
//! #     fn startup_project_names(&self) -> Vec<String> { Vec::new() }
//! # }
//! use wspm::solution::SolutionManager;
//!
//! # async fn example() {
//! let manager = SolutionManager::new(Arc::new(NullWorkspace));
//! manager.initialize();
//!
//! // Blocks until the one-time initialization has completed, then looks
//! // the project up under any of its addressable names.
//! if let Some(project) = manager.get_project("lib/A").await {
//!     println!("tracking {}", project.unique_name());
//! }
//! # }
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::core::WspmError;
use crate::host::{
    HostEventBridge, HostEventSink, HostProject, HostSubscription, HostWorkspace,
};
use crate::solution::cache::ProjectCache;
use crate::solution::dependents::DependentsGraph;
use crate::solution::gate::{InitGate, InitOutcome};
use crate::solution::project::{fold_name, ProjectHandle};

/// Capacity of the notification channel. Slow subscribers that fall more
/// than this many events behind observe a `Lagged` error, not blocked
/// event delivery.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notifications emitted by [`SolutionManager`].
#[derive(Debug, Clone)]
pub enum SolutionEvent {
    /// A solution finished opening and the cache is populated.
    SolutionOpened,
    /// The solution is closing; cache and default project are already
    /// discarded.
    SolutionClosing,
    /// The solution finished closing.
    SolutionClosed,
    /// A project entered the cache.
    ProjectAdded(ProjectHandle),
    /// A project left the cache. Carries the handle as it was tracked.
    ProjectRemoved(ProjectHandle),
    /// A project was renamed. Carries the handle under its new identity.
    ProjectRenamed(ProjectHandle),
}

/// Cache and default-project state for one solution session.
///
/// `cache` is `None` whenever no solution session is active. The default
/// name, when set, always resolves to a currently tracked project or is
/// cleared alongside it.
#[derive(Default)]
struct SolutionState {
    cache: Option<ProjectCache>,
    default_project_name: Option<String>,
}

impl SolutionState {
    /// Adds `handle` to the cache and reruns default-project bookkeeping.
    /// Returns the resolved name, or `None` when no cache is active.
    fn add_project(&mut self, handle: ProjectHandle) -> Option<String> {
        let names = handle.names().clone();
        let cache = self.cache.as_mut()?;

        let prior_occupant = cache
            .get_by_short_name(names.short_name())
            .map(|existing| existing.names().clone());
        let resolved = cache.add(handle);

        let repoint = match &self.default_project_name {
            None => true,
            Some(default) => fold_name(names.short_name()) == fold_name(default),
        };
        if repoint {
            // When the new project collides with the current default's
            // short name, the default must keep pointing at the project it
            // pointed at before, which is now only addressable by its
            // custom unique name.
            self.default_project_name = Some(match &prior_occupant {
                Some(prior) => prior.custom_unique_name().to_string(),
                None => resolved.clone(),
            });
        }

        Some(resolved)
    }

    /// Removes the project addressed by `name` and reruns default-project
    /// bookkeeping. Returns the removed handle, `None` when nothing
    /// matched.
    fn remove_project(&mut self, name: &str) -> Option<ProjectHandle> {
        let cache = self.cache.as_mut()?;
        let removed = cache.remove(name)?;
        self.update_default_after_removal(&removed);
        Some(removed)
    }

    fn update_default_after_removal(&mut self, removed: &ProjectHandle) {
        let Some(default) = self.default_project_name.clone() else {
            return;
        };
        if !removed.names().answers_to(&default) {
            return;
        }

        self.default_project_name = None;

        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if cache.contains(&default) {
            // The stale name coincidentally addresses a survivor; leaving
            // the default unset beats silently retargeting it.
            return;
        }
        let short_name = removed.short_name();
        if !cache.is_ambiguous(short_name) && cache.contains(short_name) {
            self.default_project_name = Some(short_name.to_string());
        }
    }

    /// Derives the default project from the host's startup configuration:
    /// first startup entry, looked up in the cache; custom unique name when
    /// the short name is ambiguous. Unset when there is no startup project
    /// or the lookup misses, so the result never depends on the order the
    /// cache was populated in.
    fn derive_default_from_startup(&mut self, startup_project_names: &[String]) {
        self.default_project_name = startup_project_names.first().and_then(|name| {
            let cache = self.cache.as_ref()?;
            let names = cache.find_names(name)?;
            Some(if cache.is_ambiguous(names.short_name()) {
                names.custom_unique_name().to_string()
            } else {
                names.short_name().to_string()
            })
        });
    }
}

/// The solution lifecycle synchronizer.
///
/// See the [module documentation](self) for the lifecycle and failure
/// model. All mutating entry points are host event handlers; everything
/// else is read-only queries over the cache.
pub struct SolutionManager {
    workspace: Arc<dyn HostWorkspace>,
    state: RwLock<SolutionState>,
    gate: InitGate,
    init_started: AtomicBool,
    init_needed: AtomicBool,
    events: broadcast::Sender<SolutionEvent>,
    subscription: Mutex<Option<HostSubscription>>,
    // Handle on our own Arc so the background task and the event-sink
    // registration can hold the manager without a second allocation.
    weak_self: Weak<SolutionManager>,
}

impl SolutionManager {
    /// Creates a manager over `workspace`. Call
    /// [`initialize`](Self::initialize) afterwards to start the background
    /// population walk, and [`attach`](Self::attach) to receive host
    /// events.
    #[must_use]
    pub fn new(workspace: Arc<dyn HostWorkspace>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new_cyclic(|weak_self| Self {
            workspace,
            state: RwLock::new(SolutionState::default()),
            gate: InitGate::new(),
            init_started: AtomicBool::new(false),
            init_needed: AtomicBool::new(true),
            events,
            subscription: Mutex::new(None),
            weak_self: weak_self.clone(),
        })
    }

    /// Starts the one-time background initialization.
    ///
    /// If a solution is already open, the spawned task performs the same
    /// population walk the solution-opened handler would. Failures are
    /// logged and swallowed; the readiness gate opens either way, carrying
    /// the outcome. Calling this again (before or after completion) does
    /// nothing.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn initialize(&self) {
        if self
            .init_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            trace!("initialization already started");
            return;
        }

        let Some(manager) = self.weak_self.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            let outcome = match manager.run_initialization() {
                Ok(()) => InitOutcome::Succeeded,
                Err(error) => {
                    warn!("solution initialization failed: {error:#}");
                    InitOutcome::Failed
                }
            };
            manager.gate.open(outcome);
        });
    }

    /// Registers this manager with the host's event bridge. The returned
    /// subscription is owned by the manager and released when the manager
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error when the host refuses the registration.
    pub fn attach(&self, bridge: &dyn HostEventBridge) -> Result<()> {
        let sink = self
            .weak_self
            .upgrade()
            .map(|manager| manager as Arc<dyn HostEventSink>)
            .context("solution manager is no longer alive")?;
        let subscription = bridge.advise(sink).context("advising host event bridge")?;
        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
        Ok(())
    }

    /// Releases the host event subscription, if one is held. The
    /// subscription is also released when the manager is dropped; this is
    /// for tearing event delivery down earlier.
    pub fn detach(&self) {
        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Whether a solution is really open: the host reports it open and it
    /// is not an in-memory scratch solution awaiting its first save.
    #[must_use]
    pub fn is_solution_open(&self) -> bool {
        self.workspace.is_open()
            && !(self.workspace.is_save_as_required() || self.workspace.is_deferred_save())
    }

    /// Directory containing the solution file, `None` while no saved
    /// solution is open.
    #[must_use]
    pub fn solution_directory(&self) -> Option<PathBuf> {
        if !self.is_solution_open() {
            return None;
        }
        self.workspace
            .solution_file_path()
            .and_then(|path| path.parent().map(PathBuf::from))
    }

    /// Looks up a project by any addressable name, waiting first for the
    /// one-time initialization to complete.
    ///
    /// `None` when no such project is tracked, or when `name` is a short
    /// name currently shared by several projects (use the custom unique
    /// name instead). The wait itself is unbounded; wrap the call in
    /// [`tokio::time::timeout`] to bound it.
    pub async fn get_project(&self, name: &str) -> Option<ProjectHandle> {
        self.gate.wait().await;
        let state = self.read_state();
        state.cache.as_ref()?.find(name).cloned()
    }

    /// Snapshot of every tracked project, ordered by unique name.
    ///
    /// Returns an empty list immediately, without waiting on the
    /// readiness gate, when no solution is open, since there is nothing
    /// to wait for. The list is computed per call, never cached.
    #[must_use]
    pub fn get_all_projects(&self) -> Vec<ProjectHandle> {
        if !self.is_solution_open() {
            return Vec::new();
        }

        let mut state = self.write_state();
        if let Err(error) = self.ensure_cache(&mut state) {
            warn!("failed to populate project cache: {error:#}");
            return Vec::new();
        }
        state
            .cache
            .as_ref()
            .map(ProjectCache::projects)
            .unwrap_or_default()
    }

    /// The current default project name, if any.
    #[must_use]
    pub fn default_project_name(&self) -> Option<String> {
        self.read_state().default_project_name.clone()
    }

    /// Overrides the default project name. Callers are expected to pass a
    /// name that currently resolves; lifecycle bookkeeping will clear it
    /// if its project is removed.
    pub fn set_default_project_name(&self, name: Option<String>) {
        self.write_state().default_project_name = name;
    }

    /// The project the default name currently resolves to.
    #[must_use]
    pub fn default_project(&self) -> Option<ProjectHandle> {
        let state = self.read_state();
        let name = state.default_project_name.clone()?;
        state.cache.as_ref()?.find(&name).cloned()
    }

    /// Projects that hold a reference to `project`.
    ///
    /// The reverse graph is rebuilt from the full current project set on
    /// every call; reference edits between calls are invisible until the
    /// next one, since they are not events this core observes.
    #[must_use]
    pub fn dependents_of(&self, project: &ProjectHandle) -> Vec<ProjectHandle> {
        let projects = self.get_all_projects();
        DependentsGraph::build(&projects).dependents_of(project)
    }

    /// Declared but intentionally unimplemented; fails with
    /// [`WspmError::NotSupported`] rather than returning a value that may
    /// be wrong.
    ///
    /// # Errors
    ///
    /// Always returns [`WspmError::NotSupported`].
    pub fn project_safe_name(&self, _project: &ProjectHandle) -> Result<String, WspmError> {
        Err(WspmError::not_supported("project_safe_name"))
    }

    /// Waits for the one-time initialization and returns its outcome.
    pub async fn ready(&self) -> InitOutcome {
        self.gate.wait().await
    }

    /// Non-blocking view of the initialization outcome; `None` while the
    /// background walk is still running.
    #[must_use]
    pub fn initialization_outcome(&self) -> Option<InitOutcome> {
        self.gate.outcome()
    }

    /// Subscribes to solution and project notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SolutionEvent> {
        self.events.subscribe()
    }

    /// Handles a solution-opened trigger (the open event itself, the
    /// UI-context activation signal, or the initialization walk).
    /// Idempotent: an already-populated cache is left alone; the trigger is
    /// ignored entirely while the solution is not really open.
    pub fn on_solution_opened(&self) {
        if let Err(error) = self.open_solution() {
            warn!("solution open handling failed: {error:#}");
        }
    }

    /// Handles the before-closing event: clears the default project,
    /// discards the cache, and emits [`SolutionEvent::SolutionClosing`].
    pub fn on_solution_before_closing(&self) {
        {
            let mut state = self.write_state();
            state.default_project_name = None;
            if let Some(cache) = state.cache.as_mut() {
                cache.clear();
            }
            state.cache = None;
        }
        debug!("solution closing; project cache discarded");
        self.emit(SolutionEvent::SolutionClosing);
    }

    /// Handles the after-closing event: emits
    /// [`SolutionEvent::SolutionClosed`].
    pub fn on_solution_after_closing(&self) {
        self.emit(SolutionEvent::SolutionClosed);
    }

    /// Handles a project-added event. Projects the host marks unsupported,
    /// and children of explicitly unsupported parents (solution folders and
    /// other pseudo-projects), are ignored.
    pub fn on_project_added(&self, project: Arc<dyn HostProject>) {
        if !project.is_supported() || project.is_parent_explicitly_unsupported() {
            trace!(
                "ignoring unsupported project '{}'",
                project.unique_name()
            );
            return;
        }

        let added = {
            let mut state = self.write_state();
            if let Err(error) = self.ensure_cache(&mut state) {
                warn!("project add dropped: {error:#}");
                return;
            }
            let handle = ProjectHandle::new(project);
            state
                .add_project(handle.clone())
                .map(|resolved| (handle, resolved))
        };

        if let Some((handle, resolved)) = added {
            debug!("project '{resolved}' added to cache");
            self.emit(SolutionEvent::ProjectAdded(handle));
        } else {
            trace!("project add ignored: no open solution");
        }
    }

    /// Handles a project-removed event. Removal is addressed by full path;
    /// an untracked project is a no-op.
    pub fn on_project_removed(&self, project: Arc<dyn HostProject>) {
        let removed = {
            let mut state = self.write_state();
            let path = project.full_path();
            state.remove_project(&path.to_string_lossy())
        };

        match removed {
            Some(handle) => {
                debug!("project '{}' removed from cache", handle.unique_name());
                self.emit(SolutionEvent::ProjectRemoved(handle));
            }
            None => trace!("project remove ignored: not tracked"),
        }
    }

    /// Handles a project-renamed event: drops the stale entry under
    /// `old_name`, re-adds under the new identity with full default
    /// bookkeeping, and emits the handle resolved under the new name.
    ///
    /// An empty `old_name` (reported for unsupported virtual parents) is a
    /// no-op.
    pub fn on_project_renamed(&self, project: Arc<dyn HostProject>, old_name: &str) {
        if old_name.is_empty() {
            trace!("rename with empty old name ignored");
            return;
        }
        if !project.is_supported() {
            trace!("rename of unsupported project ignored");
            return;
        }

        let renamed = {
            let mut state = self.write_state();
            if let Err(error) = self.ensure_cache(&mut state) {
                warn!("project rename dropped: {error:#}");
                return;
            }
            if state.cache.is_none() {
                return;
            }
            state.remove_project(old_name);
            let handle = ProjectHandle::new(project);
            state.add_project(handle.clone()).map(|_| handle)
        };

        if let Some(handle) = renamed {
            debug!(
                "project renamed from '{old_name}' to '{}'",
                handle.unique_name()
            );
            self.emit(SolutionEvent::ProjectRenamed(handle));
        }
    }

    fn run_initialization(&self) -> Result<()> {
        if self.init_needed.load(Ordering::SeqCst) && self.is_solution_open() {
            self.open_solution()?;
        }
        Ok(())
    }

    fn open_solution(&self) -> Result<()> {
        // Once any open trigger has run, the initialization walk has
        // nothing left to do.
        self.init_needed.store(false, Ordering::SeqCst);

        if !self.is_solution_open() {
            trace!("solution open trigger ignored: solution not really open");
            return Ok(());
        }

        {
            let mut state = self.write_state();
            self.ensure_cache(&mut state)?;
            state.derive_default_from_startup(&self.workspace.startup_project_names());
        }
        debug!("solution opened");
        self.emit(SolutionEvent::SolutionOpened);
        Ok(())
    }

    /// Builds the cache by walking every supported project the host
    /// reports. A no-op when the solution is not really open or a cache
    /// already exists for this session.
    ///
    /// The walk performs no default-project bookkeeping: the default after
    /// an open derives solely from the startup configuration, so it cannot
    /// depend on enumeration order.
    fn ensure_cache(&self, state: &mut SolutionState) -> Result<()> {
        if !self.is_solution_open() || state.cache.is_some() {
            return Ok(());
        }

        let projects = self
            .workspace
            .projects()
            .context("enumerating solution projects")?;

        let mut cache = ProjectCache::new();
        for project in projects {
            if !project.is_supported() {
                trace!("skipping unsupported project '{}'", project.unique_name());
                continue;
            }
            cache.add(ProjectHandle::new(project));
        }
        debug!("project cache populated with {} projects", cache.len());
        state.cache = Some(cache);
        Ok(())
    }

    fn emit(&self, event: SolutionEvent) {
        // Nobody listening is fine; notifications are best-effort.
        let _ = self.events.send(event);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SolutionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SolutionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HostEventSink for SolutionManager {
    fn solution_opened(&self) {
        self.on_solution_opened();
    }

    fn solution_before_closing(&self) {
        self.on_solution_before_closing();
    }

    fn solution_after_closing(&self) {
        self.on_solution_after_closing();
    }

    fn project_added(&self, project: Arc<dyn HostProject>) {
        self.on_project_added(project);
    }

    fn project_removed(&self, project: Arc<dyn HostProject>) {
        self.on_project_removed(project);
    }

    fn project_renamed(&self, project: Arc<dyn HostProject>, old_name: &str) {
        self.on_project_renamed(project, old_name);
    }

    fn ui_context_activated(&self) {
        self.on_solution_opened();
    }
}
