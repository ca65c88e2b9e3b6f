//! Test utilities: an in-memory host workspace.
//!
//! [`MockWorkspace`] and [`MockProject`] implement the [`crate::host`]
//! contracts entirely in memory so unit and integration tests can drive
//! solution lifecycle scenarios without a real development environment.
//! The workspace doubles as the event bridge: tests mutate it through the
//! driver methods (`open_solution`, `add_project`, ...) and those fire the
//! advised sinks the way the host would, one callback at a time.
//!
//! Available to integration tests through the `test-utils` feature (the
//! crate dev-depends on itself with that feature enabled).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use anyhow::{anyhow, Result};

use crate::host::{
    HostEventBridge, HostEventSink, HostProject, HostSubscription, HostWorkspace,
};

/// In-memory host project.
pub struct MockProject {
    short_name: String,
    unique_name: String,
    full_path: PathBuf,
    supported: AtomicBool,
    parent_unsupported: AtomicBool,
    supports_references: AtomicBool,
    references: Mutex<Vec<Arc<MockProject>>>,
}

impl MockProject {
    /// Creates a supported project with reference support and no parent
    /// restrictions.
    #[must_use]
    pub fn new(
        short_name: impl Into<String>,
        unique_name: impl Into<String>,
        full_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            short_name: short_name.into(),
            unique_name: unique_name.into(),
            full_path: full_path.into(),
            supported: AtomicBool::new(true),
            parent_unsupported: AtomicBool::new(false),
            supports_references: AtomicBool::new(true),
            references: Mutex::new(Vec::new()),
        }
    }

    /// Marks the project as unsupported by the package-management surface.
    pub fn set_supported(&self, supported: bool) {
        self.supported.store(supported, Ordering::SeqCst);
    }

    /// Marks the project's parent as explicitly unsupported.
    pub fn set_parent_explicitly_unsupported(&self, unsupported: bool) {
        self.parent_unsupported.store(unsupported, Ordering::SeqCst);
    }

    /// Toggles reference support.
    pub fn set_supports_references(&self, supports: bool) {
        self.supports_references.store(supports, Ordering::SeqCst);
    }

    /// Adds a forward reference to `other`.
    pub fn reference(&self, other: &Arc<MockProject>) {
        self.references
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(other));
    }
}

impl HostProject for MockProject {
    fn short_name(&self) -> String {
        self.short_name.clone()
    }

    fn unique_name(&self) -> String {
        self.unique_name.clone()
    }

    fn full_path(&self) -> PathBuf {
        self.full_path.clone()
    }

    fn is_supported(&self) -> bool {
        self.supported.load(Ordering::SeqCst)
    }

    fn is_parent_explicitly_unsupported(&self) -> bool {
        self.parent_unsupported.load(Ordering::SeqCst)
    }

    fn supports_references(&self) -> bool {
        self.supports_references.load(Ordering::SeqCst)
    }

    fn referenced_projects(&self) -> Vec<Arc<dyn HostProject>> {
        self.references
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|project| Arc::clone(project) as Arc<dyn HostProject>)
            .collect()
    }
}

#[derive(Default)]
struct WorkspaceState {
    open: bool,
    save_as_required: bool,
    deferred_save: bool,
    solution_file_path: Option<PathBuf>,
    projects: Vec<Arc<MockProject>>,
    startup_project_names: Vec<String>,
    fail_enumeration: bool,
}

/// In-memory host workspace and event bridge.
///
/// Sinks are held weakly, like a host that drops dead subscribers: the
/// workspace never keeps a subscriber alive on its own.
#[derive(Default)]
pub struct MockWorkspace {
    state: Mutex<WorkspaceState>,
    sinks: Arc<Mutex<Vec<(u64, Weak<dyn HostEventSink>)>>>,
    next_sink_id: AtomicU64,
}

impl MockWorkspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the solution open at `path` without firing events, for
    /// already-open-at-startup scenarios.
    pub fn set_open(&self, path: impl Into<PathBuf>) {
        let mut state = self.lock_state();
        state.open = true;
        state.solution_file_path = Some(path.into());
    }

    /// Simulates a scratch solution: open, but never saved to disk.
    pub fn set_in_memory_only(&self) {
        let mut state = self.lock_state();
        state.open = true;
        state.solution_file_path = None;
        state.save_as_required = true;
    }

    pub fn set_save_as_required(&self, required: bool) {
        self.lock_state().save_as_required = required;
    }

    pub fn set_deferred_save(&self, deferred: bool) {
        self.lock_state().deferred_save = deferred;
    }

    pub fn set_startup_projects(&self, names: Vec<String>) {
        self.lock_state().startup_project_names = names;
    }

    /// Makes the next project enumerations fail, to exercise
    /// initialization failure paths.
    pub fn set_fail_enumeration(&self, fail: bool) {
        self.lock_state().fail_enumeration = fail;
    }

    /// Adds a project to the solution without firing events, for
    /// population-walk scenarios.
    pub fn insert_project(&self, project: Arc<MockProject>) {
        self.lock_state().projects.push(project);
    }

    /// Opens the solution at `path` and fires the solution-opened event.
    pub fn open_solution(&self, path: impl Into<PathBuf>) {
        self.set_open(path);
        for sink in self.sinks_snapshot() {
            sink.solution_opened();
        }
    }

    /// Closes the solution: fires before-closing, tears the state down,
    /// then fires after-closing.
    pub fn close_solution(&self) {
        for sink in self.sinks_snapshot() {
            sink.solution_before_closing();
        }
        {
            let mut state = self.lock_state();
            state.open = false;
            state.solution_file_path = None;
            state.projects.clear();
            state.startup_project_names.clear();
        }
        for sink in self.sinks_snapshot() {
            sink.solution_after_closing();
        }
    }

    /// Adds a project to the open solution and fires project-added.
    pub fn add_project(&self, project: Arc<MockProject>) {
        self.lock_state().projects.push(Arc::clone(&project));
        for sink in self.sinks_snapshot() {
            sink.project_added(Arc::clone(&project) as Arc<dyn HostProject>);
        }
    }

    /// Removes a project from the solution and fires project-removed.
    pub fn remove_project(&self, project: &Arc<MockProject>) {
        self.lock_state()
            .projects
            .retain(|candidate| !Arc::ptr_eq(candidate, project));
        for sink in self.sinks_snapshot() {
            sink.project_removed(Arc::clone(project) as Arc<dyn HostProject>);
        }
    }

    /// Replaces `old` with `renamed` and fires project-renamed carrying
    /// the old unique name.
    pub fn rename_project(&self, old: &Arc<MockProject>, renamed: Arc<MockProject>) {
        let old_name = old.unique_name();
        {
            let mut state = self.lock_state();
            state
                .projects
                .retain(|candidate| !Arc::ptr_eq(candidate, old));
            state.projects.push(Arc::clone(&renamed));
        }
        self.fire_project_renamed(renamed, &old_name);
    }

    /// Fires project-renamed directly, for edge cases such as an empty
    /// old name.
    pub fn fire_project_renamed(&self, project: Arc<MockProject>, old_name: &str) {
        for sink in self.sinks_snapshot() {
            sink.project_renamed(Arc::clone(&project) as Arc<dyn HostProject>, old_name);
        }
    }

    /// Fires the UI-context activation signal.
    pub fn activate_ui_context(&self) {
        for sink in self.sinks_snapshot() {
            sink.ui_context_activated();
        }
    }

    /// Number of currently advised, still-live sinks.
    #[must_use]
    pub fn sink_count(&self) -> usize {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, sink)| sink.strong_count() > 0)
            .count()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, WorkspaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sinks_snapshot(&self) -> Vec<Arc<dyn HostEventSink>> {
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|(_, sink)| sink.upgrade())
            .collect()
    }
}

impl HostWorkspace for MockWorkspace {
    fn is_open(&self) -> bool {
        self.lock_state().open
    }

    fn solution_file_path(&self) -> Option<PathBuf> {
        self.lock_state().solution_file_path.clone()
    }

    fn is_save_as_required(&self) -> bool {
        self.lock_state().save_as_required
    }

    fn is_deferred_save(&self) -> bool {
        self.lock_state().deferred_save
    }

    fn projects(&self) -> Result<Vec<Arc<dyn HostProject>>> {
        let state = self.lock_state();
        if state.fail_enumeration {
            return Err(anyhow!("simulated host enumeration failure"));
        }
        Ok(state
            .projects
            .iter()
            .map(|project| Arc::clone(project) as Arc<dyn HostProject>)
            .collect())
    }

    fn startup_project_names(&self) -> Vec<String> {
        self.lock_state().startup_project_names.clone()
    }
}

impl HostEventBridge for MockWorkspace {
    fn advise(&self, sink: Arc<dyn HostEventSink>) -> Result<HostSubscription> {
        let id = self.next_sink_id.fetch_add(1, Ordering::SeqCst);
        self.sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::downgrade(&sink)));

        let sinks = Arc::clone(&self.sinks);
        Ok(HostSubscription::new(move || {
            sinks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(sink_id, _)| *sink_id != id);
        }))
    }
}
