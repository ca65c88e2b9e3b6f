//! Lifecycle scenarios: background initialization, event-driven cache
//! maintenance, default-project resolution, and dependents queries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use wspm::core::WspmError;
use wspm::host::HostWorkspace;
use wspm::solution::{InitOutcome, SolutionEvent, SolutionManager};
use wspm::test_utils::{MockProject, MockWorkspace};

struct Fixture {
    workspace: Arc<MockWorkspace>,
    manager: Arc<SolutionManager>,
}

fn fixture() -> Fixture {
    crate::init_tracing();
    let workspace = Arc::new(MockWorkspace::new());
    let manager = SolutionManager::new(Arc::clone(&workspace) as Arc<dyn HostWorkspace>);
    manager
        .attach(workspace.as_ref())
        .expect("mock bridge never refuses a sink");
    Fixture { workspace, manager }
}

fn project(short: &str, unique: &str) -> Arc<MockProject> {
    Arc::new(MockProject::new(
        short,
        unique,
        format!("/work/sln/{unique}"),
    ))
}

fn next_event(receiver: &mut broadcast::Receiver<SolutionEvent>) -> SolutionEvent {
    receiver.try_recv().expect("expected a buffered event")
}

#[tokio::test]
async fn test_initialize_with_already_open_solution() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    workspace.insert_project(project("Core", "Core.csproj"));
    workspace.insert_project(project("App", "App.csproj"));

    manager.initialize();
    assert_eq!(manager.ready().await, InitOutcome::Succeeded);

    let core = manager.get_project("Core").await;
    assert_eq!(core.map(|p| p.unique_name().to_string()), Some("Core.csproj".into()));
    assert_eq!(manager.get_all_projects().len(), 2);
    assert_eq!(
        manager.solution_directory(),
        Some(std::path::PathBuf::from("/work/sln"))
    );
}

#[tokio::test]
async fn test_get_project_waits_for_initialization() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    workspace.insert_project(project("Core", "Core.csproj"));

    let waiter = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.get_project("Core").await })
    };

    // Nothing has opened the gate yet; the query must still be pending.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!waiter.is_finished());
    assert_eq!(manager.initialization_outcome(), None);

    manager.initialize();
    let resolved = waiter.await.expect("query task panicked");
    assert!(resolved.is_some(), "post-gate read must see the populated cache");
    assert_eq!(manager.initialization_outcome(), Some(InitOutcome::Succeeded));
}

#[tokio::test]
async fn test_initialization_failure_still_opens_the_gate() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    workspace.insert_project(project("Core", "Core.csproj"));
    workspace.set_fail_enumeration(true);

    manager.initialize();
    assert_eq!(manager.ready().await, InitOutcome::Failed);

    // Callers proceed against the (empty) state instead of hanging.
    assert!(manager.get_project("Core").await.is_none());
    assert!(manager.get_all_projects().is_empty());

    // A later successful open trigger recovers the session.
    workspace.set_fail_enumeration(false);
    workspace.open_solution("/work/sln/app.sln");
    assert_eq!(manager.get_all_projects().len(), 1);
}

#[tokio::test]
async fn test_get_all_projects_is_empty_without_open_solution() {
    let Fixture { manager, .. } = fixture();
    // No initialize, no open: must answer immediately, not wait on the gate.
    assert!(manager.get_all_projects().is_empty());
}

#[tokio::test]
async fn test_in_memory_solution_never_populates_the_cache() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_in_memory_only();
    workspace.insert_project(project("Scratch", "Scratch.csproj"));

    manager.initialize();
    assert_eq!(manager.ready().await, InitOutcome::Succeeded);

    assert!(!manager.is_solution_open());
    assert!(manager.get_all_projects().is_empty());
    assert_eq!(manager.solution_directory(), None);

    // Same for the deferred-save flag on an otherwise saved solution.
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    workspace.set_deferred_save(true);
    manager.initialize();
    manager.ready().await;
    assert!(!manager.is_solution_open());
    assert!(manager.get_all_projects().is_empty());
}

#[tokio::test]
async fn test_membership_follows_add_remove_events() {
    let Fixture { workspace, manager } = fixture();
    workspace.open_solution("/work/sln/app.sln");
    manager.initialize();
    manager.ready().await;

    let mut events = manager.subscribe();

    let core = project("Core", "Core.csproj");
    workspace.add_project(Arc::clone(&core));
    assert!(manager.get_project("Core").await.is_some());
    match next_event(&mut events) {
        SolutionEvent::ProjectAdded(handle) => assert_eq!(handle.unique_name(), "Core.csproj"),
        other => panic!("expected ProjectAdded, got {other:?}"),
    }

    workspace.remove_project(&core);
    assert!(manager.get_project("Core").await.is_none());
    assert!(manager.get_all_projects().is_empty());
    match next_event(&mut events) {
        SolutionEvent::ProjectRemoved(handle) => assert_eq!(handle.unique_name(), "Core.csproj"),
        other => panic!("expected ProjectRemoved, got {other:?}"),
    }
}

#[tokio::test]
async fn test_colliding_short_names_require_qualified_addressing() {
    let Fixture { workspace, manager } = fixture();
    workspace.open_solution("/work/sln/app.sln");
    manager.initialize();
    manager.ready().await;

    let top = project("A", "A.csproj");
    workspace.add_project(Arc::clone(&top));
    workspace.add_project(project("A", "lib/A.csproj"));

    // The bare short name no longer resolves uniquely.
    assert!(manager.get_project("A").await.is_none());

    // The qualified forms still address each project.
    let nested = manager.get_project("lib/A").await.expect("custom unique name resolves");
    assert_eq!(nested.unique_name(), "lib/A.csproj");
    let by_unique = manager.get_project("A.csproj").await.expect("unique name resolves");
    assert_eq!(by_unique.custom_unique_name(), "A");

    // Removing one restores plain short-name addressing for the survivor.
    workspace.remove_project(&top);
    let survivor = manager.get_project("A").await.expect("short name unambiguous again");
    assert_eq!(survivor.unique_name(), "lib/A.csproj");
}

#[tokio::test]
async fn test_default_project_follows_startup_configuration() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    workspace.insert_project(project("App", "App.csproj"));
    workspace.insert_project(project("Core", "Core.csproj"));
    workspace.set_startup_projects(vec!["App".to_string()]);

    manager.initialize();
    manager.ready().await;

    assert_eq!(manager.default_project_name(), Some("App".to_string()));
    let default = manager.default_project().expect("default resolves");
    assert_eq!(default.unique_name(), "App.csproj");
}

#[tokio::test]
async fn test_default_project_is_population_order_independent() {
    let mut defaults = Vec::new();
    for reversed in [false, true] {
        let Fixture { workspace, manager } = fixture();
        workspace.set_open("/work/sln/app.sln");
        let mut projects = vec![project("App", "App.csproj"), project("Core", "Core.csproj")];
        if reversed {
            projects.reverse();
        }
        for p in projects {
            workspace.insert_project(p);
        }
        workspace.set_startup_projects(vec!["Core".to_string()]);

        manager.initialize();
        manager.ready().await;
        defaults.push(manager.default_project_name());
    }

    assert_eq!(defaults[0], Some("Core".to_string()));
    assert_eq!(defaults[0], defaults[1]);
}

#[tokio::test]
async fn test_startup_project_with_ambiguous_short_name_uses_custom_unique_name() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    workspace.insert_project(project("A", "A.csproj"));
    workspace.insert_project(project("A", "lib/A.csproj"));
    workspace.set_startup_projects(vec!["lib/A".to_string()]);

    manager.initialize();
    manager.ready().await;

    assert_eq!(manager.default_project_name(), Some("lib/A".to_string()));
    let default = manager.default_project().expect("qualified default resolves");
    assert_eq!(default.unique_name(), "lib/A.csproj");
}

#[tokio::test]
async fn test_no_startup_project_leaves_default_unset() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    workspace.insert_project(project("App", "App.csproj"));

    manager.initialize();
    manager.ready().await;

    assert_eq!(manager.default_project_name(), None);
    assert!(manager.default_project().is_none());
}

#[tokio::test]
async fn test_removing_default_falls_back_to_unambiguous_short_name() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    let top = project("A", "A.csproj");
    let nested = project("A", "lib/A.csproj");
    workspace.insert_project(Arc::clone(&top));
    workspace.insert_project(Arc::clone(&nested));
    workspace.set_startup_projects(vec!["lib/A".to_string()]);

    manager.initialize();
    manager.ready().await;
    assert_eq!(manager.default_project_name(), Some("lib/A".to_string()));

    // The default project disappears; its short name is unambiguous now,
    // so the default falls back to it and points at the survivor.
    workspace.remove_project(&nested);
    assert_eq!(manager.default_project_name(), Some("A".to_string()));
    let default = manager.default_project().expect("fallback default resolves");
    assert_eq!(default.unique_name(), "A.csproj");
}

#[tokio::test]
async fn test_removing_last_project_unsets_default() {
    let Fixture { workspace, manager } = fixture();
    workspace.open_solution("/work/sln/app.sln");
    manager.initialize();
    manager.ready().await;

    let core = project("Core", "Core.csproj");
    workspace.add_project(Arc::clone(&core));
    assert_eq!(manager.default_project_name(), Some("Core".to_string()));

    workspace.remove_project(&core);
    assert_eq!(manager.default_project_name(), None);
    assert!(manager.get_all_projects().is_empty());
}

#[tokio::test]
async fn test_removing_non_default_project_keeps_default() {
    let Fixture { workspace, manager } = fixture();
    workspace.open_solution("/work/sln/app.sln");
    manager.initialize();
    manager.ready().await;

    let app = project("App", "App.csproj");
    let core = project("Core", "Core.csproj");
    workspace.add_project(Arc::clone(&app));
    workspace.add_project(Arc::clone(&core));
    assert_eq!(manager.default_project_name(), Some("App".to_string()));

    workspace.remove_project(&core);
    assert_eq!(manager.default_project_name(), Some("App".to_string()));
}

#[tokio::test]
async fn test_rename_carries_default_and_addressing_to_new_name() {
    let Fixture { workspace, manager } = fixture();
    workspace.open_solution("/work/sln/app.sln");
    manager.initialize();
    manager.ready().await;

    let old = project("Old", "Old.csproj");
    workspace.add_project(Arc::clone(&old));
    assert_eq!(manager.default_project_name(), Some("Old".to_string()));

    let mut events = manager.subscribe();
    workspace.rename_project(&old, project("New", "New.csproj"));

    assert!(manager.get_project("Old").await.is_none());
    let renamed = manager.get_project("New").await.expect("new name resolves");
    assert_eq!(renamed.unique_name(), "New.csproj");
    assert_eq!(manager.default_project_name(), Some("New".to_string()));

    match next_event(&mut events) {
        SolutionEvent::ProjectRenamed(handle) => assert_eq!(handle.unique_name(), "New.csproj"),
        other => panic!("expected ProjectRenamed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rename_with_empty_old_name_is_ignored() {
    let Fixture { workspace, manager } = fixture();
    workspace.open_solution("/work/sln/app.sln");
    manager.initialize();
    manager.ready().await;

    let mut events = manager.subscribe();
    workspace.fire_project_renamed(project("Ghost", "Ghost.csproj"), "");

    assert!(manager.get_project("Ghost").await.is_none());
    assert!(events.try_recv().is_err(), "no event for a virtual-parent rename");
}

#[tokio::test]
async fn test_unsupported_projects_are_not_tracked() {
    let Fixture { workspace, manager } = fixture();
    workspace.open_solution("/work/sln/app.sln");
    manager.initialize();
    manager.ready().await;

    let mut events = manager.subscribe();

    let folder = project("Folder", "Folder");
    folder.set_supported(false);
    workspace.add_project(folder);

    let orphan = project("Orphan", "Orphan.csproj");
    orphan.set_parent_explicitly_unsupported(true);
    workspace.add_project(orphan);

    assert!(manager.get_all_projects().is_empty());
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_close_discards_session_and_fires_events_in_order() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    workspace.insert_project(project("App", "App.csproj"));
    workspace.set_startup_projects(vec!["App".to_string()]);
    manager.initialize();
    manager.ready().await;

    let mut events = manager.subscribe();
    workspace.close_solution();

    assert!(matches!(next_event(&mut events), SolutionEvent::SolutionClosing));
    assert!(matches!(next_event(&mut events), SolutionEvent::SolutionClosed));
    assert_eq!(manager.default_project_name(), None);
    // No blocking here: the solution is closed, so the answer is empty.
    assert!(manager.get_all_projects().is_empty());
}

#[tokio::test]
async fn test_solution_reopens_as_a_fresh_session() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    workspace.insert_project(project("App", "App.csproj"));
    manager.initialize();
    manager.ready().await;
    assert_eq!(manager.get_all_projects().len(), 1);

    workspace.close_solution();
    assert!(manager.get_all_projects().is_empty());

    let mut events = manager.subscribe();
    workspace.insert_project(project("Core", "Core.csproj"));
    workspace.open_solution("/work/sln/other.sln");

    assert!(matches!(next_event(&mut events), SolutionEvent::SolutionOpened));
    let projects = manager.get_all_projects();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].unique_name(), "Core.csproj");
}

#[tokio::test]
async fn test_ui_context_activation_opens_the_solution() {
    let Fixture { workspace, manager } = fixture();
    manager.initialize();
    manager.ready().await;
    assert!(manager.get_all_projects().is_empty());

    let mut events = manager.subscribe();
    workspace.set_open("/work/sln/app.sln");
    workspace.insert_project(project("App", "App.csproj"));
    workspace.activate_ui_context();

    assert!(matches!(next_event(&mut events), SolutionEvent::SolutionOpened));
    assert_eq!(manager.get_all_projects().len(), 1);
}

#[tokio::test]
async fn test_dependents_are_rebuilt_per_query() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    let core = project("Core", "Core.csproj");
    let app = project("App", "App.csproj");
    app.reference(&core);
    workspace.insert_project(Arc::clone(&core));
    workspace.insert_project(Arc::clone(&app));
    manager.initialize();
    manager.ready().await;

    let core_handle = manager.get_project("Core").await.expect("core tracked");
    let dependents = manager.dependents_of(&core_handle);
    assert_eq!(dependents.len(), 1);
    assert_eq!(dependents[0].short_name(), "App");

    // A reference edit is not an observable event, but the next query
    // rebuilds from current host state and sees it.
    let tests = project("Tests", "Tests.csproj");
    tests.reference(&core);
    workspace.add_project(tests);

    let dependents: Vec<String> = manager
        .dependents_of(&core_handle)
        .iter()
        .map(|p| p.short_name().to_string())
        .collect();
    assert_eq!(dependents, vec!["App".to_string(), "Tests".to_string()]);
}

#[tokio::test]
async fn test_project_safe_name_is_declared_unsupported() {
    let Fixture { workspace, manager } = fixture();
    workspace.open_solution("/work/sln/app.sln");
    manager.initialize();
    manager.ready().await;

    workspace.add_project(project("App", "App.csproj"));
    let handle = manager.get_project("App").await.expect("tracked");

    let error = manager.project_safe_name(&handle).expect_err("declared gap");
    assert!(matches!(error, WspmError::NotSupported { .. }));
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let Fixture { workspace, manager } = fixture();
    workspace.set_open("/work/sln/app.sln");
    workspace.insert_project(project("App", "App.csproj"));

    manager.initialize();
    manager.initialize();
    manager.ready().await;

    assert_eq!(manager.get_all_projects().len(), 1);
}

#[tokio::test]
async fn test_detach_stops_event_delivery() {
    let Fixture { workspace, manager } = fixture();
    workspace.open_solution("/work/sln/app.sln");
    manager.initialize();
    manager.ready().await;
    assert_eq!(workspace.sink_count(), 1);

    manager.detach();
    assert_eq!(workspace.sink_count(), 0);

    // The host keeps changing, but nothing reaches the manager anymore.
    workspace.add_project(project("App", "App.csproj"));
    assert!(manager.get_all_projects().is_empty());
}
