//! Cache partitioning across scopes, reloads and late responses.

use std::collections::HashSet;

use crossterm::event::KeyCode;
use tokio_test::assert_ok;

use taskman::app::perform;
use taskman::core::{Project, ProjectStatus};
use taskman::store::{Request, Scope};
use taskman::tea::{update, Command, Screen};

use crate::fixtures::*;

fn projects_of(model: &taskman::tea::Model, org: taskman::core::OrgId) -> Vec<Project> {
    model.store.projects_for(org).into_iter().cloned().collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Isolation
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_loading_second_org_leaves_first_untouched() {
    let world = world();
    let mut model = on_projects(&world).await;
    let engines_before = projects_of(&model, world.org.id);
    assert_eq!(engines_before.len(), 3);

    // Back to the list, open Compilers
    update(&mut model, key(KeyCode::Esc));
    assert_eq!(model.screen, Screen::Organizations);
    press(&mut model, 'j');
    assert_eq!(model.selected_org().map(|o| o.id), Some(world.other_org.id));
    let cmds = update(&mut model, key(KeyCode::Enter));
    drive(&world.api, &mut model, cmds).await;

    assert_eq!(model.scope.org(), Some(world.other_org.id));
    assert_eq!(projects_of(&model, world.other_org.id).len(), 1);
    assert_eq!(projects_of(&model, world.org.id), engines_before);
}

#[tokio::test]
async fn test_repeated_reload_never_duplicates() {
    let world = world();
    let mut model = on_tasks(&world).await;
    let tasks_before: Vec<_> = model
        .store
        .tasks_for(world.website.id)
        .into_iter()
        .cloned()
        .collect();

    // Reload the task scope twice, then the project scope once
    for _ in 0..2 {
        let cmds = press(&mut model, 'r');
        drive(&world.api, &mut model, cmds).await;
    }
    update(&mut model, key(KeyCode::Esc));
    let cmds = press(&mut model, 'r');
    drive(&world.api, &mut model, cmds).await;

    let projects = projects_of(&model, world.org.id);
    let ids: HashSet<_> = projects.iter().map(|p| p.id).collect();
    assert_eq!(projects.len(), 3);
    assert_eq!(ids.len(), 3);

    let tasks: Vec<_> = model
        .store
        .tasks_for(world.website.id)
        .into_iter()
        .cloned()
        .collect();
    assert_eq!(tasks, tasks_before, "project reload leaves task scope alone");
    assert_eq!(count_calls(&world.api, "tasks"), 3);
}

#[tokio::test]
async fn test_members_load_fills_breadcrumb() {
    let world = world();
    let model = on_projects(&world).await;

    let org = model.current_org().unwrap();
    let members = org.members.clone().unwrap();
    assert_eq!(members.len(), 2);
    let snapshot = model.snapshot();
    let view = snapshot.org.unwrap();
    assert_eq!(view.invite_code, "ADA001");
    assert_eq!(view.members.map(|m| m.len()), Some(2));
}

// ═══════════════════════════════════════════════════════════════════════════
// Late responses
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_superseded_load_is_discarded() {
    let world = world();
    let mut model = on_projects(&world).await;
    let scope = Scope::Projects(world.org.id);
    let project_load = |cmds: Vec<Command>| {
        remote_calls(cmds)
            .into_iter()
            .find(|c| c.request.scope() == Some(scope))
            .unwrap()
    };

    let first = project_load(press(&mut model, 'r'));
    let second = project_load(press(&mut model, 'r'));
    assert!(first.cancel.as_ref().unwrap().is_cancelled());
    assert!(!second.cancel.as_ref().unwrap().is_cancelled());

    // The first answer was taken before a new project appeared
    let stale = perform(&world.api, first).await;
    world
        .api
        .add_project(project(world.org.id, &world.me, "Docs", ProjectStatus::Idea))
        .unwrap();
    let fresh = perform(&world.api, second).await;
    assert_ok!(&stale.result);

    deliver(&mut model, fresh);
    assert_eq!(projects_of(&model, world.org.id).len(), 4);
    let cmds = deliver(&mut model, stale);
    assert!(cmds.is_empty());
    assert_eq!(projects_of(&model, world.org.id).len(), 4);
    assert!(!model.store.is_loading(&scope));
}

#[tokio::test]
async fn test_leaving_project_discards_its_task_load() {
    let world = world();
    let mut model = on_orgs(&world).await;
    let cmds = update(&mut model, key(KeyCode::Enter));
    drive(&world.api, &mut model, cmds).await;

    let sent = remote_calls(update(&mut model, key(KeyCode::Enter)));
    assert!(matches!(sent[0].request, Request::Load(_)));
    update(&mut model, key(KeyCode::Esc));
    assert_eq!(model.screen, Screen::Projects);

    let late = perform(&world.api, sent[0].clone()).await;
    assert!(deliver(&mut model, late).is_empty());
    assert!(model.store.tasks_for(world.website.id).is_empty());
}

#[tokio::test]
async fn test_org_load_failure_then_retry() {
    let world = world();
    world.api.set_offline(true).unwrap();
    let mut model = on_orgs(&world).await;

    assert!(model.store.organizations().is_empty());
    assert!(model.snapshot().org_load_error.is_some());

    world.api.set_offline(false).unwrap();
    let cmds = press(&mut model, 'r');
    drive(&world.api, &mut model, cmds).await;

    assert_eq!(model.store.organizations().len(), 2);
    assert!(model.store.org_load_error().is_none());
}
