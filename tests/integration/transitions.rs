//! Status transitions driven through keys and pointer gestures.

use crossterm::event::{MouseButton, MouseEventKind};
use tokio_test::assert_ok;

use taskman::core::{ProjectStatus, TaskStatus};
use taskman::store::Request;
use taskman::tea::{update, NotificationLevel};

use crate::fixtures::*;

fn cached_status(model: &taskman::tea::Model, id: taskman::core::ProjectId) -> ProjectStatus {
    model.store.project(id).map(|p| p.status).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// Authorization
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_foreign_project_cannot_be_stepped() {
    let world = world();
    let mut model = on_projects(&world).await;

    // Legacy sits under Website in the idea column
    press(&mut model, 'j');
    assert_eq!(model.selected_project().map(|p| p.id), Some(world.legacy.id));

    // The stepper is disabled; a direct move is refused with a message
    assert!(press(&mut model, ']').is_empty());
    assert!(model.notification.is_none());
    let cmds = press(&mut model, '3');
    assert!(cmds.is_empty());
    assert_eq!(cached_status(&model, world.legacy.id), ProjectStatus::Idea);
    assert_eq!(count_calls(&world.api, "update_project_status"), 0);
    assert_eq!(
        model.notification.clone().map(|n| n.level),
        Some(NotificationLevel::Error)
    );
}

#[tokio::test]
async fn test_foreign_task_cannot_be_moved_by_any_path() {
    let world = world();
    let mut model = on_tasks(&world).await;
    let audit = world.tasks[4].id;
    assert_eq!(world.tasks[4].created_by, world.other.id);

    // Keyboard: select Audit in the in-progress column
    press(&mut model, 'l');
    assert_eq!(model.selected_task().map(|t| t.id), Some(audit));
    assert!(press(&mut model, ']').is_empty());
    assert!(press(&mut model, '1').is_empty());

    // Store: the same predicate refuses directly
    assert!(model
        .store
        .update_task_status(world.me.id, audit, TaskStatus::Done)
        .is_err());

    assert_eq!(
        model.store.task(audit).map(|t| t.status),
        Some(TaskStatus::InProgress)
    );
    assert_eq!(count_calls(&world.api, "move_task"), 0);
}

#[tokio::test]
async fn test_stepper_moves_own_project_one_column() {
    let world = world();
    let mut model = on_projects(&world).await;

    let cmds = press(&mut model, ']');
    assert_eq!(
        cached_status(&model, world.website.id),
        ProjectStatus::InProgress
    );
    drive(&world.api, &mut model, cmds).await;

    assert_eq!(
        world.api.project(world.website.id).map(|p| p.status),
        Some(ProjectStatus::InProgress)
    );
    assert_eq!(count_calls(&world.api, "update_project_status"), 1);
    assert!(!model.store.is_busy());
}

// ═══════════════════════════════════════════════════════════════════════════
// Drag and drop
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_drag_idea_to_finished_is_optimistic() {
    let world = world();
    let mut model = on_projects(&world).await;

    let cmds = drag(&mut model, (15, 4), &[(45, 4), (75, 4)]);
    let sent = remote_calls(cmds);
    assert_eq!(sent.len(), 1);
    match &sent[0].request {
        Request::UpdateProjectStatus {
            org,
            project,
            status,
        } => {
            assert_eq!(*org, world.org.id);
            assert_eq!(*project, world.website.id);
            assert_eq!(*status, ProjectStatus::Finished);
        }
        other => panic!("unexpected request {:?}", other),
    }

    // Cached before the call resolves
    assert_eq!(cached_status(&model, world.website.id), ProjectStatus::Finished);
    assert_eq!(
        world.api.project(world.website.id).map(|p| p.status),
        Some(ProjectStatus::Idea)
    );

    let completion = taskman::app::perform(&world.api, sent[0].clone()).await;
    assert_ok!(&completion.result);
    deliver(&mut model, completion);

    assert_eq!(cached_status(&model, world.website.id), ProjectStatus::Finished);
    assert_eq!(count_calls(&world.api, "update_project_status"), 1);
}

#[tokio::test]
async fn test_gesture_under_activation_distance_is_a_click() {
    let world = world();
    let mut model = on_projects(&world).await;

    let cmds = drag(&mut model, (15, 4), &[(16, 4)]);
    assert!(cmds.is_empty());
    assert_eq!(cached_status(&model, world.website.id), ProjectStatus::Idea);
    assert_eq!(model.selected_project().map(|p| p.id), Some(world.website.id));
    assert_eq!(count_calls(&world.api, "update_project_status"), 0);
}

#[tokio::test]
async fn test_drop_back_on_origin_column_issues_nothing() {
    let world = world();
    let mut model = on_projects(&world).await;

    let cmds = drag(&mut model, (15, 4), &[(45, 4), (15, 6)]);
    assert!(cmds.is_empty());
    assert_eq!(cached_status(&model, world.website.id), ProjectStatus::Idea);
}

#[tokio::test]
async fn test_right_click_abandons_drag() {
    let world = world();
    let mut model = on_projects(&world).await;

    update(&mut model, mouse(MouseEventKind::Down(MouseButton::Left), 15, 4));
    update(&mut model, mouse(MouseEventKind::Drag(MouseButton::Left), 75, 4));
    update(&mut model, mouse(MouseEventKind::Down(MouseButton::Right), 75, 4));
    let cmds = update(&mut model, mouse(MouseEventKind::Up(MouseButton::Left), 75, 4));

    assert!(cmds.is_empty());
    assert_eq!(cached_status(&model, world.website.id), ProjectStatus::Idea);
}

// ═══════════════════════════════════════════════════════════════════════════
// Rollback
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_rejected_move_rolls_back() {
    let world = world();
    let mut model = on_projects(&world).await;
    world.api.fail_next(500, "database unavailable").unwrap();

    let cmds = drag(&mut model, (15, 4), &[(45, 4), (75, 4)]);
    assert_eq!(cached_status(&model, world.website.id), ProjectStatus::Finished);
    drive(&world.api, &mut model, cmds).await;

    assert_eq!(cached_status(&model, world.website.id), ProjectStatus::Idea);
    assert_eq!(
        world.api.project(world.website.id).map(|p| p.status),
        Some(ProjectStatus::Idea)
    );
    let notification = model.notification.clone().unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
    assert!(notification.message.contains("database unavailable"));
}

#[tokio::test]
async fn test_offline_task_move_rolls_back() {
    let world = world();
    let mut model = on_tasks(&world).await;
    let copy = world.tasks[0].id;
    world.api.set_offline(true).unwrap();

    let cmds = press(&mut model, '3');
    assert_eq!(model.store.task(copy).map(|t| t.status), Some(TaskStatus::Done));
    drive(&world.api, &mut model, cmds).await;

    assert_eq!(
        model.store.task(copy).map(|t| t.status),
        Some(TaskStatus::NotStarted)
    );
    assert_eq!(
        model.notification.clone().map(|n| n.level),
        Some(NotificationLevel::Error)
    );
}
