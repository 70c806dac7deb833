//! Create, join and bulk flows against the directory.

use crossterm::event::KeyCode;
use tokio_test::{assert_err, assert_ok};

use taskman::app::perform;
use taskman::core::{Organization, TaskStatus};
use taskman::store::Request;
use taskman::tea::{update, Mode, NotificationLevel};

use crate::fixtures::*;

fn status_of(model: &taskman::tea::Model, index: usize, world: &World) -> TaskStatus {
    model
        .store
        .task(world.tasks[index].id)
        .map(|t| t.status)
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// Organizations
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_invalid_invite_code_leaves_orgs_unchanged() {
    let world = world();
    let mut model = on_orgs(&world).await;
    let before: Vec<Organization> = model.store.organizations().to_vec();

    press(&mut model, 'i');
    type_text(&mut model, "nope00");
    let cmds = update(&mut model, key(KeyCode::Enter));
    assert_eq!(model.mode, Mode::List);
    drive(&world.api, &mut model, cmds).await;

    assert_eq!(model.store.organizations(), before.as_slice());
    assert_eq!(count_calls(&world.api, "organizations"), 1);
    let notification = model.notification.clone().unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
    assert!(notification.message.contains("invite code"));
    assert!(model.store.org_load_error().is_none());
}

#[tokio::test]
async fn test_join_by_code_refreshes_list() {
    let world = world();
    let stranger = user("Alan Turing");
    world.api.add_user(stranger.clone(), "secret").unwrap();
    world.api.sign_in_as(stranger.id).unwrap();
    let mut model = taskman::tea::Model::new(
        stranger.clone(),
        taskman::config::Config::default(),
        ratatui::layout::Rect::new(0, 0, 90, 30),
    );
    let cmds = taskman::tea::start(&mut model);
    drive(&world.api, &mut model, cmds).await;
    assert!(model.store.organizations().is_empty());

    press(&mut model, 'i');
    type_text(&mut model, "ada001");
    let cmds = update(&mut model, key(KeyCode::Enter));
    drive(&world.api, &mut model, cmds).await;

    let orgs = model.store.organizations();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].id, world.org.id);
    assert_eq!(
        model.notification.clone().map(|n| n.level),
        Some(NotificationLevel::Info)
    );
}

#[tokio::test]
async fn test_create_org_appears_after_refresh() {
    let world = world();
    let mut model = on_orgs(&world).await;

    press(&mut model, 'n');
    type_text(&mut model, "Looms");
    let cmds = update(&mut model, key(KeyCode::Enter));
    drive(&world.api, &mut model, cmds).await;

    let names: Vec<_> = model
        .store
        .organizations()
        .iter()
        .map(|o| o.name.as_str())
        .collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"Looms"));
    assert_eq!(count_calls(&world.api, "organizations"), 2);
}

// ═══════════════════════════════════════════════════════════════════════════
// Tasks
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_bare_task_lands_in_not_started_and_is_movable() {
    let world = world();
    let mut model = on_tasks(&world).await;
    let column_before = model.column_lengths()[0];

    press(&mut model, 'n');
    type_text(&mut model, "Ship");
    let cmds = update(&mut model, key(KeyCode::Enter));
    let sent = remote_calls(cmds);
    match &sent[0].request {
        Request::CreateTask { input, .. } => {
            assert!(input.assignee_ids.is_empty());
            assert_eq!(input.deadline, None);
        }
        other => panic!("unexpected request {:?}", other),
    }
    for call in sent {
        let completion = perform(&world.api, call).await;
        let follow_ups = update(&mut model, taskman::tea::Message::Remote(completion));
        drive(&world.api, &mut model, follow_ups).await;
    }

    let ship = model
        .store
        .tasks_for(world.website.id)
        .into_iter()
        .find(|t| t.name == "Ship")
        .cloned()
        .unwrap();
    assert_eq!(ship.status, TaskStatus::NotStarted);
    assert!(ship.assignees.is_empty());
    assert_eq!(ship.created_by, world.me.id);
    assert_eq!(model.column_lengths()[0], column_before + 1);

    let call = assert_ok!(model
        .store
        .update_task_status(world.me.id, ship.id, TaskStatus::InProgress));
    let completion = perform(&world.api, call).await;
    assert_ok!(&completion.result);
    deliver(&mut model, completion);
    assert_eq!(
        world.api.task(ship.id).map(|t| t.status),
        Some(TaskStatus::InProgress)
    );
}

#[tokio::test]
async fn test_blank_task_name_never_reaches_directory() {
    let world = world();
    let mut model = on_tasks(&world).await;

    press(&mut model, 'n');
    type_text(&mut model, "   ");
    let cmds = update(&mut model, key(KeyCode::Enter));

    assert!(cmds.is_empty());
    assert!(matches!(model.mode, Mode::Input(..)));
    assert_eq!(count_calls(&world.api, "create_task"), 0);
    assert_err!(model.store.create_task(
        world.org.id,
        world.website.id,
        taskman::api::CreateTaskInput {
            name: String::new(),
            description: String::new(),
            deadline: None,
            assignee_ids: vec![],
        },
    ));
}

#[tokio::test]
async fn test_concurrent_disjoint_bulk_moves_both_land() {
    let world = world();
    let mut model = on_tasks(&world).await;
    let (copy, design, deploy, review) = (
        world.tasks[0].id,
        world.tasks[1].id,
        world.tasks[2].id,
        world.tasks[3].id,
    );

    model.marked.extend([copy, design]);
    let first = remote_calls(press(&mut model, '2'));
    model.marked.extend([deploy, review]);
    let second = remote_calls(press(&mut model, '3'));
    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(model.store.ops().in_flight(), 2);

    // Answers arrive in reverse order
    let late = perform(&world.api, first[0].clone()).await;
    let early = perform(&world.api, second[0].clone()).await;
    deliver(&mut model, early);
    deliver(&mut model, late);

    assert_eq!(status_of(&model, 0, &world), TaskStatus::InProgress);
    assert_eq!(status_of(&model, 1, &world), TaskStatus::InProgress);
    assert_eq!(status_of(&model, 2, &world), TaskStatus::Done);
    assert_eq!(status_of(&model, 3, &world), TaskStatus::Done);
    assert_eq!(status_of(&model, 4, &world), TaskStatus::InProgress);
    assert!(!model.store.is_busy());

    for (index, expected) in [
        (0, TaskStatus::InProgress),
        (1, TaskStatus::InProgress),
        (2, TaskStatus::Done),
        (3, TaskStatus::Done),
    ] {
        assert_eq!(
            world.api.task(world.tasks[index].id).map(|t| t.status),
            Some(expected)
        );
    }
}

#[tokio::test]
async fn test_bulk_move_skips_foreign_tasks() {
    let world = world();
    let mut model = on_tasks(&world).await;
    let (copy, audit) = (world.tasks[0].id, world.tasks[4].id);

    model.marked.extend([copy, audit]);
    let sent = remote_calls(press(&mut model, '3'));
    match &sent[0].request {
        Request::BulkMoveTasks { input, .. } => assert_eq!(input.task_ids, vec![copy]),
        other => panic!("unexpected request {:?}", other),
    }
    drive(&world.api, &mut model, sent.into_iter().map(taskman::tea::Command::Remote).collect())
        .await;

    assert_eq!(status_of(&model, 0, &world), TaskStatus::Done);
    assert_eq!(status_of(&model, 4, &world), TaskStatus::InProgress);
}
