//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Seeding an in-memory directory with two organizations
//! - Driving the update loop against it the way the runtime does
//! - Building key and mouse events

use std::collections::VecDeque;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use taskman::api::InMemoryDirectory;
use taskman::app::perform;
use taskman::config::Config;
use taskman::core::{
    OrgId, Organization, Project, ProjectId, ProjectStatus, Task, TaskId, TaskStatus, User,
    UserId,
};
use taskman::store::{Completion, RemoteCall};
use taskman::tea::{start, update, Command, Cursor, Message, Model};

/// Seeded directory plus handles on what was seeded.
///
/// `Engines` holds Website (mine, idea), Mobile (mine, in progress) and
/// Legacy (Grace's, idea). Website holds four of my tasks, not started, and
/// Audit (Grace's, in progress). `Compilers` holds one project of Grace's.
pub struct World {
    pub api: InMemoryDirectory,
    pub me: User,
    pub other: User,
    pub org: Organization,
    pub other_org: Organization,
    pub website: Project,
    pub legacy: Project,
    pub tasks: Vec<Task>,
}

pub fn user(name: &str) -> User {
    User {
        id: UserId::new(),
        email: format!("{}@example.com", name.split(' ').next().unwrap_or(name).to_lowercase()),
        full_name: name.to_string(),
    }
}

pub fn organization(name: &str, code: &str, creator: &User) -> Organization {
    Organization {
        id: OrgId::new(),
        name: name.to_string(),
        invite_code: code.to_string(),
        created_by: Some(creator.id),
        members: None,
    }
}

pub fn project(org: OrgId, owner: &User, name: &str, status: ProjectStatus) -> Project {
    Project {
        id: ProjectId::new(),
        org_id: org,
        name: name.to_string(),
        description: String::new(),
        status,
        deadline: None,
        created_by: owner.id,
        assignees: vec![],
    }
}

pub fn task(project: ProjectId, owner: &User, name: &str, status: TaskStatus) -> Task {
    Task {
        id: TaskId::new(),
        project_id: project,
        name: name.to_string(),
        description: String::new(),
        status,
        deadline: None,
        created_by: owner.id,
        assignees: vec![],
    }
}

pub fn world() -> World {
    let api = InMemoryDirectory::new();
    let me = user("Ada Lovelace");
    let other = user("Grace Hopper");
    api.add_user(me.clone(), "secret").unwrap();
    api.add_user(other.clone(), "secret").unwrap();
    api.sign_in_as(me.id).unwrap();

    let org = organization("Engines", "ADA001", &me);
    let other_org = organization("Compilers", "COBOL1", &other);
    api.add_organization(org.clone(), &[me.id, other.id]).unwrap();
    api.add_organization(other_org.clone(), &[me.id, other.id])
        .unwrap();

    let website = project(org.id, &me, "Website", ProjectStatus::Idea);
    let mobile = project(org.id, &me, "Mobile", ProjectStatus::InProgress);
    let legacy = project(org.id, &other, "Legacy", ProjectStatus::Idea);
    let compiler = project(other_org.id, &other, "Compiler", ProjectStatus::Idea);
    for p in [&website, &mobile, &legacy, &compiler] {
        api.add_project(p.clone()).unwrap();
    }

    let tasks = vec![
        task(website.id, &me, "Copy", TaskStatus::NotStarted),
        task(website.id, &me, "Design", TaskStatus::NotStarted),
        task(website.id, &me, "Deploy", TaskStatus::NotStarted),
        task(website.id, &me, "Review", TaskStatus::NotStarted),
        task(website.id, &other, "Audit", TaskStatus::InProgress),
    ];
    for t in &tasks {
        api.add_task(t.clone()).unwrap();
    }

    World {
        api,
        me,
        other,
        org,
        other_org,
        website,
        legacy,
        tasks,
    }
}

/// Fresh model for the signed-in user on a 90x30 terminal.
pub fn model_for(world: &World) -> Model {
    Model::new(world.me.clone(), Config::default(), Rect::new(0, 0, 90, 30))
}

pub fn remote_calls(cmds: Vec<Command>) -> Vec<RemoteCall> {
    cmds.into_iter()
        .filter_map(|c| match c {
            Command::Remote(call) => Some(call),
            Command::Quit => None,
        })
        .collect()
}

/// Execute every remote command against the directory and fold the
/// completions back in, following up refreshes until nothing is left.
pub async fn drive(api: &InMemoryDirectory, model: &mut Model, cmds: Vec<Command>) {
    let mut queue: VecDeque<RemoteCall> = remote_calls(cmds).into();
    while let Some(call) = queue.pop_front() {
        let completion = perform(api, call).await;
        queue.extend(remote_calls(update(model, Message::Remote(completion))));
    }
}

/// Fold one completion in, without following up.
pub fn deliver(model: &mut Model, completion: Completion) -> Vec<Command> {
    update(model, Message::Remote(completion))
}

pub fn key(code: KeyCode) -> Message {
    Message::Key(KeyEvent::new(code, KeyModifiers::empty()))
}

pub fn press(model: &mut Model, c: char) -> Vec<Command> {
    update(model, key(KeyCode::Char(c)))
}

pub fn type_text(model: &mut Model, text: &str) {
    for c in text.chars() {
        press(model, c);
    }
}

pub fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Message {
    Message::Mouse(MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::empty(),
    })
}

/// Press, move through `path`, release at the last point.
pub fn drag(model: &mut Model, from: (u16, u16), path: &[(u16, u16)]) -> Vec<Command> {
    update(model, mouse(MouseEventKind::Down(MouseButton::Left), from.0, from.1));
    for &(x, y) in path {
        update(model, mouse(MouseEventKind::Drag(MouseButton::Left), x, y));
    }
    let (x, y) = path.last().copied().unwrap_or(from);
    update(model, mouse(MouseEventKind::Up(MouseButton::Left), x, y))
}

/// Organization list loaded.
pub async fn on_orgs(world: &World) -> Model {
    let mut model = model_for(world);
    let cmds = start(&mut model);
    drive(&world.api, &mut model, cmds).await;
    model
}

/// Engines' project board loaded.
pub async fn on_projects(world: &World) -> Model {
    let mut model = on_orgs(world).await;
    let cmds = update(&mut model, key(KeyCode::Enter));
    drive(&world.api, &mut model, cmds).await;
    model
}

/// Website's task board loaded.
pub async fn on_tasks(world: &World) -> Model {
    let mut model = on_projects(world).await;
    model.cursor = Cursor { column: 0, row: 0 };
    let cmds = update(&mut model, key(KeyCode::Enter));
    drive(&world.api, &mut model, cmds).await;
    model
}

pub fn count_calls(api: &InMemoryDirectory, name: &str) -> usize {
    api.calls().iter().filter(|c| c.as_str() == name).count()
}
