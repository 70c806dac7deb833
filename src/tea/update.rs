//! Pure update function for the TEA (The Elm Architecture) pattern.
//!
//! The update function takes a model and a message, mutates the model,
//! and returns a list of commands to execute.

use chrono::{DateTime, NaiveDate, Utc};
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::api::{CreateProjectInput, CreateTaskInput};
use crate::board::{self, BoardLayout, Card};
use crate::core::{
    Lifecycle, Project, ProjectId, ProjectStatus, Task, TaskId, TaskStatus, UserId,
};
use crate::drag::{DragEngine, DropCommand, Point};
use crate::store::{Outcome, RemoteCall, Request};
use crate::transition::{step_target, Step};
use crate::{tlog, tlog_debug, tlog_warn, Error, Result};

use super::command::Command;
use super::message::Message;
use super::model::{Cursor, Form, InputKind, Mode, Model, Notification, NotificationLevel, Screen};

/// Helper to set an error notification and mark model as dirty.
fn set_error(model: &mut Model, message: String) {
    tlog_warn!("UI Error: {}", message);
    model.notification = Some(Notification {
        level: NotificationLevel::Error,
        message,
    });
    model.dirty = true;
}

fn set_info(model: &mut Model, message: &str) {
    model.notification = Some(Notification {
        level: NotificationLevel::Info,
        message: message.to_string(),
    });
    model.dirty = true;
}

/// Commands to run once the terminal is up.
pub fn start(model: &mut Model) -> Vec<Command> {
    vec![Command::Remote(model.store.load_organizations())]
}

/// Pure update function: Model + Message → Commands
///
/// This function:
/// 1. Takes the current model and an input message
/// 2. Mutates the model state (and sets dirty flag)
/// 3. Returns a list of commands (side effects) to execute
///
/// The function itself has no side effects - all I/O happens via returned Commands.
pub fn update(model: &mut Model, msg: Message) -> Vec<Command> {
    let mut cmds = Vec::new();

    match msg {
        Message::Key(key) => {
            clear_notification(model);
            model.dirty = true; // Keyboard input always triggers render
            match model.mode {
                Mode::List => update_list_mode(model, key, &mut cmds),
                Mode::Input(form, kind) => update_input_mode(model, key, form, kind, &mut cmds),
            }
        }

        Message::Mouse(mouse) => {
            if model.mode == Mode::List {
                update_mouse(model, mouse, &mut cmds);
            }
        }

        Message::Resize(width, height) => {
            model.area = Rect::new(0, 0, width, height);
            model.dirty = true;
        }

        Message::Remote(completion) => {
            let created = created_message(&completion.request);
            match model.store.complete(completion) {
                Outcome::Applied(follow_ups) => {
                    if let Some(message) = created {
                        set_info(model, message);
                    }
                    cmds.extend(follow_ups.into_iter().map(Command::Remote));
                }
                Outcome::Discarded => return cmds,
                Outcome::Failed { op, message } => {
                    set_error(model, message);
                    if let Some(prev) = model.notified_op.replace(op) {
                        model.store.dismiss(prev);
                    }
                }
            }
            model.clamp_cursors();
            model.dirty = true;
        }
    }

    cmds
}

fn created_message(request: &Request) -> Option<&'static str> {
    match request {
        Request::CreateOrganization(_) => Some("Organization created"),
        Request::JoinOrganization(_) => Some("Joined organization"),
        Request::CreateProject { .. } => Some("Project created"),
        Request::CreateTask { .. } => Some("Task created"),
        _ => None,
    }
}

/// Drop the notification; a failure it reported counts as seen.
fn clear_notification(model: &mut Model) {
    model.notification = None;
    if let Some(op) = model.notified_op.take() {
        model.store.dismiss(op);
    }
}

fn update_list_mode(model: &mut Model, key: KeyEvent, cmds: &mut Vec<Command>) {
    match key.code {
        KeyCode::Char('q') => {
            cmds.push(Command::Quit);
        }

        KeyCode::Char('?') => {
            model.show_keymap = !model.show_keymap;
        }

        KeyCode::Char('r') => {
            for scope in model.reload_scopes() {
                cmds.push(Command::Remote(model.store.load(scope)));
            }
        }

        KeyCode::Char('x') => {
            model.store.dismiss_all();
        }

        _ => match model.screen {
            Screen::Organizations => update_org_list(model, key, cmds),
            Screen::Projects | Screen::Tasks => update_board(model, key, cmds),
        },
    }
}

fn update_org_list(model: &mut Model, key: KeyEvent, cmds: &mut Vec<Command>) {
    let len = model.store.organizations().len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            if len > 0 {
                model.org_cursor = (model.org_cursor + 1) % len;
            }
        }

        KeyCode::Char('k') | KeyCode::Up => {
            if len > 0 {
                model.org_cursor = model.org_cursor.checked_sub(1).unwrap_or(len - 1);
            }
        }

        KeyCode::Enter => open_org(model, cmds),

        KeyCode::Char('n') => open_form(model, Form::NewOrganization),

        KeyCode::Char('i') => open_form(model, Form::JoinOrganization),

        KeyCode::Esc => {
            cmds.push(Command::Quit);
        }

        _ => {}
    }
}

fn update_board(model: &mut Model, key: KeyEvent, cmds: &mut Vec<Command>) {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => move_column(model, false),
        KeyCode::Char('l') | KeyCode::Right => move_column(model, true),
        KeyCode::Char('j') | KeyCode::Down => move_row(model, true),
        KeyCode::Char('k') | KeyCode::Up => move_row(model, false),

        KeyCode::Enter => {
            if model.screen == Screen::Projects {
                open_project(model, cmds);
            }
        }

        KeyCode::Char('[') => step(model, Step::Back, cmds),
        KeyCode::Char(']') => step(model, Step::Forward, cmds),

        KeyCode::Char(c @ '1'..='3') => {
            let index = c as usize - '1' as usize;
            move_selected_to(model, index, cmds);
        }

        KeyCode::Char(' ') => {
            if let Some(id) = model.selected_task().map(|t| t.id) {
                if !model.marked.remove(&id) {
                    model.marked.insert(id);
                }
            }
        }

        KeyCode::Char('n') => match model.screen {
            Screen::Projects => open_form(model, Form::NewProject),
            _ => open_form(model, Form::NewTask),
        },

        KeyCode::Esc | KeyCode::Backspace => {
            // An active drag is abandoned first; the next Esc goes back.
            let cancelled = model.project_drag.cancel() | model.task_drag.cancel();
            if !cancelled {
                go_back(model);
            }
        }

        _ => {}
    }
}

fn move_column(model: &mut Model, forward: bool) {
    let lengths = model.column_lengths();
    if lengths.is_empty() {
        return;
    }
    let last = lengths.len() - 1;
    model.cursor.column = if forward {
        (model.cursor.column + 1).min(last)
    } else {
        model.cursor.column.saturating_sub(1)
    };
    model.cursor.row = model
        .cursor
        .row
        .min(lengths[model.cursor.column].saturating_sub(1));
}

fn move_row(model: &mut Model, forward: bool) {
    let len = model
        .column_lengths()
        .get(model.cursor.column)
        .copied()
        .unwrap_or(0);
    if len == 0 {
        return;
    }
    model.cursor.row = if forward {
        (model.cursor.row + 1) % len
    } else {
        model.cursor.row.checked_sub(1).unwrap_or(len - 1)
    };
}

// ─────────────────────────────────────────────────────────────────────────
// Navigation
// ─────────────────────────────────────────────────────────────────────────

fn open_org(model: &mut Model, cmds: &mut Vec<Command>) {
    let Some(org) = model.selected_org().map(|o| o.id) else {
        return;
    };
    let left = model.scope.select_org(org);
    model.store.cancel_loads(&left);
    model.marked.clear();
    model.cursor = Cursor::default();
    model.screen = Screen::Projects;
    tlog!("opened org={}", org.short());

    cmds.push(Command::Remote(model.store.load_projects(org)));
    cmds.push(Command::Remote(model.store.load_members(org)));
}

fn open_project(model: &mut Model, cmds: &mut Vec<Command>) {
    let (Some(org), Some(project)) = (model.scope.org(), model.selected_project().cloned()) else {
        return;
    };
    match model.scope.select_project(&project) {
        Ok(left) => {
            model.store.cancel_loads(&left);
            model.marked.clear();
            model.cursor = Cursor::default();
            model.screen = Screen::Tasks;
            tlog!("opened project={}", project.id.short());
            cmds.push(Command::Remote(model.store.load_tasks(org, project.id)));
        }
        Err(e) => set_error(model, e.to_string()),
    }
}

fn go_back(model: &mut Model) {
    match model.screen {
        Screen::Tasks => {
            let project = model.scope.project();
            let left: Vec<_> = model.scope.clear_project().into_iter().collect();
            model.store.cancel_loads(&left);
            model.marked.clear();
            model.screen = Screen::Projects;
            model.cursor = Cursor::default();
            if let Some(id) = project {
                follow_project(model, id);
            }
        }
        Screen::Projects => {
            let left = model.scope.clear_org();
            model.store.cancel_loads(&left);
            model.screen = Screen::Organizations;
            model.cursor = Cursor::default();
        }
        Screen::Organizations => {}
    }
}

fn open_form(model: &mut Model, form: Form) {
    model.pending_name = None;
    model.pending_description = None;
    model.pending_deadline = None;
    model.input_buffer.clear();
    model.mode = Mode::Input(form, form.first_field());
}

// ─────────────────────────────────────────────────────────────────────────
// Status changes
// ─────────────────────────────────────────────────────────────────────────

fn follow_project(model: &mut Model, id: ProjectId) {
    let projects: Vec<Project> = model.board_projects().into_iter().cloned().collect();
    let refs: Vec<&Project> = projects.iter().collect();
    model.focus_card(&refs, id);
}

fn follow_task(model: &mut Model, id: TaskId) {
    let tasks: Vec<Task> = model.board_tasks().into_iter().cloned().collect();
    let refs: Vec<&Task> = tasks.iter().collect();
    model.focus_card(&refs, id);
}

fn move_project(model: &mut Model, id: ProjectId, target: ProjectStatus, cmds: &mut Vec<Command>) {
    match model
        .store
        .update_project_status(model.principal.id, id, target)
    {
        Ok(call) => {
            cmds.push(Command::Remote(call));
            follow_project(model, id);
        }
        Err(e) => set_error(model, e.to_string()),
    }
    model.dirty = true;
}

fn move_task(model: &mut Model, id: TaskId, target: TaskStatus, cmds: &mut Vec<Command>) {
    match model.store.update_task_status(model.principal.id, id, target) {
        Ok(call) => {
            cmds.push(Command::Remote(call));
            follow_task(model, id);
        }
        Err(e) => set_error(model, e.to_string()),
    }
    model.dirty = true;
}

/// Stepwise control: one column left or right.
fn step(model: &mut Model, step: Step, cmds: &mut Vec<Command>) {
    let principal = model.principal.id;
    match model.screen {
        Screen::Projects => {
            let Some(project) = model.selected_project() else {
                return;
            };
            let id = project.id;
            match step_target(project, principal, step) {
                Some(target) => move_project(model, id, target, cmds),
                None => tlog_debug!("stepper disabled for project={}", id.short()),
            }
        }
        Screen::Tasks => {
            let Some(task) = model.selected_task() else {
                return;
            };
            let id = task.id;
            match step_target(task, principal, step) {
                Some(target) => move_task(model, id, target, cmds),
                None => tlog_debug!("stepper disabled for task={}", id.short()),
            }
        }
        Screen::Organizations => {}
    }
}

/// Direct move to the `index`th column. With tasks marked, they all move.
fn move_selected_to(model: &mut Model, index: usize, cmds: &mut Vec<Command>) {
    match model.screen {
        Screen::Projects => {
            let Some(&target) = ProjectStatus::ORDER.get(index) else {
                return;
            };
            if let Some(id) = model.selected_project().map(|p| p.id) {
                move_project(model, id, target, cmds);
            }
        }
        Screen::Tasks => {
            let Some(&target) = TaskStatus::ORDER.get(index) else {
                return;
            };
            if model.marked.is_empty() {
                if let Some(id) = model.selected_task().map(|t| t.id) {
                    move_task(model, id, target, cmds);
                }
                return;
            }
            let Some(project) = model.scope.project() else {
                return;
            };
            let ids: Vec<TaskId> = model.marked.iter().copied().collect();
            match model
                .store
                .bulk_move_tasks(model.principal.id, project, &ids, target)
            {
                Ok(call) => {
                    cmds.push(Command::Remote(call));
                    model.marked.clear();
                    model.clamp_cursors();
                }
                Err(e) => set_error(model, e.to_string()),
            }
        }
        Screen::Organizations => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Mouse
// ─────────────────────────────────────────────────────────────────────────

/// What a mouse event did to a board's gesture.
enum DragStep<E: Card> {
    Pressed(E::Key),
    Moved,
    Dropped(DropCommand<E>),
    Ended,
    Ignored,
}

fn drag_step<E: Card>(
    engine: &mut DragEngine<E>,
    layout: &BoardLayout<E::Status, E::Key>,
    entities: &[E],
    principal: UserId,
    mouse: MouseEvent,
) -> DragStep<E> {
    let at = Point::from((mouse.column, mouse.row));
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let Some(slot) = layout.card_at(mouse.column, mouse.row) else {
                return DragStep::Ignored;
            };
            let Some(entity) = entities.iter().find(|e| e.key() == slot.key) else {
                return DragStep::Ignored;
            };
            if !engine.press(entity, slot.rect, at, principal) {
                tlog_debug!("press on {:?}: not movable by principal", slot.key);
            }
            DragStep::Pressed(slot.key)
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if engine.motion(at, &layout.regions()) {
                DragStep::Moved
            } else {
                DragStep::Ignored
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if engine.gesture().is_none() {
                return DragStep::Ignored;
            }
            match engine.release(at, &layout.regions(), principal) {
                Some(drop) => DragStep::Dropped(drop),
                None => DragStep::Ended,
            }
        }
        MouseEventKind::Down(MouseButton::Right) => {
            if engine.cancel() {
                DragStep::Ended
            } else {
                DragStep::Ignored
            }
        }
        _ => DragStep::Ignored,
    }
}

fn update_mouse(model: &mut Model, mouse: MouseEvent, cmds: &mut Vec<Command>) {
    let principal = model.principal.id;
    match model.screen {
        Screen::Organizations => {
            if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
                return;
            }
            let area = board::list_area(board::screen(model.area).body);
            let offset = board::list_offset(model.org_cursor, area.height);
            let len = model.store.organizations().len();
            if let Some(row) = board::list_row_at(area, offset, len, mouse.column, mouse.row) {
                model.org_cursor = row;
                model.dirty = true;
            }
        }

        Screen::Projects => {
            let layout = model.project_layout();
            let projects: Vec<Project> = model.board_projects().into_iter().cloned().collect();
            match drag_step(&mut model.project_drag, &layout, &projects, principal, mouse) {
                DragStep::Pressed(id) => {
                    follow_project(model, id);
                    model.dirty = true;
                }
                DragStep::Dropped(drop) => move_project(model, drop.entity.id, drop.target, cmds),
                DragStep::Moved | DragStep::Ended => model.dirty = true,
                DragStep::Ignored => {}
            }
        }

        Screen::Tasks => {
            let layout = model.task_layout();
            let tasks: Vec<Task> = model.board_tasks().into_iter().cloned().collect();
            match drag_step(&mut model.task_drag, &layout, &tasks, principal, mouse) {
                DragStep::Pressed(id) => {
                    follow_task(model, id);
                    model.dirty = true;
                }
                DragStep::Dropped(drop) => move_task(model, drop.entity.id, drop.target, cmds),
                DragStep::Moved | DragStep::Ended => model.dirty = true,
                DragStep::Ignored => {}
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Input forms
// ─────────────────────────────────────────────────────────────────────────

fn update_input_mode(
    model: &mut Model,
    key: KeyEvent,
    form: Form,
    kind: InputKind,
    cmds: &mut Vec<Command>,
) {
    match key.code {
        KeyCode::Enter => {
            // Store current field value before submitting
            store_current_field(model, kind);
            match submit(model, form) {
                Ok(call) => {
                    cmds.push(Command::Remote(call));
                    close_form(model);
                }
                Err(e) => {
                    // Form stays open with the field restored
                    load_field_buffer(model, kind);
                    set_error(model, e.to_string());
                }
            }
        }

        KeyCode::Tab => {
            // Cycle to next input field (store current, load next)
            if let Some(next_kind) = kind.next(form) {
                store_current_field(model, kind);
                model.mode = Mode::Input(form, next_kind);
                load_field_buffer(model, next_kind);
            }
        }

        KeyCode::Esc => close_form(model),

        KeyCode::Backspace => {
            model.input_buffer.pop();
        }

        KeyCode::Char(c) => {
            model.input_buffer.push(c);
        }

        _ => {}
    }
}

fn close_form(model: &mut Model) {
    model.input_buffer.clear();
    model.pending_name = None;
    model.pending_description = None;
    model.pending_deadline = None;
    model.mode = Mode::List;
}

/// Validate the form and start its remote call.
fn submit(model: &mut Model, form: Form) -> Result<RemoteCall> {
    let name = model.pending_name.clone().unwrap_or_default();
    let description = model.pending_description.clone().unwrap_or_default();
    match form {
        Form::NewOrganization => model.store.create_organization(&name),
        Form::JoinOrganization => model.store.join_organization(&name),
        Form::NewProject => {
            let org = model
                .scope
                .org()
                .ok_or_else(|| Error::NotFound("no organization selected".to_string()))?;
            let deadline = parse_deadline(model.pending_deadline.as_deref())?;
            model.store.create_project(
                org,
                CreateProjectInput {
                    name,
                    description,
                    deadline,
                    assignee_ids: vec![],
                    status: ProjectStatus::default(),
                },
            )
        }
        Form::NewTask => {
            let (Some(org), Some(project)) = (model.scope.org(), model.scope.project()) else {
                return Err(Error::NotFound("no project selected".to_string()));
            };
            let deadline = parse_deadline(model.pending_deadline.as_deref())?;
            model.store.create_task(
                org,
                project,
                CreateTaskInput {
                    name,
                    description,
                    deadline,
                    assignee_ids: vec![],
                },
            )
        }
    }
}

/// `YYYY-MM-DD`, taken as midnight UTC. Blank means no deadline.
fn parse_deadline(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| Error::Validation(format!("Deadline '{}' is not YYYY-MM-DD", raw)))?;
    Ok(date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()))
}

/// Store current input buffer into the appropriate pending field.
/// Invite codes share the name slot.
fn store_current_field(model: &mut Model, kind: InputKind) {
    let value = std::mem::take(&mut model.input_buffer);
    let value_opt = if value.is_empty() { None } else { Some(value) };
    match kind {
        InputKind::Name | InputKind::InviteCode => model.pending_name = value_opt,
        InputKind::Description => model.pending_description = value_opt,
        InputKind::Deadline => model.pending_deadline = value_opt,
    }
}

/// Load the appropriate pending field into input buffer.
fn load_field_buffer(model: &mut Model, kind: InputKind) {
    model.input_buffer = match kind {
        InputKind::Name | InputKind::InviteCode => model.pending_name.clone(),
        InputKind::Description => model.pending_description.clone(),
        InputKind::Deadline => model.pending_deadline.clone(),
    }
    .unwrap_or_default();
}
