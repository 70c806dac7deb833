//! Model for the TEA (The Elm Architecture) pattern.
//!
//! The Model is pure application state - no channels, no handles, no runtime infrastructure.

use std::collections::BTreeSet;

use ratatui::layout::Rect;

use crate::board::{self, BoardLayout, Card};
use crate::config::Config;
use crate::core::{
    Lifecycle, Organization, Project, ProjectId, ProjectStatus, Task, TaskId, TaskStatus, User,
    UserId,
};
use crate::drag::DragEngine;
use crate::render::{next_version, DragView, OrgView, RenderState};
use crate::scope::ScopeSelector;
use crate::store::{EntityStore, OpId, Scope};
use crate::transition::{step_target, Step, Transitionable};

/// Level of a notification message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Error notification - displayed in red with "Error:" prefix
    Error,
    /// Informational notification - displayed in green
    Info,
}

/// A notification message to display to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// Which level of the hierarchy is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Organizations,
    Projects,
    Tasks,
}

/// Application UI mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    List,
    Input(Form, InputKind),
}

/// What an input form submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    NewOrganization,
    JoinOrganization,
    NewProject,
    NewTask,
}

impl Form {
    pub fn title(&self) -> &'static str {
        match self {
            Form::NewOrganization => "New organization",
            Form::JoinOrganization => "Join organization",
            Form::NewProject => "New project",
            Form::NewTask => "New task",
        }
    }

    pub fn first_field(&self) -> InputKind {
        match self {
            Form::JoinOrganization => InputKind::InviteCode,
            _ => InputKind::Name,
        }
    }
}

/// Types of input prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Name,
    Description,
    Deadline,
    InviteCode,
}

impl InputKind {
    pub fn label(&self) -> &'static str {
        match self {
            InputKind::Name => "Name",
            InputKind::Description => "Description",
            InputKind::Deadline => "Deadline (YYYY-MM-DD)",
            InputKind::InviteCode => "Invite code",
        }
    }

    /// Cycle to next input field (Tab behavior).
    /// Returns None for single-field forms.
    pub fn next(&self, form: Form) -> Option<InputKind> {
        match (form, self) {
            (Form::NewProject | Form::NewTask, InputKind::Name) => Some(InputKind::Description),
            (Form::NewProject | Form::NewTask, InputKind::Description) => Some(InputKind::Deadline),
            (Form::NewProject | Form::NewTask, InputKind::Deadline) => Some(InputKind::Name),
            _ => None,
        }
    }
}

/// Card cursor on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub column: usize,
    pub row: usize,
}

/// Pure application state - the single source of truth.
pub struct Model {
    // Core state
    pub store: EntityStore,
    pub scope: ScopeSelector,
    pub principal: User,
    pub screen: Screen,
    pub org_cursor: usize,
    pub cursor: Cursor,
    /// Tasks marked for a bulk move.
    pub marked: BTreeSet<TaskId>,
    pub mode: Mode,

    // Drag gestures, one engine per board
    pub project_drag: DragEngine<Project>,
    pub task_drag: DragEngine<Task>,

    // Input state
    pub input_buffer: String,
    pub pending_name: Option<String>,
    pub pending_description: Option<String>,
    pub pending_deadline: Option<String>,
    pub notification: Option<Notification>,
    /// Failed op behind the current error notification.
    pub notified_op: Option<OpId>,

    // UI toggle state
    /// Whether the keymap legend is expanded (toggled by '?')
    pub show_keymap: bool,
    /// Terminal area, kept in sync with resize events for hit-testing.
    pub area: Rect,

    // Dirty flag - set when state changes and render is needed
    pub dirty: bool,

    // Config (immutable after init)
    pub config: Config,
}

impl Model {
    pub fn new(principal: User, config: Config, area: Rect) -> Self {
        let distance = config.drag_activation_distance;
        Self {
            store: EntityStore::new(),
            scope: ScopeSelector::new(),
            principal,
            screen: Screen::default(),
            org_cursor: 0,
            cursor: Cursor::default(),
            marked: BTreeSet::new(),
            mode: Mode::default(),
            project_drag: DragEngine::new(distance),
            task_drag: DragEngine::new(distance),
            input_buffer: String::new(),
            pending_name: None,
            pending_description: None,
            pending_deadline: None,
            notification: None,
            notified_op: None,
            show_keymap: false,
            area,
            dirty: true,
            config,
        }
    }

    // Accessor methods for UI and update

    pub fn selected_org(&self) -> Option<&Organization> {
        self.store.organizations().get(self.org_cursor)
    }

    pub fn current_org(&self) -> Option<&Organization> {
        self.scope.org().and_then(|id| self.store.organization(id))
    }

    pub fn current_project(&self) -> Option<&Project> {
        self.scope.project().and_then(|id| self.store.project(id))
    }

    pub fn board_projects(&self) -> Vec<&Project> {
        self.scope
            .org()
            .map(|org| self.store.projects_for(org))
            .unwrap_or_default()
    }

    pub fn board_tasks(&self) -> Vec<&Task> {
        self.scope
            .project()
            .map(|project| self.store.tasks_for(project))
            .unwrap_or_default()
    }

    fn card_at_cursor<'a, E: Card>(&self, entities: &[&'a E]) -> Option<&'a E> {
        board::columns(entities, self.principal.id)
            .get(self.cursor.column)
            .and_then(|col| col.get(self.cursor.row))
            .copied()
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.card_at_cursor(&self.board_projects())
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.card_at_cursor(&self.board_tasks())
    }

    /// Number of cards in each column of the board on screen.
    pub fn column_lengths(&self) -> Vec<usize> {
        let principal = self.principal.id;
        match self.screen {
            Screen::Organizations => vec![],
            Screen::Projects => board::columns(&self.board_projects(), principal)
                .iter()
                .map(Vec::len)
                .collect(),
            Screen::Tasks => board::columns(&self.board_tasks(), principal)
                .iter()
                .map(Vec::len)
                .collect(),
        }
    }

    /// Keep cursors inside the lists after a reload or move.
    pub fn clamp_cursors(&mut self) {
        let orgs = self.store.organizations().len();
        self.org_cursor = self.org_cursor.min(orgs.saturating_sub(1));

        let lengths = self.column_lengths();
        if lengths.is_empty() {
            return;
        }
        self.cursor.column = self.cursor.column.min(lengths.len() - 1);
        self.cursor.row = self
            .cursor
            .row
            .min(lengths[self.cursor.column].saturating_sub(1));
    }

    /// Move the cursor onto the card with `key`, if it is on the board.
    pub fn focus_card<E: Card>(&mut self, entities: &[&E], key: E::Key) {
        for (column, cards) in board::columns(entities, self.principal.id).iter().enumerate() {
            if let Some(row) = cards.iter().position(|c| c.key() == key) {
                self.cursor = Cursor { column, row };
                return;
            }
        }
    }

    pub fn project_layout(&self) -> BoardLayout<ProjectStatus, ProjectId> {
        board::layout(
            board::screen(self.area).body,
            &self.board_projects(),
            self.principal.id,
            self.selected_project().map(|p| p.id),
        )
    }

    pub fn task_layout(&self) -> BoardLayout<TaskStatus, TaskId> {
        board::layout(
            board::screen(self.area).body,
            &self.board_tasks(),
            self.principal.id,
            self.selected_task().map(|t| t.id),
        )
    }

    /// Scopes to re-fetch for the screen on display (`r`).
    pub fn reload_scopes(&self) -> Vec<Scope> {
        match (self.screen, self.scope.org(), self.scope.project()) {
            (Screen::Tasks, Some(org), Some(project)) => vec![Scope::Tasks(org, project)],
            (Screen::Projects, Some(org), _) => vec![Scope::Projects(org), Scope::Members(org)],
            _ => vec![Scope::Organizations],
        }
    }

    /// Create an immutable snapshot for the render thread.
    ///
    /// Each snapshot gets a monotonically increasing version number,
    /// enabling the render thread to detect state changes and skip
    /// redundant renders.
    pub fn snapshot(&self) -> RenderState {
        let principal = self.principal.id;
        let org = self.current_org().map(|o| OrgView {
            id: o.id,
            name: o.name.clone(),
            invite_code: o.invite_code.clone(),
            members: o
                .members
                .as_ref()
                .map(|m| m.iter().map(|u| u.short_name().to_string()).collect()),
        });

        let (steps, drag) = match self.screen {
            Screen::Projects => (
                stepper_labels(self.selected_project(), principal),
                drag_view(self.project_drag.gesture().map(|g| {
                    (g.snapshot.name.clone(), g.dragged_rect(), g.over.map(|s| s.position()))
                })),
            ),
            Screen::Tasks => (
                stepper_labels(self.selected_task(), principal),
                drag_view(self.task_drag.gesture().map(|g| {
                    (g.snapshot.name.clone(), g.dragged_rect(), g.over.map(|s| s.position()))
                })),
            ),
            Screen::Organizations => ((None, None), None),
        };

        RenderState {
            version: next_version(),
            screen: self.screen,
            principal,
            principal_name: self.principal.short_name().to_string(),
            organizations: self.store.organizations().to_vec(),
            org_cursor: self.org_cursor,
            org_load_error: self.store.org_load_error().map(str::to_string),
            org,
            project_name: self.current_project().map(|p| p.name.clone()),
            projects: self.board_projects().into_iter().cloned().collect(),
            tasks: self.board_tasks().into_iter().cloned().collect(),
            selected_project: self.selected_project().map(|p| p.id),
            selected_task: self.selected_task().map(|t| t.id),
            marked: self.marked.iter().copied().collect(),
            step_back: steps.0,
            step_forward: steps.1,
            drag,
            loading: self.reload_scopes().iter().any(|s| self.store.is_loading(s)),
            in_flight: self.store.ops().in_flight(),
            mode: self.mode,
            input_buffer: self.input_buffer.clone(),
            notification: self.notification.clone(),
            show_keymap: self.show_keymap,
        }
    }
}

fn stepper_labels<E: Transitionable>(
    entity: Option<&E>,
    principal: UserId,
) -> (Option<&'static str>, Option<&'static str>) {
    match entity {
        Some(e) => (
            step_target(e, principal, Step::Back).map(|s| s.label()),
            step_target(e, principal, Step::Forward).map(|s| s.label()),
        ),
        None => (None, None),
    }
}

fn drag_view(gesture: Option<(String, Rect, Option<usize>)>) -> Option<DragView> {
    gesture.map(|(title, rect, over)| DragView { title, rect, over })
}
