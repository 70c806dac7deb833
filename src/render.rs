use std::sync::atomic::{AtomicU64, Ordering};

use ratatui::layout::Rect;

use crate::core::{OrgId, Organization, Project, ProjectId, Task, TaskId, UserId};
use crate::tea::{Mode, Notification, Screen};

/// Header information for the selected organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgView {
    pub id: OrgId,
    pub name: String,
    pub invite_code: String,
    /// Short member names, once loaded.
    pub members: Option<Vec<String>>,
}

/// The card being dragged, drawn over the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragView {
    pub title: String,
    pub rect: Rect,
    /// Column index of the current drop candidate.
    pub over: Option<usize>,
}

static VERSION_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn next_version() -> u64 {
    VERSION_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone)]
pub struct RenderState {
    pub version: u64,
    pub screen: Screen,
    pub principal: UserId,
    pub principal_name: String,

    pub organizations: Vec<Organization>,
    pub org_cursor: usize,
    /// Persistent banner after a failed organization load.
    pub org_load_error: Option<String>,
    pub org: Option<OrgView>,
    pub project_name: Option<String>,

    /// Cards of the board on screen.
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    pub selected_project: Option<ProjectId>,
    pub selected_task: Option<TaskId>,
    pub marked: Vec<TaskId>,
    /// Stepper targets (labels); `None` means that side is disabled.
    pub step_back: Option<&'static str>,
    pub step_forward: Option<&'static str>,
    pub drag: Option<DragView>,

    /// A load for the screen on display is in flight.
    pub loading: bool,
    pub in_flight: usize,

    pub mode: Mode,
    pub input_buffer: String,
    pub notification: Option<Notification>,
    /// Whether the keymap legend is expanded (toggled by '?')
    pub show_keymap: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            version: 0,
            screen: Screen::Organizations,
            principal: UserId::default(),
            principal_name: String::new(),
            organizations: Vec::new(),
            org_cursor: 0,
            org_load_error: None,
            org: None,
            project_name: None,
            projects: Vec::new(),
            tasks: Vec::new(),
            selected_project: None,
            selected_task: None,
            marked: Vec::new(),
            step_back: None,
            step_forward: None,
            drag: None,
            loading: false,
            in_flight: 0,
            mode: Mode::List,
            input_buffer: String::new(),
            notification: None,
            show_keymap: false,
        }
    }
}
