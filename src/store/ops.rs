//! Per-operation progress tracking.
//!
//! Each remote operation gets its own [`OpId`] and state, so overlapping
//! operations never overwrite each other's progress or failure message.

use std::collections::BTreeMap;

/// Identity of one remote operation, unique for the life of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(u64);

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    LoadOrganizations,
    LoadProjects,
    LoadTasks,
    LoadMembers,
    CreateOrganization,
    JoinOrganization,
    CreateProject,
    CreateTask,
    UpdateProjectStatus,
    MoveTask,
    BulkMoveTasks,
}

impl OpKind {
    /// Short description used as the prefix of failure notifications.
    pub fn describe(&self) -> &'static str {
        match self {
            OpKind::LoadOrganizations => "Failed to load organizations",
            OpKind::LoadProjects => "Failed to load projects",
            OpKind::LoadTasks => "Failed to load tasks",
            OpKind::LoadMembers => "Failed to load members",
            OpKind::CreateOrganization => "Failed to create organization",
            OpKind::JoinOrganization => "Failed to join organization",
            OpKind::CreateProject => "Failed to create project",
            OpKind::CreateTask => "Failed to create task",
            OpKind::UpdateProjectStatus => "Failed to update project",
            OpKind::MoveTask => "Failed to move task",
            OpKind::BulkMoveTasks => "Failed to move tasks",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpState {
    InFlight,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    pub state: OpState,
}

#[derive(Debug, Default)]
pub struct OperationTracker {
    next_id: u64,
    ops: BTreeMap<OpId, Operation>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, kind: OpKind) -> OpId {
        self.next_id += 1;
        let id = OpId(self.next_id);
        self.ops.insert(
            id,
            Operation {
                kind,
                state: OpState::InFlight,
            },
        );
        id
    }

    /// A successful op leaves no trace.
    pub fn succeed(&mut self, id: OpId) {
        self.ops.remove(&id);
    }

    pub fn fail(&mut self, id: OpId, message: impl Into<String>) {
        if let Some(op) = self.ops.get_mut(&id) {
            op.state = OpState::Failed(message.into());
        }
    }

    /// Drop an op without recording an outcome (cancelled loads).
    pub fn forget(&mut self, id: OpId) {
        self.ops.remove(&id);
    }

    /// Dismiss a failure. In-flight ops are left alone.
    pub fn dismiss(&mut self, id: OpId) -> bool {
        match self.ops.get(&id) {
            Some(Operation {
                state: OpState::Failed(_),
                ..
            }) => {
                self.ops.remove(&id);
                true
            }
            _ => false,
        }
    }

    pub fn dismiss_all(&mut self) {
        self.ops.retain(|_, op| op.state == OpState::InFlight);
    }

    pub fn get(&self, id: OpId) -> Option<&Operation> {
        self.ops.get(&id)
    }

    pub fn is_busy(&self) -> bool {
        self.ops.values().any(|op| op.state == OpState::InFlight)
    }

    pub fn in_flight(&self) -> usize {
        self.ops
            .values()
            .filter(|op| op.state == OpState::InFlight)
            .count()
    }

    /// Failed ops, oldest first.
    pub fn failures(&self) -> impl Iterator<Item = (OpId, OpKind, &str)> {
        self.ops.iter().filter_map(|(id, op)| match &op.state {
            OpState::Failed(msg) => Some((*id, op.kind, msg.as_str())),
            OpState::InFlight => None,
        })
    }

    pub fn latest_failure(&self) -> Option<(OpId, OpKind, &str)> {
        self.failures().last()
    }
}
