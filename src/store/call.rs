//! Remote calls issued by the store and the completions that come back.

use tokio_util::sync::CancellationToken;

use super::loads::{LoadTicket, Scope};
use super::ops::OpId;
use crate::api::{
    BulkMoveInput, CreateOrganizationInput, CreateProjectInput, CreateTaskInput,
    JoinOrganizationInput,
};
use crate::core::{
    OrgId, Organization, Project, ProjectId, ProjectStatus, Task, TaskId, TaskStatus, User,
};
use crate::Result;

/// What to ask the directory for.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Load(LoadTicket),
    CreateOrganization(CreateOrganizationInput),
    JoinOrganization(JoinOrganizationInput),
    CreateProject {
        org: OrgId,
        input: CreateProjectInput,
    },
    CreateTask {
        org: OrgId,
        project: ProjectId,
        input: CreateTaskInput,
    },
    UpdateProjectStatus {
        org: OrgId,
        project: ProjectId,
        status: ProjectStatus,
    },
    MoveTask {
        org: OrgId,
        project: ProjectId,
        task: TaskId,
        status: TaskStatus,
    },
    BulkMoveTasks {
        org: OrgId,
        project: ProjectId,
        input: BulkMoveInput,
    },
}

impl Request {
    pub fn scope(&self) -> Option<Scope> {
        match self {
            Request::Load(ticket) => Some(ticket.scope),
            _ => None,
        }
    }
}

/// A request tagged with its operation, ready to be executed.
#[derive(Debug, Clone)]
pub struct RemoteCall {
    pub op: OpId,
    pub request: Request,
    /// Present for scope loads; cancelled when the load is superseded or
    /// its scope is left.
    pub cancel: Option<CancellationToken>,
}

/// Successful directory answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Organizations(Vec<Organization>),
    Projects(Vec<Project>),
    Tasks(Vec<Task>),
    Members(Vec<User>),
    /// Create or join succeeded; the containing scope is re-fetched.
    Created,
    /// Status change accepted.
    Accepted,
}

/// The result of executing a [`RemoteCall`].
#[derive(Debug)]
pub struct Completion {
    pub op: OpId,
    pub request: Request,
    pub result: Result<Response>,
}
