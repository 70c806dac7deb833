//! Scope-partitioned entity cache.
//!
//! The store owns the canonical copies of organizations, projects and tasks.
//! Every operation is split in two: a `begin` half that validates, applies
//! any optimistic change and returns the [`RemoteCall`] to execute, and
//! [`EntityStore::complete`], which folds the directory's answer back in.
//! Both halves run on the logic thread, so each merge or patch is applied
//! as one step.
//!
//! Consistency policy: status changes are optimistic with rollback; creates
//! and joins are refresh-after-write (the containing scope is re-fetched,
//! the echoed record is not inserted).

pub mod call;
pub mod loads;
pub mod ops;

use std::collections::HashMap;

use crate::api::{
    BulkMoveInput, CreateOrganizationInput, CreateProjectInput, CreateTaskInput,
    JoinOrganizationInput,
};
use crate::core::{
    Lifecycle, OrgId, Organization, Project, ProjectId, ProjectStatus, Task, TaskId, TaskStatus,
    UserId,
};
use crate::transition::{check_transition, is_authorized, TransitionError};
use crate::{tlog, tlog_debug, tlog_warn, Error, Result};

pub use call::{Completion, RemoteCall, Request, Response};
pub use loads::{LoadRegistry, LoadTicket, Scope};
pub use ops::{OpId, OpKind, OpState, Operation, OperationTracker};

/// Prior state captured before an optimistic status change.
#[derive(Debug, Clone)]
enum Rollback {
    Project {
        id: ProjectId,
        prior: ProjectStatus,
        applied: ProjectStatus,
    },
    Tasks {
        prior: Vec<(TaskId, TaskStatus)>,
        applied: TaskStatus,
    },
}

/// How a completion was folded into the store.
#[derive(Debug)]
pub enum Outcome {
    /// Applied; the calls are follow-ups (refresh-after-write).
    Applied(Vec<RemoteCall>),
    /// Response for a superseded or cancelled load; nothing changed.
    Discarded,
    /// The operation failed; any optimistic change has been undone.
    Failed { op: OpId, message: String },
}

#[derive(Debug, Default)]
pub struct EntityStore {
    organizations: Vec<Organization>,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    ops: OperationTracker,
    loads: LoadRegistry,
    rollbacks: HashMap<OpId, Rollback>,
    org_load_error: Option<String>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    pub fn organizations(&self) -> &[Organization] {
        &self.organizations
    }

    pub fn organization(&self, id: OrgId) -> Option<&Organization> {
        self.organizations.iter().find(|o| o.id == id)
    }

    pub fn projects_for(&self, org: OrgId) -> Vec<&Project> {
        self.projects.iter().filter(|p| p.org_id == org).collect()
    }

    pub fn project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn tasks_for(&self, project: ProjectId) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.project_id == project)
            .collect()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn ops(&self) -> &OperationTracker {
        &self.ops
    }

    pub fn is_busy(&self) -> bool {
        self.ops.is_busy()
    }

    pub fn is_loading(&self, scope: &Scope) -> bool {
        self.loads.is_loading(scope)
    }

    /// Persistent error from the last organization load, until one succeeds.
    pub fn org_load_error(&self) -> Option<&str> {
        self.org_load_error.as_deref()
    }

    pub fn dismiss(&mut self, op: OpId) -> bool {
        self.ops.dismiss(op)
    }

    pub fn dismiss_all(&mut self) {
        self.ops.dismiss_all();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Loads
    // ─────────────────────────────────────────────────────────────────────

    fn begin_load(&mut self, scope: Scope, kind: OpKind) -> RemoteCall {
        let op = self.ops.begin(kind);
        let (ticket, token, superseded) = self.loads.begin(scope, op);
        if let Some(prev) = superseded {
            tlog_debug!("load superseded scope={} {}", scope, prev);
            self.ops.forget(prev);
        }
        tlog_debug!("load begin scope={} gen={} {}", scope, ticket.generation, op);
        RemoteCall {
            op,
            request: Request::Load(ticket),
            cancel: Some(token),
        }
    }

    pub fn load_organizations(&mut self) -> RemoteCall {
        self.begin_load(Scope::Organizations, OpKind::LoadOrganizations)
    }

    pub fn load_projects(&mut self, org: OrgId) -> RemoteCall {
        self.begin_load(Scope::Projects(org), OpKind::LoadProjects)
    }

    pub fn load_tasks(&mut self, org: OrgId, project: ProjectId) -> RemoteCall {
        self.begin_load(Scope::Tasks(org, project), OpKind::LoadTasks)
    }

    pub fn load_members(&mut self, org: OrgId) -> RemoteCall {
        self.begin_load(Scope::Members(org), OpKind::LoadMembers)
    }

    /// Start a load for any scope.
    pub fn load(&mut self, scope: Scope) -> RemoteCall {
        match scope {
            Scope::Organizations => self.load_organizations(),
            Scope::Projects(org) => self.load_projects(org),
            Scope::Tasks(org, project) => self.load_tasks(org, project),
            Scope::Members(org) => self.load_members(org),
        }
    }

    /// Cancel in-flight loads for scopes the user navigated away from.
    pub fn cancel_loads(&mut self, scopes: &[Scope]) {
        for scope in scopes {
            if let Some(op) = self.loads.cancel(scope) {
                tlog_debug!("load cancelled scope={} {}", scope, op);
                self.ops.forget(op);
            }
        }
    }

    pub fn cancel_org_loads(&mut self, org: OrgId) {
        for op in self.loads.cancel_org(org) {
            self.ops.forget(op);
        }
    }

    fn apply_load(&mut self, scope: Scope, response: Response) {
        match (scope, response) {
            (Scope::Organizations, Response::Organizations(mut orgs)) => {
                for org in orgs.iter_mut().filter(|o| o.members.is_none()) {
                    org.members = self
                        .organization(org.id)
                        .and_then(|old| old.members.clone());
                }
                tlog!("loaded {} organizations", orgs.len());
                self.organizations = orgs;
                self.org_load_error = None;
            }
            (Scope::Projects(org), Response::Projects(list)) => {
                self.projects.retain(|p| p.org_id != org);
                let before = self.projects.len();
                self.projects
                    .extend(list.into_iter().filter(|p| p.org_id == org));
                tlog!(
                    "loaded {} projects for org={}",
                    self.projects.len() - before,
                    org.short()
                );
            }
            (Scope::Tasks(_, project), Response::Tasks(list)) => {
                self.tasks.retain(|t| t.project_id != project);
                let before = self.tasks.len();
                self.tasks
                    .extend(list.into_iter().filter(|t| t.project_id == project));
                tlog!(
                    "loaded {} tasks for project={}",
                    self.tasks.len() - before,
                    project.short()
                );
            }
            (Scope::Members(org), Response::Members(members)) => {
                if let Some(o) = self.organizations.iter_mut().find(|o| o.id == org) {
                    o.members = Some(members);
                }
            }
            (scope, response) => {
                tlog_warn!("load response does not match scope={}: {:?}", scope, response);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Creates (refresh-after-write)
    // ─────────────────────────────────────────────────────────────────────

    fn begin_call(&mut self, kind: OpKind, request: Request) -> RemoteCall {
        let op = self.ops.begin(kind);
        tlog_debug!("{:?} begin {}", kind, op);
        RemoteCall {
            op,
            request,
            cancel: None,
        }
    }

    pub fn create_organization(&mut self, name: &str) -> Result<RemoteCall> {
        let name = required("Organization name", name)?;
        Ok(self.begin_call(
            OpKind::CreateOrganization,
            Request::CreateOrganization(CreateOrganizationInput { name }),
        ))
    }

    /// Invite codes are case-insensitive; they are sent upper-cased.
    pub fn join_organization(&mut self, invite_code: &str) -> Result<RemoteCall> {
        let invite_code = required("Invite code", invite_code)?.to_uppercase();
        Ok(self.begin_call(
            OpKind::JoinOrganization,
            Request::JoinOrganization(JoinOrganizationInput { invite_code }),
        ))
    }

    pub fn create_project(&mut self, org: OrgId, input: CreateProjectInput) -> Result<RemoteCall> {
        let name = required("Project name", &input.name)?;
        if self.organization(org).is_none() {
            return Err(Error::NotFound(format!("organization {}", org)));
        }
        let input = CreateProjectInput {
            name,
            description: input.description.trim().to_string(),
            ..input
        };
        Ok(self.begin_call(OpKind::CreateProject, Request::CreateProject { org, input }))
    }

    pub fn create_task(
        &mut self,
        org: OrgId,
        project: ProjectId,
        input: CreateTaskInput,
    ) -> Result<RemoteCall> {
        let name = required("Task name", &input.name)?;
        match self.project(project) {
            Some(p) if p.org_id == org => {}
            _ => return Err(Error::NotFound(format!("project {}", project))),
        }
        let input = CreateTaskInput {
            name,
            description: input.description.trim().to_string(),
            ..input
        };
        Ok(self.begin_call(
            OpKind::CreateTask,
            Request::CreateTask {
                org,
                project,
                input,
            },
        ))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Status transitions (optimistic)
    // ─────────────────────────────────────────────────────────────────────

    pub fn update_project_status(
        &mut self,
        principal: UserId,
        project_id: ProjectId,
        target: ProjectStatus,
    ) -> Result<RemoteCall> {
        let project = self
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| Error::NotFound(format!("project {}", project_id)))?;
        check_transition(&*project, principal, target)?;

        let prior = project.status;
        project.status = target;
        let org = project.org_id;
        tlog!(
            "project={} {} -> {} (optimistic)",
            project_id.short(),
            prior,
            target
        );

        let call = self.begin_call(
            OpKind::UpdateProjectStatus,
            Request::UpdateProjectStatus {
                org,
                project: project_id,
                status: target,
            },
        );
        self.rollbacks.insert(
            call.op,
            Rollback::Project {
                id: project_id,
                prior,
                applied: target,
            },
        );
        Ok(call)
    }

    fn org_of_project(&self, project: ProjectId) -> Result<OrgId> {
        self.project(project)
            .map(|p| p.org_id)
            .ok_or_else(|| Error::NotFound(format!("project {}", project)))
    }

    pub fn update_task_status(
        &mut self,
        principal: UserId,
        task_id: TaskId,
        target: TaskStatus,
    ) -> Result<RemoteCall> {
        let project = self
            .task(task_id)
            .map(|t| t.project_id)
            .ok_or_else(|| Error::NotFound(format!("task {}", task_id)))?;
        let org = self.org_of_project(project)?;

        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(format!("task {}", task_id)))?;
        check_transition(&*task, principal, target)?;

        let prior = task.status;
        task.status = target;
        tlog!(
            "task={} {} -> {} (optimistic)",
            task_id.short(),
            prior,
            target
        );

        let call = self.begin_call(
            OpKind::MoveTask,
            Request::MoveTask {
                org,
                project,
                task: task_id,
                status: target,
            },
        );
        self.rollbacks.insert(
            call.op,
            Rollback::Tasks {
                prior: vec![(task_id, prior)],
                applied: target,
            },
        );
        Ok(call)
    }

    /// Move several tasks of one project at once.
    ///
    /// Tasks the principal may not move, or that already have `target`, are
    /// left out of the request. If nothing is left, no call is made and the
    /// reason is returned as an error.
    pub fn bulk_move_tasks(
        &mut self,
        principal: UserId,
        project: ProjectId,
        task_ids: &[TaskId],
        target: TaskStatus,
    ) -> Result<RemoteCall> {
        let org = self.org_of_project(project)?;

        let mut prior = Vec::new();
        let mut unauthorized = 0;
        for task in self
            .tasks
            .iter_mut()
            .filter(|t| t.project_id == project && task_ids.contains(&t.id))
        {
            if !is_authorized(&*task, principal) {
                unauthorized += 1;
                continue;
            }
            if task.status == target {
                continue;
            }
            prior.push((task.id, task.status));
            task.status = target;
        }

        if prior.is_empty() {
            return Err(if unauthorized > 0 {
                TransitionError::NotAuthorized.into()
            } else {
                TransitionError::Unchanged(target.as_str()).into()
            });
        }
        if unauthorized > 0 {
            tlog_debug!("bulk move skipped {} unauthorized tasks", unauthorized);
        }
        tlog!(
            "bulk move {} tasks -> {} (optimistic)",
            prior.len(),
            target
        );

        let input = BulkMoveInput {
            task_ids: prior.iter().map(|(id, _)| *id).collect(),
            status: target,
        };
        let call = self.begin_call(
            OpKind::BulkMoveTasks,
            Request::BulkMoveTasks {
                org,
                project,
                input,
            },
        );
        self.rollbacks.insert(
            call.op,
            Rollback::Tasks {
                prior,
                applied: target,
            },
        );
        Ok(call)
    }

    fn roll_back(&mut self, op: OpId) {
        let Some(rollback) = self.rollbacks.remove(&op) else {
            return;
        };
        match rollback {
            Rollback::Project { id, prior, applied } => {
                if let Some(p) = self
                    .projects
                    .iter_mut()
                    .find(|p| p.id == id && p.status == applied)
                {
                    p.status = prior;
                    tlog!("project={} rolled back to {}", id.short(), prior);
                }
            }
            Rollback::Tasks { prior, applied } => {
                for (id, status) in prior {
                    if let Some(t) = self
                        .tasks
                        .iter_mut()
                        .find(|t| t.id == id && t.status == applied)
                    {
                        t.status = status;
                        tlog!("task={} rolled back to {}", id.short(), status);
                    }
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Completion
    // ─────────────────────────────────────────────────────────────────────

    pub fn complete(&mut self, completion: Completion) -> Outcome {
        let Completion {
            op,
            request,
            result,
        } = completion;

        if let Request::Load(ticket) = &request {
            if !self.loads.finish(ticket) {
                tlog_debug!(
                    "discarding stale response scope={} gen={}",
                    ticket.scope,
                    ticket.generation
                );
                self.ops.forget(op);
                return Outcome::Discarded;
            }
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => return self.fail(op, &request, e),
        };
        self.ops.succeed(op);
        self.rollbacks.remove(&op);

        let follow_ups = match request {
            Request::Load(ticket) => {
                self.apply_load(ticket.scope, response);
                vec![]
            }
            Request::CreateOrganization(_) | Request::JoinOrganization(_) => {
                vec![self.load_organizations()]
            }
            Request::CreateProject { org, .. } => vec![self.load_projects(org)],
            Request::CreateTask { org, project, .. } => vec![self.load_tasks(org, project)],
            Request::UpdateProjectStatus { .. }
            | Request::MoveTask { .. }
            | Request::BulkMoveTasks { .. } => vec![],
        };
        Outcome::Applied(follow_ups)
    }

    fn fail(&mut self, op: OpId, request: &Request, error: Error) -> Outcome {
        let kind = self.ops.get(op).map(|o| o.kind);
        let message = match kind {
            Some(kind) => format!("{}: {}", kind.describe(), error),
            None => error.to_string(),
        };
        tlog_warn!("{} failed: {}", op, message);

        self.roll_back(op);
        if request.scope() == Some(Scope::Organizations) {
            self.organizations.clear();
            self.org_load_error = Some(message.clone());
        }
        self.ops.fail(op, message.clone());
        Outcome::Failed { op, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::User;

    fn user(id: UserId) -> User {
        User {
            id,
            email: String::new(),
            full_name: String::new(),
        }
    }

    fn org(name: &str) -> Organization {
        Organization {
            id: OrgId::new(),
            name: name.to_string(),
            invite_code: "ABC123".to_string(),
            created_by: None,
            members: None,
        }
    }

    fn project(org: OrgId, created_by: UserId, status: ProjectStatus) -> Project {
        Project {
            id: ProjectId::new(),
            org_id: org,
            name: "Launch".to_string(),
            description: String::new(),
            status,
            deadline: None,
            created_by,
            assignees: vec![],
        }
    }

    fn task(project: ProjectId, created_by: UserId, status: TaskStatus) -> Task {
        Task {
            id: TaskId::new(),
            project_id: project,
            name: "Copy".to_string(),
            description: String::new(),
            status,
            deadline: None,
            created_by,
            assignees: vec![],
        }
    }

    fn ok(call: RemoteCall, response: Response) -> Completion {
        Completion {
            op: call.op,
            request: call.request,
            result: Ok(response),
        }
    }

    fn err(call: RemoteCall, error: Error) -> Completion {
        Completion {
            op: call.op,
            request: call.request,
            result: Err(error),
        }
    }

    fn network() -> Error {
        Error::Network("connection refused".to_string())
    }

    /// Store holding one org with the given projects and tasks.
    fn seeded(o: &Organization, projects: Vec<Project>, tasks: Vec<Task>) -> EntityStore {
        let mut store = EntityStore::new();
        let call = store.load_organizations();
        store.complete(ok(call, Response::Organizations(vec![o.clone()])));
        let call = store.load_projects(o.id);
        store.complete(ok(call, Response::Projects(projects.clone())));
        for p in &projects {
            let call = store.load_tasks(o.id, p.id);
            let list = tasks
                .iter()
                .filter(|t| t.project_id == p.id)
                .cloned()
                .collect();
            store.complete(ok(call, Response::Tasks(list)));
        }
        store
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Load / merge
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_load_projects_is_scope_isolated() {
        let (x, y) = (org("X"), org("Y"));
        let me = UserId::new();
        let mut store = EntityStore::new();
        let call = store.load_organizations();
        store.complete(ok(call, Response::Organizations(vec![x.clone(), y.clone()])));

        let xp = vec![project(x.id, me, ProjectStatus::Idea)];
        let call = store.load_projects(x.id);
        store.complete(ok(call, Response::Projects(xp.clone())));
        let call = store.load_projects(y.id);
        store.complete(ok(
            call,
            Response::Projects(vec![project(y.id, me, ProjectStatus::Finished)]),
        ));

        let cached: Vec<Project> = store.projects_for(x.id).into_iter().cloned().collect();
        assert_eq!(cached, xp);
        assert_eq!(store.projects_for(y.id).len(), 1);
    }

    #[test]
    fn test_repeated_load_replaces_scope() {
        let o = org("X");
        let me = UserId::new();
        let list = vec![
            project(o.id, me, ProjectStatus::Idea),
            project(o.id, me, ProjectStatus::Idea),
        ];
        let mut store = seeded(&o, list.clone(), vec![]);

        let call = store.load_projects(o.id);
        store.complete(ok(call, Response::Projects(list.clone())));
        assert_eq!(store.projects_for(o.id).len(), 2);
    }

    #[test]
    fn test_load_drops_records_outside_scope() {
        let (x, y) = (org("X"), org("Y"));
        let me = UserId::new();
        let mut store = seeded(&x, vec![], vec![]);
        let call = store.load_projects(x.id);
        store.complete(ok(
            call,
            Response::Projects(vec![project(y.id, me, ProjectStatus::Idea)]),
        ));
        assert!(store.projects_for(y.id).is_empty());
    }

    #[test]
    fn test_superseded_load_is_discarded() {
        let o = org("X");
        let me = UserId::new();
        let mut store = seeded(&o, vec![], vec![]);

        let first = store.load_projects(o.id);
        let second = store.load_projects(o.id);
        assert!(first.cancel.as_ref().unwrap().is_cancelled());

        let newest = vec![project(o.id, me, ProjectStatus::Finished)];
        store.complete(ok(second, Response::Projects(newest.clone())));
        let outcome = store.complete(ok(
            first,
            Response::Projects(vec![project(o.id, me, ProjectStatus::Idea)]),
        ));

        assert!(matches!(outcome, Outcome::Discarded));
        assert_eq!(store.projects_for(o.id)[0], &newest[0]);
        assert!(!store.is_busy());
    }

    #[test]
    fn test_cancelled_load_is_discarded() {
        let o = org("X");
        let me = UserId::new();
        let mut store = seeded(&o, vec![], vec![]);

        let call = store.load_projects(o.id);
        store.cancel_org_loads(o.id);
        assert!(!store.is_busy());
        let outcome = store.complete(ok(
            call,
            Response::Projects(vec![project(o.id, me, ProjectStatus::Idea)]),
        ));
        assert!(matches!(outcome, Outcome::Discarded));
        assert!(store.projects_for(o.id).is_empty());
    }

    #[test]
    fn test_org_load_failure_clears_list_and_sets_banner() {
        let o = org("X");
        let mut store = seeded(&o, vec![], vec![]);

        let call = store.load_organizations();
        let outcome = store.complete(err(call, network()));
        assert!(matches!(outcome, Outcome::Failed { .. }));
        assert!(store.organizations().is_empty());
        assert!(store
            .org_load_error()
            .is_some_and(|e| e.starts_with("Failed to load organizations")));

        let call = store.load_organizations();
        store.complete(ok(call, Response::Organizations(vec![o])));
        assert!(store.org_load_error().is_none());
    }

    #[test]
    fn test_project_load_failure_keeps_cache() {
        let o = org("X");
        let me = UserId::new();
        let mut store = seeded(&o, vec![project(o.id, me, ProjectStatus::Idea)], vec![]);
        let call = store.load_projects(o.id);
        store.complete(err(call, network()));
        assert_eq!(store.projects_for(o.id).len(), 1);
        assert_eq!(store.ops().failures().count(), 1);
    }

    #[test]
    fn test_members_fill_org_and_survive_reload() {
        let o = org("X");
        let mut store = seeded(&o, vec![], vec![]);
        let call = store.load_members(o.id);
        store.complete(ok(call, Response::Members(vec![user(UserId::new())])));
        assert_eq!(store.organization(o.id).unwrap().members.as_ref().unwrap().len(), 1);

        let call = store.load_organizations();
        store.complete(ok(call, Response::Organizations(vec![o.clone()])));
        assert!(store.organization(o.id).unwrap().members.is_some());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Creates
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_blank_name_rejected_before_call() {
        let mut store = EntityStore::new();
        assert!(matches!(
            store.create_organization("   "),
            Err(Error::Validation(_))
        ));
        assert!(!store.is_busy());
    }

    #[test]
    fn test_create_reloads_containing_scope() {
        let o = org("X");
        let mut store = seeded(&o, vec![], vec![]);
        let call = store
            .create_project(
                o.id,
                CreateProjectInput {
                    name: "  Site ".to_string(),
                    description: String::new(),
                    deadline: None,
                    assignee_ids: vec![],
                    status: ProjectStatus::Idea,
                },
            )
            .unwrap();
        match &call.request {
            Request::CreateProject { input, .. } => assert_eq!(input.name, "Site"),
            other => panic!("unexpected request {:?}", other),
        }

        match store.complete(ok(call, Response::Created)) {
            Outcome::Applied(follow_ups) => {
                assert_eq!(follow_ups.len(), 1);
                assert_eq!(
                    follow_ups[0].request.scope(),
                    Some(Scope::Projects(o.id))
                );
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(store.projects_for(o.id).is_empty());
    }

    #[test]
    fn test_join_uppercases_code() {
        let mut store = EntityStore::new();
        let call = store.join_organization(" k7q2zd ").unwrap();
        assert_eq!(
            call.request,
            Request::JoinOrganization(JoinOrganizationInput {
                invite_code: "K7Q2ZD".to_string()
            })
        );
    }

    #[test]
    fn test_failed_join_leaves_orgs_unchanged() {
        let o = org("X");
        let mut store = seeded(&o, vec![], vec![]);
        let call = store.join_organization("NOPE00").unwrap();
        let outcome = store.complete(err(
            call,
            Error::Protocol {
                status: 400,
                message: "Invalid or expired invite code".to_string(),
            },
        ));
        assert!(matches!(outcome, Outcome::Failed { .. }));
        assert_eq!(store.organizations(), &[o]);
    }

    #[test]
    fn test_create_task_requires_cached_project() {
        let o = org("X");
        let mut store = seeded(&o, vec![], vec![]);
        let result = store.create_task(
            o.id,
            ProjectId::new(),
            CreateTaskInput {
                name: "T".to_string(),
                description: String::new(),
                deadline: None,
                assignee_ids: vec![],
            },
        );
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Transitions
    // ═══════════════════════════════════════════════════════════════════════

    #[test]
    fn test_project_status_applied_before_completion() {
        let o = org("X");
        let me = UserId::new();
        let p = project(o.id, me, ProjectStatus::Idea);
        let mut store = seeded(&o, vec![p.clone()], vec![]);

        let call = store
            .update_project_status(me, p.id, ProjectStatus::Finished)
            .unwrap();
        assert_eq!(store.project(p.id).unwrap().status, ProjectStatus::Finished);
        assert!(store.is_busy());

        store.complete(ok(call, Response::Accepted));
        assert_eq!(store.project(p.id).unwrap().status, ProjectStatus::Finished);
        assert!(!store.is_busy());
    }

    #[test]
    fn test_unauthorized_transition_changes_nothing() {
        let o = org("X");
        let p = project(o.id, UserId::new(), ProjectStatus::Idea);
        let mut store = seeded(&o, vec![p.clone()], vec![]);

        let result = store.update_project_status(UserId::new(), p.id, ProjectStatus::InProgress);
        assert!(matches!(
            result,
            Err(Error::Transition(TransitionError::NotAuthorized))
        ));
        assert_eq!(store.project(p.id).unwrap().status, ProjectStatus::Idea);
        assert!(!store.is_busy());
    }

    #[test]
    fn test_failed_transition_rolls_back() {
        let o = org("X");
        let me = UserId::new();
        let p = project(o.id, me, ProjectStatus::Idea);
        let t = task(p.id, me, TaskStatus::NotStarted);
        let mut store = seeded(&o, vec![p.clone()], vec![t.clone()]);

        let call = store.update_task_status(me, t.id, TaskStatus::Done).unwrap();
        assert_eq!(store.task(t.id).unwrap().status, TaskStatus::Done);
        let outcome = store.complete(err(call, network()));

        match outcome {
            Outcome::Failed { message, .. } => assert!(message.starts_with("Failed to move task")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(store.task(t.id).unwrap().status, TaskStatus::NotStarted);
    }

    #[test]
    fn test_rollback_skips_entity_changed_since() {
        let o = org("X");
        let me = UserId::new();
        let p = project(o.id, me, ProjectStatus::Idea);
        let mut store = seeded(&o, vec![p.clone()], vec![]);

        let first = store
            .update_project_status(me, p.id, ProjectStatus::InProgress)
            .unwrap();
        let second = store
            .update_project_status(me, p.id, ProjectStatus::Finished)
            .unwrap();
        store.complete(err(first, network()));
        assert_eq!(store.project(p.id).unwrap().status, ProjectStatus::Finished);
        store.complete(ok(second, Response::Accepted));
        assert_eq!(store.project(p.id).unwrap().status, ProjectStatus::Finished);
    }

    #[test]
    fn test_bulk_move_skips_unauthorized_and_unchanged() {
        let o = org("X");
        let me = UserId::new();
        let p = project(o.id, me, ProjectStatus::Idea);
        let mine = task(p.id, me, TaskStatus::NotStarted);
        let done = task(p.id, me, TaskStatus::Done);
        let theirs = task(p.id, UserId::new(), TaskStatus::NotStarted);
        let mut store = seeded(
            &o,
            vec![p.clone()],
            vec![mine.clone(), done.clone(), theirs.clone()],
        );

        let call = store
            .bulk_move_tasks(me, p.id, &[mine.id, done.id, theirs.id], TaskStatus::Done)
            .unwrap();
        match &call.request {
            Request::BulkMoveTasks { input, .. } => assert_eq!(input.task_ids, vec![mine.id]),
            other => panic!("unexpected request {:?}", other),
        }
        assert_eq!(store.task(theirs.id).unwrap().status, TaskStatus::NotStarted);
    }

    #[test]
    fn test_bulk_move_with_nothing_to_send() {
        let o = org("X");
        let p = project(o.id, UserId::new(), ProjectStatus::Idea);
        let theirs = task(p.id, UserId::new(), TaskStatus::NotStarted);
        let mut store = seeded(&o, vec![p.clone()], vec![theirs.clone()]);

        let result = store.bulk_move_tasks(UserId::new(), p.id, &[theirs.id], TaskStatus::Done);
        assert!(matches!(
            result,
            Err(Error::Transition(TransitionError::NotAuthorized))
        ));
        assert!(!store.is_busy());
    }

    #[test]
    fn test_bulk_move_rollback_restores_each_prior() {
        let o = org("X");
        let me = UserId::new();
        let p = project(o.id, me, ProjectStatus::Idea);
        let a = task(p.id, me, TaskStatus::NotStarted);
        let b = task(p.id, me, TaskStatus::InProgress);
        let mut store = seeded(&o, vec![p.clone()], vec![a.clone(), b.clone()]);

        let call = store
            .bulk_move_tasks(me, p.id, &[a.id, b.id], TaskStatus::Done)
            .unwrap();
        store.complete(err(call, network()));
        assert_eq!(store.task(a.id).unwrap().status, TaskStatus::NotStarted);
        assert_eq!(store.task(b.id).unwrap().status, TaskStatus::InProgress);
    }
}
