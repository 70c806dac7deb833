//! In-process directory used by tests and `--demo`.
//!
//! Applies the same membership and authorization rules as the real
//! directory so client behavior can be exercised without a server. Every
//! call is recorded, which lets callers assert that nothing was sent.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::{
    AuthResponse, BulkMoveInput, CreateOrganizationInput, CreateProjectInput, CreateTaskInput,
    DirectoryApi, JoinOrganizationInput, RegisterInput,
};
use crate::core::{
    OrgId, Organization, Project, ProjectId, ProjectStatus, Task, TaskId, TaskStatus, User, UserId,
};
use crate::transition::is_authorized;
use crate::{Error, Result};

const INVITE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    principal: Option<UserId>,
    users: HashMap<UserId, User>,
    passwords: HashMap<String, (String, UserId)>,
    orgs: Vec<Organization>,
    memberships: HashMap<OrgId, Vec<UserId>>,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    offline: bool,
    fail_next: Option<(u16, String)>,
    calls: Vec<String>,
}

fn protocol(status: u16, message: &str) -> Error {
    Error::Protocol {
        status,
        message: message.to_string(),
    }
}

fn poisoned<E: std::fmt::Display>(err: E) -> Error {
    Error::Network(format!("directory state poisoned: {}", err))
}

fn invite_code() -> String {
    uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(6)
        .map(|b| INVITE_CHARSET[*b as usize % INVITE_CHARSET.len()] as char)
        .collect()
}

impl MemoryState {
    fn require_principal(&self) -> Result<UserId> {
        self.principal
            .ok_or_else(|| protocol(401, "Authorization header required"))
    }

    fn require_member(&self, org_id: OrgId) -> Result<UserId> {
        let user = self.require_principal()?;
        let is_member = self
            .memberships
            .get(&org_id)
            .is_some_and(|m| m.contains(&user));
        if !is_member {
            return Err(protocol(403, "Not a member of this organization"));
        }
        Ok(user)
    }

    fn resolve_users(&self, ids: &[UserId]) -> Vec<User> {
        ids.iter()
            .filter_map(|id| self.users.get(id).cloned())
            .collect()
    }

    fn project_in_org(&self, org_id: OrgId, project_id: ProjectId) -> Result<&Project> {
        self.projects
            .iter()
            .find(|p| p.id == project_id && p.org_id == org_id)
            .ok_or_else(|| protocol(404, "Project not found"))
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(poisoned)
    }

    /// Record the call and apply connectivity faults.
    fn enter(&self, call: &str) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        let mut state = self.write()?;
        state.calls.push(call.to_string());
        if state.offline {
            return Err(Error::Network("connection refused".to_string()));
        }
        if let Some((status, message)) = state.fail_next.take() {
            return Err(Error::Protocol { status, message });
        }
        Ok(state)
    }

    // Seeding

    pub fn add_user(&self, user: User, password: &str) -> Result<()> {
        let mut state = self.write()?;
        state
            .passwords
            .insert(user.email.clone(), (password.to_string(), user.id));
        state.users.insert(user.id, user);
        Ok(())
    }

    /// Act as `user` for subsequent calls, as if its credential were stored.
    pub fn sign_in_as(&self, user: UserId) -> Result<()> {
        self.write()?.principal = Some(user);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<()> {
        self.write()?.principal = None;
        Ok(())
    }

    pub fn add_organization(&self, org: Organization, members: &[UserId]) -> Result<()> {
        let mut state = self.write()?;
        state.memberships.insert(org.id, members.to_vec());
        state.orgs.push(org);
        Ok(())
    }

    pub fn add_project(&self, project: Project) -> Result<()> {
        self.write()?.projects.push(project);
        Ok(())
    }

    pub fn add_task(&self, task: Task) -> Result<()> {
        self.write()?.tasks.push(task);
        Ok(())
    }

    // Fault injection

    pub fn set_offline(&self, offline: bool) -> Result<()> {
        self.write()?.offline = offline;
        Ok(())
    }

    /// Make the next call fail with the given status and `{"error"}` message.
    pub fn fail_next(&self, status: u16, message: &str) -> Result<()> {
        self.write()?.fail_next = Some((status, message.to_string()));
        Ok(())
    }

    // Inspection

    /// Names of the calls received so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        self.read().map(|s| s.calls.clone()).unwrap_or_default()
    }

    pub fn project(&self, id: ProjectId) -> Option<Project> {
        self.read()
            .ok()?
            .projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.read().ok()?.tasks.iter().find(|t| t.id == id).cloned()
    }

    /// A small seeded directory with one signed-in user.
    pub fn demo() -> Result<Self> {
        let dir = Self::new();
        let ada = User {
            id: UserId::new(),
            email: "ada@example.com".to_string(),
            full_name: "Ada Lovelace".to_string(),
        };
        let grace = User {
            id: UserId::new(),
            email: "grace@example.com".to_string(),
            full_name: "Grace Hopper".to_string(),
        };
        dir.add_user(ada.clone(), "demo")?;
        dir.add_user(grace.clone(), "demo")?;
        dir.sign_in_as(ada.id)?;

        let org = Organization {
            id: OrgId::new(),
            name: "Analytical Engines".to_string(),
            invite_code: "ADA001".to_string(),
            created_by: Some(ada.id),
            members: None,
        };
        dir.add_organization(org.clone(), &[ada.id, grace.id])?;
        dir.add_organization(
            Organization {
                id: OrgId::new(),
                name: "Compilers Guild".to_string(),
                invite_code: "COBOL1".to_string(),
                created_by: Some(grace.id),
                members: None,
            },
            &[grace.id],
        )?;

        let now = Utc::now();
        let website = Project {
            id: ProjectId::new(),
            org_id: org.id,
            name: "Website relaunch".to_string(),
            description: "New landing page and docs".to_string(),
            status: ProjectStatus::InProgress,
            deadline: Some(now + Duration::days(14)),
            created_by: ada.id,
            assignees: vec![grace.clone()],
        };
        dir.add_project(website.clone())?;
        dir.add_project(Project {
            id: ProjectId::new(),
            org_id: org.id,
            name: "Difference engine".to_string(),
            description: String::new(),
            status: ProjectStatus::Idea,
            deadline: None,
            created_by: grace.id,
            assignees: vec![],
        })?;
        dir.add_project(Project {
            id: ProjectId::new(),
            org_id: org.id,
            name: "Note G".to_string(),
            description: "Bernoulli numbers".to_string(),
            status: ProjectStatus::Finished,
            deadline: None,
            created_by: ada.id,
            assignees: vec![ada.clone()],
        })?;

        let tasks = [
            ("Write copy", TaskStatus::NotStarted, ada.id, vec![]),
            ("Pick palette", TaskStatus::InProgress, grace.id, vec![ada.clone()]),
            ("Set up hosting", TaskStatus::Done, grace.id, vec![]),
            ("Review docs", TaskStatus::NotStarted, grace.id, vec![grace.clone()]),
        ];
        for (name, status, created_by, assignees) in tasks {
            dir.add_task(Task {
                id: TaskId::new(),
                project_id: website.id,
                name: name.to_string(),
                description: String::new(),
                status,
                deadline: None,
                created_by,
                assignees,
            })?;
        }
        Ok(dir)
    }
}

#[async_trait]
impl DirectoryApi for InMemoryDirectory {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let mut state = self.enter("login")?;
        let user_id = match state.passwords.get(email) {
            Some((stored, id)) if stored == password => *id,
            _ => return Err(protocol(401, "Invalid credentials")),
        };
        let user = state
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| protocol(401, "Invalid credentials"))?;
        state.principal = Some(user_id);
        Ok(AuthResponse {
            token: format!("demo-{}", user_id),
            user,
        })
    }

    async fn register(&self, input: &RegisterInput) -> Result<AuthResponse> {
        let mut state = self.enter("register")?;
        if state.passwords.contains_key(&input.email) {
            return Err(protocol(409, "User already exists"));
        }
        let user = User {
            id: UserId::new(),
            email: input.email.clone(),
            full_name: input.full_name.clone(),
        };
        state
            .passwords
            .insert(user.email.clone(), (input.password.clone(), user.id));
        state.users.insert(user.id, user.clone());
        state.principal = Some(user.id);
        Ok(AuthResponse {
            token: format!("demo-{}", user.id),
            user,
        })
    }

    async fn me(&self) -> Result<User> {
        let state = self.enter("me")?;
        let id = state.require_principal()?;
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| protocol(401, "Invalid token"))
    }

    async fn organizations(&self) -> Result<Vec<Organization>> {
        let state = self.enter("organizations")?;
        let user = state.require_principal()?;
        Ok(state
            .orgs
            .iter()
            .filter(|o| {
                state
                    .memberships
                    .get(&o.id)
                    .is_some_and(|m| m.contains(&user))
            })
            .cloned()
            .collect())
    }

    async fn create_organization(&self, input: &CreateOrganizationInput) -> Result<Organization> {
        let mut state = self.enter("create_organization")?;
        let user = state.require_principal()?;
        let org = Organization {
            id: OrgId::new(),
            name: input.name.clone(),
            invite_code: invite_code(),
            created_by: Some(user),
            members: None,
        };
        state.memberships.insert(org.id, vec![user]);
        state.orgs.push(org.clone());
        Ok(org)
    }

    async fn join_organization(&self, input: &JoinOrganizationInput) -> Result<Organization> {
        let mut state = self.enter("join_organization")?;
        let user = state.require_principal()?;
        let org = state
            .orgs
            .iter()
            .find(|o| o.invite_code == input.invite_code)
            .cloned()
            .ok_or_else(|| protocol(400, "Invalid or expired invite code"))?;
        let members = state.memberships.entry(org.id).or_default();
        if !members.contains(&user) {
            members.push(user);
        }
        Ok(org)
    }

    async fn members(&self, org_id: OrgId) -> Result<Vec<User>> {
        let state = self.enter("members")?;
        state.require_member(org_id)?;
        let ids = state.memberships.get(&org_id).cloned().unwrap_or_default();
        Ok(state.resolve_users(&ids))
    }

    async fn projects(&self, org_id: OrgId) -> Result<Vec<Project>> {
        let state = self.enter("projects")?;
        state.require_member(org_id)?;
        Ok(state
            .projects
            .iter()
            .filter(|p| p.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn create_project(&self, org_id: OrgId, input: &CreateProjectInput) -> Result<Project> {
        let mut state = self.enter("create_project")?;
        let user = state.require_member(org_id)?;
        let project = Project {
            id: ProjectId::new(),
            org_id,
            name: input.name.clone(),
            description: input.description.clone(),
            status: input.status,
            deadline: input.deadline,
            created_by: user,
            assignees: state.resolve_users(&input.assignee_ids),
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project_status(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        status: ProjectStatus,
    ) -> Result<()> {
        let mut state = self.enter("update_project_status")?;
        let user = state.require_member(org_id)?;
        if !is_authorized(state.project_in_org(org_id, project_id)?, user) {
            return Err(protocol(403, "Not assigned to this project"));
        }
        if let Some(p) = state.projects.iter_mut().find(|p| p.id == project_id) {
            p.status = status;
        }
        Ok(())
    }

    async fn tasks(&self, org_id: OrgId, project_id: ProjectId) -> Result<Vec<Task>> {
        let state = self.enter("tasks")?;
        state.require_member(org_id)?;
        state.project_in_org(org_id, project_id)?;
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create_task(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        input: &CreateTaskInput,
    ) -> Result<Task> {
        let mut state = self.enter("create_task")?;
        let user = state.require_member(org_id)?;
        state.project_in_org(org_id, project_id)?;
        let task = Task {
            id: TaskId::new(),
            project_id,
            name: input.name.clone(),
            description: input.description.clone(),
            status: TaskStatus::NotStarted,
            deadline: input.deadline,
            created_by: user,
            assignees: state.resolve_users(&input.assignee_ids),
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn move_task(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<()> {
        let mut state = self.enter("move_task")?;
        let user = state.require_member(org_id)?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| protocol(404, "Task not found"))?;
        if task.project_id != project_id {
            return Err(protocol(403, "Task does not belong to this project"));
        }
        if !is_authorized(&*task, user) {
            return Err(protocol(403, "Not assigned to this task"));
        }
        task.status = status;
        Ok(())
    }

    async fn bulk_move_tasks(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        input: &BulkMoveInput,
    ) -> Result<()> {
        let mut state = self.enter("bulk_move_tasks")?;
        let user = state.require_member(org_id)?;
        for id in &input.task_ids {
            let task = state
                .tasks
                .iter()
                .find(|t| t.id == *id)
                .ok_or_else(|| protocol(404, "Task not found"))?;
            if task.project_id != project_id {
                return Err(protocol(403, "Task does not belong to this project"));
            }
            if !is_authorized(task, user) {
                return Err(protocol(403, "Not assigned to this task"));
            }
        }
        for task in state
            .tasks
            .iter_mut()
            .filter(|t| input.task_ids.contains(&t.id))
        {
            task.status = input.status;
        }
        Ok(())
    }
}
