//! Port to the remote directory service.
//!
//! [`DirectoryApi`] is the whole surface the client consumes. Two adapters
//! implement it: [`HttpDirectory`] talks to the real service and
//! [`InMemoryDirectory`] keeps everything in process for tests and `--demo`.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{
    OrgId, Organization, Project, ProjectId, ProjectStatus, Task, TaskId, TaskStatus, User, UserId,
};
use crate::Result;

pub use http::HttpDirectory;
pub use memory::InMemoryDirectory;

#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse>;

    async fn register(&self, input: &RegisterInput) -> Result<AuthResponse>;

    /// Validate the current credential and return its principal.
    async fn me(&self) -> Result<User>;

    async fn organizations(&self) -> Result<Vec<Organization>>;

    async fn create_organization(&self, input: &CreateOrganizationInput) -> Result<Organization>;

    async fn join_organization(&self, input: &JoinOrganizationInput) -> Result<Organization>;

    async fn members(&self, org_id: OrgId) -> Result<Vec<User>>;

    async fn projects(&self, org_id: OrgId) -> Result<Vec<Project>>;

    async fn create_project(&self, org_id: OrgId, input: &CreateProjectInput) -> Result<Project>;

    async fn update_project_status(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        status: ProjectStatus,
    ) -> Result<()>;

    async fn tasks(&self, org_id: OrgId, project_id: ProjectId) -> Result<Vec<Task>>;

    async fn create_task(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        input: &CreateTaskInput,
    ) -> Result<Task>;

    async fn move_task(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<()>;

    async fn bulk_move_tasks(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        input: &BulkMoveInput,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrganizationInput {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinOrganizationInput {
    pub invite_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee_ids: Vec<UserId>,
    #[serde(default)]
    pub status: ProjectStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignee_ids: Vec<UserId>,
}

/// Body of the status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBody<S> {
    pub status: S,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkMoveInput {
    pub task_ids: Vec<TaskId>,
    pub status: TaskStatus,
}
