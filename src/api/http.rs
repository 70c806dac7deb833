//! HTTP adapter for the directory service.
//!
//! Every call carries the bearer credential when one is stored. A missing
//! credential just means the header is omitted; the directory answers 401
//! and that surfaces as a protocol failure like any other.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    AuthResponse, BulkMoveInput, CreateOrganizationInput, CreateProjectInput, CreateTaskInput,
    DirectoryApi, JoinOrganizationInput, LoginInput, RegisterInput, StatusBody,
};
use crate::core::{
    OrgId, Organization, Project, ProjectId, ProjectStatus, Task, TaskId, TaskStatus, User,
};
use crate::{tlog_debug, tlog_trace, Error, Result};

/// Error payload returned by the directory: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct HttpDirectory {
    base_url: String,
    token: Option<String>,
    client: Client,
}

impl HttpDirectory {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tlog_trace!("HTTP {} {}", method, url);
        let mut req = self.client.request(method, &url);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| {
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("error")
                )
            });
        tlog_debug!("HTTP failure status={} message={}", status.as_u16(), message);
        Err(Error::Protocol {
            status: status.as_u16(),
            message,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, envelope: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path)).await?;
        decode(response, envelope).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        envelope: &str,
    ) -> Result<T> {
        let response = self.send(self.request(method, path).json(body)).await?;
        decode(response, envelope).await
    }

    async fn send_json_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<()> {
        self.send(self.request(method, path).json(body)).await?;
        Ok(())
    }
}

/// Only reading the body can fail as `Network`; the server has answered,
/// so a body that does not parse is a `Json` failure.
async fn decode<T: DeserializeOwned>(response: Response, envelope: &str) -> Result<T> {
    let body = response.text().await?;
    decode_body(&body, envelope)
}

pub(crate) fn decode_body<T: DeserializeOwned>(body: &str, envelope: &str) -> Result<T> {
    let value: Value = serde_json::from_str(body)?;
    unwrap_envelope(value, envelope)
}

/// Accept both a bare payload and one wrapped as `{"<envelope>": payload}`.
///
/// Older directory builds wrap every response in an object keyed by the
/// record kind; newer ones return the record directly.
pub(crate) fn unwrap_envelope<T: DeserializeOwned>(value: Value, envelope: &str) -> Result<T> {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(v) => Ok(v),
        Err(direct_err) => match value {
            Value::Object(mut map) => match map.remove(envelope) {
                Some(inner) => Ok(serde_json::from_value(inner)?),
                None => Err(direct_err.into()),
            },
            _ => Err(direct_err.into()),
        },
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectory {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginInput {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.send_json(Method::POST, "/auth/login", &body, "auth").await
    }

    async fn register(&self, input: &RegisterInput) -> Result<AuthResponse> {
        self.send_json(Method::POST, "/auth/register", input, "auth")
            .await
    }

    async fn me(&self) -> Result<User> {
        if self.token.is_none() {
            return Err(Error::Unauthenticated);
        }
        self.get("/auth/me", "user").await
    }

    async fn organizations(&self) -> Result<Vec<Organization>> {
        self.get("/organizations", "organizations").await
    }

    async fn create_organization(&self, input: &CreateOrganizationInput) -> Result<Organization> {
        self.send_json(Method::POST, "/organizations", input, "organization")
            .await
    }

    async fn join_organization(&self, input: &JoinOrganizationInput) -> Result<Organization> {
        self.send_json(Method::POST, "/organizations/join", input, "organization")
            .await
    }

    async fn members(&self, org_id: OrgId) -> Result<Vec<User>> {
        self.get(&format!("/organizations/{}/members", org_id), "members")
            .await
    }

    async fn projects(&self, org_id: OrgId) -> Result<Vec<Project>> {
        self.get(&format!("/organizations/{}/projects", org_id), "projects")
            .await
    }

    async fn create_project(&self, org_id: OrgId, input: &CreateProjectInput) -> Result<Project> {
        self.send_json(
            Method::POST,
            &format!("/organizations/{}/projects", org_id),
            input,
            "project",
        )
        .await
    }

    async fn update_project_status(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        status: ProjectStatus,
    ) -> Result<()> {
        self.send_json_empty(
            Method::PUT,
            &format!("/organizations/{}/projects/{}/status", org_id, project_id),
            &StatusBody { status },
        )
        .await
    }

    async fn tasks(&self, org_id: OrgId, project_id: ProjectId) -> Result<Vec<Task>> {
        self.get(
            &format!("/organizations/{}/projects/{}/tasks", org_id, project_id),
            "tasks",
        )
        .await
    }

    async fn create_task(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        input: &CreateTaskInput,
    ) -> Result<Task> {
        self.send_json(
            Method::POST,
            &format!("/organizations/{}/projects/{}/tasks", org_id, project_id),
            input,
            "task",
        )
        .await
    }

    async fn move_task(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<()> {
        self.send_json_empty(
            Method::PUT,
            &format!(
                "/organizations/{}/projects/{}/tasks/{}/move",
                org_id, project_id, task_id
            ),
            &StatusBody { status },
        )
        .await
    }

    async fn bulk_move_tasks(
        &self,
        org_id: OrgId,
        project_id: ProjectId,
        input: &BulkMoveInput,
    ) -> Result<()> {
        self.send_json_empty(
            Method::PUT,
            &format!(
                "/organizations/{}/projects/{}/tasks/bulk-move",
                org_id, project_id
            ),
            input,
        )
        .await
    }
}
