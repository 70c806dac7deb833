//! Directory records as the client caches them.
//!
//! Field names follow the directory's snake_case JSON. Optional or
//! server-computed fields default so older servers still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::ids::{OrgId, ProjectId, TaskId, UserId};
use super::status::{ProjectStatus, TaskStatus};

/// Go handlers encode a nil slice as `null`; read it as an empty list.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
}

impl User {
    /// Name for cards: first word of the full name, falling back to the email.
    pub fn short_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .next()
            .unwrap_or(self.email.as_str())
    }
}

/// An organization the principal belongs to.
///
/// Organizations are only ever added (create or join); the client never
/// deletes one locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrgId,
    pub name: String,
    /// Opaque join token shared with people who should join.
    #[serde(default)]
    pub invite_code: String,
    #[serde(default)]
    pub created_by: Option<UserId>,
    /// Filled by a separate members request; `None` until then.
    #[serde(default)]
    pub members: Option<Vec<User>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub org_id: OrgId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: ProjectStatus,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub created_by: UserId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub assignees: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub created_by: UserId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub assignees: Vec<User>,
}
