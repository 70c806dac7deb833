//! Domain records for the organization → project → task hierarchy.

pub mod entity;
pub mod ids;
pub mod status;

pub use entity::{Organization, Project, Task, User};
pub use ids::{OrgId, ProjectId, TaskId, UserId};
pub use status::{Lifecycle, ProjectStatus, TaskStatus};
