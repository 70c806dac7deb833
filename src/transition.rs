//! Status transitions for projects and tasks.
//!
//! A single predicate, [`check_transition`], decides whether a principal may
//! move an entity to a target status. Both invocation paths use it: the
//! stepwise control (which only offers the adjacent states) and drag-drop
//! (which may target any column). Any target other than the current status
//! is valid on both paths.
//!
//! Authorization here is a client-side courtesy. The directory enforces the
//! same rule on its side.

use thiserror::Error;

use crate::core::{Lifecycle, Project, ProjectStatus, Task, TaskStatus, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("only the creator or an assignee can change this status")]
    NotAuthorized,

    #[error("status is already {0}")]
    Unchanged(&'static str),
}

/// An entity whose status follows a [`Lifecycle`].
pub trait Transitionable {
    type Status: Lifecycle;

    fn status(&self) -> Self::Status;
    fn created_by(&self) -> UserId;
    fn is_assignee(&self, user: UserId) -> bool;
}

impl Transitionable for Project {
    type Status = ProjectStatus;

    fn status(&self) -> ProjectStatus {
        self.status
    }

    fn created_by(&self) -> UserId {
        self.created_by
    }

    fn is_assignee(&self, user: UserId) -> bool {
        self.assignees.iter().any(|a| a.id == user)
    }
}

impl Transitionable for Task {
    type Status = TaskStatus;

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn created_by(&self) -> UserId {
        self.created_by
    }

    fn is_assignee(&self, user: UserId) -> bool {
        self.assignees.iter().any(|a| a.id == user)
    }
}

/// Creator or listed assignee.
pub fn is_authorized<E: Transitionable>(entity: &E, principal: UserId) -> bool {
    entity.created_by() == principal || entity.is_assignee(principal)
}

pub fn check_transition<E: Transitionable>(
    entity: &E,
    principal: UserId,
    target: E::Status,
) -> Result<(), TransitionError> {
    if !is_authorized(entity, principal) {
        return Err(TransitionError::NotAuthorized);
    }
    if entity.status() == target {
        return Err(TransitionError::Unchanged(target.as_str()));
    }
    Ok(())
}

/// Direction of the stepwise control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Back,
    Forward,
}

/// Target offered by the stepwise control, or `None` when that side of the
/// control is disabled (end of the line, or not authorized).
pub fn step_target<E: Transitionable>(
    entity: &E,
    principal: UserId,
    step: Step,
) -> Option<E::Status> {
    let current = entity.status();
    let target = match step {
        Step::Back => current.prev(),
        Step::Forward => current.next(),
    }?;
    check_transition(entity, principal, target).ok()?;
    Some(target)
}
