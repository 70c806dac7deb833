//! Scope load bookkeeping.
//!
//! At most one load per scope is current. Starting another load for the same
//! scope cancels the previous one; a response is applied only if its ticket
//! is still the current one for its scope.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

use super::ops::OpId;
use crate::core::{OrgId, ProjectId};

/// Cache partition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Organizations,
    Projects(OrgId),
    Tasks(OrgId, ProjectId),
    Members(OrgId),
}

impl Scope {
    pub fn org(&self) -> Option<OrgId> {
        match self {
            Scope::Organizations => None,
            Scope::Projects(org) | Scope::Members(org) | Scope::Tasks(org, _) => Some(*org),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Organizations => write!(f, "organizations"),
            Scope::Projects(org) => write!(f, "projects[{}]", org.short()),
            Scope::Tasks(_, project) => write!(f, "tasks[{}]", project.short()),
            Scope::Members(org) => write!(f, "members[{}]", org.short()),
        }
    }
}

/// Tag carried by a load request and echoed back with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub scope: Scope,
    pub generation: u64,
}

#[derive(Debug)]
struct ActiveLoad {
    generation: u64,
    op: OpId,
    token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct LoadRegistry {
    next_generation: u64,
    active: HashMap<Scope, ActiveLoad>,
}

impl LoadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new load for `scope`, cancelling any load already running
    /// for it. Returns the new ticket, its token, and the superseded op.
    pub fn begin(&mut self, scope: Scope, op: OpId) -> (LoadTicket, CancellationToken, Option<OpId>) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let token = CancellationToken::new();
        let previous = self.active.insert(
            scope,
            ActiveLoad {
                generation,
                op,
                token: token.clone(),
            },
        );
        let superseded = previous.map(|prev| {
            prev.token.cancel();
            prev.op
        });
        (LoadTicket { scope, generation }, token, superseded)
    }

    /// Cancel the current load for `scope`. Returns its op if one was running.
    pub fn cancel(&mut self, scope: &Scope) -> Option<OpId> {
        self.active.remove(scope).map(|load| {
            load.token.cancel();
            load.op
        })
    }

    /// Cancel every load belonging to `org` (projects, members, tasks).
    pub fn cancel_org(&mut self, org: OrgId) -> Vec<OpId> {
        let scopes: Vec<Scope> = self
            .active
            .keys()
            .filter(|s| s.org() == Some(org))
            .copied()
            .collect();
        scopes.iter().filter_map(|s| self.cancel(s)).collect()
    }

    /// Accept a response for `ticket`. False means the response is stale
    /// (superseded or cancelled) and must be discarded.
    pub fn finish(&mut self, ticket: &LoadTicket) -> bool {
        match self.active.get(&ticket.scope) {
            Some(load) if load.generation == ticket.generation && !load.token.is_cancelled() => {
                self.active.remove(&ticket.scope);
                true
            }
            _ => false,
        }
    }

    pub fn is_loading(&self, scope: &Scope) -> bool {
        self.active.contains_key(scope)
    }
}
