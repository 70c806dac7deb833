//! Active organization / project selection.

use crate::core::{OrgId, Project, ProjectId};
use crate::store::Scope;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSelector {
    org: Option<OrgId>,
    project: Option<ProjectId>,
}

impl ScopeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn org(&self) -> Option<OrgId> {
        self.org
    }

    pub fn project(&self) -> Option<ProjectId> {
        self.project
    }

    /// Select `org` and clear any selected project.
    ///
    /// Returns the scopes being left, whose in-flight loads should be
    /// cancelled. The caller starts the project load for `org`.
    pub fn select_org(&mut self, org: OrgId) -> Vec<Scope> {
        let mut left = Vec::new();
        if let Some(prev) = self.org {
            if let Some(project) = self.project {
                left.push(Scope::Tasks(prev, project));
            }
            if prev != org {
                left.push(Scope::Projects(prev));
                left.push(Scope::Members(prev));
            }
        }
        self.org = Some(org);
        self.project = None;
        left
    }

    /// Select `project`, which must belong to the selected organization.
    ///
    /// Returns the scopes being left, as for [`ScopeSelector::select_org`].
    pub fn select_project(&mut self, project: &Project) -> Result<Vec<Scope>> {
        let org = self
            .org
            .ok_or_else(|| Error::NotFound("no organization selected".to_string()))?;
        if project.org_id != org {
            return Err(Error::NotFound(format!(
                "project {} in organization {}",
                project.id, org
            )));
        }
        let left = match self.project {
            Some(prev) if prev != project.id => vec![Scope::Tasks(org, prev)],
            _ => vec![],
        };
        self.project = Some(project.id);
        Ok(left)
    }

    /// Leave the project board. Returns the scope being left.
    pub fn clear_project(&mut self) -> Option<Scope> {
        let project = self.project.take()?;
        self.org.map(|org| Scope::Tasks(org, project))
    }

    /// Leave the organization. Returns the scopes being left.
    pub fn clear_org(&mut self) -> Vec<Scope> {
        let mut left: Vec<Scope> = self.clear_project().into_iter().collect();
        if let Some(org) = self.org.take() {
            left.push(Scope::Projects(org));
            left.push(Scope::Members(org));
        }
        left
    }
}
