//! Ownership policy for profiles and workflows.
//!
//! Reads are open to every authenticated principal; mutations require
//! ownership. Workflow mutations additionally go through [`workflow_scope`]:
//! a regular principal only ever "sees" its own workflows for destructive
//! verbs, so touching someone else's workflow is a 404, not a 403.

use crate::error::AppError;
use crate::extractors::auth::AuthUser;

/// The viewset action a request maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Destroy,
    /// `OPTIONS` introspection.
    Metadata,
}

impl Action {
    /// GET, HEAD and OPTIONS.
    pub fn is_safe(self) -> bool {
        matches!(self, Action::List | Action::Retrieve | Action::Metadata)
    }
}

/// Which workflows a principal may address for a given action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowScope {
    All,
    OwnedBy(String),
}

#[cfg(test)]
impl WorkflowScope {
    fn contains(&self, owner_id: &str) -> bool {
        match self {
            WorkflowScope::All => true,
            WorkflowScope::OwnedBy(profile_id) => profile_id == owner_id,
        }
    }
}

/// Staff and single-object retrieval see everything; everyone else only
/// their own workflows.
pub fn workflow_scope(principal: &AuthUser, action: Action) -> WorkflowScope {
    if principal.is_staff || action == Action::Retrieve {
        WorkflowScope::All
    } else {
        WorkflowScope::OwnedBy(principal.profile_id.clone())
    }
}

/// Object-level write check: safe actions pass, creation always passes,
/// everything else needs `owner_id` to be the principal's own profile.
pub fn can_write(principal: &AuthUser, action: Action, owner_id: &str) -> bool {
    action.is_safe() || action == Action::Create || principal.profile_id == owner_id
}

pub fn require_write(principal: &AuthUser, action: Action, owner_id: &str) -> Result<(), AppError> {
    if can_write(principal, action, owner_id) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

/// Only staff may enumerate profiles; single retrieval is open.
pub fn can_list_profiles(principal: &AuthUser, action: Action) -> bool {
    principal.is_staff || action != Action::List
}

pub fn require_profile_access(principal: &AuthUser, action: Action) -> Result<(), AppError> {
    if can_list_profiles(principal, action) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}
