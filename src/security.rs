//! Authorization guard for mutations. Pure predicates over the documents:
//! they return allow/deny and never fail, so callers can map a deny to 403
//! distinctly from a missing resource's 404.

use crate::model::{Comment, Profile, Project};

/// Only the owner may alter (or delete) a project.
pub fn can_edit_project(project: &Project, requester: &str) -> bool {
    project.owner_id == requester
}

/// A comment is removable by its author or by the project owner.
pub fn can_delete_comment(project: &Project, comment: &Comment, requester: &str) -> bool {
    comment.author_id == requester || project.owner_id == requester
}

/// Creating a project requires a profile that is complete at this moment:
/// both name and bio non-empty after trimming. The stored `is_complete` flag
/// is not consulted so a stale flag cannot widen the gate.
pub fn can_create_project(profile: Option<&Profile>) -> bool {
    match profile {
        Some(p) => !p.name.trim().is_empty() && !p.bio.trim().is_empty(),
        None => false,
    }
}
