//!
//! vitrine engagement operations
//! -----------------------------
//! Pure mutation helpers for the interactive parts of a project document:
//! like/favorite toggles, the rating upsert and the comment lifecycle. Each
//! helper mutates an in-memory document; persistence is the caller's job.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::identity::VerifiedUser;
use crate::model::{Comment, Project, Rating};
use crate::security;

/// Flip membership of `id` in the set: remove if present, append if absent.
/// Returns the new membership state. Two consecutive toggles by the same id
/// restore the original set.
pub fn toggle_membership(set: &mut Vec<String>, id: &str) -> bool {
    if let Some(pos) = set.iter().position(|s| s == id) {
        set.remove(pos);
        false
    } else {
        set.push(id.to_string());
        true
    }
}

/// Insert-or-replace the rater's entry. A re-rating overwrites the value in
/// place, preserving the entry's position; the list never grows a second
/// entry for the same rater. Values outside [1,5] are rejected.
pub fn apply_rating(ratings: &mut Vec<Rating>, rater_id: &str, value: i64) -> AppResult<()> {
    if !(1..=5).contains(&value) {
        return Err(AppError::invalid_input("rating_range", "rating value must be between 1 and 5"));
    }
    let value = value as u8;
    match ratings.iter_mut().find(|r| r.rater_id == rater_id) {
        Some(existing) => existing.value = value,
        None => ratings.push(Rating { rater_id: rater_id.to_string(), value }),
    }
    Ok(())
}

/// Append a fresh comment at the end of the list. The text is stored as
/// provided; author identity comes from the verified credential. Returns the
/// created comment so the handler can echo it back.
pub fn append_comment(comments: &mut Vec<Comment>, author: &VerifiedUser, text: String) -> Comment {
    let comment = Comment {
        comment_id: Uuid::new_v4(),
        author_id: author.subject_id.clone(),
        author_email: author.email.clone(),
        text,
        created_at: Utc::now(),
    };
    comments.push(comment.clone());
    comment
}

/// Remove a comment by id. Missing id is NotFound; a requester who is neither
/// the comment author nor the project owner gets Forbidden. Relative order of
/// the remaining comments is preserved.
pub fn remove_comment(project: &mut Project, comment_id: &Uuid, requester: &str) -> AppResult<()> {
    let Some(pos) = project.comments.iter().position(|c| &c.comment_id == comment_id) else {
        return Err(AppError::not_found("unknown_comment", "comment not found"));
    };
    if !security::can_delete_comment(project, &project.comments[pos], requester) {
        return Err(AppError::forbidden("comment_delete_denied", "only the comment author or project owner may delete"));
    }
    project.comments.remove(pos);
    Ok(())
}
