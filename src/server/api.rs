//! Per-endpoint operations behind the HTTP handlers. Each function does the
//! whole load-authorize-mutate-save sequence for one endpoint under a single
//! store lock and reports outcomes as `AppResult`, so the handler layer only
//! translates errors to status codes. Integration tests drive these functions
//! directly against a tempdir-backed store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engagement;
use crate::error::{AppError, AppResult};
use crate::identity::VerifiedUser;
use crate::model::{Comment, Profile, Project, ProjectFields};
use crate::security;
use crate::storage::SharedStore;
use crate::view::{average_rating, user_rating, ProjectView};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 9;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPage {
    pub projects: Vec<ProjectView>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_projects: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub likes: usize,
    pub liked_by_current_user: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteOutcome {
    pub favorited_by_current_user: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingOutcome {
    pub average_rating: f64,
    pub user_rating: u8,
}

// A path id that does not parse as a uuid cannot name a stored project, so it
// resolves the same way as an unknown id.
fn parse_project_id(id: &str) -> AppResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| AppError::not_found("unknown_project", "project not found"))
}

fn load_project(store: &crate::storage::Store, id: &Uuid) -> AppResult<Project> {
    match store.get_project(id)? {
        Some(p) => Ok(p),
        None => Err(AppError::not_found("unknown_project", "project not found")),
    }
}

/// Fetch the requester's profile, creating an empty one on first access.
pub fn fetch_profile(store: &SharedStore, user: &VerifiedUser) -> AppResult<Profile> {
    let guard = store.0.lock();
    if let Some(profile) = guard.get_profile(&user.subject_id)? {
        return Ok(profile);
    }
    let profile = Profile::empty(&user.subject_id, &user.email);
    guard.save_profile(&profile)?;
    Ok(profile)
}

/// Update name/bio and recompute completeness.
pub fn update_profile(store: &SharedStore, user: &VerifiedUser, input: ProfileUpdate) -> AppResult<Profile> {
    let guard = store.0.lock();
    let mut profile = guard
        .get_profile(&user.subject_id)?
        .unwrap_or_else(|| Profile::empty(&user.subject_id, &user.email));
    profile.name = input.name;
    profile.bio = input.bio;
    profile.recompute_completeness();
    guard.save_profile(&profile)?;
    Ok(profile)
}

/// Paginated public feed, newest first. Page numbers are 1-based; out-of-range
/// pages return an empty list with the real totals.
pub fn list_projects(
    store: &SharedStore,
    requester: Option<&str>,
    page: Option<usize>,
    limit: Option<usize>,
) -> AppResult<ProjectPage> {
    let page = page.unwrap_or(DEFAULT_PAGE).max(1);
    let limit = match limit.unwrap_or(DEFAULT_PAGE_SIZE) {
        0 => DEFAULT_PAGE_SIZE,
        n => n,
    };
    let guard = store.0.lock();
    let (projects, total) = guard.find_page((page - 1) * limit, limit)?;
    Ok(ProjectPage {
        projects: projects.iter().map(|p| ProjectView::materialize(p, requester)).collect(),
        current_page: page,
        total_pages: total.div_ceil(limit),
        total_projects: total,
    })
}

/// The requester's own projects, presented with the owned-listing
/// materialization (always shown as liked).
pub fn owned_projects(store: &SharedStore, user: &VerifiedUser) -> AppResult<Vec<ProjectView>> {
    let guard = store.0.lock();
    let projects = guard.find_by_owner(&user.subject_id)?;
    Ok(projects.iter().map(ProjectView::materialize_owned).collect())
}

pub fn favorite_projects(store: &SharedStore, user: &VerifiedUser) -> AppResult<Vec<ProjectView>> {
    let guard = store.0.lock();
    let projects = guard.find_by_favorited(&user.subject_id)?;
    Ok(projects
        .iter()
        .map(|p| ProjectView::materialize(p, Some(user.subject_id.as_str())))
        .collect())
}

pub fn fetch_project(store: &SharedStore, id: &str, requester: Option<&str>) -> AppResult<ProjectView> {
    let id = parse_project_id(id)?;
    let guard = store.0.lock();
    let project = load_project(&guard, &id)?;
    Ok(ProjectView::materialize(&project, requester))
}

/// Create a project for the requester. Requires the profile to be complete at
/// this moment; the author fields snapshot the profile as it is right now.
pub fn create_project(store: &SharedStore, user: &VerifiedUser, fields: ProjectFields) -> AppResult<ProjectView> {
    let guard = store.0.lock();
    let profile = guard.get_profile(&user.subject_id)?;
    if !security::can_create_project(profile.as_ref()) {
        return Err(AppError::forbidden(
            "profile_incomplete",
            "complete your profile (name and bio) before creating a project",
        ));
    }
    let profile = profile.unwrap_or_else(|| Profile::empty(&user.subject_id, &user.email));
    let project = Project::create(fields, &profile);
    guard.save_project(&project)?;
    Ok(ProjectView::materialize(&project, Some(user.subject_id.as_str())))
}

/// Owner-only update of the editable fields.
pub fn update_project(store: &SharedStore, user: &VerifiedUser, id: &str, fields: ProjectFields) -> AppResult<ProjectView> {
    let id = parse_project_id(id)?;
    let guard = store.0.lock();
    let mut project = load_project(&guard, &id)?;
    if !security::can_edit_project(&project, &user.subject_id) {
        return Err(AppError::forbidden("not_owner", "only the project owner may update it"));
    }
    project.apply_fields(fields);
    guard.save_project(&project)?;
    Ok(ProjectView::materialize(&project, Some(user.subject_id.as_str())))
}

/// Owner-only deletion.
pub fn delete_project(store: &SharedStore, user: &VerifiedUser, id: &str) -> AppResult<()> {
    let id = parse_project_id(id)?;
    let guard = store.0.lock();
    let project = load_project(&guard, &id)?;
    if !security::can_edit_project(&project, &user.subject_id) {
        return Err(AppError::forbidden("not_owner", "only the project owner may delete it"));
    }
    guard.delete_project(&id)?;
    Ok(())
}

pub fn toggle_like(store: &SharedStore, user: &VerifiedUser, id: &str) -> AppResult<LikeOutcome> {
    let id = parse_project_id(id)?;
    let guard = store.0.lock();
    let mut project = load_project(&guard, &id)?;
    let liked = engagement::toggle_membership(&mut project.liked_by, &user.subject_id);
    guard.save_project(&project)?;
    Ok(LikeOutcome { likes: project.liked_by.len(), liked_by_current_user: liked })
}

pub fn toggle_favorite(store: &SharedStore, user: &VerifiedUser, id: &str) -> AppResult<FavoriteOutcome> {
    let id = parse_project_id(id)?;
    let guard = store.0.lock();
    let mut project = load_project(&guard, &id)?;
    let favorited = engagement::toggle_membership(&mut project.favorited_by, &user.subject_id);
    guard.save_project(&project)?;
    Ok(FavoriteOutcome { favorited_by_current_user: favorited })
}

pub fn rate_project(store: &SharedStore, user: &VerifiedUser, id: &str, value: i64) -> AppResult<RatingOutcome> {
    let id = parse_project_id(id)?;
    let guard = store.0.lock();
    let mut project = load_project(&guard, &id)?;
    engagement::apply_rating(&mut project.ratings, &user.subject_id, value)?;
    guard.save_project(&project)?;
    Ok(RatingOutcome {
        average_rating: average_rating(&project.ratings),
        user_rating: user_rating(&project.ratings, Some(user.subject_id.as_str())),
    })
}

/// Comments for a project, most recent first. Storage order is append order;
/// the sort here is presentation only.
pub fn list_comments(store: &SharedStore, id: &str) -> AppResult<Vec<Comment>> {
    let id = parse_project_id(id)?;
    let guard = store.0.lock();
    let project = load_project(&guard, &id)?;
    let mut comments = project.comments;
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(comments)
}

pub fn add_comment(store: &SharedStore, user: &VerifiedUser, id: &str, text: String) -> AppResult<Comment> {
    let id = parse_project_id(id)?;
    let guard = store.0.lock();
    let mut project = load_project(&guard, &id)?;
    let comment = engagement::append_comment(&mut project.comments, user, text);
    guard.save_project(&project)?;
    Ok(comment)
}

pub fn delete_comment(store: &SharedStore, user: &VerifiedUser, id: &str, comment_id: &str) -> AppResult<()> {
    let id = parse_project_id(id)?;
    let comment_id = Uuid::parse_str(comment_id)
        .map_err(|_| AppError::not_found("unknown_comment", "comment not found"))?;
    let guard = store.0.lock();
    let mut project = load_project(&guard, &id)?;
    engagement::remove_comment(&mut project, &comment_id, &user.subject_id)?;
    guard.save_project(&project)?;
    Ok(())
}
