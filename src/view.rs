//!
//! vitrine view materializer
//! -------------------------
//! Pure derivation of the response shape for a project: membership flags for
//! the requesting user, like/comment counts, and the rating aggregate. One
//! materializer serves the single-project, feed, favorites and owned-listing
//! paths so the derived fields cannot drift between endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Project, Rating};

/// Response object for a project: the stored fields plus per-requester
/// derived fields. Comments themselves are served by the comments endpoint;
/// only the count travels here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub github_link: String,
    pub live_demo: String,
    pub owner_id: String,
    pub author_name: String,
    pub author_bio: String,
    pub created_at: DateTime<Utc>,
    pub likes: usize,
    pub liked_by_current_user: bool,
    pub favorited_by_current_user: bool,
    pub comment_count: usize,
    pub average_rating: f64,
    pub user_rating: u8,
}

/// Mean of all rating values rounded to one decimal, `0.0` when there are
/// none. Rounding is `(mean * 10).round() / 10`, half away from zero, which
/// for values in [1,5] behaves as round-half-up: the mean of 1 and 2 is 1.5,
/// not 2.
pub fn average_rating(ratings: &[Rating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: u32 = ratings.iter().map(|r| r.value as u32).sum();
    let mean = sum as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// The requester's own rating value, or 0 when they have not rated.
pub fn user_rating(ratings: &[Rating], requester: Option<&str>) -> u8 {
    match requester {
        Some(id) => ratings.iter().find(|r| r.rater_id == id).map(|r| r.value).unwrap_or(0),
        None => 0,
    }
}

impl ProjectView {
    /// Derive the view of `project` as seen by `requester` (None for an
    /// anonymous request: membership flags false, user rating 0).
    pub fn materialize(project: &Project, requester: Option<&str>) -> Self {
        let is_member = |set: &[String]| match requester {
            Some(id) => set.iter().any(|s| s == id),
            None => false,
        };
        Self {
            id: project.id,
            title: project.title.clone(),
            description: project.description.clone(),
            tags: project.tags.clone(),
            github_link: project.github_link.clone(),
            live_demo: project.live_demo.clone(),
            owner_id: project.owner_id.clone(),
            author_name: project.author_name.clone(),
            author_bio: project.author_bio.clone(),
            created_at: project.created_at,
            likes: project.liked_by.len(),
            liked_by_current_user: is_member(&project.liked_by),
            favorited_by_current_user: is_member(&project.favorited_by),
            comment_count: project.comments.len(),
            average_rating: average_rating(&project.ratings),
            user_rating: user_rating(&project.ratings, requester),
        }
    }

    /// Owned-listing variant: identical to materializing as the owner except
    /// `liked_by_current_user` is always true. The owned listing presents a
    /// user's own projects as liked regardless of actual membership; this is
    /// the product contract for that path, not a fallback.
    pub fn materialize_owned(project: &Project) -> Self {
        let mut view = Self::materialize(project, Some(project.owner_id.as_str()));
        view.liked_by_current_user = true;
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Profile, ProjectFields};

    fn sample_project() -> Project {
        let mut owner = Profile::empty("auth0|owner", "owner@example.com");
        owner.name = "Owner".into();
        owner.bio = "bio".into();
        Project::create(
            ProjectFields { title: "Relay".into(), ..Default::default() },
            &owner,
        )
    }

    fn rating(rater: &str, value: u8) -> Rating {
        Rating { rater_id: rater.to_string(), value }
    }

    #[test]
    fn average_is_zero_when_unrated() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn average_rounds_to_one_decimal_half_up() {
        assert_eq!(average_rating(&[rating("a", 1), rating("b", 2)]), 1.5);
        assert_eq!(average_rating(&[rating("a", 5), rating("b", 2)]), 3.5);
        // 1+2+5 = 8/3 = 2.666… -> 2.7
        assert_eq!(average_rating(&[rating("a", 1), rating("b", 2), rating("c", 5)]), 2.7);
        assert_eq!(average_rating(&[rating("a", 4)]), 4.0);
    }

    #[test]
    fn membership_flags_follow_requester() {
        let mut project = sample_project();
        project.liked_by.push("auth0|fan".into());
        project.favorited_by.push("auth0|keeper".into());

        let anon = ProjectView::materialize(&project, None);
        assert!(!anon.liked_by_current_user);
        assert!(!anon.favorited_by_current_user);
        assert_eq!(anon.likes, 1);

        let fan = ProjectView::materialize(&project, Some("auth0|fan"));
        assert!(fan.liked_by_current_user);
        assert!(!fan.favorited_by_current_user);

        let keeper = ProjectView::materialize(&project, Some("auth0|keeper"));
        assert!(!keeper.liked_by_current_user);
        assert!(keeper.favorited_by_current_user);
    }

    #[test]
    fn user_rating_defaults_to_zero() {
        let mut project = sample_project();
        project.ratings.push(rating("auth0|fan", 4));
        let fan = ProjectView::materialize(&project, Some("auth0|fan"));
        assert_eq!(fan.user_rating, 4);
        let other = ProjectView::materialize(&project, Some("auth0|other"));
        assert_eq!(other.user_rating, 0);
        let anon = ProjectView::materialize(&project, None);
        assert_eq!(anon.user_rating, 0);
    }

    #[test]
    fn owned_listing_always_shows_liked() {
        let project = sample_project();
        // The owner never actually liked their own project
        assert!(!project.liked_by.iter().any(|s| s == &project.owner_id));
        let view = ProjectView::materialize_owned(&project);
        assert!(view.liked_by_current_user);
        // The count still reflects real membership only
        assert_eq!(view.likes, 0);
    }

    #[test]
    fn comment_count_tracks_list_length() {
        let mut project = sample_project();
        assert_eq!(ProjectView::materialize(&project, None).comment_count, 0);
        project.comments.push(crate::model::Comment {
            comment_id: Uuid::new_v4(),
            author_id: "auth0|fan".into(),
            author_email: "fan@example.com".into(),
            text: "great".into(),
            created_at: Utc::now(),
        });
        assert_eq!(ProjectView::materialize(&project, None).comment_count, 1);
    }
}
