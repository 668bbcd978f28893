//!
//! vitrine document model
//! ----------------------
//! The stored document shapes for the showcase backend. These are the exact
//! JSON forms persisted by `storage` and exchanged over HTTP, so field names
//! are camelCase on the wire. Derived presentation fields (like counts,
//! averages, per-requester membership) live in `view`, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One profile per subject-id. Created lazily with empty name/bio on the
/// first authenticated profile fetch, then filled in by the profile update
/// call which recomputes `is_complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Stable identity key supplied by the identity verifier.
    pub subject_id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    /// Both `name` and `bio` non-empty after trimming.
    #[serde(default)]
    pub is_complete: bool,
}

impl Profile {
    pub fn empty(subject_id: &str, email: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            email: email.to_string(),
            name: String::new(),
            bio: String::new(),
            is_complete: false,
        }
    }

    pub fn recompute_completeness(&mut self) {
        self.is_complete = !self.name.trim().is_empty() && !self.bio.trim().is_empty();
    }
}

/// A single rating entry. The ratings list holds at most one entry per
/// `rater_id`; re-rating replaces the value in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub rater_id: String,
    /// Always within [1,5]; enforced by `engagement::apply_rating`.
    pub value: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_id: Uuid,
    pub author_id: String,
    pub author_email: String,
    /// Stored as provided; no server-side trimming or sanitization.
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// The project document. `liked_by` and `favorited_by` carry no duplicate
/// subject-ids (toggle semantics), `comments` is append-ordered, and
/// `owner_id` never changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub github_link: String,
    #[serde(default)]
    pub live_demo: String,
    pub owner_id: String,
    /// Snapshot of the owner's profile at creation time; not re-synced when
    /// the profile changes later.
    pub author_name: String,
    pub author_bio: String,
    #[serde(default)]
    pub liked_by: Vec<String>,
    #[serde(default)]
    pub favorited_by: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    pub created_at: DateTime<Utc>,
}

/// Editable project fields, used both as creation input and update payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub github_link: String,
    #[serde(default)]
    pub live_demo: String,
}

impl Project {
    /// Build a fresh project for `owner`, snapshotting the author fields from
    /// the profile as it exists right now.
    pub fn create(fields: ProjectFields, owner: &Profile) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            tags: fields.tags,
            github_link: fields.github_link,
            live_demo: fields.live_demo,
            owner_id: owner.subject_id.clone(),
            author_name: owner.name.clone(),
            author_bio: owner.bio.clone(),
            liked_by: Vec::new(),
            favorited_by: Vec::new(),
            comments: Vec::new(),
            ratings: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Overwrite the owner-editable fields. Ownership and the author snapshot
    /// are untouched.
    pub fn apply_fields(&mut self, fields: ProjectFields) {
        self.title = fields.title;
        self.description = fields.description;
        self.tags = fields.tags;
        self.github_link = fields.github_link;
        self.live_demo = fields.live_demo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_requires_trimmed_name_and_bio() {
        let mut p = Profile::empty("auth0|u1", "u1@example.com");
        p.recompute_completeness();
        assert!(!p.is_complete);
        p.name = "   ".into();
        p.bio = "builds things".into();
        p.recompute_completeness();
        assert!(!p.is_complete, "whitespace-only name must not count");
        p.name = "Ada".into();
        p.recompute_completeness();
        assert!(p.is_complete);
    }

    #[test]
    fn create_snapshots_author_fields() {
        let mut owner = Profile::empty("auth0|u1", "u1@example.com");
        owner.name = "Ada".into();
        owner.bio = "builds things".into();
        owner.recompute_completeness();
        let proj = Project::create(
            ProjectFields { title: "Relay".into(), ..Default::default() },
            &owner,
        );
        assert_eq!(proj.owner_id, "auth0|u1");
        assert_eq!(proj.author_name, "Ada");
        assert_eq!(proj.author_bio, "builds things");
        assert!(proj.liked_by.is_empty() && proj.ratings.is_empty());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let mut owner = Profile::empty("u", "u@example.com");
        owner.name = "U".into();
        owner.bio = "b".into();
        let proj = Project::create(ProjectFields::default(), &owner);
        let v = serde_json::to_value(&proj).unwrap();
        assert!(v.get("ownerId").is_some());
        assert!(v.get("likedBy").is_some());
        assert!(v.get("favoritedBy").is_some());
        assert!(v.get("githubLink").is_some());
        assert!(v.get("createdAt").is_some());
    }
}
