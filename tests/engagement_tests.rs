//! Like, favorite and rating integration tests: toggle round-trips, the
//! rating upsert with its aggregate, and how the derived view fields track
//! each mutation for different requesters.

use anyhow::Result;
use tempfile::tempdir;

use vitrine::identity::VerifiedUser;
use vitrine::model::ProjectFields;
use vitrine::server::api;
use vitrine::storage::SharedStore;

fn user(name: &str) -> VerifiedUser {
    VerifiedUser {
        subject_id: format!("auth0|{}", name),
        email: format!("{}@example.com", name),
    }
}

fn seed_project(store: &SharedStore, owner: &VerifiedUser, title: &str) -> String {
    api::fetch_profile(store, owner).expect("profile fetch");
    api::update_profile(
        store,
        owner,
        api::ProfileUpdate { name: "Owner".into(), bio: "bio".into() },
    )
    .expect("profile update");
    let view = api::create_project(
        store,
        owner,
        ProjectFields { title: title.into(), ..Default::default() },
    )
    .expect("project creation");
    view.id.to_string()
}

#[test]
fn like_toggle_round_trips_and_counts() -> Result<()> {
    let tmp = tempdir()?;
    let store = SharedStore::new(tmp.path())?;
    let ada = user("ada");
    let fan = user("fan");
    let id = seed_project(&store, &ada, "Relay");

    let first = api::toggle_like(&store, &fan, &id)?;
    assert!(first.liked_by_current_user);
    assert_eq!(first.likes, 1);

    // A second fan stacks, the first fan's toggle-off removes only their own
    let other = user("other");
    let second = api::toggle_like(&store, &other, &id)?;
    assert_eq!(second.likes, 2);

    let undone = api::toggle_like(&store, &fan, &id)?;
    assert!(!undone.liked_by_current_user);
    assert_eq!(undone.likes, 1);

    let view_fan = api::fetch_project(&store, &id, Some("auth0|fan"))?;
    assert!(!view_fan.liked_by_current_user);
    let view_other = api::fetch_project(&store, &id, Some("auth0|other"))?;
    assert!(view_other.liked_by_current_user);
    Ok(())
}

#[test]
fn favorite_toggle_feeds_the_favorites_listing() -> Result<()> {
    let tmp = tempdir()?;
    let store = SharedStore::new(tmp.path())?;
    let ada = user("ada");
    let keeper = user("keeper");
    let id = seed_project(&store, &ada, "Relay");

    let on = api::toggle_favorite(&store, &keeper, &id)?;
    assert!(on.favorited_by_current_user);

    let favorites = api::favorite_projects(&store, &keeper)?;
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].title, "Relay");
    assert!(favorites[0].favorited_by_current_user);

    let off = api::toggle_favorite(&store, &keeper, &id)?;
    assert!(!off.favorited_by_current_user);
    assert!(api::favorite_projects(&store, &keeper)?.is_empty());
    Ok(())
}

#[test]
fn rating_upsert_and_running_average() -> Result<()> {
    let tmp = tempdir()?;
    let store = SharedStore::new(tmp.path())?;
    let ada = user("ada");
    let a = user("rater-a");
    let b = user("rater-b");
    let id = seed_project(&store, &ada, "Relay");

    // Unrated project shows zero
    let view = api::fetch_project(&store, &id, None)?;
    assert_eq!(view.average_rating, 0.0);
    assert_eq!(view.user_rating, 0);

    let after_a = api::rate_project(&store, &a, &id, 1)?;
    assert_eq!(after_a.average_rating, 1.0);
    assert_eq!(after_a.user_rating, 1);

    // Mean of 1 and 2 is 1.5, not rounded to a whole star
    let after_b = api::rate_project(&store, &b, &id, 2)?;
    assert_eq!(after_b.average_rating, 1.5);
    assert_eq!(after_b.user_rating, 2);

    // Re-rating replaces A's entry; the list does not grow
    let after_rerate = api::rate_project(&store, &a, &id, 5)?;
    assert_eq!(after_rerate.average_rating, 3.5);
    assert_eq!(after_rerate.user_rating, 5);

    let view_b = api::fetch_project(&store, &id, Some("auth0|rater-b"))?;
    assert_eq!(view_b.user_rating, 2);
    assert_eq!(view_b.average_rating, 3.5);

    // Exactly one stored entry per rater
    {
        let guard = store.0.lock();
        let project = guard.get_project(&uuid::Uuid::parse_str(&id)?)?.expect("stored project");
        assert_eq!(project.ratings.len(), 2);
        assert_eq!(project.ratings[0].rater_id, "auth0|rater-a");
        assert_eq!(project.ratings[0].value, 5);
    }
    Ok(())
}

#[test]
fn rating_out_of_range_is_rejected_without_side_effects() -> Result<()> {
    let tmp = tempdir()?;
    let store = SharedStore::new(tmp.path())?;
    let ada = user("ada");
    let a = user("rater-a");
    let id = seed_project(&store, &ada, "Relay");

    for bad in [0i64, 6, -3] {
        let err = api::rate_project(&store, &a, &id, bad).unwrap_err();
        assert_eq!(err.http_status(), 400, "value {} must map to 400", bad);
    }
    let view = api::fetch_project(&store, &id, Some("auth0|rater-a"))?;
    assert_eq!(view.average_rating, 0.0);
    assert_eq!(view.user_rating, 0);
    Ok(())
}

#[test]
fn engagement_on_unknown_project_is_not_found() -> Result<()> {
    let tmp = tempdir()?;
    let store = SharedStore::new(tmp.path())?;
    let fan = user("fan");
    let ghost = uuid::Uuid::new_v4().to_string();

    assert_eq!(api::toggle_like(&store, &fan, &ghost).unwrap_err().http_status(), 404);
    assert_eq!(api::toggle_favorite(&store, &fan, &ghost).unwrap_err().http_status(), 404);
    assert_eq!(api::rate_project(&store, &fan, &ghost, 3).unwrap_err().http_status(), 404);
    Ok(())
}
