mod common;

use feedback_moderation_api::{
    entity::{
        moderation_history::ActionKind,
        reviews::{Entity as Reviews, ReviewStatus},
        users::Role,
    },
    error::AppError,
    ledger::{self, HistoryScope},
    middleware::auth::AuthUser,
    models::{ModeratorStats, Review},
    services::{moderation_service, review_service},
    state::AppState,
};
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use common::{create_product, create_user, reload_product, setup_state, submit, tick};

/// Submit one review per rating, each from a fresh user.
async fn reviews_with(
    state: &AppState,
    product_id: Uuid,
    ratings: &[i32],
) -> anyhow::Result<Vec<Review>> {
    let mut out = Vec::with_capacity(ratings.len());
    for (i, rating) in ratings.iter().enumerate() {
        let author = create_user(state, Role::User, &format!("Reviewer{i}")).await?;
        out.push(submit(state, &author, product_id, *rating).await?);
        tick().await;
    }
    Ok(out)
}

async fn approve_all(state: &AppState, moderator: &AuthUser, reviews: &[Review]) -> anyhow::Result<()> {
    for review in reviews {
        moderation_service::approve_review(state, moderator, review.id).await?;
    }
    Ok(())
}

#[tokio::test]
async fn approvals_drive_the_product_rating() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let moderator = create_user(&state, Role::Moderator, "Mod").await?;
    let product = create_product(&state, "Coffee Grinder").await?;

    let initial = reviews_with(&state, product.id, &[5, 4, 3]).await?;
    approve_all(&state, &moderator, &initial).await?;

    let p = reload_product(&state, product.id).await?;
    assert_eq!(p.average_rating, 4.0);
    assert_eq!(p.total_reviews, 3);

    let more = reviews_with(&state, product.id, &[5, 1]).await?;

    let outcome = moderation_service::approve_review(&state, &moderator, more[0].id)
        .await?
        .into_data()
        .expect("outcome");
    let review = outcome.review.expect("review");
    assert_eq!(review.status, ReviewStatus::Approved);
    assert_eq!(review.moderator_id, Some(moderator.user_id));
    assert!(review.moderated_at.is_some());
    let rating = outcome.rating.expect("rating");
    assert_eq!(rating.average_rating, 4.25);
    assert_eq!(rating.total_reviews, 4);

    let outcome = moderation_service::reject_review(
        &state,
        &moderator,
        more[1].id,
        Some("Not about the product".into()),
    )
    .await?
    .into_data()
    .expect("outcome");
    assert!(outcome.rating.is_none());
    assert_eq!(outcome.action.action, ActionKind::Reject);
    assert_eq!(outcome.action.reason.as_deref(), Some("Not about the product"));

    let p = reload_product(&state, product.id).await?;
    assert_eq!(p.average_rating, 4.25);
    assert_eq!(p.total_reviews, 4);

    let public = review_service::list_product_reviews(&state, product.id)
        .await?
        .into_data()
        .expect("list");
    assert_eq!(public.items.len(), 4);
    assert!(public.items.iter().all(|r| r.status == ReviewStatus::Approved));
    // newest first
    assert_eq!(public.items[0].id, more[0].id);
    Ok(())
}

#[tokio::test]
async fn second_decision_is_already_moderated() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let moderator = create_user(&state, Role::Moderator, "Mod").await?;
    let product = create_product(&state, "Yoga Mat").await?;
    let reviews = reviews_with(&state, product.id, &[4]).await?;

    moderation_service::approve_review(&state, &moderator, reviews[0].id).await?;

    let err = moderation_service::approve_review(&state, &moderator, reviews[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyModerated(ReviewStatus::Approved)));

    let err = moderation_service::reject_review(&state, &moderator, reviews[0].id, Some("spam".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyModerated(ReviewStatus::Approved)));

    let p = reload_product(&state, product.id).await?;
    assert_eq!(p.total_reviews, 1);
    assert_eq!(p.average_rating, 4.0);

    // failed attempts leave no ledger trace
    let history = moderation_service::moderation_history(
        &state,
        &moderator,
        HistoryScope::Review(reviews[0].id),
        None,
    )
    .await?
    .into_data()
    .expect("history");
    assert_eq!(history.items.len(), 1);
    Ok(())
}

// The test pool has one connection, so the two approvals interleave at the
// connection and run back to back. postgres_flow.rs covers a real race.
#[tokio::test]
async fn back_to_back_approvals_apply_once() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let first = create_user(&state, Role::Moderator, "ModA").await?;
    let second = create_user(&state, Role::Moderator, "ModB").await?;
    let product = create_product(&state, "Water Bottle").await?;
    let reviews = reviews_with(&state, product.id, &[5]).await?;
    let id = reviews[0].id;

    let (a, b) = tokio::join!(
        moderation_service::approve_review(&state, &first, id),
        moderation_service::approve_review(&state, &second, id),
    );

    let wins = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(wins, 1);
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(
        loser.unwrap_err(),
        AppError::AlreadyModerated(ReviewStatus::Approved)
    ));

    let p = reload_product(&state, product.id).await?;
    assert_eq!(p.total_reviews, 1);
    assert_eq!(p.average_rating, 5.0);
    Ok(())
}

#[tokio::test]
async fn removing_an_approved_review_updates_the_rating() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let moderator = create_user(&state, Role::Moderator, "Mod").await?;
    let product = create_product(&state, "Desk Chair").await?;
    let reviews = reviews_with(&state, product.id, &[5, 3]).await?;
    approve_all(&state, &moderator, &reviews).await?;

    let outcome = moderation_service::remove_review(
        &state,
        &moderator,
        reviews[0].id,
        Some("Contains personal data".into()),
    )
    .await?
    .into_data()
    .expect("outcome");
    assert!(outcome.review.is_none());
    assert_eq!(outcome.action.action, ActionKind::Remove);
    let rating = outcome.rating.expect("rating");
    assert_eq!(rating.total_reviews, 1);
    assert_eq!(rating.average_rating, 3.0);

    let p = reload_product(&state, product.id).await?;
    assert_eq!(p.total_reviews, 1);
    assert_eq!(p.average_rating, 3.0);

    // the ledger outlives the review
    let history = moderation_service::moderation_history(
        &state,
        &moderator,
        HistoryScope::Review(reviews[0].id),
        None,
    )
    .await?
    .into_data()
    .expect("history");
    let actions: Vec<ActionKind> = history.items.iter().map(|h| h.action).collect();
    assert_eq!(actions, vec![ActionKind::Remove, ActionKind::Approve]);

    let err = moderation_service::remove_review(&state, &moderator, reviews[0].id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn removing_a_pending_review_skips_recompute() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let moderator = create_user(&state, Role::Moderator, "Mod").await?;
    let product = create_product(&state, "Notebook").await?;
    let reviews = reviews_with(&state, product.id, &[2, 4]).await?;
    moderation_service::approve_review(&state, &moderator, reviews[1].id).await?;

    let outcome = moderation_service::remove_review(&state, &moderator, reviews[0].id, None)
        .await?
        .into_data()
        .expect("outcome");
    assert!(outcome.rating.is_none());
    assert!(outcome.action.reason.is_none());

    let p = reload_product(&state, product.id).await?;
    assert_eq!(p.total_reviews, 1);
    assert_eq!(p.average_rating, 4.0);
    Ok(())
}

#[tokio::test]
async fn moderator_role_is_checked_first() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let user = create_user(&state, Role::User, "Plain").await?;
    let missing = Uuid::new_v4();

    let err = moderation_service::approve_review(&state, &user, missing)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = moderation_service::remove_review(&state, &user, missing, Some("x".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = review_service::list_pending_reviews(&state, &user)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let moderator = create_user(&state, Role::Moderator, "Mod").await?;
    let err = moderation_service::approve_review(&state, &moderator, missing)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn stats_count_each_action() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let moderator = create_user(&state, Role::Moderator, "Mod").await?;
    let idle = create_user(&state, Role::Moderator, "Idle").await?;
    let product = create_product(&state, "Blender").await?;
    let reviews = reviews_with(&state, product.id, &[5, 4, 2, 1]).await?;

    moderation_service::approve_review(&state, &moderator, reviews[0].id).await?;
    moderation_service::approve_review(&state, &moderator, reviews[1].id).await?;
    moderation_service::reject_review(&state, &moderator, reviews[2].id, Some("rude".into()))
        .await?;
    moderation_service::remove_review(&state, &moderator, reviews[0].id, Some("dup".into()))
        .await?;

    let stats = moderation_service::moderator_stats(&state, &moderator, moderator.user_id)
        .await?
        .into_data()
        .expect("stats");
    assert_eq!(
        stats,
        ModeratorStats {
            total_actions: 4,
            approvals: 2,
            rejections: 1,
            removals: 1,
        }
    );

    let none = moderation_service::moderator_stats(&state, &moderator, idle.user_id)
        .await?
        .into_data()
        .expect("stats");
    assert_eq!(none, ModeratorStats::default());

    let counts = review_service::review_status_counts(&state.orm).await?;
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.approved, 1);
    assert_eq!(counts.rejected, 1);
    Ok(())
}

#[tokio::test]
async fn history_is_newest_first_and_capped() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let moderator = create_user(&state, Role::Moderator, "Mod").await?;
    let other = create_user(&state, Role::Moderator, "Other").await?;
    let product = create_product(&state, "Table Fan").await?;
    let reviews = reviews_with(&state, product.id, &[3, 4, 5]).await?;

    moderation_service::approve_review(&state, &moderator, reviews[0].id).await?;
    tick().await;
    moderation_service::reject_review(&state, &other, reviews[1].id, Some("spam".into())).await?;
    tick().await;
    moderation_service::approve_review(&state, &moderator, reviews[2].id).await?;

    let all = moderation_service::moderation_history(&state, &moderator, HistoryScope::All, Some(50))
        .await?
        .into_data()
        .expect("history");
    let ids: Vec<Uuid> = all.items.iter().map(|h| h.review_id).collect();
    assert_eq!(ids, vec![reviews[2].id, reviews[1].id, reviews[0].id]);

    let capped =
        moderation_service::moderation_history(&state, &moderator, HistoryScope::All, Some(2))
            .await?
            .into_data()
            .expect("history");
    assert_eq!(capped.items.len(), 2);
    assert_eq!(capped.items[0].review_id, reviews[2].id);

    let mine = moderation_service::moderation_history(
        &state,
        &moderator,
        HistoryScope::Moderator(moderator.user_id),
        None,
    )
    .await?
    .into_data()
    .expect("history");
    assert_eq!(mine.items.len(), 2);
    assert!(mine.items.iter().all(|h| h.moderator_id == moderator.user_id));
    Ok(())
}

#[tokio::test]
async fn pending_queue_is_oldest_first_with_product() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let moderator = create_user(&state, Role::Moderator, "Mod").await?;
    let lamp = create_product(&state, "Floor Lamp").await?;
    let rug = create_product(&state, "Wool Rug").await?;

    let first = reviews_with(&state, lamp.id, &[4]).await?;
    let second = reviews_with(&state, rug.id, &[2]).await?;
    let third = reviews_with(&state, lamp.id, &[5]).await?;
    moderation_service::approve_review(&state, &moderator, third[0].id).await?;

    let queue = review_service::list_pending_reviews(&state, &moderator)
        .await?
        .into_data()
        .expect("queue");
    let ids: Vec<Uuid> = queue.items.iter().map(|p| p.review.id).collect();
    assert_eq!(ids, vec![first[0].id, second[0].id]);

    let product = queue.items[1].product.as_ref().expect("product");
    assert_eq!(product.id, rug.id);
    assert_eq!(product.name, "Wool Rug");
    Ok(())
}

/// Any write to `products` aborts, so the rating step of a transition fails.
async fn freeze_products(state: &AppState) -> anyhow::Result<()> {
    state
        .orm
        .execute_unprepared(
            "CREATE TRIGGER products_frozen BEFORE UPDATE ON products \
             BEGIN SELECT RAISE(ABORT, 'products are frozen'); END",
        )
        .await?;
    Ok(())
}

#[tokio::test]
async fn failed_approval_rolls_back_every_step() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let moderator = create_user(&state, Role::Moderator, "Mod").await?;
    let product = create_product(&state, "Espresso Machine").await?;
    let reviews = reviews_with(&state, product.id, &[5]).await?;
    freeze_products(&state).await?;

    let err = moderation_service::approve_review(&state, &moderator, reviews[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OrmError(_)));

    let review = Reviews::find_by_id(reviews[0].id)
        .one(&state.orm)
        .await?
        .expect("review");
    assert_eq!(review.status, ReviewStatus::Pending);
    assert!(review.moderator_id.is_none());
    assert!(review.moderated_at.is_none());

    let entries = ledger::history(&state.orm, HistoryScope::Review(reviews[0].id), None).await?;
    assert!(entries.is_empty());

    let p = reload_product(&state, product.id).await?;
    assert_eq!((p.total_reviews, p.average_rating), (0, 0.0));
    Ok(())
}

#[tokio::test]
async fn failed_removal_keeps_the_review_and_rating() -> anyhow::Result<()> {
    let state = setup_state().await?;
    let moderator = create_user(&state, Role::Moderator, "Mod").await?;
    let product = create_product(&state, "Rice Cooker").await?;
    let reviews = reviews_with(&state, product.id, &[4, 2]).await?;
    approve_all(&state, &moderator, &reviews).await?;
    freeze_products(&state).await?;

    let err = moderation_service::remove_review(
        &state,
        &moderator,
        reviews[0].id,
        Some("Duplicate".into()),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::OrmError(_)));

    let review = Reviews::find_by_id(reviews[0].id)
        .one(&state.orm)
        .await?
        .expect("review still present");
    assert_eq!(review.status, ReviewStatus::Approved);

    let entries = ledger::history(&state.orm, HistoryScope::Review(reviews[0].id), None).await?;
    let actions: Vec<ActionKind> = entries.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![ActionKind::Approve]);

    let p = reload_product(&state, product.id).await?;
    assert_eq!((p.total_reviews, p.average_rating), (2, 3.0));
    Ok(())
}
