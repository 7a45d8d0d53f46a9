//! Runs against a real Postgres when `TEST_DATABASE_URL` is set; skipped otherwise.

mod common;

use feedback_moderation_api::{
    db::{create_orm_conn, run_migrations},
    entity::{reviews::ReviewStatus, users::Role},
    error::AppError,
    services::moderation_service,
    state::AppState,
};
use uuid::Uuid;

use common::{create_product, create_user, reload_product, submit};

async fn postgres_state() -> anyhow::Result<Option<AppState>> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return Ok(None);
    };
    let orm = create_orm_conn(&url, 5).await?;
    run_migrations(&orm).await?;
    Ok(Some(AppState::new(orm)))
}

#[tokio::test]
async fn racing_moderators_on_postgres() -> anyhow::Result<()> {
    let Some(state) = postgres_state().await? else {
        return Ok(());
    };
    let tag = Uuid::new_v4().simple().to_string();

    let author = create_user(&state, Role::User, &format!("Author{tag}")).await?;
    let approver = create_user(&state, Role::Moderator, &format!("Approver{tag}")).await?;
    let rejecter = create_user(&state, Role::Moderator, &format!("Rejecter{tag}")).await?;
    let product = create_product(&state, &format!("Race Product {tag}")).await?;
    let review = submit(&state, &author, product.id, 5).await?;

    let s1 = state.clone();
    let s2 = state.clone();
    let id = review.id;
    let approve = tokio::spawn(async move {
        moderation_service::approve_review(&s1, &approver, id).await
    });
    let reject = tokio::spawn(async move {
        moderation_service::reject_review(&s2, &rejecter, id, Some("race".into())).await
    });
    let (approved, rejected) = (approve.await?, reject.await?);

    assert!(approved.is_ok() ^ rejected.is_ok());
    let p = reload_product(&state, product.id).await?;
    if approved.is_ok() {
        assert!(matches!(
            rejected.unwrap_err(),
            AppError::AlreadyModerated(ReviewStatus::Approved)
        ));
        assert_eq!((p.total_reviews, p.average_rating), (1, 5.0));
    } else {
        assert!(matches!(
            approved.unwrap_err(),
            AppError::AlreadyModerated(ReviewStatus::Rejected)
        ));
        assert_eq!((p.total_reviews, p.average_rating), (0, 0.0));
    }
    Ok(())
}
