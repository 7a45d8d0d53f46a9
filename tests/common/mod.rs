#![allow(dead_code)]

use chrono::Utc;
use feedback_moderation_api::{
    db::{create_orm_conn, run_migrations},
    dto::reviews::NewReview,
    entity::{
        products::{ActiveModel as ProductActive, Entity as Products, Model as ProductModel},
        users::{ActiveModel as UserActive, AuthProvider, Role},
    },
    middleware::auth::AuthUser,
    models::Review,
    services::review_service,
    state::AppState,
};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

/// Fresh, migrated in-memory database. One connection, so every test gets its own schema.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let orm = create_orm_conn("sqlite::memory:", 1).await?;
    run_migrations(&orm).await?;
    Ok(AppState::new(orm))
}

pub async fn create_user(state: &AppState, role: Role, name: &str) -> anyhow::Result<AuthUser> {
    let email = format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4().simple());
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.clone()),
        password_hash: Set(Some("dummy".into())),
        display_name: Set(name.to_string()),
        role: Set(role),
        auth_provider: Set(AuthProvider::Email),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        email,
        role,
    })
}

pub async fn create_product(state: &AppState, name: &str) -> anyhow::Result<ProductModel> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set("A product used in tests".into()),
        category: Set("Testing".into()),
        image_url: Set(None),
        average_rating: Set(0.0),
        total_reviews: Set(0),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

pub async fn submit(
    state: &AppState,
    author: &AuthUser,
    product_id: Uuid,
    rating: i32,
) -> anyhow::Result<Review> {
    let review = review_service::submit_review(
        &state.orm,
        NewReview {
            product_id,
            user_id: author.user_id,
            user_name: author.email.clone(),
            rating,
            review_text: format!("Rated this product {rating} out of five stars."),
        },
    )
    .await?;
    Ok(review)
}

pub async fn reload_product(state: &AppState, id: Uuid) -> anyhow::Result<ProductModel> {
    Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {id} missing"))
}

/// Keeps `created_at` strictly increasing between consecutive inserts.
pub async fn tick() {
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
}
