use chrono::Utc;
use feedback_moderation_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        users::{ActiveModel as UserActive, AuthProvider, Column as UserCol, Entity as Users, Role},
    },
    services::auth_service::hash_password,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url, 2).await?;
    run_migrations(&orm).await?;

    let moderator_id = ensure_user(
        &orm,
        "moderator@example.com",
        "admin123",
        "System Moderator",
        Role::Moderator,
    )
    .await?;
    let user_id = ensure_user(&orm, "user@example.com", "user123", "Test User", Role::User).await?;
    seed_products(&orm).await?;

    println!("Seed completed. Moderator ID: {moderator_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    password: &str,
    display_name: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        println!("User {email} already present");
        return Ok(existing.id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set(Some(password_hash)),
        display_name: Set(display_name.to_string()),
        role: Set(role),
        auth_provider: Set(AuthProvider::Email),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Created user {email} (role={role:?})");
    Ok(user.id)
}

async fn seed_products(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let products = [
        (
            "Wireless Noise-Cancelling Headphones",
            "Over-ear headphones with adaptive noise cancellation and 30 hour battery life",
            "Electronics",
        ),
        (
            "Stainless Steel Water Bottle",
            "Double-walled bottle that keeps drinks cold for 24 hours",
            "Home & Kitchen",
        ),
        (
            "Ergonomic Office Chair",
            "Adjustable lumbar support and breathable mesh back",
            "Furniture",
        ),
        (
            "Trail Running Shoes",
            "Lightweight shoes with aggressive grip for off-road runs",
            "Sports",
        ),
    ];

    let mut created = 0;
    for (name, description, category) in products {
        let exists = Products::find()
            .filter(ProdCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }
        ProductActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(description.to_string()),
            category: Set(category.to_string()),
            image_url: Set(None),
            average_rating: Set(0.0),
            total_reviews: Set(0),
            created_at: Set(Utc::now().into()),
        }
        .insert(orm)
        .await?;
        created += 1;
    }

    println!("Seeded {created} products");
    Ok(())
}
