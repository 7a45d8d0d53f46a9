use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    dto::products::{CategoryList, CreateProductRequest, ProductList},
    entity::products::{ActiveModel, Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_moderator},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::ProductQuery,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if search.chars().count() < 2 {
            return Err(AppError::Validation(
                "Search query must be at least 2 characters".into(),
            ));
        }
        condition = condition.add(
            Condition::any()
                .add(Column::Name.contains(search))
                .add(Column::Description.contains(search)),
        );
    }

    if let Some(category) = query.category.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_asc(Column::Name);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;
    Ok(ApiResponse::success("Product", product.into(), None))
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items: Vec<String> = Products::find()
        .select_only()
        .column(Column::Category)
        .distinct()
        .order_by_asc(Column::Category)
        .into_tuple()
        .all(&state.orm)
        .await?;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

/// Add a product to the catalog. Its rating cache starts empty and is only ever
/// written by moderation.
pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_moderator(user)?;

    let name = required_field("name", &payload.name)?;
    let description = required_field("description", &payload.description)?;
    let category = required_field("category", &payload.category)?;
    let image_url = payload
        .image_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(description),
        category: Set(category),
        image_url: Set(image_url),
        average_rating: Set(0.0),
        total_reviews: Set(0),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("A product with this name already exists".into())
        }
        _ => AppError::from(err),
    })?;

    tracing::info!(product_id = %product.id, moderator_id = %user.user_id, "product created");

    Ok(ApiResponse::success(
        "Product created",
        product.into(),
        Some(Meta::empty()),
    ))
}

fn required_field(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("Missing required field: {field}")));
    }
    Ok(value.to_string())
}
