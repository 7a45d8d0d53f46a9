use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    dto::{
        moderation::{PendingReview, PendingReviewList, ProductBrief, ReviewStatusCounts},
        reviews::{NewReview, ReviewList, SubmitReviewRequest},
    },
    entity::{
        products::{Column as ProdCol, Entity as Products},
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews, ReviewStatus},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_moderator},
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const MIN_REVIEW_LEN: usize = 10;
pub const MAX_REVIEW_LEN: usize = 1000;

pub fn validate_rating(rating: i32) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation(
            "Rating must be an integer between 1 and 5".into(),
        ));
    }
    Ok(())
}

/// Length is counted in characters, not bytes.
pub fn validate_review_text(text: &str) -> AppResult<()> {
    let len = text.chars().count();
    if len < MIN_REVIEW_LEN {
        return Err(AppError::Validation(format!(
            "Review must be at least {MIN_REVIEW_LEN} characters long"
        )));
    }
    if len > MAX_REVIEW_LEN {
        return Err(AppError::Validation(format!(
            "Review must not exceed {MAX_REVIEW_LEN} characters"
        )));
    }
    Ok(())
}

/// Insert a new review in `pending` state.
///
/// Checks run in order: rating and text, product existence, then the
/// one-active-review-per-user rule. Product aggregates are untouched.
pub async fn submit_review<C>(conn: &C, input: NewReview) -> AppResult<Review>
where
    C: ConnectionTrait,
{
    let review_text = input.review_text.trim().to_string();
    validate_rating(input.rating)?;
    validate_review_text(&review_text)?;

    let product_exists = Products::find_by_id(input.product_id)
        .select_only()
        .column(ProdCol::Id)
        .into_tuple::<Uuid>()
        .one(conn)
        .await?
        .is_some();
    if !product_exists {
        return Err(AppError::NotFound("Product not found".into()));
    }

    let active = Reviews::find()
        .filter(ReviewCol::UserId.eq(input.user_id))
        .filter(ReviewCol::ProductId.eq(input.product_id))
        .filter(ReviewCol::Status.ne(ReviewStatus::Rejected))
        .count(conn)
        .await?;
    if active > 0 {
        return Err(already_reviewed());
    }

    // The partial unique index catches a concurrent duplicate that slipped past the count.
    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(input.product_id),
        user_id: Set(input.user_id),
        user_name: Set(input.user_name),
        rating: Set(input.rating),
        review_text: Set(review_text),
        status: Set(ReviewStatus::Pending),
        created_at: Set(Utc::now().into()),
        moderated_at: Set(None),
        moderator_id: Set(None),
    }
    .insert(conn)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => already_reviewed(),
        _ => AppError::from(err),
    })?;

    tracing::info!(
        review_id = %review.id,
        product_id = %review.product_id,
        user_id = %review.user_id,
        "review submitted"
    );

    Ok(review.into())
}

fn already_reviewed() -> AppError {
    AppError::Conflict("You have already reviewed this product".into())
}

/// Submit a review as the authenticated caller. The author name is snapshotted
/// from the caller's profile.
pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: SubmitReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    let author = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))?;

    let review = submit_review(
        &state.orm,
        NewReview {
            product_id: payload.product_id,
            user_id: author.id,
            user_name: author.display_name,
            rating: payload.rating,
            review_text: payload.review_text,
        },
    )
    .await?;

    Ok(ApiResponse::success(
        "Review submitted successfully. It will be visible after moderation.",
        review,
        Some(Meta::empty()),
    ))
}

/// Reviews of one product in the given status, newest first.
pub async fn reviews_for_product<C>(
    conn: &C,
    product_id: Uuid,
    status: ReviewStatus,
) -> AppResult<Vec<Review>>
where
    C: ConnectionTrait,
{
    let items = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .filter(ReviewCol::Status.eq(status))
        .order_by_desc(ReviewCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();
    Ok(items)
}

/// Public listing: approved reviews only.
pub async fn list_product_reviews(
    state: &AppState,
    product_id: Uuid,
) -> AppResult<ApiResponse<ReviewList>> {
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    let items = reviews_for_product(&state.orm, product_id, ReviewStatus::Approved).await?;
    let meta = Meta::counted(items.len());
    Ok(ApiResponse::success("Reviews", ReviewList { items }, Some(meta)))
}

pub async fn list_my_reviews(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<ReviewList>> {
    let items = Reviews::find()
        .filter(ReviewCol::UserId.eq(user.user_id))
        .order_by_desc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Review::from)
        .collect::<Vec<_>>();
    let meta = Meta::counted(items.len());
    Ok(ApiResponse::success("Reviews", ReviewList { items }, Some(meta)))
}

/// Moderator queue: pending reviews oldest first, each with its product summary.
pub async fn list_pending_reviews(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PendingReviewList>> {
    ensure_moderator(user)?;

    let pending = Reviews::find()
        .filter(ReviewCol::Status.eq(ReviewStatus::Pending))
        .order_by_asc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let product_ids: Vec<Uuid> = pending.iter().map(|r| r.product_id).collect();
    let products: HashMap<Uuid, ProductBrief> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|p| {
                (
                    p.id,
                    ProductBrief {
                        id: p.id,
                        name: p.name,
                        category: p.category,
                    },
                )
            })
            .collect()
    };

    let items = pending
        .into_iter()
        .map(|review| {
            let product = products.get(&review.product_id).map(|p| ProductBrief {
                id: p.id,
                name: p.name.clone(),
                category: p.category.clone(),
            });
            PendingReview {
                review: review.into(),
                product,
            }
        })
        .collect();

    Ok(ApiResponse::success(
        "Pending reviews",
        PendingReviewList { items },
        Some(Meta::empty()),
    ))
}

#[derive(Debug, FromQueryResult)]
struct StatusCount {
    status: ReviewStatus,
    count: i64,
}

pub async fn review_status_counts<C>(conn: &C) -> AppResult<ReviewStatusCounts>
where
    C: ConnectionTrait,
{
    let rows = Reviews::find()
        .select_only()
        .column(ReviewCol::Status)
        .column_as(Expr::col(ReviewCol::Id).count(), "count")
        .group_by(ReviewCol::Status)
        .into_model::<StatusCount>()
        .all(conn)
        .await?;

    let mut counts = ReviewStatusCounts::default();
    for row in rows {
        match row.status {
            ReviewStatus::Pending => counts.pending = row.count,
            ReviewStatus::Approved => counts.approved = row.count,
            ReviewStatus::Rejected => counts.rejected = row.count,
        }
    }
    Ok(counts)
}

pub async fn review_summary(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ReviewStatusCounts>> {
    ensure_moderator(user)?;
    let counts = review_status_counts(&state.orm).await?;
    Ok(ApiResponse::success("Review counts", counts, Some(Meta::empty())))
}
