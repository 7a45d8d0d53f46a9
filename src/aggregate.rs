//! Product rating aggregation.
//!
//! The `average_rating` / `total_reviews` columns on `products` are a cache over
//! the approved reviews of that product. They are rebuilt from scratch inside the
//! moderation transaction every time the approved set changes; nothing else
//! writes them.

use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{
        products::{Column as ProdCol, Entity as Products},
        reviews::{Column as ReviewCol, Entity as Reviews, ReviewStatus},
    },
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: i64,
}

/// Mean and count of a set of approved ratings. Zero for an empty set; the mean
/// is kept at full precision.
pub fn summarize(ratings: &[i32]) -> RatingSummary {
    if ratings.is_empty() {
        return RatingSummary {
            average_rating: 0.0,
            total_reviews: 0,
        };
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let total = ratings.len() as i64;
    RatingSummary {
        average_rating: sum as f64 / total as f64,
        total_reviews: total,
    }
}

/// Rebuild a product's cached rating from its approved reviews.
///
/// Must run on the same transaction as the status change that triggered it. The
/// product row is locked first so concurrent recomputations for one product
/// serialize and each one reads the approved set committed before it.
pub async fn recompute_product_rating<C>(conn: &C, product_id: Uuid) -> AppResult<RatingSummary>
where
    C: ConnectionTrait,
{
    Products::find_by_id(product_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    let ratings: Vec<i32> = Reviews::find()
        .select_only()
        .column(ReviewCol::Rating)
        .filter(ReviewCol::ProductId.eq(product_id))
        .filter(ReviewCol::Status.eq(ReviewStatus::Approved))
        .into_tuple()
        .all(conn)
        .await?;

    let summary = summarize(&ratings);

    Products::update_many()
        .col_expr(ProdCol::AverageRating, Expr::value(summary.average_rating))
        .col_expr(ProdCol::TotalReviews, Expr::value(summary.total_reviews))
        .filter(ProdCol::Id.eq(product_id))
        .exec(conn)
        .await?;

    tracing::debug!(
        product_id = %product_id,
        average_rating = summary.average_rating,
        total_reviews = summary.total_reviews,
        "product rating recomputed"
    );

    Ok(summary)
}
