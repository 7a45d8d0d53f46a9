//! Review moderation engine.
//!
//! Every transition runs as one database transaction covering the review status
//! change (or deletion), the product rating recomputation and the ledger append.
//! A `pending -> approved | rejected` change is a conditional update that only
//! matches while the row is still pending, so when two moderators race on the
//! same review exactly one update lands and the other sees `AlreadyModerated`.

use std::future::Future;

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    aggregate::recompute_product_rating,
    db::is_transient,
    dto::moderation::{ModerationHistoryList, ModerationOutcome},
    entity::{
        moderation_history::ActionKind,
        reviews::{Column as ReviewCol, Entity as Reviews, ReviewStatus},
    },
    error::{AppError, AppResult},
    ledger::{self, HistoryScope},
    middleware::auth::{AuthUser, ensure_moderator},
    models::{ModerationAction, ModeratorStats},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Attempts per transition, counting the first.
pub const MAX_TX_ATTEMPTS: u32 = 3;

/// Terminal decision for a pending review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

impl Verdict {
    fn status(self) -> ReviewStatus {
        match self {
            Verdict::Approve => ReviewStatus::Approved,
            Verdict::Reject => ReviewStatus::Rejected,
        }
    }

    fn action(self) -> ActionKind {
        match self {
            Verdict::Approve => ActionKind::Approve,
            Verdict::Reject => ActionKind::Reject,
        }
    }
}

pub async fn approve_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
) -> AppResult<ApiResponse<ModerationOutcome>> {
    ensure_moderator(user)?;
    let outcome = with_retry(review_id, || {
        decide(&state.orm, user.user_id, review_id, Verdict::Approve, None)
    })
    .await?;
    Ok(ApiResponse::success(
        "Review approved successfully",
        outcome,
        Some(Meta::empty()),
    ))
}

/// The reason is kept on the ledger entry only, never on the review.
pub async fn reject_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
    reason: Option<String>,
) -> AppResult<ApiResponse<ModerationOutcome>> {
    ensure_moderator(user)?;
    let outcome = with_retry(review_id, || {
        decide(
            &state.orm,
            user.user_id,
            review_id,
            Verdict::Reject,
            reason.clone(),
        )
    })
    .await?;
    Ok(ApiResponse::success(
        "Review rejected successfully",
        outcome,
        Some(Meta::empty()),
    ))
}

/// Hard-delete a review in any status. The ledger entry outlives the row.
pub async fn remove_review(
    state: &AppState,
    user: &AuthUser,
    review_id: Uuid,
    reason: Option<String>,
) -> AppResult<ApiResponse<ModerationOutcome>> {
    ensure_moderator(user)?;
    let outcome = with_retry(review_id, || {
        remove(&state.orm, user.user_id, review_id, reason.clone())
    })
    .await?;
    Ok(ApiResponse::success(
        "Review removed successfully",
        outcome,
        Some(Meta::empty()),
    ))
}

async fn decide(
    db: &DatabaseConnection,
    moderator_id: Uuid,
    review_id: Uuid,
    verdict: Verdict,
    reason: Option<String>,
) -> AppResult<ModerationOutcome> {
    let txn = db.begin().await?;

    let review = Reviews::find_by_id(review_id)
        .one(&txn)
        .await?
        .ok_or_else(review_not_found)?;
    if review.status != ReviewStatus::Pending {
        return Err(AppError::AlreadyModerated(review.status));
    }

    let now = Utc::now();
    let updated = Reviews::update_many()
        .col_expr(ReviewCol::Status, Expr::value(verdict.status()))
        .col_expr(ReviewCol::ModeratorId, Expr::value(Some(moderator_id)))
        .col_expr(
            ReviewCol::ModeratedAt,
            Expr::value(Some(now.fixed_offset())),
        )
        .filter(ReviewCol::Id.eq(review_id))
        .filter(ReviewCol::Status.eq(ReviewStatus::Pending))
        .exec(&txn)
        .await?;

    if updated.rows_affected == 0 {
        // Lost the race: someone else moved or deleted the review after our read.
        let current = Reviews::find_by_id(review_id).one(&txn).await?;
        return Err(match current {
            Some(current) => AppError::AlreadyModerated(current.status),
            None => review_not_found(),
        });
    }

    let rating = match verdict {
        Verdict::Approve => Some(recompute_product_rating(&txn, review.product_id).await?),
        Verdict::Reject => None,
    };

    let entry = ledger::record_action(&txn, review_id, moderator_id, verdict.action(), reason).await?;

    let review = Reviews::find_by_id(review_id)
        .one(&txn)
        .await?
        .ok_or_else(review_not_found)?;

    txn.commit().await?;

    tracing::info!(
        review_id = %review_id,
        moderator_id = %moderator_id,
        product_id = %review.product_id,
        action = ?verdict.action(),
        "review moderated"
    );

    Ok(ModerationOutcome {
        review: Some(review.into()),
        action: entry.into(),
        rating,
    })
}

async fn remove(
    db: &DatabaseConnection,
    moderator_id: Uuid,
    review_id: Uuid,
    reason: Option<String>,
) -> AppResult<ModerationOutcome> {
    let txn = db.begin().await?;

    // Row lock: a concurrent approval either finishes first (and we read its
    // status) or waits for this deletion and then finds nothing to update.
    let review = Reviews::find_by_id(review_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(review_not_found)?;

    let entry =
        ledger::record_action(&txn, review_id, moderator_id, ActionKind::Remove, reason).await?;

    Reviews::delete_by_id(review_id).exec(&txn).await?;

    let rating = if review.status == ReviewStatus::Approved {
        Some(recompute_product_rating(&txn, review.product_id).await?)
    } else {
        None
    };

    txn.commit().await?;

    tracing::info!(
        review_id = %review_id,
        moderator_id = %moderator_id,
        product_id = %review.product_id,
        prior_status = %review.status,
        action = ?ActionKind::Remove,
        "review removed"
    );

    Ok(ModerationOutcome {
        review: None,
        action: entry.into(),
        rating,
    })
}

/// Re-run a whole transition while it fails with a transient storage conflict.
/// Any other error, including domain errors, is returned immediately.
async fn with_retry<T, F, Fut>(review_id: Uuid, mut attempt_fn: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 1;
    loop {
        match attempt_fn().await {
            Err(AppError::OrmError(err)) if attempt < MAX_TX_ATTEMPTS && is_transient(&err) => {
                tracing::warn!(
                    review_id = %review_id,
                    attempt,
                    error = %err,
                    "transient conflict during moderation, retrying"
                );
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn review_not_found() -> AppError {
    AppError::NotFound("Review not found".into())
}

pub async fn moderation_history(
    state: &AppState,
    user: &AuthUser,
    scope: HistoryScope,
    limit: Option<u64>,
) -> AppResult<ApiResponse<ModerationHistoryList>> {
    ensure_moderator(user)?;
    let items = ledger::history(&state.orm, scope, limit)
        .await?
        .into_iter()
        .map(ModerationAction::from)
        .collect();
    Ok(ApiResponse::success(
        "Moderation history",
        ModerationHistoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn moderator_stats(
    state: &AppState,
    user: &AuthUser,
    moderator_id: Uuid,
) -> AppResult<ApiResponse<ModeratorStats>> {
    ensure_moderator(user)?;
    let stats = ledger::moderator_stats(&state.orm, moderator_id).await?;
    Ok(ApiResponse::success(
        "Moderator statistics",
        stats,
        Some(Meta::empty()),
    ))
}
