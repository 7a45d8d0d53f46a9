use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    routing::{delete, get, put},
};
use uuid::Uuid;

use crate::{
    dto::moderation::{
        ModerationHistoryList, ModerationOutcome, ModerationReasonRequest, PendingReviewList,
        ReviewStatusCounts,
    },
    error::{AppError, AppResult},
    ledger::HistoryScope,
    middleware::auth::{AuthUser, ensure_moderator},
    models::ModeratorStats,
    response::ApiResponse,
    routes::params::HistoryQuery,
    services::{moderation_service, review_service},
    state::AppState,
};

const MAX_REASON_LEN: usize = 500;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending", get(list_pending))
        .route("/summary", get(review_summary))
        .route("/{id}/approve", put(approve_review))
        .route("/{id}/reject", put(reject_review))
        .route("/reviews/{id}", delete(remove_review))
        .route("/history", get(history))
        .route("/history/reviews/{id}", get(review_history))
        .route("/history/moderators/{id}", get(moderator_history))
        .route("/stats", get(my_stats))
        .route("/stats/{moderator_id}", get(moderator_stats))
}

type ReasonBody = Result<Json<ModerationReasonRequest>, JsonRejection>;

/// A request without a JSON body carries no reason; a malformed body is a validation error.
fn reason_body(payload: ReasonBody) -> AppResult<ModerationReasonRequest> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(ModerationReasonRequest::default()),
        Err(rejection) => Err(AppError::Validation(rejection.body_text())),
    }
}

/// Reject and remove must say why. Storage accepts a missing reason; this boundary does not.
fn required_reason(payload: ModerationReasonRequest) -> AppResult<String> {
    let reason = payload
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::Validation("A reason is required".into()))?;
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(AppError::Validation(format!(
            "Reason must not exceed {MAX_REASON_LEN} characters"
        )));
    }
    Ok(reason)
}

#[utoipa::path(
    get,
    path = "/api/moderation/pending",
    responses(
        (status = 200, description = "Pending reviews, oldest first", body = ApiResponse<PendingReviewList>),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Moderation"
)]
pub async fn list_pending(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PendingReviewList>>> {
    let resp = review_service::list_pending_reviews(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/moderation/summary",
    responses(
        (status = 200, description = "Review counts per status", body = ApiResponse<ReviewStatusCounts>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Moderation"
)]
pub async fn review_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ReviewStatusCounts>>> {
    let resp = review_service::review_summary(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/moderation/{id}/approve",
    params(
        ("id" = Uuid, Path, description = "Review ID")
    ),
    responses(
        (status = 200, description = "Review approved", body = ApiResponse<ModerationOutcome>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Review not found"),
        (status = 409, description = "Review already moderated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Moderation"
)]
pub async fn approve_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ModerationOutcome>>> {
    let resp = moderation_service::approve_review(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/moderation/{id}/reject",
    params(
        ("id" = Uuid, Path, description = "Review ID")
    ),
    request_body = ModerationReasonRequest,
    responses(
        (status = 200, description = "Review rejected", body = ApiResponse<ModerationOutcome>),
        (status = 400, description = "Missing reason"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Review not found"),
        (status = 409, description = "Review already moderated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Moderation"
)]
pub async fn reject_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    payload: ReasonBody,
) -> AppResult<Json<ApiResponse<ModerationOutcome>>> {
    ensure_moderator(&user)?;
    let reason = required_reason(reason_body(payload)?)?;
    let resp = moderation_service::reject_review(&state, &user, id, Some(reason)).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/moderation/reviews/{id}",
    params(
        ("id" = Uuid, Path, description = "Review ID")
    ),
    request_body = ModerationReasonRequest,
    responses(
        (status = 200, description = "Review removed", body = ApiResponse<ModerationOutcome>),
        (status = 400, description = "Missing reason"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Review not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Moderation"
)]
pub async fn remove_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    payload: ReasonBody,
) -> AppResult<Json<ApiResponse<ModerationOutcome>>> {
    ensure_moderator(&user)?;
    let reason = required_reason(reason_body(payload)?)?;
    let resp = moderation_service::remove_review(&state, &user, id, Some(reason)).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/moderation/history",
    params(
        ("limit" = Option<u64>, Query, description = "Max entries, 1-200, default 50")
    ),
    responses(
        (status = 200, description = "Moderation history, newest first", body = ApiResponse<ModerationHistoryList>),
        (status = 400, description = "Invalid limit"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Moderation"
)]
pub async fn history(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<ApiResponse<ModerationHistoryList>>> {
    let limit = query.resolve()?;
    let resp =
        moderation_service::moderation_history(&state, &user, HistoryScope::All, Some(limit))
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/moderation/history/reviews/{id}",
    params(
        ("id" = Uuid, Path, description = "Review ID, live or removed")
    ),
    responses(
        (status = 200, description = "History of one review", body = ApiResponse<ModerationHistoryList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Moderation"
)]
pub async fn review_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ModerationHistoryList>>> {
    let resp =
        moderation_service::moderation_history(&state, &user, HistoryScope::Review(id), None)
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/moderation/history/moderators/{id}",
    params(
        ("id" = Uuid, Path, description = "Moderator ID"),
        ("limit" = Option<u64>, Query, description = "Max entries, 1-200, uncapped when absent")
    ),
    responses(
        (status = 200, description = "Actions taken by one moderator", body = ApiResponse<ModerationHistoryList>),
        (status = 400, description = "Invalid limit"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Moderation"
)]
pub async fn moderator_history(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<ApiResponse<ModerationHistoryList>>> {
    let limit = query.resolve_optional()?;
    let resp =
        moderation_service::moderation_history(&state, &user, HistoryScope::Moderator(id), limit)
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/moderation/stats",
    responses(
        (status = 200, description = "Statistics for the calling moderator", body = ApiResponse<ModeratorStats>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Moderation"
)]
pub async fn my_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ModeratorStats>>> {
    let resp = moderation_service::moderator_stats(&state, &user, user.user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/moderation/stats/{moderator_id}",
    params(
        ("moderator_id" = Uuid, Path, description = "Moderator ID")
    ),
    responses(
        (status = 200, description = "Statistics for one moderator", body = ApiResponse<ModeratorStats>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Moderation"
)]
pub async fn moderator_stats(
    State(state): State<AppState>,
    user: AuthUser,
    Path(moderator_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ModeratorStats>>> {
    let resp = moderation_service::moderator_stats(&state, &user, moderator_id).await?;
    Ok(Json(resp))
}
