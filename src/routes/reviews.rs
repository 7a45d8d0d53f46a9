use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::reviews::{ReviewList, SubmitReviewRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Review,
    response::ApiResponse,
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_review))
        .route("/mine", get(my_reviews))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = SubmitReviewRequest,
    responses(
        (status = 201, description = "Review submitted, pending moderation", body = ApiResponse<Review>),
        (status = 400, description = "Invalid rating or review text"),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Already reviewed this product"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn submit_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitReviewRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Review>>)> {
    let resp = review_service::create_review(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/reviews/mine",
    responses(
        (status = 200, description = "Caller's reviews in any status", body = ApiResponse<ReviewList>),
        (status = 401, description = "Unauthenticated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn my_reviews(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = review_service::list_my_reviews(&state, &user).await?;
    Ok(Json(resp))
}
