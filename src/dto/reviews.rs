use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Review;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitReviewRequest {
    pub product_id: Uuid,
    pub rating: i32,
    pub review_text: String,
}

/// Input to review submission once the caller has been resolved.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub rating: i32,
    pub review_text: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReviewList {
    #[schema(value_type = Vec<Review>)]
    pub items: Vec<Review>,
}
