use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    aggregate::RatingSummary,
    models::{ModerationAction, Review},
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ModerationReasonRequest {
    pub reason: Option<String>,
}

/// Result of a moderation transition.
#[derive(Debug, Serialize, ToSchema)]
pub struct ModerationOutcome {
    /// The review after the transition; `None` once removed.
    pub review: Option<Review>,
    pub action: ModerationAction,
    /// Present when the product's rating was recomputed.
    pub rating: Option<RatingSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductBrief {
    pub id: Uuid,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendingReview {
    #[serde(flatten)]
    pub review: Review,
    pub product: Option<ProductBrief>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PendingReviewList {
    #[schema(value_type = Vec<PendingReview>)]
    pub items: Vec<PendingReview>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ModerationHistoryList {
    #[schema(value_type = Vec<ModerationAction>)]
    pub items: Vec<ModerationAction>,
}

#[derive(Debug, Default, Serialize, ToSchema, PartialEq, Eq)]
pub struct ReviewStatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}
