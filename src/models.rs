use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    moderation_history::{self, ActionKind},
    products,
    reviews::{self, ReviewStatus},
    users::{self, AuthProvider, Role},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub auth_provider: AuthProvider,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
    pub average_rating: f64,
    pub total_reviews: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub rating: i32,
    pub review_text: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub moderator_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModerationAction {
    pub id: Uuid,
    pub review_id: Uuid,
    pub moderator_id: Uuid,
    pub action: ActionKind,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ModeratorStats {
    pub total_actions: i64,
    pub approvals: i64,
    pub rejections: i64,
    pub removals: i64,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            display_name: model.display_name,
            role: model.role,
            auth_provider: model.auth_provider,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            category: model.category,
            image_url: model.image_url,
            average_rating: model.average_rating,
            total_reviews: model.total_reviews,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<reviews::Model> for Review {
    fn from(model: reviews::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            user_id: model.user_id,
            user_name: model.user_name,
            rating: model.rating,
            review_text: model.review_text,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            moderated_at: model.moderated_at.map(|dt| dt.with_timezone(&Utc)),
            moderator_id: model.moderator_id,
        }
    }
}

impl From<moderation_history::Model> for ModerationAction {
    fn from(model: moderation_history::Model) -> Self {
        Self {
            id: model.id,
            review_id: model.review_id,
            moderator_id: model.moderator_id,
            action: model.action,
            reason: model.reason,
            timestamp: model.timestamp.with_timezone(&Utc),
        }
    }
}
