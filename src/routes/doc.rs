use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    aggregate::RatingSummary,
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        moderation::{
            ModerationHistoryList, ModerationOutcome, ModerationReasonRequest, PendingReview,
            PendingReviewList, ProductBrief, ReviewStatusCounts,
        },
        products::{CategoryList, CreateProductRequest, ProductList},
        reviews::{ReviewList, SubmitReviewRequest},
    },
    entity::{
        moderation_history::ActionKind,
        reviews::ReviewStatus,
        users::{AuthProvider, Role},
    },
    models::{ModerationAction, ModeratorStats, Product, Review, User},
    response::Meta,
    routes::{auth, health, moderation, params, products, reviews},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        products::list_products,
        products::list_categories,
        products::get_product,
        products::create_product,
        products::list_product_reviews,
        reviews::submit_review,
        reviews::my_reviews,
        moderation::list_pending,
        moderation::review_summary,
        moderation::approve_review,
        moderation::reject_review,
        moderation::remove_review,
        moderation::history,
        moderation::review_history,
        moderation::moderator_history,
        moderation::my_stats,
        moderation::moderator_stats
    ),
    components(
        schemas(
            User,
            Role,
            AuthProvider,
            Product,
            Review,
            ReviewStatus,
            ModerationAction,
            ActionKind,
            ModeratorStats,
            RatingSummary,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            ProductList,
            CategoryList,
            SubmitReviewRequest,
            ReviewList,
            ModerationReasonRequest,
            ModerationOutcome,
            ProductBrief,
            PendingReview,
            PendingReviewList,
            ModerationHistoryList,
            ReviewStatusCounts,
            params::Pagination,
            params::ProductQuery,
            params::HistoryQuery,
            Meta
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Reviews", description = "Review submission and listing"),
        (name = "Moderation", description = "Moderator-only review workflow"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
