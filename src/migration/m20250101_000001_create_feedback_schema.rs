use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, EntityTrait, Schema};

use crate::entity::{ModerationHistory, Products, Reviews, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

// Partial unique index: at most one non-rejected review per user and product.
// Both PostgreSQL and SQLite accept this form.
const ONE_ACTIVE_REVIEW_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS reviews_one_active_per_user \
     ON reviews (user_id, product_id) WHERE status <> 'rejected'";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        manager
            .create_table(table_for(&schema, Users).if_not_exists().to_owned())
            .await?;

        manager
            .create_table(
                table_for(&schema, Products)
                    .if_not_exists()
                    .check(Expr::cust("average_rating >= 0 AND average_rating <= 5"))
                    .check(Expr::cust("total_reviews >= 0"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                table_for(&schema, Reviews)
                    .if_not_exists()
                    .check(Expr::cust("rating BETWEEN 1 AND 5"))
                    .check(Expr::cust("length(review_text) BETWEEN 10 AND 1000"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(table_for(&schema, ModerationHistory).if_not_exists().to_owned())
            .await?;

        manager
            .get_connection()
            .execute_unprepared(ONE_ACTIVE_REVIEW_INDEX)
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("reviews_product_status_idx")
                    .table(Reviews)
                    .col(crate::entity::reviews::Column::ProductId)
                    .col(crate::entity::reviews::Column::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("moderation_history_moderator_idx")
                    .table(ModerationHistory)
                    .col(crate::entity::moderation_history::Column::ModeratorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModerationHistory).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reviews).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

fn table_for<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    schema.create_table_from_entity(entity)
}
