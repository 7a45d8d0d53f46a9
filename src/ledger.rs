//! Append-only moderation ledger.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    entity::moderation_history::{
        ActionKind, ActiveModel as HistoryActive, Column as HistoryCol, Entity as ModerationHistory,
        Model as HistoryModel,
    },
    error::AppResult,
    models::ModeratorStats,
};

/// Append one decision to the ledger. Entries are never updated or deleted.
pub async fn record_action<C>(
    conn: &C,
    review_id: Uuid,
    moderator_id: Uuid,
    action: ActionKind,
    reason: Option<String>,
) -> AppResult<HistoryModel>
where
    C: ConnectionTrait,
{
    let entry = HistoryActive {
        id: Set(Uuid::new_v4()),
        review_id: Set(review_id),
        moderator_id: Set(moderator_id),
        action: Set(action),
        reason: Set(reason),
        timestamp: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(entry)
}

/// Scope of a history query.
#[derive(Debug, Clone, Copy)]
pub enum HistoryScope {
    All,
    Review(Uuid),
    Moderator(Uuid),
}

/// Ledger entries, newest first, optionally capped.
pub async fn history<C>(conn: &C, scope: HistoryScope, limit: Option<u64>) -> AppResult<Vec<HistoryModel>>
where
    C: ConnectionTrait,
{
    let mut finder = ModerationHistory::find();
    finder = match scope {
        HistoryScope::All => finder,
        HistoryScope::Review(id) => finder.filter(HistoryCol::ReviewId.eq(id)),
        HistoryScope::Moderator(id) => finder.filter(HistoryCol::ModeratorId.eq(id)),
    };
    let entries = finder
        .order_by_desc(HistoryCol::Timestamp)
        .limit(limit)
        .all(conn)
        .await?;
    Ok(entries)
}

#[derive(Debug, FromQueryResult)]
struct ActionCount {
    action: ActionKind,
    count: i64,
}

/// Per-action counts for one moderator, grouped over the ledger.
pub async fn moderator_stats<C>(conn: &C, moderator_id: Uuid) -> AppResult<ModeratorStats>
where
    C: ConnectionTrait,
{
    let rows = ModerationHistory::find()
        .select_only()
        .column(HistoryCol::Action)
        .column_as(Expr::col(HistoryCol::Id).count(), "count")
        .filter(HistoryCol::ModeratorId.eq(moderator_id))
        .group_by(HistoryCol::Action)
        .into_model::<ActionCount>()
        .all(conn)
        .await?;

    let mut stats = ModeratorStats::default();
    for row in rows {
        match row.action {
            ActionKind::Approve => stats.approvals = row.count,
            ActionKind::Reject => stats.rejections = row.count,
            ActionKind::Remove => stats.removals = row.count,
        }
        stats.total_actions += row.count;
    }
    Ok(stats)
}
