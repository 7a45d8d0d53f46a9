use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub const MAX_PAGE: i64 = 100_000;

impl Pagination {
    /// `(page, per_page, offset)` with page in `1..=MAX_PAGE` and per_page in `1..=100`.
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

// Paging fields are inlined: `#[serde(flatten)]` breaks numeric parsing in query strings.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub category: Option<String>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

pub const DEFAULT_HISTORY_LIMIT: u64 = 50;
pub const MAX_HISTORY_LIMIT: u64 = 200;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct HistoryQuery {
    pub limit: Option<u64>,
}

impl HistoryQuery {
    /// Limit for the global feed: defaults to 50, must lie in 1..=200.
    pub fn resolve(&self) -> Result<u64, AppError> {
        let limit = self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "Limit must be between 1 and {MAX_HISTORY_LIMIT}"
            )));
        }
        Ok(limit)
    }

    /// Optional cap: absent means uncapped, present must lie in 1..=200.
    pub fn resolve_optional(&self) -> Result<Option<u64>, AppError> {
        match self.limit {
            None => Ok(None),
            Some(_) => self.resolve().map(Some),
        }
    }
}
