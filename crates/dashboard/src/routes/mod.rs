//! HTTP route handlers.

pub mod auth;
pub mod bots;
pub mod content;
pub mod dashboard;
pub mod health;
pub mod kyc;
pub mod playlists;
pub mod settings;
pub mod transactions;
pub mod users;

use serde::Deserialize;

use crate::error::ApiError;

/// Default row count for bounded list endpoints.
pub const DEFAULT_LIMIT: u32 = 10;

/// Upper bound accepted for `limit` parameters.
pub const MAX_LIMIT: u32 = 100;

/// `?limit=` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

impl LimitQuery {
    pub fn resolve(&self) -> Result<u32, ApiError> {
        match self.limit {
            None => Ok(DEFAULT_LIMIT),
            Some(limit) if (1..=MAX_LIMIT).contains(&limit) => Ok(limit),
            Some(_) => Err(ApiError::Validation(format!(
                "Limit must be between 1 and {}",
                MAX_LIMIT
            ))),
        }
    }
}

/// First row of a targeted write, or `err` when the write matched nothing.
pub(crate) fn first_or<T>(rows: Vec<T>, err: ApiError) -> Result<T, ApiError> {
    rows.into_iter().next().ok_or(err)
}
