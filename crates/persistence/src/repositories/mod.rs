//! Repository implementations, one per business entity.
//!
//! Repositories are stateless apart from the shared store handle. List and
//! single-entity reads and all writes propagate [`StoreError`] after logging;
//! aggregate reads log and fall back to zeroed stats.

pub mod analytics;
pub mod bot_config;
pub mod cms;
pub mod kyc;
pub mod playlist;
pub mod profile;
pub mod reward_settings;
pub mod system_settings;
pub mod transactions;
pub mod users;

pub use analytics::AnalyticsRepository;
pub use bot_config::BotConfigRepository;
pub use cms::CmsRepository;
pub use kyc::KycRepository;
pub use playlist::PlaylistRepository;
pub use profile::ProfileRepository;
pub use reward_settings::RewardSettingsRepository;
pub use system_settings::SystemSettingsRepository;
pub use transactions::TransactionsRepository;
pub use users::UsersRepository;

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use domain::models::{NewAuditLog, Profile};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::schema::tables;
use crate::store::{decode_rows, DataStore, Mutation, Query, Row, StoreError};

/// Fetch profiles for a set of user ids, keyed by id.
pub(crate) async fn profiles_by_id(
    store: &dyn DataStore,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, Profile>, StoreError> {
    let mut ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = store
        .select(&Query::from(tables::PROFILES).is_in("id", ids))
        .await?;
    let profiles: Vec<Profile> = decode_rows(rows)?;
    Ok(profiles.into_iter().map(|p| (p.id, p)).collect())
}

/// Log an aggregate-read failure and substitute zeroed stats.
pub(crate) fn zeroed_on_error<T: Default>(result: Result<T, StoreError>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::error!(error = %e, stats = what, "Failed to compute stats, returning zeroes");
        T::default()
    })
}

/// Log a propagated read or write failure.
pub(crate) fn logged<T>(result: Result<T, StoreError>, operation: &str) -> Result<T, StoreError> {
    if let Err(e) = &result {
        tracing::error!(error = %e, operation, "Store operation failed");
    }
    result
}

/// Insert mutation for an audit entry, submitted in the same batch as the change.
pub(crate) fn audit_mutation(entry: &NewAuditLog) -> Result<Mutation, StoreError> {
    let row = crate::store::to_row(entry)?;
    Ok(Mutation::insert(tables::AUDIT_LOGS, vec![row]))
}

/// Timestamp in the encoding rows use.
pub(crate) fn timestamp(at: DateTime<Utc>) -> Value {
    json!(at.to_rfc3339())
}

/// Midnight UTC on the first day of the month containing `now`.
pub(crate) fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Consecutive days ending today, oldest first.
pub(crate) fn day_window(now: DateTime<Utc>, days: u32) -> Vec<NaiveDate> {
    let today = now.date_naive();
    (0..days as i64)
        .rev()
        .map(|back| today - Duration::days(back))
        .collect()
}

/// Build a row from key/value pairs.
pub(crate) fn row(pairs: Value) -> Row {
    match pairs {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
