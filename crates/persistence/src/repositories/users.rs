//! User administration: profiles joined with roles, rewards and KYC state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use domain::models::{
    AppRole, AuditAction, KycDocument, KycReviewUpdate, KycStatus, ListOptions, Profile,
    UserDetail, UserReward, UserRole, UserStats, UserView, NOT_AVAILABLE,
};
use domain::services::AuditLogBuilder;
use serde_json::{json, Map, Value};
use shared::format::format_date;
use uuid::Uuid;

use super::{audit_mutation, logged, row, start_of_month, timestamp, zeroed_on_error};
use crate::schema::tables;
use crate::store::{
    decode_row, decode_rows, to_row, DataStore, Direction, Mutation, Query, Row, StoreError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Flag,
    Text,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldKind::Flag => value.is_boolean(),
            FieldKind::Text => value.is_string() || value.is_null(),
        }
    }
}

/// Accepted update keys, the profile column each maps to, and its value kind.
const PROFILE_FIELDS: &[(&str, &str, FieldKind)] = &[
    ("fullName", "full_name", FieldKind::Text),
    ("full_name", "full_name", FieldKind::Text),
    ("email", "email", FieldKind::Text),
    ("phone", "phone", FieldKind::Text),
    ("bio", "bio", FieldKind::Text),
    ("avatarUrl", "avatar_url", FieldKind::Text),
    ("avatar_url", "avatar_url", FieldKind::Text),
    ("isActive", "is_active", FieldKind::Flag),
    ("is_active", "is_active", FieldKind::Flag),
    ("spotifyConnected", "spotify_connected", FieldKind::Flag),
    ("spotify_connected", "spotify_connected", FieldKind::Flag),
    ("spotifyUserId", "spotify_user_id", FieldKind::Text),
    ("spotify_user_id", "spotify_user_id", FieldKind::Text),
    ("spotifyDisplayName", "spotify_display_name", FieldKind::Text),
    ("spotify_display_name", "spotify_display_name", FieldKind::Text),
];

/// Map a partial profile update onto profile columns.
///
/// Unknown keys are dropped without error. A known key whose value has the
/// wrong type rejects the whole update.
pub fn map_profile_fields(updates: &Map<String, Value>) -> Result<Row, StoreError> {
    let mut mapped = Row::new();
    for (key, value) in updates {
        match PROFILE_FIELDS.iter().find(|(k, _, _)| k == key) {
            Some((_, column, kind)) => {
                if !kind.accepts(value) {
                    let expected = match kind {
                        FieldKind::Flag => "a boolean",
                        FieldKind::Text => "a string or null",
                    };
                    return Err(StoreError::Validation(format!(
                        "{} must be {}",
                        key, expected
                    )));
                }
                mapped.insert(column.to_string(), value.clone());
            }
            None => tracing::debug!(key = %key, "Dropping unknown profile field"),
        }
    }
    Ok(mapped)
}

/// Repository for user administration.
#[derive(Clone)]
pub struct UsersRepository {
    store: Arc<dyn DataStore>,
}

impl UsersRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// List users with search over email and name, and an active/inactive filter.
    pub async fn list_users(&self, options: &ListOptions) -> Result<Vec<UserView>, StoreError> {
        logged(self.fetch_users(options).await, "list_users")
    }

    async fn fetch_users(&self, options: &ListOptions) -> Result<Vec<UserView>, StoreError> {
        let mut query = Query::from(tables::PROFILES).order_by("created_at", Direction::Desc);
        if let Some(term) = options.search_term() {
            query = query.search(&["email", "full_name"], term);
        }
        match options.status_filter() {
            Some("active") => query = query.eq("is_active", true),
            Some("inactive") => query = query.eq("is_active", false),
            Some(other) => {
                tracing::debug!(status = %other, "Unknown user status filter matches nothing");
                return Ok(Vec::new());
            }
            None => {}
        }
        let query = query.range(options.page_limit(), options.offset);

        let profiles: Vec<Profile> = decode_rows(self.store.select(&query).await?)?;
        if profiles.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = profiles.iter().map(|p| p.id.to_string()).collect();

        let documents: Vec<KycDocument> = decode_rows(
            self.store
                .select(
                    &Query::from(tables::KYC_DOCUMENTS)
                        .is_in("user_id", ids.clone())
                        .order_by("created_at", Direction::Desc),
                )
                .await?,
        )?;
        let rewards: Vec<UserReward> = decode_rows(
            self.store
                .select(&Query::from(tables::USER_REWARDS).is_in("user_id", ids.clone()))
                .await?,
        )?;
        let roles: Vec<UserRole> = decode_rows(
            self.store
                .select(&Query::from(tables::USER_ROLES).is_in("user_id", ids))
                .await?,
        )?;

        // Documents are newest first, so the first one seen per user wins.
        let mut latest_kyc: HashMap<Uuid, KycStatus> = HashMap::new();
        for doc in &documents {
            latest_kyc.entry(doc.user_id).or_insert(doc.status);
        }
        let rewards: HashMap<Uuid, UserReward> =
            rewards.into_iter().map(|r| (r.user_id, r)).collect();
        let roles: HashMap<Uuid, AppRole> = roles.into_iter().map(|r| (r.user_id, r.role)).collect();

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let reward = rewards.get(&profile.id);
                UserView {
                    id: profile.id,
                    name: profile.display_name(),
                    email: profile.email.clone().unwrap_or_else(|| NOT_AVAILABLE.into()),
                    phone: profile.phone.clone().unwrap_or_else(|| NOT_AVAILABLE.into()),
                    status: if profile.is_active { "active" } else { "inactive" }.to_string(),
                    kyc_status: latest_kyc.get(&profile.id).copied().unwrap_or_default(),
                    role: roles.get(&profile.id).copied().unwrap_or_default(),
                    total_points: reward.map(|r| r.total_points).unwrap_or(0),
                    level: reward.map(|r| r.level).unwrap_or(1),
                    spotify_connected: profile.spotify_connected,
                    join_date: format_date(&profile.created_at),
                }
            })
            .collect())
    }

    /// Full detail for one user, or `None` if the profile does not exist.
    pub async fn get_user(&self, id: Uuid) -> Result<Option<UserDetail>, StoreError> {
        logged(self.fetch_user(id).await, "get_user")
    }

    async fn fetch_user(&self, id: Uuid) -> Result<Option<UserDetail>, StoreError> {
        let rows = self
            .store
            .select(&Query::from(tables::PROFILES).eq("id", id.to_string()).limit(1))
            .await?;
        let Some(first) = rows.into_iter().next() else {
            return Ok(None);
        };
        let profile: Profile = decode_row(first)?;

        let role = self.get_user_role(id).await?.unwrap_or_default();
        let rewards = self
            .store
            .select(&Query::from(tables::USER_REWARDS).eq("user_id", id.to_string()))
            .await?
            .into_iter()
            .next()
            .map(decode_row::<UserReward>)
            .transpose()?
            .unwrap_or_else(|| UserReward::empty(id));
        let kyc_documents = decode_rows(
            self.store
                .select(
                    &Query::from(tables::KYC_DOCUMENTS)
                        .eq("user_id", id.to_string())
                        .order_by("created_at", Direction::Desc),
                )
                .await?,
        )?;

        Ok(Some(UserDetail {
            profile,
            role,
            rewards,
            kyc_documents,
        }))
    }

    /// Headline user counts. Zeroed when the store fails.
    pub async fn get_user_stats(&self) -> UserStats {
        zeroed_on_error(self.fetch_user_stats().await, "users")
    }

    async fn fetch_user_stats(&self) -> Result<UserStats, StoreError> {
        let month_start = start_of_month(Utc::now());
        let total_users = self.store.count(&Query::from(tables::PROFILES)).await?;
        let active_users = self
            .store
            .count(&Query::from(tables::PROFILES).eq("is_active", true))
            .await?;
        let new_this_month = self
            .store
            .count(&Query::from(tables::PROFILES).gte("created_at", timestamp(month_start)))
            .await?;
        let mut verified: Vec<String> = self
            .store
            .select(
                &Query::from(tables::KYC_DOCUMENTS)
                    .columns(&["user_id"])
                    .eq("status", KycStatus::Approved.as_str()),
            )
            .await?
            .into_iter()
            .filter_map(|r| r.get("user_id").and_then(Value::as_str).map(str::to_string))
            .collect();
        verified.sort();
        verified.dedup();

        Ok(UserStats {
            total_users,
            active_users,
            inactive_users: total_users - active_users,
            new_this_month,
            verified_users: verified.len() as i64,
        })
    }

    /// Apply a partial profile update. Unknown keys are ignored.
    pub async fn update_user_profile(
        &self,
        id: Uuid,
        updates: &Map<String, Value>,
    ) -> Result<Profile, StoreError> {
        let mut patch = logged(map_profile_fields(updates), "update_user_profile")?;
        patch.insert("updated_at".into(), timestamp(Utc::now()));

        let rows = logged(
            self.store
                .update(Query::from(tables::PROFILES).eq("id", id.to_string()), patch)
                .await,
            "update_user_profile",
        )?;
        let profile = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))?;

        tracing::info!(user_id = %id, "Updated user profile");
        decode_row(profile)
    }

    /// Soft-deactivate or reactivate a user.
    pub async fn set_user_active(&self, id: Uuid, active: bool) -> Result<Profile, StoreError> {
        let updates = row(json!({ "is_active": active }));
        self.update_user_profile(id, &updates).await
    }

    /// Review every document of a user that can move to `status`.
    ///
    /// Returns the updated documents; an empty result means nothing matched.
    pub async fn update_user_kyc_status(
        &self,
        user_id: Uuid,
        status: KycStatus,
        reason: Option<&str>,
        reviewer: Option<Uuid>,
    ) -> Result<Vec<KycDocument>, StoreError> {
        let review = KycReviewUpdate::new(status, reason, reviewer, Utc::now());
        let sources: Vec<&str> = KycStatus::sources_for(status)
            .iter()
            .map(KycStatus::as_str)
            .collect();
        let query = Query::from(tables::KYC_DOCUMENTS)
            .eq("user_id", user_id.to_string())
            .is_in("status", sources);

        let audit = AuditLogBuilder::new(reviewer, AuditAction::KycStatusChanged)
            .on_resource("user", user_id)
            .with_change("status", None, Some(json!(status.as_str())))
            .with_detail("reason", json!(review.rejection_reason))
            .build();

        let result = self
            .store
            .batch(vec![
                Mutation::update(query, to_row(&review)?).required(),
                audit_mutation(&audit)?,
            ])
            .await;

        match result {
            Ok(mut results) => {
                let documents: Vec<KycDocument> = decode_rows(results.swap_remove(0))?;
                tracing::info!(
                    user_id = %user_id,
                    status = %status,
                    updated = documents.len(),
                    "Updated user KYC status"
                );
                Ok(documents)
            }
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(user_id = %user_id, status = %status, "No KYC document matched");
                Ok(Vec::new())
            }
            Err(e) => logged(Err(e), "update_user_kyc_status"),
        }
    }

    /// Role assigned to a user, if any.
    pub async fn get_user_role(&self, user_id: Uuid) -> Result<Option<AppRole>, StoreError> {
        let rows = logged(
            self.store
                .select(&Query::from(tables::USER_ROLES).eq("user_id", user_id.to_string()))
                .await,
            "get_user_role",
        )?;
        Ok(rows
            .into_iter()
            .next()
            .map(decode_row::<UserRole>)
            .transpose()?
            .map(|r| r.role))
    }

    /// Whether a user may use the admin dashboard. Store failures deny access.
    pub async fn is_admin(&self, user_id: Uuid) -> bool {
        match self.get_user_role(user_id).await {
            Ok(role) => role.is_some_and(|r| r.can_access_admin()),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{seed_profile, seed_profile_with, store};
    use domain::models::MAX_PAGE_LIMIT;

    #[test]
    fn test_mapper_drops_unknown_keys() {
        let updates = row(json!({
            "fullName": "John Doe",
            "avatarUrl": "https://cdn.example.com/a.png",
            "invalidField": "should not be written",
        }));
        let mapped = map_profile_fields(&updates).unwrap();
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped["full_name"], json!("John Doe"));
        assert_eq!(mapped["avatar_url"], json!("https://cdn.example.com/a.png"));
        assert!(!mapped.contains_key("invalidField"));
    }

    #[tokio::test]
    async fn test_list_users_search_john() {
        let (memory, store) = store();
        seed_profile(&memory, "john@example.com", Some("John"));
        seed_profile(&memory, "jane@example.com", Some("Jane"));
        let repo = UsersRepository::new(store);

        let options = ListOptions::default().with_search("john").with_page(10, 0);
        let users = repo.list_users(&options).await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "john@example.com");
        assert_eq!(users[0].kyc_status, KycStatus::Pending);
        assert_eq!(users[0].role, AppRole::User);
        assert_eq!(users[0].total_points, 0);
    }

    #[tokio::test]
    async fn test_list_users_joins_related_rows() {
        let (memory, store) = store();
        let id = seed_profile(&memory, "amy@example.com", None);
        memory
            .seed(tables::USER_ROLES, vec![json!({"user_id": id, "role": "moderator"})])
            .unwrap();
        memory
            .seed(
                tables::USER_REWARDS,
                vec![json!({"user_id": id, "total_points": 1200, "level": 3})],
            )
            .unwrap();
        memory
            .seed(
                tables::KYC_DOCUMENTS,
                vec![
                    json!({"user_id": id, "document_type": "passport", "file_path": "a", "status": "rejected", "created_at": "2024-01-01T00:00:00Z"}),
                    json!({"user_id": id, "document_type": "passport", "file_path": "b", "status": "under_review", "created_at": "2024-02-01T00:00:00Z"}),
                ],
            )
            .unwrap();
        let repo = UsersRepository::new(store);

        let users = repo.list_users(&ListOptions::default()).await.unwrap();
        assert_eq!(users[0].name, "amy@example.com");
        assert_eq!(users[0].phone, NOT_AVAILABLE);
        assert_eq!(users[0].role, AppRole::Moderator);
        assert_eq!(users[0].total_points, 1200);
        assert_eq!(users[0].kyc_status, KycStatus::UnderReview);
    }

    #[tokio::test]
    async fn test_status_all_applies_no_filter() {
        let (memory, store) = store();
        seed_profile(&memory, "a@example.com", None);
        seed_profile_with(&memory, json!({"email": "b@example.com", "is_active": false}));
        let repo = UsersRepository::new(store);

        let all = repo
            .list_users(&ListOptions::default().with_status("all"))
            .await
            .unwrap();
        let active = repo
            .list_users(&ListOptions::default().with_status("active"))
            .await
            .unwrap();
        let inactive = repo
            .list_users(&ListOptions::default().with_status("inactive"))
            .await
            .unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(active.len(), 1);
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].status, "inactive");

        let unknown = repo
            .list_users(&ListOptions::default().with_status("verified"))
            .await
            .unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn test_list_users_caps_page_size() {
        let (memory, store) = store();
        let profiles = (0..MAX_PAGE_LIMIT + 5)
            .map(|i| json!({"email": format!("user{}@example.com", i)}))
            .collect();
        memory.seed(tables::PROFILES, profiles).unwrap();
        let repo = UsersRepository::new(store);

        let users = repo
            .list_users(&ListOptions::default().with_page(5000, 0))
            .await
            .unwrap();
        assert_eq!(users.len(), MAX_PAGE_LIMIT as usize);
    }

    #[tokio::test]
    async fn test_update_profile_rejects_mistyped_value() {
        let (memory, store) = store();
        let id: Uuid = seed_profile(&memory, "john@example.com", Some("John"))
            .parse()
            .unwrap();
        let repo = UsersRepository::new(store);

        for updates in [json!({"isActive": "nope"}), json!({"isActive": null}), json!({"phone": 42})] {
            let err = repo.update_user_profile(id, &row(updates)).await.unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }
        assert_eq!(memory.write_count(), 0);
        assert_eq!(memory.rows(tables::PROFILES)[0]["is_active"], json!(true));

        let users = repo.list_users(&ListOptions::default()).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].status, "active");
    }

    #[tokio::test]
    async fn test_list_users_propagates_store_failure() {
        let (memory, store) = store();
        memory.set_failing(true);
        let repo = UsersRepository::new(store);
        assert!(repo.list_users(&ListOptions::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_update_profile_ignores_invalid_field() {
        let (memory, store) = store();
        let id = seed_profile(&memory, "john@example.com", Some("John"));
        let repo = UsersRepository::new(store);

        let updates = row(json!({"fullName": "John Smith", "invalidField": 42}));
        let profile = repo
            .update_user_profile(id.parse().unwrap(), &updates)
            .await
            .unwrap();

        assert_eq!(profile.full_name.as_deref(), Some("John Smith"));
        assert!(!memory.rows(tables::PROFILES)[0].contains_key("invalidField"));
    }

    #[tokio::test]
    async fn test_update_missing_profile_is_not_found() {
        let (_memory, store) = store();
        let repo = UsersRepository::new(store);
        let err = repo.set_user_active(Uuid::new_v4(), false).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_user_stats() {
        let (memory, store) = store();
        let a = seed_profile(&memory, "a@example.com", None);
        seed_profile_with(
            &memory,
            json!({"email": "b@example.com", "is_active": false, "created_at": "2020-01-01T00:00:00Z"}),
        );
        memory
            .seed(
                tables::KYC_DOCUMENTS,
                vec![
                    json!({"user_id": a, "document_type": "passport", "file_path": "x", "status": "approved"}),
                    json!({"user_id": a, "document_type": "utility_bill", "file_path": "y", "status": "approved"}),
                ],
            )
            .unwrap();
        let repo = UsersRepository::new(store);

        let stats = repo.get_user_stats().await;
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.active_users, 1);
        assert_eq!(stats.inactive_users, 1);
        assert_eq!(stats.new_this_month, 1);
        assert_eq!(stats.verified_users, 1);
    }

    #[tokio::test]
    async fn test_user_stats_zeroed_on_failure() {
        let (memory, store) = store();
        memory.set_failing(true);
        let repo = UsersRepository::new(store);
        assert_eq!(repo.get_user_stats().await, UserStats::default());
    }

    #[tokio::test]
    async fn test_update_user_kyc_status_skips_terminal_documents() {
        let (memory, store) = store();
        let id = seed_profile(&memory, "a@example.com", None);
        memory
            .seed(
                tables::KYC_DOCUMENTS,
                vec![
                    json!({"user_id": id, "document_type": "passport", "file_path": "x"}),
                    json!({"user_id": id, "document_type": "national_id", "file_path": "y", "status": "rejected"}),
                ],
            )
            .unwrap();
        let repo = UsersRepository::new(store);
        let reviewer = Uuid::new_v4();

        let updated = repo
            .update_user_kyc_status(id.parse().unwrap(), KycStatus::Approved, None, Some(reviewer))
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].status, KycStatus::Approved);
        assert_eq!(updated[0].reviewed_by, Some(reviewer));
        assert_eq!(memory.rows(tables::AUDIT_LOGS).len(), 1);

        let none = repo
            .update_user_kyc_status(id.parse().unwrap(), KycStatus::Approved, None, Some(reviewer))
            .await
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(memory.rows(tables::AUDIT_LOGS).len(), 1);
    }

    #[tokio::test]
    async fn test_roles() {
        let (memory, store) = store();
        let admin = seed_profile(&memory, "admin@example.com", None);
        let user = seed_profile(&memory, "user@example.com", None);
        memory
            .seed(tables::USER_ROLES, vec![json!({"user_id": admin, "role": "admin"})])
            .unwrap();
        let repo = UsersRepository::new(store);

        assert!(repo.is_admin(admin.parse().unwrap()).await);
        assert!(!repo.is_admin(user.parse().unwrap()).await);
        assert_eq!(repo.get_user_role(user.parse().unwrap()).await.unwrap(), None);

        let detail = repo.get_user(admin.parse().unwrap()).await.unwrap().unwrap();
        assert_eq!(detail.role, AppRole::Admin);
        assert_eq!(detail.rewards.level, 1);
        assert!(repo.get_user(Uuid::new_v4()).await.unwrap().is_none());
    }
}
