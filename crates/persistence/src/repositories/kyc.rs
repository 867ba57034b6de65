//! KYC document review and storage access.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::models::{
    AuditAction, DocumentType, KycDocument, KycDocumentView, KycReviewUpdate, KycStats, KycStatus,
    ListOptions, NOT_AVAILABLE, UNKNOWN_USER,
};
use domain::services::AuditLogBuilder;
use serde_json::json;
use shared::format::{format_date, format_datetime};
use uuid::Uuid;

use super::{audit_mutation, logged, profiles_by_id, timestamp, zeroed_on_error};
use crate::schema::{tables, KYC_BUCKET};
use crate::storage::{ObjectStorage, SIGNED_URL_TTL};
use crate::store::{
    decode_row, decode_rows, to_row, DataStore, Direction, Mutation, Query, StoreError,
};

/// Repository for KYC documents.
#[derive(Clone)]
pub struct KycRepository {
    store: Arc<dyn DataStore>,
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
    signed_url_ttl: Duration,
}

impl KycRepository {
    pub fn new(store: Arc<dyn DataStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            store,
            storage,
            bucket: KYC_BUCKET.to_string(),
            signed_url_ttl: SIGNED_URL_TTL,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_signed_url_ttl(mut self, ttl: Duration) -> Self {
        self.signed_url_ttl = ttl;
        self
    }

    /// List documents with owner and reviewer names.
    pub async fn list_documents(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<KycDocumentView>, StoreError> {
        logged(self.fetch_documents(options).await, "list_kyc_documents")
    }

    async fn fetch_documents(
        &self,
        options: &ListOptions,
    ) -> Result<Vec<KycDocumentView>, StoreError> {
        let mut query = Query::from(tables::KYC_DOCUMENTS).order_by("created_at", Direction::Desc);
        if let Some(term) = options.search_term() {
            query = query.search(&["file_name", "document_type"], term);
        }
        if let Some(status) = options.status_filter() {
            match status.parse::<KycStatus>() {
                Ok(status) => query = query.eq("status", status.as_str()),
                Err(e) => {
                    tracing::debug!(error = %e, "Unknown KYC status filter matches nothing");
                    return Ok(Vec::new());
                }
            }
        }
        let query = query.range(options.page_limit(), options.offset);

        let documents: Vec<KycDocument> = decode_rows(self.store.select(&query).await?)?;
        let people = profiles_by_id(
            self.store.as_ref(),
            documents
                .iter()
                .flat_map(|d| std::iter::once(d.user_id).chain(d.reviewed_by)),
        )
        .await?;

        Ok(documents
            .into_iter()
            .map(|doc| {
                let owner = people.get(&doc.user_id);
                if owner.is_none() {
                    tracing::warn!(document_id = %doc.id, user_id = %doc.user_id, "KYC owner profile missing");
                }
                let reviewer = doc
                    .reviewed_by
                    .and_then(|id| people.get(&id))
                    .map(|p| p.display_name());
                KycDocumentView {
                    id: doc.id,
                    user_id: doc.user_id,
                    user_name: owner
                        .map(|p| p.display_name())
                        .unwrap_or_else(|| UNKNOWN_USER.into()),
                    user_email: owner
                        .and_then(|p| p.email.clone())
                        .unwrap_or_else(|| NOT_AVAILABLE.into()),
                    document_type: doc.document_type,
                    document_type_label: doc.document_type.label().to_string(),
                    file_name: doc
                        .file_name
                        .clone()
                        .unwrap_or_else(|| file_name_from_path(&doc.file_path)),
                    file_path: doc.file_path,
                    status: doc.status,
                    rejection_reason: doc.rejection_reason,
                    reviewed_by: reviewer.unwrap_or_else(|| NOT_AVAILABLE.into()),
                    reviewed_at: doc
                        .reviewed_at
                        .map(|at| format_datetime(&at))
                        .unwrap_or_else(|| NOT_AVAILABLE.into()),
                    submitted_at: format_date(&doc.created_at),
                }
            })
            .collect())
    }

    /// All documents submitted by one user, newest first.
    pub async fn list_user_documents(&self, user_id: Uuid) -> Result<Vec<KycDocument>, StoreError> {
        let rows = logged(
            self.store
                .select(
                    &Query::from(tables::KYC_DOCUMENTS)
                        .eq("user_id", user_id.to_string())
                        .order_by("created_at", Direction::Desc),
                )
                .await,
            "list_user_kyc_documents",
        )?;
        decode_rows(rows)
    }

    pub async fn get_document(&self, id: Uuid) -> Result<Option<KycDocument>, StoreError> {
        let rows = logged(
            self.store
                .select(&Query::from(tables::KYC_DOCUMENTS).eq("id", id.to_string()))
                .await,
            "get_kyc_document",
        )?;
        rows.into_iter().next().map(decode_row).transpose()
    }

    /// Document counts per status. Zeroed when the store fails.
    pub async fn get_kyc_stats(&self) -> KycStats {
        zeroed_on_error(self.fetch_kyc_stats().await, "kyc")
    }

    async fn fetch_kyc_stats(&self) -> Result<KycStats, StoreError> {
        let mut stats = KycStats {
            total: self.store.count(&Query::from(tables::KYC_DOCUMENTS)).await?,
            ..KycStats::default()
        };
        for status in KycStatus::ALL {
            let count = self
                .store
                .count(&Query::from(tables::KYC_DOCUMENTS).eq("status", status.as_str()))
                .await?;
            match status {
                KycStatus::Pending => stats.pending = count,
                KycStatus::UnderReview => stats.under_review = count,
                KycStatus::Approved => stats.approved = count,
                KycStatus::Rejected => stats.rejected = count,
            }
        }
        Ok(stats)
    }

    /// Move one document to `status`, recording the review in the audit log.
    ///
    /// Only a document whose current status can transition to `status` is
    /// updated, so an illegal transition returns an empty result.
    /// An `under_review` document cannot return to `pending`, so its
    /// `reviewed_at` and `reviewed_by` stay set after such a call.
    pub async fn update_kyc_status(
        &self,
        id: Uuid,
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
            .eq("id", id.to_string())
            .is_in("status", sources);
        let audit = AuditLogBuilder::new(reviewer, AuditAction::KycStatusChanged)
            .on_resource("kyc_document", id)
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
                tracing::info!(document_id = %id, status = %status, "Updated KYC status");
                Ok(documents)
            }
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(document_id = %id, status = %status, "No KYC document was updated");
                Ok(Vec::new())
            }
            Err(e) => logged(Err(e), "update_kyc_status"),
        }
    }

    /// Store a document object and record it as pending review.
    ///
    /// The upload and the row insert are separate calls; a failed insert
    /// leaves an unreferenced object behind.
    pub async fn upload_document(
        &self,
        user_id: Uuid,
        document_type: DocumentType,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<KycDocument, StoreError> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(StoreError::Validation("File name is required".into()));
        }
        if bytes.is_empty() {
            return Err(StoreError::Validation("File is empty".into()));
        }

        let now = Utc::now();
        let key = object_key(user_id, now.timestamp_millis(), file_name);
        let path = logged(
            self.storage
                .upload(&self.bucket, &key, bytes, content_type)
                .await,
            "upload_kyc_object",
        )?;

        let row = super::row(json!({
            "user_id": user_id,
            "document_type": document_type,
            "file_path": path,
            "file_name": file_name,
            "status": KycStatus::Pending,
            "created_at": timestamp(now),
            "updated_at": timestamp(now),
        }));
        let inserted = logged(
            self.store.insert(tables::KYC_DOCUMENTS, vec![row]).await,
            "insert_kyc_document",
        )?;
        let document = inserted
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound("inserted KYC document".into()))?;

        tracing::info!(user_id = %user_id, document_type = %document_type, "Uploaded KYC document");
        decode_row(document)
    }

    /// Short-lived signed URL for viewing a document.
    pub async fn document_url(&self, file_path: &str) -> Result<String, StoreError> {
        logged(
            self.storage
                .create_signed_url(&self.bucket, file_path, self.signed_url_ttl)
                .await,
            "kyc_document_url",
        )
    }

    /// One signed URL per document, requested sequentially.
    pub async fn download_all(
        &self,
        documents: &[KycDocument],
    ) -> Vec<(Uuid, Result<String, StoreError>)> {
        let mut urls = Vec::with_capacity(documents.len());
        for doc in documents {
            urls.push((doc.id, self.document_url(&doc.file_path).await));
        }
        urls
    }
}

/// Storage key for an uploaded document: `{user_id}/{millis}_{file_name}`.
pub fn object_key(user_id: Uuid, millis: i64, file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}/{}_{}", user_id, millis, safe)
}

fn file_name_from_path(path: &str) -> String {
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}
