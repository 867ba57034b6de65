//! KYC review bindings and actions.

use domain::models::{
    DocumentType, KycDocument, KycDocumentView, KycStats, KycStatus, ListOptions,
};
use domain::services::Toast;
use persistence::StoreError;
use shared::validation::normalize_reason;
use uuid::Uuid;

use super::{done, done_unless_empty, ActionResult, ActionRunner, DashboardContext, Outcome, Refetch};
use crate::query::AsyncQuery;

pub fn use_kyc_documents(ctx: &DashboardContext) -> AsyncQuery<Vec<KycDocumentView>, ListOptions> {
    let repo = ctx.kyc();
    AsyncQuery::new(ctx.notifier.clone(), move |options: ListOptions| {
        let repo = repo.clone();
        async move { repo.list_documents(&options).await }
    })
}

pub fn use_kyc_stats(ctx: &DashboardContext) -> AsyncQuery<KycStats, ()> {
    let repo = ctx.kyc();
    AsyncQuery::new(ctx.notifier.clone(), move |_: ()| {
        let repo = repo.clone();
        async move { Ok(repo.get_kyc_stats().await) }
    })
}

/// Documents of one user, newest first.
pub fn use_user_documents(ctx: &DashboardContext) -> AsyncQuery<Vec<KycDocument>, Uuid> {
    let repo = ctx.kyc();
    AsyncQuery::new(ctx.notifier.clone(), move |user_id: Uuid| {
        let repo = repo.clone();
        async move { repo.list_user_documents(user_id).await }
    })
}

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Clone)]
pub struct KycActions {
    ctx: DashboardContext,
    runner: ActionRunner,
}

impl KycActions {
    pub fn new(ctx: &DashboardContext) -> Self {
        Self {
            ctx: ctx.clone(),
            runner: ActionRunner::new("kyc", ctx.notifier.clone()),
        }
    }

    /// Invoke `refetch` after every successful action.
    pub fn with_refetch(mut self, refetch: Refetch) -> Self {
        self.runner.set_refetch(refetch);
        self
    }

    pub fn loading(&self) -> bool {
        self.runner.loading()
    }

    /// Move a document to `status`.
    ///
    /// Rejecting requires a non-blank reason; without one nothing is written.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: KycStatus,
        reason: Option<&str>,
        reviewer: Option<Uuid>,
    ) -> bool {
        if status == KycStatus::Rejected && normalize_reason(reason).is_none() {
            self.runner
                .reject::<()>("Rejection Reason Required", "Please provide a reason for rejection")
                .success
        } else {
            let repo = self.ctx.kyc();
            self.runner
                .run(repo.update_kyc_status(id, status, reason, reviewer), |docs| {
                    done_unless_empty(
                        docs,
                        "Success",
                        format!("KYC status updated to {}", status),
                        "Document not found or already reviewed",
                    )
                })
                .await
                .success
        }
    }

    pub async fn approve(&self, id: Uuid, reviewer: Option<Uuid>) -> bool {
        self.update_status(id, KycStatus::Approved, None, reviewer)
            .await
    }

    pub async fn reject(&self, id: Uuid, reason: &str, reviewer: Option<Uuid>) -> bool {
        self.update_status(id, KycStatus::Rejected, Some(reason), reviewer)
            .await
    }

    /// Upload a document for a user. Type and file must both be chosen.
    pub async fn upload(
        &self,
        user_id: Uuid,
        document_type: Option<DocumentType>,
        file: Option<UploadFile>,
    ) -> ActionResult<KycDocument> {
        let (Some(document_type), Some(file)) = (document_type, file) else {
            return self
                .runner
                .reject("Missing Information", "Please select a document type and file");
        };
        let repo = self.ctx.kyc();
        self.runner
            .run(
                repo.upload_document(
                    user_id,
                    document_type,
                    &file.name,
                    file.bytes,
                    &file.content_type,
                ),
                |doc| {
                    done(
                        "Document Uploaded",
                        format!("{} submitted for review", doc.document_type.label()),
                    )
                },
            )
            .await
    }

    /// Signed URLs for every document, in input order.
    ///
    /// Fails as a whole when any URL could not be created.
    pub async fn download_all(&self, documents: &[KycDocument]) -> ActionResult<Vec<String>> {
        let repo = self.ctx.kyc();
        let count = documents.len();
        self.runner
            .run(
                async move {
                    repo.download_all(documents)
                        .await
                        .into_iter()
                        .map(|(id, url)| {
                            url.map_err(|e| {
                                StoreError::Storage(format!("document {}: {}", id, e))
                            })
                        })
                        .collect::<Result<Vec<String>, StoreError>>()
                },
                |_| {
                    Outcome::Done(Toast::success(
                        "Documents Ready",
                        format!("{} document(s) ready to download", count),
                    ))
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::refetch_of;
    use crate::hooks::test_support::harness;
    use crate::query::BoxFuture;
    use domain::services::ToastVariant;
    use persistence::schema::tables;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn seed_document(h: &crate::hooks::test_support::Harness, status: &str) -> Uuid {
        let rows = h
            .memory
            .seed(
                tables::KYC_DOCUMENTS,
                vec![json!({
                    "user_id": Uuid::new_v4(),
                    "document_type": "passport",
                    "file_path": "u/1_passport.png",
                    "status": status,
                })],
            )
            .unwrap();
        rows[0]["id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_reject_with_empty_reason_makes_no_store_call() {
        let h = harness();
        let id = seed_document(&h, "pending");
        let (reads, writes) = (h.memory.read_count(), h.memory.write_count());
        let actions = KycActions::new(&h.ctx);

        assert!(!actions.reject(id, "   ", None).await);

        assert_eq!(h.memory.read_count(), reads);
        assert_eq!(h.memory.write_count(), writes);
        let toast = h.notifier.last().unwrap();
        assert_eq!(toast.title, "Rejection Reason Required");
        assert_eq!(toast.variant, ToastVariant::Warning);
        assert_eq!(h.notifier.len(), 1);
    }

    #[tokio::test]
    async fn test_approve_notifies_and_refetches_once() {
        let h = harness();
        let id = seed_document(&h, "pending");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let actions = KycActions::new(&h.ctx).with_refetch(Arc::new(
            move || -> BoxFuture<'static, ()> {
                counter.fetch_add(1, Ordering::SeqCst);
                Box::pin(async {})
            },
        ));

        assert!(actions.approve(id, Some(Uuid::new_v4())).await);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let toast = h.notifier.last().unwrap();
        assert_eq!(toast.description, "KYC status updated to approved");
        assert_eq!(toast.variant, ToastVariant::Default);
        assert_eq!(h.notifier.len(), 1);
        assert!(!actions.loading());
    }

    #[tokio::test]
    async fn test_reviewing_terminal_document_warns() {
        let h = harness();
        let id = seed_document(&h, "approved");
        let actions = KycActions::new(&h.ctx);

        assert!(!actions.reject(id, "Blurry scan", None).await);
        assert_eq!(h.notifier.last().unwrap().variant, ToastVariant::Warning);
    }

    #[tokio::test]
    async fn test_store_failure_notifies_destructive() {
        let h = harness();
        let id = seed_document(&h, "pending");
        h.memory.set_failing(true);
        let actions = KycActions::new(&h.ctx);

        assert!(!actions.approve(id, None).await);
        assert_eq!(h.notifier.last().unwrap().variant, ToastVariant::Destructive);
        assert_eq!(h.notifier.len(), 1);
    }

    #[tokio::test]
    async fn test_refetch_of_query_reloads_list() {
        let h = harness();
        let id = seed_document(&h, "pending");
        let documents = use_kyc_documents(&h.ctx);
        documents
            .sync(ListOptions::default().with_status("pending"))
            .await;
        assert_eq!(documents.snapshot().data.unwrap().len(), 1);

        let actions = KycActions::new(&h.ctx).with_refetch(refetch_of(&documents));
        assert!(actions.approve(id, None).await);
        assert!(documents.snapshot().data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_requires_type_and_file() {
        let h = harness();
        let actions = KycActions::new(&h.ctx);
        let user = Uuid::new_v4();

        let missing = actions.upload(user, Some(DocumentType::Passport), None).await;
        assert!(!missing.success);
        assert_eq!(h.notifier.last().unwrap().title, "Missing Information");
        assert_eq!(h.storage.object_count(), 0);

        let uploaded = actions
            .upload(
                user,
                Some(DocumentType::Passport),
                Some(UploadFile {
                    name: "passport.png".into(),
                    bytes: vec![1, 2, 3],
                    content_type: "image/png".into(),
                }),
            )
            .await;
        assert!(uploaded.success);
        let doc = uploaded.data.unwrap();
        assert_eq!(doc.status, KycStatus::Pending);
        assert_eq!(h.storage.object_count(), 1);

        let urls = actions.download_all(&[doc]).await;
        assert_eq!(urls.data.unwrap().len(), 1);
        assert_eq!(h.notifier.len(), 3);
    }

    #[tokio::test]
    async fn test_stats_binding() {
        let h = harness();
        seed_document(&h, "pending");
        seed_document(&h, "rejected");
        let stats = use_kyc_stats(&h.ctx);
        stats.sync(()).await;
        let stats = stats.snapshot().data.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.rejected, 1);
    }
}
