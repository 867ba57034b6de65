//! CMS pages, FAQ list and legal documents, stored as typed settings.

use std::sync::Arc;

use domain::models::setting::{page_key, FAQ_KEY};
use domain::models::{FaqEntry, LegalDocument, LegalKind, PageContent, SettingPayload};
use uuid::Uuid;

use super::SystemSettingsRepository;
use crate::store::{DataStore, StoreError};

#[derive(Clone)]
pub struct CmsRepository {
    settings: SystemSettingsRepository,
}

impl CmsRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            settings: SystemSettingsRepository::new(store),
        }
    }

    pub async fn get_page_content(&self, page: &str) -> Result<Option<PageContent>, StoreError> {
        let key = page_key(page);
        match self.settings.get_typed(&key).await? {
            Some(SettingPayload::Cms(content)) => Ok(Some(content)),
            Some(other) => Err(wrong_category(&key, &other)),
            None => Ok(None),
        }
    }

    pub async fn update_page_content(
        &self,
        page: &str,
        content: PageContent,
        actor: Option<Uuid>,
    ) -> Result<PageContent, StoreError> {
        let key = page_key(page);
        self.settings
            .put_typed(&key, &SettingPayload::Cms(content.clone()), actor)
            .await?;
        tracing::info!(page = %key, "Updated page content");
        Ok(content)
    }

    /// FAQ entries sorted by their `order` field. Empty when none are stored.
    pub async fn get_faqs(&self) -> Result<Vec<FaqEntry>, StoreError> {
        match self.settings.get_typed(FAQ_KEY).await? {
            Some(SettingPayload::Faq(mut entries)) => {
                entries.sort_by_key(|e| e.order);
                Ok(entries)
            }
            Some(other) => Err(wrong_category(FAQ_KEY, &other)),
            None => Ok(Vec::new()),
        }
    }

    /// Replace the FAQ list.
    pub async fn update_faqs(
        &self,
        entries: Vec<FaqEntry>,
        actor: Option<Uuid>,
    ) -> Result<Vec<FaqEntry>, StoreError> {
        self.settings
            .put_typed(FAQ_KEY, &SettingPayload::Faq(entries.clone()), actor)
            .await?;
        tracing::info!(entries = entries.len(), "Updated FAQs");
        Ok(entries)
    }

    pub async fn get_legal_document(
        &self,
        kind: LegalKind,
    ) -> Result<Option<LegalDocument>, StoreError> {
        let key = kind.setting_key();
        match self.settings.get_typed(key).await? {
            Some(SettingPayload::Legal(doc)) => Ok(Some(doc)),
            Some(other) => Err(wrong_category(key, &other)),
            None => Ok(None),
        }
    }

    pub async fn update_legal_document(
        &self,
        kind: LegalKind,
        document: LegalDocument,
        actor: Option<Uuid>,
    ) -> Result<LegalDocument, StoreError> {
        self.settings
            .put_typed(
                kind.setting_key(),
                &SettingPayload::Legal(document.clone()),
                actor,
            )
            .await?;
        tracing::info!(key = kind.setting_key(), version = %document.version, "Updated legal document");
        Ok(document)
    }
}

fn wrong_category(key: &str, payload: &SettingPayload) -> StoreError {
    StoreError::Validation(format!("{} holds a {} setting", key, payload.category()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::store;
    use crate::schema::tables;
    use domain::models::PageSection;
    use serde_json::json;

    fn page(title: &str) -> PageContent {
        PageContent {
            title: title.into(),
            subtitle: None,
            body: "Welcome".into(),
            sections: vec![PageSection {
                heading: "Why".into(),
                body: "Because".into(),
            }],
            published: true,
        }
    }

    #[tokio::test]
    async fn test_page_round_trip_uses_page_key() {
        let (memory, store) = store();
        let repo = CmsRepository::new(store);

        assert_eq!(repo.get_page_content("about-us").await.unwrap(), None);
        repo.update_page_content("About-Us", page("About"), None)
            .await
            .unwrap();

        let loaded = repo.get_page_content("about us").await.unwrap().unwrap();
        assert_eq!(loaded.title, "About");
        assert_eq!(memory.rows(tables::SYSTEM_SETTINGS)[0]["key"], json!("page_about_us"));
    }

    #[tokio::test]
    async fn test_invalid_page_is_rejected() {
        let (_, store) = store();
        let repo = CmsRepository::new(store);
        let err = repo
            .update_page_content("home", page(""), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_faqs_sorted_by_order() {
        let (_, store) = store();
        let repo = CmsRepository::new(store);
        assert!(repo.get_faqs().await.unwrap().is_empty());

        repo.update_faqs(
            vec![
                FaqEntry {
                    question: "Second?".into(),
                    answer: "B".into(),
                    order: 2,
                },
                FaqEntry {
                    question: "First?".into(),
                    answer: "A".into(),
                    order: 1,
                },
            ],
            None,
        )
        .await
        .unwrap();

        let faqs = repo.get_faqs().await.unwrap();
        assert_eq!(faqs[0].question, "First?");
        assert_eq!(faqs[1].question, "Second?");
    }

    #[tokio::test]
    async fn test_legal_documents_are_keyed_by_kind() {
        let (_, store) = store();
        let repo = CmsRepository::new(store);
        let terms = LegalDocument {
            title: "Terms of Service".into(),
            content: "Play fair.".into(),
            version: "2.1".into(),
            effective_date: None,
        };
        repo.update_legal_document(LegalKind::Terms, terms.clone(), None)
            .await
            .unwrap();

        assert_eq!(
            repo.get_legal_document(LegalKind::Terms).await.unwrap(),
            Some(terms)
        );
        assert_eq!(repo.get_legal_document(LegalKind::Privacy).await.unwrap(), None);
    }
}
