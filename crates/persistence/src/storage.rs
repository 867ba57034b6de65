//! Object storage for uploaded documents.
//!
//! Objects are private; readers receive short-lived signed URLs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::store::StoreError;

/// Lifetime of signed document URLs.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60);

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store an object and return its key.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError>;

    /// Create a URL granting read access to an object for `ttl`.
    async fn create_signed_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StoreError>;
}

/// Client for the hosted storage REST API.
#[derive(Clone)]
pub struct HttpObjectStorage {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl std::fmt::Debug for HttpObjectStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpObjectStorage")
            .field("base_url", &self.base_url)
            .field("service_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl HttpObjectStorage {
    pub fn new(base_url: &str, service_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Storage(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    fn object_url(&self, path: &str, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object{}/{}/{}",
            self.base_url,
            path,
            bucket,
            key.trim_start_matches('/')
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            Err(StoreError::NotFound(body))
        } else {
            Err(StoreError::Storage(format!("{}: {}", status, body)))
        }
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let size = bytes.len();
        let response = self
            .client
            .post(self.object_url("", bucket, key))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::check(response).await?;

        tracing::info!(bucket = %bucket, key = %key, size, "Uploaded object");
        Ok(key.to_string())
    }

    async fn create_signed_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        let response = self
            .client
            .post(self.object_url("/sign", bucket, key))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&serde_json::json!({ "expiresIn": ttl.as_secs() }))
            .send()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        let signed: SignedUrlResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct MemoryObjects {
    objects: HashMap<(String, String), StoredObject>,
    failing: bool,
    signed_requests: u64,
}

/// In-process object storage. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStorage {
    inner: Arc<RwLock<MemoryObjects>>,
}

impl MemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut inner) = self.inner.write() {
            inner.failing = failing;
        }
    }

    /// Bytes and content type of a stored object.
    pub fn object(&self, bucket: &str, key: &str) -> Option<(Vec<u8>, String)> {
        self.inner.read().ok().and_then(|inner| {
            inner
                .objects
                .get(&(bucket.to_string(), key.to_string()))
                .map(|o| (o.bytes.clone(), o.content_type.clone()))
        })
    }

    pub fn object_count(&self) -> usize {
        self.inner.read().map(|i| i.objects.len()).unwrap_or(0)
    }

    /// Number of signed URLs requested so far.
    pub fn signed_requests(&self) -> u64 {
        self.inner.read().map(|i| i.signed_requests).unwrap_or(0)
    }

    fn guard(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryObjects>, StoreError> {
        let inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("object storage lock poisoned".into()))?;
        if inner.failing {
            return Err(StoreError::Storage(
                "object storage is simulating an outage".into(),
            ));
        }
        Ok(inner)
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let mut inner = self.guard()?;
        let id = (bucket.to_string(), key.to_string());
        if inner.objects.contains_key(&id) {
            return Err(StoreError::Conflict(format!("{}/{} already exists", bucket, key)));
        }
        inner.objects.insert(
            id,
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(key.to_string())
    }

    async fn create_signed_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        let mut inner = self.guard()?;
        inner.signed_requests += 1;
        if !inner
            .objects
            .contains_key(&(bucket.to_string(), key.to_string()))
        {
            return Err(StoreError::NotFound(format!("{}/{}", bucket, key)));
        }
        Ok(format!(
            "memory://{}/{}?expires_in={}",
            bucket,
            key,
            ttl.as_secs()
        ))
    }
}
