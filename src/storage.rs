//! Object storage for catalog images.
//!
//! The store itself is an external service; this module wraps it behind
//! [`ObjectStore`] and adds the compensating cleanup used when a catalog write
//! fails after its image was already uploaded.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
};

const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// A file received from the client, not yet stored.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Per-file result reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    Stored { url: String, key: String },
    Failed { error: String },
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, files: Vec<UploadFile>) -> AppResult<Vec<UploadOutcome>>;

    async fn delete(&self, key: &str) -> AppResult<()>;
}

pub type SharedStore = Arc<dyn ObjectStore>;

/// Build the store described by the configuration.
pub fn from_config(config: &StorageConfig) -> AppResult<SharedStore> {
    match &config.url {
        Some(url) => Ok(Arc::new(HttpObjectStore::new(url, config.token.clone())?)),
        None => {
            tracing::warn!("STORAGE_URL is not set, image uploads are disabled");
            Ok(Arc::new(DisabledObjectStore))
        }
    }
}

/// Check size and extension before anything is sent to the store.
pub fn validate_image(file: &UploadFile, max_bytes: usize) -> AppResult<()> {
    if file.bytes.is_empty() {
        return Err(AppError::Validation(format!(
            "image: {} is empty",
            file.file_name
        )));
    }
    if file.bytes.len() > max_bytes {
        return Err(AppError::Validation(format!(
            "image: {} is larger than {} bytes",
            file.file_name, max_bytes
        )));
    }
    let ext = Path::new(&file.file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
        return Err(AppError::Validation(format!(
            "image: unsupported format '{}'. Supported: {}",
            ext,
            SUPPORTED_FORMATS.join(", ")
        )));
    }
    Ok(())
}

/// Upload a single catalog image and return `(url, key)`.
pub async fn upload_one(
    store: &dyn ObjectStore,
    file: UploadFile,
    max_bytes: usize,
) -> AppResult<(String, String)> {
    validate_image(&file, max_bytes)?;
    let name = file.file_name.clone();
    let mut outcomes = store.upload(vec![file]).await?;
    match outcomes.pop() {
        Some(UploadOutcome::Stored { url, key }) => {
            tracing::info!(file = %name, %key, "image stored");
            Ok((url, key))
        }
        Some(UploadOutcome::Failed { error }) => Err(AppError::Storage(error)),
        None => Err(AppError::Storage("store returned no result".into())),
    }
}

/// Delete an object whose database write did not commit. Failures are logged,
/// the original error is what the caller reports.
pub async fn compensate(store: &dyn ObjectStore, key: &str) {
    if let Err(err) = store.delete(key).await {
        tracing::warn!(error = %err, %key, "failed to remove orphaned upload");
    } else {
        tracing::info!(%key, "removed orphaned upload");
    }
}

/// Store reachable over HTTP: `POST {base}/files` (multipart `files`) and
/// `DELETE {base}/files/{key}`.
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StoreReply {
    success: Option<bool>,
    url: Option<String>,
    key: Option<String>,
    error: Option<String>,
}

impl HttpObjectStore {
    pub fn new(base_url: &str, token: Option<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl From<StoreReply> for UploadOutcome {
    fn from(reply: StoreReply) -> Self {
        match reply {
            StoreReply {
                success: Some(true) | None,
                url: Some(url),
                key: Some(key),
                ..
            } => UploadOutcome::Stored { url, key },
            StoreReply { error, .. } => UploadOutcome::Failed {
                error: error.unwrap_or_else(|| "upload rejected".into()),
            },
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn upload(&self, files: Vec<UploadFile>) -> AppResult<Vec<UploadOutcome>> {
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let mut part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);
            if let Some(content_type) = file.content_type {
                part = part
                    .mime_str(&content_type)
                    .map_err(|e| AppError::Validation(format!("image: {e}")))?;
            }
            form = form.part("files", part);
        }

        let url = format!("{}/files", self.base_url);
        let response = self
            .authorize(self.client.post(&url).multipart(form))
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Storage(format!("store responded with {status}")));
        }

        let replies: Vec<StoreReply> = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("unreadable store reply: {e}")))?;
        Ok(replies.into_iter().map(UploadOutcome::from).collect())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let url = format!("{}/files/{}", self.base_url, key);
        let response = self
            .authorize(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Storage(format!(
                "delete responded with {}",
                response.status()
            )))
        }
    }
}

/// Used when no store is configured.
pub struct DisabledObjectStore;

#[async_trait]
impl ObjectStore for DisabledObjectStore {
    async fn upload(&self, _files: Vec<UploadFile>) -> AppResult<Vec<UploadOutcome>> {
        Err(AppError::BadRequest("Image uploads are not configured".into()))
    }

    async fn delete(&self, _key: &str) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, len: usize) -> UploadFile {
        UploadFile {
            file_name: name.into(),
            content_type: None,
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn rejects_unsupported_extension() {
        assert!(matches!(
            validate_image(&file("invoice.pdf", 10), 100),
            Err(AppError::Validation(_))
        ));
        assert!(validate_image(&file("photo.JPG", 10), 100).is_ok());
    }

    #[test]
    fn rejects_empty_and_oversized_files() {
        assert!(validate_image(&file("a.png", 0), 100).is_err());
        assert!(validate_image(&file("a.png", 101), 100).is_err());
    }

    #[test]
    fn store_reply_maps_to_outcome() {
        let stored: UploadOutcome = StoreReply {
            success: Some(true),
            url: Some("https://cdn.example.com/a.png".into()),
            key: Some("a.png".into()),
            error: None,
        }
        .into();
        assert_eq!(
            stored,
            UploadOutcome::Stored {
                url: "https://cdn.example.com/a.png".into(),
                key: "a.png".into()
            }
        );

        let failed: UploadOutcome = StoreReply {
            success: Some(false),
            url: None,
            key: None,
            error: Some("quota exceeded".into()),
        }
        .into();
        assert_eq!(
            failed,
            UploadOutcome::Failed {
                error: "quota exceeded".into()
            }
        );
    }

    #[tokio::test]
    async fn disabled_store_refuses_uploads() {
        let err = upload_one(&DisabledObjectStore, file("a.png", 3), 100)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
