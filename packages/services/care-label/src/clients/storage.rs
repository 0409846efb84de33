use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::sync::Arc;

use super::appwrite::{parse_error_message, truncate_body, AppwriteHttp};
use crate::config::Config;
use crate::error::UploadError;
use crate::models::{StoredFileRef, UploadableImage};

/// Remote object storage for uploaded label photos.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// One network call; returns the stored file's identifier.
    async fn upload(&self, image: &UploadableImage) -> Result<StoredFileRef, UploadError>;

    /// Best-effort removal. Failures are logged by the implementation and never returned.
    async fn delete(&self, file: &StoredFileRef);
}

pub struct AppwriteStorage {
    http: AppwriteHttp,
}

impl AppwriteStorage {
    pub fn new(config: Arc<Config>) -> Self {
        Self { http: AppwriteHttp::new(config) }
    }

    pub fn from_http(http: AppwriteHttp) -> Self { Self { http } }

    fn files_path(&self) -> String {
        format!("storage/buckets/{}/files", self.http.config().bucket_id)
    }

    fn classify_failure(status: StatusCode, body: &str) -> UploadError {
        let detail = parse_error_message(body).unwrap_or_else(|| format!("status={}", status));
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UploadError::Auth(detail),
            StatusCode::NOT_FOUND => UploadError::NotFound(detail),
            StatusCode::PAYLOAD_TOO_LARGE => UploadError::SizeExceeded(detail),
            _ if detail.to_ascii_lowercase().contains("size") => UploadError::SizeExceeded(detail),
            _ => UploadError::Unknown(detail),
        }
    }
}

#[async_trait]
impl ObjectStore for AppwriteStorage {
    async fn upload(&self, image: &UploadableImage) -> Result<StoredFileRef, UploadError> {
        self.http.config().require(&["endpoint", "projectId", "bucketId"]).map_err(|e| {
            tracing::error!(error = %e, "Upload skipped: storage not configured");
            UploadError::from(e)
        })?;

        let file_id = uuid::Uuid::new_v4().simple().to_string();
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| UploadError::Unknown(format!("invalid MIME type: {}", e)))?;
        let form = Form::new().text("fileId", file_id.clone()).part("file", part);

        tracing::debug!(file_id = %file_id, size_bytes = image.size(), mime = %image.mime_type, "Uploading image");
        let response = self.http
            .post(&self.files_path())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Upload request failed");
                UploadError::Unknown(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let (preview, truncated) = truncate_body(&body);
            tracing::error!(
                http.status = %status,
                body.truncated = truncated,
                body.preview = %preview,
                "Error uploading image to storage"
            );
            return Err(Self::classify_failure(status, &body));
        }

        let stored_id = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| json.get("$id").and_then(|v| v.as_str()).map(|s| s.to_string()))
            .unwrap_or(file_id);
        tracing::info!(file_id = %stored_id, "Image uploaded");
        Ok(StoredFileRef(stored_id))
    }

    async fn delete(&self, file: &StoredFileRef) {
        if let Err(e) = self.http.config().require(&["endpoint", "projectId", "bucketId"]) {
            tracing::warn!(file_id = %file, error = %e, "Delete skipped: storage not configured");
            return;
        }
        let path = format!("{}/{}", self.files_path(), file.as_str());
        match self.http.delete(&path).send().await {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(file_id = %file, "Deleted uploaded image");
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!(file_id = %file, http.status = %status, error = ?parse_error_message(&body), "Error deleting image from storage");
            }
            Err(e) => {
                tracing::warn!(file_id = %file, error = %e, "Error deleting image from storage");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_classification() {
        let auth = AppwriteStorage::classify_failure(StatusCode::UNAUTHORIZED, r#"{"message":"missing scope"}"#);
        assert_eq!(auth, UploadError::Auth("missing scope".into()));
        assert_eq!(auth.user_message(), "Authentication failed. Please check your configuration.");

        let missing = AppwriteStorage::classify_failure(StatusCode::NOT_FOUND, "");
        assert!(matches!(missing, UploadError::NotFound(_)));

        let size = AppwriteStorage::classify_failure(
            StatusCode::BAD_REQUEST,
            r#"{"message":"File size not allowed"}"#,
        );
        assert!(matches!(size, UploadError::SizeExceeded(_)));
        assert!(matches!(
            AppwriteStorage::classify_failure(StatusCode::PAYLOAD_TOO_LARGE, ""),
            UploadError::SizeExceeded(_)
        ));

        let other = AppwriteStorage::classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "oops");
        assert_eq!(other, UploadError::Unknown("status=500 Internal Server Error".into()));
        assert_eq!(other.user_message(), "Failed to upload image. Please try again.");
    }
}
