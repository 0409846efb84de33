use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::appwrite::{parse_error_message, AppwriteHttp};
use crate::catalog::SymbolCatalog;
use crate::config::Config;
use crate::error::CatalogError;
use crate::models::{null_as_default, CareCategory, SymbolCatalogEntry};

#[derive(Debug, Deserialize)]
struct DocumentList {
    #[serde(default)]
    documents: Vec<SymbolDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolDocument {
    #[serde(rename = "$id")]
    id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    category: CareCategory,
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default)]
    short_description: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

/// Symbols collection in the document database.
pub struct AppwriteSymbolCatalog {
    http: AppwriteHttp,
}

impl AppwriteSymbolCatalog {
    pub fn new(config: Arc<Config>) -> Self {
        Self { http: AppwriteHttp::new(config) }
    }

    pub fn from_http(http: AppwriteHttp) -> Self { Self { http } }

    fn to_entry(&self, doc: SymbolDocument) -> SymbolCatalogEntry {
        let short_description = doc
            .short_description
            .filter(|s| !s.is_empty())
            .or(doc.description)
            .unwrap_or_default();
        let image = doc
            .image
            .filter(|id| !id.is_empty())
            .map(|id| self.http.config().file_view_url(&id));
        SymbolCatalogEntry {
            id: doc.id,
            category: doc.category,
            title: doc.title,
            short_description,
            image,
        }
    }
}

#[async_trait]
impl SymbolCatalog for AppwriteSymbolCatalog {
    async fn list_symbols(&self) -> Result<Vec<SymbolCatalogEntry>, CatalogError> {
        let cfg = self.http.config();
        cfg.require(&["endpoint", "projectId", "databaseId", "symbolsCollectionId"])?;

        let path = format!(
            "databases/{}/collections/{}/documents",
            cfg.database_id, cfg.symbols_collection_id
        );
        let limit_query = serde_json::json!({ "method": "limit", "values": [cfg.catalog_limit] }).to_string();
        let response = self.http
            .get(&path)
            .query(&[("queries[]", limit_query)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = parse_error_message(&body).unwrap_or_else(|| format!("status={}", status));
            tracing::error!(http.status = %status, error = %detail, "Error fetching symbols");
            return Err(CatalogError::Request(detail));
        }

        let list: DocumentList = response.json().await?;
        let entries: Vec<SymbolCatalogEntry> = list.documents.into_iter().map(|d| self.to_entry(d)).collect();
        tracing::debug!(count = entries.len(), "Fetched symbol catalog");
        Ok(entries)
    }
}
