use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};

use super::{empty_as_none, null_as_default, CareCategory, StoredFileRef};

/// One recognised care symbol, as produced by the remote inference job.
#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[graphql(rename_fields = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct SymbolDetection {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: CareCategory,
    #[serde(default, deserialize_with = "null_as_default")]
    pub short_description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub dos: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub donts: Option<String>,
    /// Storage file id of the symbol artwork.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub image: Option<String>,
}

impl SymbolDetection {
    pub fn new(title: impl Into<String>, category: CareCategory, confidence: f64) -> Self {
        Self {
            title: title.into(),
            category,
            short_description: String::new(),
            confidence,
            dos: None,
            donts: None,
            image: None,
        }
    }
}

/// Reference entry shown in browse mode. Never tied to a detection job.
#[derive(SimpleObject, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[graphql(rename_fields = "camelCase")]
#[serde(rename_all = "camelCase")]
pub struct SymbolCatalogEntry {
    pub id: String,
    pub category: CareCategory,
    pub title: String,
    pub short_description: String,
    /// Viewable URL, already resolved.
    pub image: Option<String>,
}

/// Parameters of one remote detection run.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionJob {
    pub file_ref: StoredFileRef,
    pub top_k: u32,
    pub threshold: f64,
}

impl DetectionJob {
    pub const DEFAULT_TOP_K: u32 = 5;
    pub const DEFAULT_THRESHOLD: f64 = 0.4;

    pub fn new(file_ref: StoredFileRef) -> Self {
        Self { file_ref, top_k: Self::DEFAULT_TOP_K, threshold: Self::DEFAULT_THRESHOLD }
    }

    pub fn with_params(file_ref: StoredFileRef, top_k: u32, threshold: f64) -> Self {
        Self { file_ref, top_k, threshold }
    }

    /// JSON handed to the function as its request body.
    pub fn function_input(&self) -> serde_json::Value {
        serde_json::json!({
            "fileId": self.file_ref.as_str(),
            "topK": self.top_k,
            "threshold": self.threshold,
        })
    }
}

/// Output of a successful analysis: what the results view receives.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisPayload {
    pub detections: Vec<SymbolDetection>,
    pub file_ref: StoredFileRef,
}
