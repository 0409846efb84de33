use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub port: u16,
    // Backend-as-a-service coordinates
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub symbols_collection_id: String,
    pub bucket_id: String,
    pub function_id: String,
    pub http_timeout_ms: u64,
    pub http_user_agent: String,
    // Detection job defaults
    pub inference_top_k: u32,
    pub inference_threshold: f64,
    pub poll_max_attempts: u32,
    pub poll_interval_ms: u64,
    // Perceived-progress delay before results are handed over
    pub preparing_delay_ms: u64,
    pub delete_after_analysis: bool,
    // Browse mode
    pub catalog_limit: u32,
    pub catalog_static_fallback: bool,
}

/// Backend keys that must be present for live calls, paired with their env var names.
const BACKEND_KEYS: [(&str, &str); 6] = [
    ("endpoint", "APPWRITE_ENDPOINT"),
    ("projectId", "APPWRITE_PROJECT_ID"),
    ("databaseId", "APPWRITE_DATABASE_ID"),
    ("symbolsCollectionId", "APPWRITE_SYMBOLS_COLLECTION_ID"),
    ("bucketId", "APPWRITE_BUCKET_ID"),
    ("functionId", "APPWRITE_FUNCTION_ID"),
];

impl Config {
    pub fn from_env() -> Self {
    let get = |k: &str| std::env::var(k).ok();
    let flag = |k: &str, default: bool| {
        get(k).map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(default)
    };

    let port: u16 = get("PORT").and_then(|s| s.parse().ok()).unwrap_or(8087);
    let endpoint = get("APPWRITE_ENDPOINT").unwrap_or_default();
    let project_id = get("APPWRITE_PROJECT_ID").unwrap_or_default();
    let database_id = get("APPWRITE_DATABASE_ID").unwrap_or_default();
    let symbols_collection_id = get("APPWRITE_SYMBOLS_COLLECTION_ID").unwrap_or_default();
    let bucket_id = get("APPWRITE_BUCKET_ID").unwrap_or_default();
    let function_id = get("APPWRITE_FUNCTION_ID").unwrap_or_default();
    let http_timeout_ms: u64 = get("HTTP_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(30000);
    let http_user_agent = get("HTTP_USER_AGENT").unwrap_or_else(|| "care-label-service/1.0".to_string());
    let inference_top_k: u32 = get("INFERENCE_TOP_K").and_then(|s| s.parse().ok()).unwrap_or(5);
    let inference_threshold: f64 = get("INFERENCE_THRESHOLD").and_then(|s| s.parse().ok()).unwrap_or(0.4);
    let poll_max_attempts: u32 = get("POLL_MAX_ATTEMPTS").and_then(|s| s.parse().ok()).unwrap_or(60);
    let poll_interval_ms: u64 = get("POLL_INTERVAL_MS").and_then(|s| s.parse().ok()).unwrap_or(1000);
    let preparing_delay_ms: u64 = get("PREPARING_DELAY_MS").and_then(|s| s.parse().ok()).unwrap_or(500);
    let delete_after_analysis = flag("DELETE_AFTER_ANALYSIS", false);
    let catalog_limit: u32 = get("CATALOG_LIMIT").and_then(|s| s.parse().ok()).unwrap_or(50);
    let catalog_static_fallback = flag("CATALOG_STATIC_FALLBACK", true);

        Self {
            port,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id,
            database_id,
            symbols_collection_id,
            bucket_id,
            function_id,
            http_timeout_ms,
            http_user_agent,
            inference_top_k,
            inference_threshold,
            poll_max_attempts,
            poll_interval_ms,
            preparing_delay_ms,
            delete_after_analysis,
            catalog_limit,
            catalog_static_fallback,
        }
    }

    /// Config pointing at a single backend base URL; used by tests and local tooling.
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        Self {
            port: 0,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id: "care-labels".to_string(),
            database_id: "main".to_string(),
            symbols_collection_id: "care_symbols".to_string(),
            bucket_id: "uploads".to_string(),
            function_id: "care-symbols-infer".to_string(),
            http_timeout_ms: 5000,
            http_user_agent: "care-label-service/test".to_string(),
            inference_top_k: 5,
            inference_threshold: 0.4,
            poll_max_attempts: 60,
            poll_interval_ms: 1000,
            preparing_delay_ms: 500,
            delete_after_analysis: false,
            catalog_limit: 50,
            catalog_static_fallback: true,
        }
    }

    fn backend_value(&self, key: &str) -> &str {
        match key {
            "endpoint" => &self.endpoint,
            "projectId" => &self.project_id,
            "databaseId" => &self.database_id,
            "symbolsCollectionId" => &self.symbols_collection_id,
            "bucketId" => &self.bucket_id,
            "functionId" => &self.function_id,
            _ => "",
        }
    }

    fn is_missing(&self, key: &str) -> bool {
        let value = self.backend_value(key).trim();
        if value.is_empty() || value == format!("your_{}_here", key) {
            return true;
        }
        // The endpoint must be an absolute http(s) URL
        key == "endpoint"
            && !url::Url::parse(value).map(|u| matches!(u.scheme(), "http" | "https")).unwrap_or(false)
    }

    /// Env var names of backend keys that are unset or still hold a placeholder.
    pub fn missing_backend_keys(&self) -> Vec<&'static str> {
        BACKEND_KEYS
            .iter()
            .filter(|(key, _)| self.is_missing(key))
            .map(|(_, env)| *env)
            .collect()
    }

    /// Logs missing configuration once at startup. Returns whether every backend key is usable.
    pub fn validate(&self) -> bool {
        let missing = self.missing_backend_keys();
        if missing.is_empty() {
            return true;
        }
        tracing::error!(missing = ?missing, "Missing or invalid backend configuration; live calls will be skipped");
        false
    }

    /// Short-circuits a live call when any of the given backend keys is missing.
    pub fn require(&self, keys: &[&str]) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = BACKEND_KEYS
            .iter()
            .filter(|(key, _)| keys.contains(key) && self.is_missing(key))
            .map(|(_, env)| *env)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Missing(missing))
        }
    }

    /// Public view URL for a stored file (symbol artwork or uploaded image).
    pub fn file_view_url(&self, file_id: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/view?project={}",
            self.endpoint, self.bucket_id, file_id, self.project_id
        )
    }
}
