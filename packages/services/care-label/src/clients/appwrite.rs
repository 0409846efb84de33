use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

pub const PROJECT_HEADER: &str = "X-Appwrite-Project";

/// Shared HTTP plumbing for the backend-as-a-service REST API.
#[derive(Clone)]
pub struct AppwriteHttp {
    client: Client,
    config: Arc<Config>,
}

impl AppwriteHttp {
    pub fn new(config: Arc<Config>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(Duration::from_millis(config.http_timeout_ms.min(10_000)))
            .user_agent(config.http_user_agent.as_str())
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint, path.trim_start_matches('/'))
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).header(PROJECT_HEADER, &self.config.project_id)
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).header(PROJECT_HEADER, &self.config.project_id)
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).header(PROJECT_HEADER, &self.config.project_id)
    }
}

/// Pulls `message` out of an error body like `{"message": "...", "code": 404, "type": "..."}`.
pub fn parse_error_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(|m| m.to_string())
}

/// Log-friendly preview of a response body.
pub fn truncate_body(body: &str) -> (String, bool) {
    const LIMIT: usize = 500;
    if body.chars().count() > LIMIT {
        let head: String = body.chars().take(LIMIT).collect();
        (format!("{}…<truncated>", head), true)
    } else {
        (body.to_string(), false)
    }
}
