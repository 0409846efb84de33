use async_trait::async_trait;
use std::sync::Arc;

use super::appwrite::{parse_error_message, truncate_body, AppwriteHttp};
use crate::config::Config;
use crate::error::InferenceError;
use crate::models::{DetectionJob, Execution};

/// Remote function-execution endpoints used by the inference client.
#[async_trait]
pub trait ExecutionApi: Send + Sync {
    /// Submits a detection job, asking for synchronous execution.
    async fn create_execution(&self, job: &DetectionJob) -> Result<Execution, InferenceError>;

    async fn get_execution(&self, execution_id: &str) -> Result<Execution, InferenceError>;
}

pub struct AppwriteFunctions {
    http: AppwriteHttp,
}

impl AppwriteFunctions {
    pub fn new(config: Arc<Config>) -> Self {
        Self { http: AppwriteHttp::new(config) }
    }

    pub fn from_http(http: AppwriteHttp) -> Self { Self { http } }

    fn executions_path(&self) -> String {
        format!("functions/{}/executions", self.http.config().function_id)
    }

    async fn read_execution(&self, response: reqwest::Response, op: &'static str) -> Result<Execution, InferenceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (preview, truncated) = truncate_body(&body);
            tracing::error!(
                op,
                http.status = %status,
                body.truncated = truncated,
                body.preview = %preview,
                "Execution request failed"
            );
            let message = parse_error_message(&body)
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            return Err(InferenceError::status(status.as_u16(), message));
        }
        let execution: Execution = response.json().await?;
        Ok(execution)
    }
}

#[async_trait]
impl ExecutionApi for AppwriteFunctions {
    async fn create_execution(&self, job: &DetectionJob) -> Result<Execution, InferenceError> {
        self.http.config().require(&["endpoint", "projectId", "functionId"])?;

        // The function receives its parameters as a JSON string in `body`
        let payload = serde_json::json!({
            "body": job.function_input().to_string(),
            "async": false,
        });
        let response = self.http
            .post(&self.executions_path())
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;
        let execution = self.read_execution(response, "create_execution").await?;
        tracing::info!(
            execution_id = %execution.id,
            status = ?execution.status,
            file_id = %job.file_ref,
            "Detection job submitted"
        );
        Ok(execution)
    }

    async fn get_execution(&self, execution_id: &str) -> Result<Execution, InferenceError> {
        self.http.config().require(&["endpoint", "projectId", "functionId"])?;

        let path = format!("{}/{}", self.executions_path(), execution_id);
        let response = self.http.get(&path).send().await?;
        self.read_execution(response, "get_execution").await
    }
}
