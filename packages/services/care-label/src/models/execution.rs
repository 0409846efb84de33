use serde::{Deserialize, Serialize};

use super::{null_as_default, SymbolDetection};
use crate::error::InferenceError;

/// Lifecycle state of a remote function execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[serde(alias = "waiting", alias = "scheduled")]
    Queued,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

/// Execution document returned by both the submit and the status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    #[serde(rename = "$id", default)]
    pub id: String,
    pub status: ExecutionStatus,
    #[serde(rename = "responseBody", default, deserialize_with = "null_as_default")]
    pub response_body: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stderr: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: String,
}

/// JSON the inference function writes into `responseBody`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferencePayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default)]
    pub results: Option<Vec<SymbolDetection>>,
    #[serde(rename = "fileId", default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Execution {
    /// `Ok(Some)` once completed successfully, `Ok(None)` while still running.
    pub fn outcome(&self) -> Result<Option<InferencePayload>, InferenceError> {
        match self.status {
            ExecutionStatus::Completed => self.parse_payload().map(Some),
            ExecutionStatus::Failed => Err(InferenceError::ExecutionFailed(self.diagnostic())),
            _ => Ok(None),
        }
    }

    fn parse_payload(&self) -> Result<InferencePayload, InferenceError> {
        let payload: InferencePayload = if self.response_body.trim().is_empty() {
            InferencePayload::default()
        } else {
            serde_json::from_str(&self.response_body)
                .map_err(|e| InferenceError::MalformedResponse(e.to_string()))?
        };
        if !payload.success {
            let reason = payload.error.clone().unwrap_or_else(|| "Inference failed".to_string());
            return Err(InferenceError::InferenceFailed(reason));
        }
        Ok(payload)
    }

    fn diagnostic(&self) -> String {
        [&self.stderr, &self.errors, &self.response_body]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exec(v: serde_json::Value) -> Execution { serde_json::from_value(v).unwrap() }

    #[test]
    fn completed_success_yields_payload() {
        let e = exec(json!({
            "$id": "ex1",
            "status": "completed",
            "responseBody": r#"{"success":true,"results":[{"title":"Do Not Iron","category":"ironing","confidence":0.7}],"fileId":"f1"}"#
        }));
        let payload = e.outcome().unwrap().unwrap();
        assert_eq!(payload.file_id.as_deref(), Some("f1"));
        assert_eq!(payload.results.unwrap().len(), 1);
    }

    #[test]
    fn completed_without_success_is_inference_failure() {
        let e = exec(json!({"status":"completed","responseBody":r#"{"success":false,"error":"model not loaded"}"#}));
        assert_eq!(e.outcome().unwrap_err(), InferenceError::InferenceFailed("model not loaded".into()));

        let empty = exec(json!({"status":"completed","responseBody":""}));
        assert_eq!(empty.outcome().unwrap_err(), InferenceError::InferenceFailed("Inference failed".into()));

        let garbage = exec(json!({"status":"completed","responseBody":"<html>"}));
        assert!(matches!(garbage.outcome().unwrap_err(), InferenceError::MalformedResponse(_)));
    }

    #[test]
    fn null_enrichment_fields_do_not_fail_a_completed_job() {
        let body = json!({
            "success": true,
            "fileId": "abc123",
            "results": [
                {"title": "Tumble Dry Low", "category": null, "confidence": 0.77,
                 "shortDescription": null, "dos": null, "donts": null, "image": null}
            ]
        });
        let e = exec(json!({"$id": "ex2", "status": "completed", "responseBody": body.to_string(), "stderr": null}));
        let payload = e.outcome().unwrap().unwrap();
        let results = payload.results.unwrap();
        assert_eq!(results[0].title, "Tumble Dry Low");
        assert_eq!(results[0].category, crate::models::CareCategory::Unknown);
        assert_eq!(results[0].short_description, "");
        assert!(results[0].image.is_none());
    }

    #[test]
    fn failed_status_carries_first_diagnostic() {
        let e = exec(json!({"status":"failed","stderr":"","errors":"OOM killed","responseBody":"x"}));
        assert_eq!(e.outcome().unwrap_err(), InferenceError::ExecutionFailed("OOM killed".into()));
        let bare = exec(json!({"status":"failed"}));
        assert_eq!(bare.outcome().unwrap_err(), InferenceError::ExecutionFailed("Unknown error".into()));
    }

    #[test]
    fn pending_states_are_not_terminal() {
        for s in ["waiting", "processing", "scheduled", "something-new"] {
            let e = exec(json!({"status": s}));
            assert!(!e.status.is_terminal());
            assert!(e.outcome().unwrap().is_none());
        }
    }
}
