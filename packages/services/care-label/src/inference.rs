//! Detection job protocol: submit, then poll the execution until it reaches a terminal state.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::ExecutionApi;
use crate::config::Config;
use crate::error::InferenceError;
use crate::models::{AnalysisPayload, DetectionJob, InferencePayload, StoredFileRef};

/// Suspension point between poll attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Transient; keep polling.
    Retry,
    /// Terminal; surface the error now.
    Abort,
}

/// Fixed-interval, bounded-attempt polling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { max_attempts: 60, interval: Duration::from_secs(1) }
    }
}

impl PollPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.poll_max_attempts,
            interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    pub fn classify(&self, error: &InferenceError) -> PollDecision {
        match error {
            InferenceError::Transport { .. } => PollDecision::Retry,
            InferenceError::ExecutionFailed(_)
            | InferenceError::InferenceFailed(_)
            | InferenceError::MalformedResponse(_)
            | InferenceError::Timeout { .. }
            | InferenceError::Config(_) => PollDecision::Abort,
        }
    }
}

pub struct InferenceClient {
    api: Arc<dyn ExecutionApi>,
    sleeper: Arc<dyn Sleeper>,
    policy: PollPolicy,
    top_k: u32,
    threshold: f64,
}

impl InferenceClient {
    pub fn new(api: Arc<dyn ExecutionApi>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            api,
            sleeper,
            policy: PollPolicy::default(),
            top_k: DetectionJob::DEFAULT_TOP_K,
            threshold: DetectionJob::DEFAULT_THRESHOLD,
        }
    }

    pub fn from_config(api: Arc<dyn ExecutionApi>, sleeper: Arc<dyn Sleeper>, config: &Config) -> Self {
        Self::new(api, sleeper)
            .with_policy(PollPolicy::from_config(config))
            .with_job_params(config.inference_top_k, config.inference_threshold)
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_job_params(mut self, top_k: u32, threshold: f64) -> Self {
        self.top_k = top_k;
        self.threshold = threshold;
        self
    }

    pub fn policy(&self) -> &PollPolicy { &self.policy }

    /// Runs one detection job against an uploaded file with the client's default parameters.
    pub async fn detect(&self, file_ref: &StoredFileRef) -> Result<AnalysisPayload, InferenceError> {
        let job = DetectionJob::with_params(file_ref.clone(), self.top_k, self.threshold);
        self.run_job(&job).await
    }

    pub async fn run_job(&self, job: &DetectionJob) -> Result<AnalysisPayload, InferenceError> {
        // No retry at this layer: a failed submit is reported as-is
        let execution = self.api.create_execution(job).await?;
        if let Some(payload) = execution.outcome()? {
            return Ok(Self::into_analysis(payload, &job.file_ref));
        }
        if execution.id.is_empty() {
            return Err(InferenceError::MalformedResponse("pending execution without id".to_string()));
        }
        tracing::debug!(execution_id = %execution.id, status = ?execution.status, "Execution pending; polling");
        self.poll(&execution.id, &job.file_ref).await
    }

    async fn poll(&self, execution_id: &str, file_ref: &StoredFileRef) -> Result<AnalysisPayload, InferenceError> {
        let max = self.policy.max_attempts;
        for attempt in 1..=max {
            let checked = self.api.get_execution(execution_id).await.and_then(|e| e.outcome());
            match checked {
                Ok(Some(payload)) => {
                    tracing::info!(execution_id, attempt, "Execution completed");
                    return Ok(Self::into_analysis(payload, file_ref));
                }
                Ok(None) => {
                    tracing::debug!(execution_id, attempt, "Execution still running");
                }
                Err(e) => match self.policy.classify(&e) {
                    PollDecision::Abort => {
                        tracing::error!(execution_id, attempt, error = %e, "Execution ended in failure");
                        return Err(e);
                    }
                    PollDecision::Retry => {
                        tracing::warn!(execution_id, attempt, error = %e, "Transient error while polling execution");
                    }
                },
            }
            if attempt < max {
                self.sleeper.sleep(self.policy.interval).await;
            }
        }
        tracing::error!(execution_id, attempts = max, "Execution did not finish in time");
        Err(InferenceError::Timeout { attempts: max })
    }

    fn into_analysis(payload: InferencePayload, submitted: &StoredFileRef) -> AnalysisPayload {
        let file_ref = payload
            .file_id
            .filter(|id| !id.is_empty())
            .map(StoredFileRef)
            .unwrap_or_else(|| submitted.clone());
        AnalysisPayload { detections: payload.results.unwrap_or_default(), file_ref }
    }
}
