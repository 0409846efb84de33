//! Analysis orchestration: validate → upload → infer → prepare → hand results over.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clients::{AppwriteFunctions, AppwriteHttp, AppwriteStorage, ObjectStore};
use crate::config::Config;
use crate::error::PipelineError;
use crate::inference::{InferenceClient, Sleeper, TokioSleeper};
use crate::models::{AnalysisPayload, UploadableImage};
use crate::processing::validation;

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Back at image selection; nothing in flight that matters.
    Selecting,
    Uploading,
    Analyzing,
    Preparing,
    Complete,
    Error(PipelineError),
}

impl Stage {
    pub fn message(&self) -> &'static str {
        match self {
            Stage::Selecting => "Select a photo of your care label",
            Stage::Uploading => "Uploading your image…",
            Stage::Analyzing => "Analyzing care symbols…",
            Stage::Preparing => "Preparing your results…",
            Stage::Complete => "Analysis complete",
            Stage::Error(_) => "Something went wrong",
        }
    }

    pub fn progress(&self) -> u8 {
        match self {
            Stage::Uploading => 33,
            Stage::Analyzing => 66,
            Stage::Preparing | Stage::Complete => 100,
            Stage::Selecting | Stage::Error(_) => 0,
        }
    }
}

pub trait StageObserver: Send + Sync {
    fn on_stage(&self, stage: &Stage);
}

impl<F> StageObserver for F
where
    F: Fn(&Stage) + Send + Sync,
{
    fn on_stage(&self, stage: &Stage) { self(stage) }
}

pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage(&self, _stage: &Stage) {}
}

pub struct AnalysisPipeline {
    store: Arc<dyn ObjectStore>,
    inference: InferenceClient,
    sleeper: Arc<dyn Sleeper>,
    preparing_delay: Duration,
    delete_after_analysis: bool,
}

impl AnalysisPipeline {
    pub fn new(store: Arc<dyn ObjectStore>, inference: InferenceClient, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            store,
            inference,
            sleeper,
            preparing_delay: Duration::from_millis(500),
            delete_after_analysis: false,
        }
    }

    /// Production wiring against the configured backend.
    pub fn from_config(config: Arc<Config>) -> Self {
        let http = AppwriteHttp::new(config.clone());
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
        let store = Arc::new(AppwriteStorage::from_http(http.clone()));
        let functions = Arc::new(AppwriteFunctions::from_http(http));
        let inference = InferenceClient::from_config(functions, sleeper.clone(), &config);
        Self::new(store, inference, sleeper)
            .with_preparing_delay(Duration::from_millis(config.preparing_delay_ms))
            .with_delete_after_analysis(config.delete_after_analysis)
    }

    pub fn with_preparing_delay(mut self, delay: Duration) -> Self {
        self.preparing_delay = delay;
        self
    }

    pub fn with_delete_after_analysis(mut self, enabled: bool) -> Self {
        self.delete_after_analysis = enabled;
        self
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> { self.store.clone() }

    /// One analysis attempt, always from scratch. Stages are reported to `observer` as they begin.
    pub async fn run(&self, image: &UploadableImage, observer: &dyn StageObserver) -> Result<AnalysisPayload, PipelineError> {
        validation::validate(image)?;

        observer.on_stage(&Stage::Uploading);
        let file_ref = match self.store.upload(image).await {
            Ok(file_ref) => file_ref,
            Err(e) => return Err(Self::fail(observer, e.into())),
        };

        observer.on_stage(&Stage::Analyzing);
        let payload = match self.inference.detect(&file_ref).await {
            Ok(payload) => payload,
            Err(e) => return Err(Self::fail(observer, e.into())),
        };

        observer.on_stage(&Stage::Preparing);
        self.sleeper.sleep(self.preparing_delay).await;

        if self.delete_after_analysis {
            let store = self.store.clone();
            let uploaded = file_ref.clone();
            tokio::spawn(async move { store.delete(&uploaded).await });
        }

        tracing::info!(
            file_id = %payload.file_ref,
            detections = payload.detections.len(),
            "Analysis complete"
        );
        observer.on_stage(&Stage::Complete);
        Ok(payload)
    }

    fn fail(observer: &dyn StageObserver, error: PipelineError) -> PipelineError {
        tracing::error!(error = %error, code = error.code(), "Analysis failed");
        observer.on_stage(&Stage::Error(error.clone()));
        error
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Completed(AnalysisPayload),
    Failed(PipelineError),
    /// The user moved on before this attempt finished; its result was dropped.
    Abandoned,
}

/// One user's analysis of one selected image, with retry and cancel.
pub struct AnalysisSession {
    pipeline: Arc<AnalysisPipeline>,
    image: UploadableImage,
    generation: AtomicU64,
    stage: Mutex<Stage>,
}

struct AttemptObserver<'a> {
    session: &'a AnalysisSession,
    generation: u64,
    forward: &'a dyn StageObserver,
}

impl StageObserver for AttemptObserver<'_> {
    fn on_stage(&self, stage: &Stage) {
        if self.session.is_current(self.generation) {
            self.session.set_stage(stage.clone());
            self.forward.on_stage(stage);
        }
    }
}

impl AnalysisSession {
    pub fn new(pipeline: Arc<AnalysisPipeline>, image: UploadableImage) -> Self {
        Self { pipeline, image, generation: AtomicU64::new(0), stage: Mutex::new(Stage::Selecting) }
    }

    pub fn stage(&self) -> Stage {
        self.stage.lock().map(|s| s.clone()).unwrap_or(Stage::Selecting)
    }

    fn set_stage(&self, stage: Stage) {
        if let Ok(mut current) = self.stage.lock() {
            *current = stage;
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    pub async fn run(&self, observer: &dyn StageObserver) -> SessionOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let attempt = AttemptObserver { session: self, generation, forward: observer };
        let result = self.pipeline.run(&self.image, &attempt).await;

        if !self.is_current(generation) {
            tracing::debug!(generation, "Discarding result of abandoned analysis");
            return SessionOutcome::Abandoned;
        }
        match result {
            Ok(payload) => SessionOutcome::Completed(payload),
            Err(e) => SessionOutcome::Failed(e),
        }
    }

    /// Re-uploads the same image and resubmits; never resumes a partial attempt.
    pub async fn retry(&self, observer: &dyn StageObserver) -> SessionOutcome {
        tracing::info!(previous = ?self.stage(), "Retrying analysis from upload");
        self.run(observer).await
    }

    /// Returns to image selection. In-flight calls finish on their own; their results are ignored.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.set_stage(Stage::Selecting);
    }
}
