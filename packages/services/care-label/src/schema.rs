use async_graphql::{
    Context, EmptySubscription, Enum, ErrorExtensions, Object, Result as GraphQLResult, Schema, SimpleObject,
};
use base64::Engine;
use std::sync::Arc;

use crate::catalog::{filter_by_category, SymbolCatalog};
use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{CareCategory, StoredFileRef, SymbolCatalogEntry, UploadableImage};
use crate::pipeline::{AnalysisPipeline, NoopObserver};
use crate::presentation::{DetectionCard, ResultsView};
use crate::processing::validation;

pub type CareLabelSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Process-wide handles, constructed once and injected into the schema.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub pipeline: Arc<AnalysisPipeline>,
    pub catalog: Arc<dyn SymbolCatalog>,
}

pub fn build_schema(app: AppContext) -> CareLabelSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).data(app).finish()
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum ResultsState { NoAnalysis, NothingDetected, Detected }

#[derive(SimpleObject, Clone)]
#[graphql(rename_fields = "camelCase")]
pub struct SymbolCard {
    pub title: String,
    pub category: CareCategory,
    pub category_label: String,
    pub description: String,
    pub confidence: f64,
    pub confidence_percent: i32,
    pub dos: Vec<String>,
    pub donts: Vec<String>,
    pub image_url: Option<String>,
}

#[derive(SimpleObject, Clone)]
#[graphql(rename_fields = "camelCase")]
pub struct AnalysisResults {
    pub state: ResultsState,
    pub headline: String,
    pub file_id: Option<String>,
    pub symbols: Vec<SymbolCard>,
}

#[derive(SimpleObject, Clone)]
pub struct CategoryInfo { pub category: CareCategory, pub label: String }

#[derive(SimpleObject, Clone)]
pub struct ValidationResult { pub valid: bool, pub reason: Option<String> }

fn to_results(view: ResultsView, config: &Config) -> AnalysisResults {
    let headline = view.headline();
    let cards = view.cards();
    let (state, file_id, detections) = match view {
        ResultsView::NoAnalysis => (ResultsState::NoAnalysis, None, Vec::new()),
        ResultsView::NothingDetected { file_id } => (ResultsState::NothingDetected, Some(file_id), Vec::new()),
        ResultsView::Detected { file_id, detections } => (ResultsState::Detected, Some(file_id), detections),
    };
    let symbols = cards
        .into_iter()
        .zip(detections)
        .map(|(card, d): (DetectionCard, _)| SymbolCard {
            title: card.title,
            category: d.category,
            category_label: card.category_label.to_string(),
            description: card.description,
            confidence: d.confidence,
            confidence_percent: card.confidence_percent as i32,
            dos: card.dos,
            donts: card.donts,
            image_url: card.image.map(|id| config.file_view_url(&id)),
        })
        .collect();
    AnalysisResults { state, headline, file_id, symbols }
}

fn pipeline_error(e: PipelineError) -> async_graphql::Error {
    async_graphql::Error::new(e.user_message()).extend_with(|_, ext| {
        ext.set("code", e.code());
        ext.set("category", format!("{:?}", e.failure_category()).to_uppercase());
        ext.set("retryable", !matches!(e, PipelineError::Validation(_)));
    })
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn health(&self) -> GraphQLResult<String> {
        Ok("OK".to_string())
    }

    /// Browse-mode categories, in tab order
    async fn categories(&self) -> Vec<CategoryInfo> {
        CareCategory::BROWSE_ORDER
            .iter()
            .map(|c| CategoryInfo { category: *c, label: c.label().to_string() })
            .collect()
    }

    /// Reference symbols, optionally limited to one category
    async fn symbols(&self, ctx: &Context<'_>, category: Option<CareCategory>) -> GraphQLResult<Vec<SymbolCatalogEntry>> {
        let app = ctx.data::<AppContext>()?;
        let all = app.catalog.list_symbols().await.map_err(|e| {
            tracing::error!(error = %e, "Symbol catalog unavailable");
            async_graphql::Error::new(e.user_message())
        })?;
        Ok(match category {
            Some(c) => filter_by_category(&all, c),
            None => all,
        })
    }

    async fn accepted_file_types(&self) -> Vec<String> {
        validation::ACCEPTED_FILE_TYPES.iter().map(|s| s.to_string()).collect()
    }

    async fn max_upload_bytes(&self) -> i64 {
        validation::MAX_FILE_SIZE as i64
    }

    /// Results screen with nothing handed over
    async fn empty_results(&self, ctx: &Context<'_>) -> GraphQLResult<AnalysisResults> {
        let app = ctx.data::<AppContext>()?;
        Ok(to_results(ResultsView::from_handoff(None), &app.config))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Client-side style pre-check; no upload happens
    async fn validate_image(&self, mime_type: String, size: i64) -> ValidationResult {
        let Ok(size) = u64::try_from(size) else {
            return ValidationResult { valid: false, reason: Some("Invalid file size.".to_string()) };
        };
        match validation::validate_parts(&mime_type, size) {
            Ok(()) => ValidationResult { valid: true, reason: None },
            Err(e) => ValidationResult { valid: false, reason: Some(e.user_message()) },
        }
    }

    /// Upload → detect → results, in one call
    async fn analyze_label(
        &self,
        ctx: &Context<'_>,
        image_base64: String,
        mime_type: String,
        file_name: Option<String>,
    ) -> GraphQLResult<AnalysisResults> {
        let app = ctx.data::<AppContext>()?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(image_base64.trim())
            .map_err(|e| {
                tracing::warn!(error = %e, "Rejected undecodable image payload");
                async_graphql::Error::new("Invalid image data.").extend_with(|_, ext| ext.set("code", "VALIDATION"))
            })?;
        let mut image = UploadableImage::new(bytes, mime_type);
        if let Some(name) = file_name.filter(|n| !n.is_empty()) {
            image = image.with_file_name(name);
        }

        let payload = app.pipeline.run(&image, &NoopObserver).await.map_err(pipeline_error)?;
        Ok(to_results(ResultsView::from_handoff(Some(payload)), &app.config))
    }

    /// Fire-and-forget removal of an uploaded image; always reports success
    async fn delete_image(&self, ctx: &Context<'_>, file_id: String) -> GraphQLResult<bool> {
        let app = ctx.data::<AppContext>()?;
        let store = app.pipeline.store();
        tokio::spawn(async move { store.delete(&StoredFileRef(file_id)).await });
        Ok(true)
    }
}
