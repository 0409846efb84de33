use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};

use care_label_service::catalog::StaticSymbolCatalog;
use care_label_service::clients::{ExecutionApi, ObjectStore};
use care_label_service::config::Config;
use care_label_service::error::{InferenceError, UploadError};
use care_label_service::inference::{InferenceClient, Sleeper};
use care_label_service::models::{DetectionJob, Execution, StoredFileRef, UploadableImage};
use care_label_service::pipeline::AnalysisPipeline;
use care_label_service::schema::{build_schema, AppContext, CareLabelSchema};

#[derive(Default)]
struct FakeStore {
    uploads: AtomicUsize,
    deletes: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn upload(&self, _image: &UploadableImage) -> Result<StoredFileRef, UploadError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(UploadError::Auth("invalid key".into()));
        }
        Ok(StoredFileRef::from("abc123"))
    }

    async fn delete(&self, _file: &StoredFileRef) {
        self.deletes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Completes every job on submit with a fixed response body.
struct CannedFunction {
    response_body: String,
}

#[async_trait]
impl ExecutionApi for CannedFunction {
    async fn create_execution(&self, _job: &DetectionJob) -> Result<Execution, InferenceError> {
        Ok(serde_json::from_value(json!({
            "$id": "exec-1",
            "status": "completed",
            "responseBody": self.response_body,
        }))
        .unwrap())
    }

    async fn get_execution(&self, _execution_id: &str) -> Result<Execution, InferenceError> {
        unreachable!("completed executions are never polled")
    }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

fn schema_with(store: Arc<FakeStore>, results: Value) -> CareLabelSchema {
    let config = Arc::new(Config::for_endpoint("http://appwrite.test/v1"));
    let body = json!({"success": true, "fileId": "abc123", "results": results}).to_string();
    let sleeper: Arc<dyn Sleeper> = Arc::new(NoSleep);
    let inference = InferenceClient::new(Arc::new(CannedFunction { response_body: body }), sleeper.clone());
    let pipeline = AnalysisPipeline::new(store, inference, sleeper).with_preparing_delay(Duration::ZERO);
    build_schema(AppContext {
        config,
        pipeline: Arc::new(pipeline),
        catalog: Arc::new(StaticSymbolCatalog),
    })
}

async fn run(schema: &CareLabelSchema, query: &str) -> Value {
    let response = schema.execute(query).await;
    serde_json::to_value(&response).unwrap()
}

fn encoded(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[tokio::test]
async fn test_analyze_label_returns_sorted_cards() {
    let store = Arc::new(FakeStore::default());
    let schema = schema_with(store.clone(), json!([
        {"title": "Tumble Dry Low", "category": "drying", "confidence": 0.55, "donts": "No high heat"},
        {"title": "Machine Wash 30°C", "category": "washing", "confidence": 0.92, "image": "wash-30-art"},
        {"title": "Mystery", "category": "", "confidence": 0.3}
    ]));

    let query = format!(
        r#"mutation {{ analyzeLabel(imageBase64: "{}", mimeType: "image/jpeg", fileName: "label.jpg") {{
            state headline fileId
            symbols {{ title category categoryLabel confidencePercent donts imageUrl }}
        }} }}"#,
        encoded(&[0xFF, 0xD8, 0xFF, 0xE0])
    );
    let res = run(&schema, &query).await;
    assert!(res.get("errors").is_none(), "unexpected errors: {res}");

    let results = &res["data"]["analyzeLabel"];
    assert_eq!(results["state"], "DETECTED");
    assert_eq!(results["headline"], "We found 3 care symbols on your label");
    assert_eq!(results["fileId"], "abc123");

    let symbols = results["symbols"].as_array().unwrap();
    let titles: Vec<&str> = symbols.iter().map(|s| s["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["Machine Wash 30°C", "Tumble Dry Low", "Mystery"]);
    assert_eq!(symbols[0]["confidencePercent"], 92);
    assert_eq!(
        symbols[0]["imageUrl"],
        "http://appwrite.test/v1/storage/buckets/uploads/files/wash-30-art/view?project=care-labels"
    );
    assert_eq!(symbols[1]["donts"], json!(["No high heat"]));
    assert_eq!(symbols[2]["category"], "UNKNOWN");
    assert_eq!(symbols[2]["categoryLabel"], "Other");
    assert_eq!(store.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_analyze_label_with_no_detections() {
    let schema = schema_with(Arc::new(FakeStore::default()), json!([]));
    let query = format!(
        r#"mutation {{ analyzeLabel(imageBase64: "{}", mimeType: "image/png") {{ state headline fileId symbols {{ title }} }} }}"#,
        encoded(b"\x89PNG")
    );
    let res = run(&schema, &query).await;
    let results = &res["data"]["analyzeLabel"];
    assert_eq!(results["state"], "NOTHING_DETECTED");
    assert_eq!(results["headline"], "No symbols detected");
    assert_eq!(results["symbols"], json!([]));
}

#[tokio::test]
async fn test_rejected_type_never_uploads() {
    let store = Arc::new(FakeStore::default());
    let schema = schema_with(store.clone(), json!([]));
    let query = format!(
        r#"mutation {{ analyzeLabel(imageBase64: "{}", mimeType: "application/pdf") {{ state }} }}"#,
        encoded(b"%PDF")
    );
    let res = run(&schema, &query).await;
    let error = &res["errors"][0];
    assert_eq!(error["message"], "Invalid file type. Please upload a JPG, PNG, HEIC, or WebP image.");
    assert_eq!(error["extensions"]["code"], "VALIDATION");
    assert_eq!(error["extensions"]["retryable"], false);
    assert_eq!(store.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_failure_is_sanitized() {
    let store = Arc::new(FakeStore { fail: true, ..Default::default() });
    let schema = schema_with(store, json!([]));
    let query = format!(
        r#"mutation {{ analyzeLabel(imageBase64: "{}", mimeType: "image/webp") {{ state }} }}"#,
        encoded(b"RIFF")
    );
    let res = run(&schema, &query).await;
    let error = &res["errors"][0];
    assert_eq!(error["message"], "Authentication failed. Please check your configuration.");
    assert_eq!(error["extensions"]["code"], "UPLOAD");
    assert!(!error["message"].as_str().unwrap().contains("invalid key"));
}

#[tokio::test]
async fn test_undecodable_image_is_rejected() {
    let schema = schema_with(Arc::new(FakeStore::default()), json!([]));
    let res = run(&schema, r#"mutation { analyzeLabel(imageBase64: "***", mimeType: "image/jpeg") { state } }"#).await;
    assert_eq!(res["errors"][0]["message"], "Invalid image data.");
    assert_eq!(res["errors"][0]["extensions"]["code"], "VALIDATION");
}

#[tokio::test]
async fn test_validate_image_reports_reason() {
    let schema = schema_with(Arc::new(FakeStore::default()), json!([]));
    let res = run(
        &schema,
        r#"mutation {
            ok: validateImage(mimeType: "image/heic", size: 1024) { valid reason }
            big: validateImage(mimeType: "image/jpeg", size: 15728640) { valid reason }
            negative: validateImage(mimeType: "image/jpeg", size: -1) { valid reason }
        }"#,
    )
    .await;
    assert_eq!(res["data"]["ok"], json!({"valid": true, "reason": null}));
    assert_eq!(res["data"]["big"]["valid"], false);
    assert_eq!(
        res["data"]["big"]["reason"],
        "File size (15 MB) exceeds the maximum limit of 10 MB."
    );
    assert_eq!(res["data"]["negative"], json!({"valid": false, "reason": "Invalid file size."}));
}

#[tokio::test]
async fn test_browse_queries() {
    let schema = schema_with(Arc::new(FakeStore::default()), json!([]));
    let res = run(
        &schema,
        r#"{
            categories { category label }
            symbols(category: DRY_CLEANING) { id title }
            acceptedFileTypes
            maxUploadBytes
            emptyResults { state headline }
        }"#,
    )
    .await;
    assert!(res.get("errors").is_none(), "unexpected errors: {res}");
    let data = &res["data"];
    assert_eq!(data["categories"][0], json!({"category": "WASHING", "label": "Washing"}));
    assert_eq!(data["categories"].as_array().unwrap().len(), 5);
    assert_eq!(data["symbols"].as_array().unwrap().len(), 3);
    assert_eq!(data["acceptedFileTypes"].as_array().unwrap().len(), 5);
    assert_eq!(data["maxUploadBytes"], 10485760);
    assert_eq!(data["emptyResults"]["state"], "NO_ANALYSIS");
    assert_eq!(data["emptyResults"]["headline"], "No Analysis in Progress");
}

#[tokio::test]
async fn test_delete_image_returns_immediately() {
    let store = Arc::new(FakeStore::default());
    let schema = schema_with(store.clone(), json!([]));
    let res = run(&schema, r#"mutation { deleteImage(fileId: "abc123") }"#).await;
    assert_eq!(res["data"]["deleteImage"], true);

    for _ in 0..50 {
        if store.deletes.load(Ordering::SeqCst) == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
}
