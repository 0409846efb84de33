use thiserror::Error;

use crate::processing::validation::{format_file_size, MAX_FILE_SIZE};

/// Missing or placeholder backend configuration. Only ever logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing backend configuration: {0:?}")]
    Missing(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported MIME type: {0}")]
    InvalidType(String),
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },
}

impl ValidationError {
    pub fn user_message(&self) -> String {
        match self {
            ValidationError::InvalidType(_) => {
                "Invalid file type. Please upload a JPG, PNG, HEIC, or WebP image.".to_string()
            }
            ValidationError::TooLarge { size, .. } => format!(
                "File size ({}) exceeds the maximum limit of {}.",
                format_file_size(*size),
                format_file_size(MAX_FILE_SIZE)
            ),
        }
    }
}

/// Object store failures. The payload is the provider's raw detail, kept for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("upload rejected (credentials/permission): {0}")]
    Auth(String),
    #[error("upload target not found: {0}")]
    NotFound(String),
    #[error("upload rejected by server size limit: {0}")]
    SizeExceeded(String),
    #[error("upload failed: {0}")]
    Unknown(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl UploadError {
    pub fn user_message(&self) -> &'static str {
        match self {
            UploadError::Auth(_) => "Authentication failed. Please check your configuration.",
            UploadError::NotFound(_) => "Storage bucket not found. Please check your configuration.",
            UploadError::SizeExceeded(_) => "File size exceeds the allowed limit.",
            UploadError::Unknown(_) | UploadError::Config(_) => "Failed to upload image. Please try again.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Connect,
    Timeout,
    Status(u16),
    Decode,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("transport error ({kind:?}): {message}")]
    Transport { kind: TransportKind, message: String },
    /// The platform reported the execution itself as failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// The execution completed but its payload declared `success: false`.
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("malformed execution response: {0}")]
    MalformedResponse(String),
    #[error("analysis timed out after {attempts} status checks")]
    Timeout { attempts: u32 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl InferenceError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        InferenceError::Transport { kind: TransportKind::Status(status), message: message.into() }
    }
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_timeout() {
            TransportKind::Timeout
        } else if e.is_connect() || e.is_request() {
            TransportKind::Connect
        } else if e.is_decode() {
            TransportKind::Decode
        } else if let Some(status) = e.status() {
            TransportKind::Status(status.as_u16())
        } else {
            TransportKind::Other
        };
        InferenceError::Transport { kind, message: e.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CatalogError {
    pub fn user_message(&self) -> &'static str {
        "Failed to load symbols. Please try again later."
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self { CatalogError::Request(e.to_string()) }
}

/// The three user-facing buckets every analysis failure collapses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, async_graphql::Enum)]
pub enum FailureCategory {
    Network,
    Timeout,
    Generic,
}

impl FailureCategory {
    pub fn message(&self) -> &'static str {
        match self {
            FailureCategory::Network => "Network error. Please check your connection and try again.",
            FailureCategory::Timeout => "Analysis timed out. Please try again.",
            FailureCategory::Generic => "Failed to analyze image. Please try again.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),
    #[error("upload: {0}")]
    Upload(#[from] UploadError),
    #[error("inference: {0}")]
    Inference(#[from] InferenceError),
}

impl PipelineError {
    pub fn failure_category(&self) -> FailureCategory {
        match self {
            PipelineError::Inference(InferenceError::Timeout { .. }) => FailureCategory::Timeout,
            PipelineError::Inference(InferenceError::Transport { kind, .. }) => match kind {
                TransportKind::Connect => FailureCategory::Network,
                TransportKind::Timeout => FailureCategory::Timeout,
                _ => FailureCategory::Generic,
            },
            _ => FailureCategory::Generic,
        }
    }

    /// Sanitized text shown next to the retry/cancel prompt.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Validation(e) => e.user_message(),
            PipelineError::Upload(e) => e.user_message().to_string(),
            PipelineError::Inference(_) => self.failure_category().message().to_string(),
        }
    }

    /// Short machine-readable tag for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "VALIDATION",
            PipelineError::Upload(_) => "UPLOAD",
            PipelineError::Inference(_) => match self.failure_category() {
                FailureCategory::Network => "NETWORK",
                FailureCategory::Timeout => "TIMEOUT",
                FailureCategory::Generic => "GENERIC",
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
