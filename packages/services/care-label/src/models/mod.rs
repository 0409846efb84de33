pub mod detection;
pub mod execution;

pub use detection::*;
pub use execution::*;

use async_graphql::Enum;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Enum, Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "kebab-case")]
pub enum CareCategory {
    Washing,
    Drying,
    Ironing,
    #[serde(alias = "bleaching")]
    Bleach,
    #[serde(alias = "dry_cleaning", alias = "drycleaning")]
    DryCleaning,
    // Remote enrichment may return "" or a category this service doesn't know
    #[serde(other)]
    Unknown,
}

impl CareCategory {
    /// Browse-mode tab order.
    pub const BROWSE_ORDER: [CareCategory; 5] = [
        CareCategory::Washing,
        CareCategory::Bleach,
        CareCategory::Drying,
        CareCategory::Ironing,
        CareCategory::DryCleaning,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CareCategory::Washing => "Washing",
            CareCategory::Drying => "Drying",
            CareCategory::Ironing => "Ironing",
            CareCategory::Bleach => "Bleach",
            CareCategory::DryCleaning => "Dry Cleaning",
            CareCategory::Unknown => "Other",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            CareCategory::Washing => "washing",
            CareCategory::Drying => "drying",
            CareCategory::Ironing => "ironing",
            CareCategory::Bleach => "bleach",
            CareCategory::DryCleaning => "dry-cleaning",
            CareCategory::Unknown => "",
        }
    }
}

impl Default for CareCategory {
    fn default() -> Self { CareCategory::Unknown }
}

/// Binary payload selected by the user, with its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadableImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl UploadableImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self { bytes, mime_type: mime_type.into(), file_name: "care-label".to_string() }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn size(&self) -> u64 { self.bytes.len() as u64 }
}

/// Opaque identifier the object store hands back after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredFileRef(pub String);

impl StoredFileRef {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl std::fmt::Display for StoredFileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for StoredFileRef {
    fn from(s: &str) -> Self { StoredFileRef(s.to_string()) }
}

/// Treats `""` (and `null`) as absent; the inference function pads missing fields with empty strings.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// `null` decodes like a missing key. Document attributes that were never set come back as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
