//! Browse mode: reference catalog of care symbols, independent of any analysis.

use async_trait::async_trait;
use std::sync::Arc;

use crate::clients::AppwriteSymbolCatalog;
use crate::config::Config;
use crate::error::CatalogError;
use crate::models::{CareCategory, SymbolCatalogEntry};

#[async_trait]
pub trait SymbolCatalog: Send + Sync {
    async fn list_symbols(&self) -> Result<Vec<SymbolCatalogEntry>, CatalogError>;
}

/// Built-in reference table (id, category, title, description).
const STATIC_SYMBOLS: [(&str, CareCategory, &str, &str); 16] = [
    ("wash-30", CareCategory::Washing, "Machine Wash 30°C", "Wash in washing machine at maximum 30°C (86°F) on normal cycle."),
    ("wash-40", CareCategory::Washing, "Machine Wash 40°C", "Wash in washing machine at maximum 40°C (104°F) on normal cycle."),
    ("hand-wash", CareCategory::Washing, "Hand Wash Only", "Wash by hand only in water at or below 40°C. Do not machine wash."),
    ("no-wash", CareCategory::Washing, "Do Not Wash", "Do not wash with water. This item requires special care or dry cleaning only."),
    ("delicate-wash", CareCategory::Washing, "Delicate Cycle", "Use gentle or delicate cycle at 30°C. Suitable for fragile fabrics."),
    ("tumble-low", CareCategory::Drying, "Tumble Dry Low", "Machine dry on low heat or delicate cycle. Use reduced temperature."),
    ("line-dry", CareCategory::Drying, "Line Dry", "Hang to dry on a clothesline or drying rack. Do not tumble dry."),
    ("no-tumble", CareCategory::Drying, "Do Not Tumble Dry", "Do not machine dry. Air dry or lay flat to dry instead."),
    ("flat-dry", CareCategory::Drying, "Dry Flat", "Lay flat to dry on a horizontal surface. Prevents stretching."),
    ("iron-low", CareCategory::Ironing, "Iron Low Heat", "Iron at low temperature (110°C). Use one dot setting on iron."),
    ("iron-medium", CareCategory::Ironing, "Iron Medium Heat", "Iron at medium temperature (150°C). Use two dot setting on iron."),
    ("no-iron", CareCategory::Ironing, "Do Not Iron", "Do not iron. Fabric may be damaged by heat or pressure."),
    ("no-steam", CareCategory::Ironing, "No Steam Iron", "Iron without steam. Steam may damage the fabric finish."),
    ("dry-clean", CareCategory::DryCleaning, "Dry Clean Only", "Professional dry cleaning only. Use perchloroethylene (P) solvent."),
    ("no-dry-clean", CareCategory::DryCleaning, "Do Not Dry Clean", "Do not dry clean. Use alternative cleaning methods only."),
    ("gentle-dry-clean", CareCategory::DryCleaning, "Gentle Dry Clean", "Professional dry cleaning with gentle cycle. Use petroleum (F) solvent."),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSymbolCatalog;

impl StaticSymbolCatalog {
    pub fn entries() -> Vec<SymbolCatalogEntry> {
        STATIC_SYMBOLS
            .iter()
            .map(|(id, category, title, description)| SymbolCatalogEntry {
                id: id.to_string(),
                category: *category,
                title: title.to_string(),
                short_description: description.to_string(),
                image: None,
            })
            .collect()
    }
}

#[async_trait]
impl SymbolCatalog for StaticSymbolCatalog {
    async fn list_symbols(&self) -> Result<Vec<SymbolCatalogEntry>, CatalogError> {
        Ok(Self::entries())
    }
}

/// Remote collection when configured; the built-in table otherwise (if allowed).
pub fn catalog_for(config: Arc<Config>) -> Arc<dyn SymbolCatalog> {
    let remote_ready = config
        .require(&["endpoint", "projectId", "databaseId", "symbolsCollectionId"])
        .is_ok();
    if !remote_ready && config.catalog_static_fallback {
        tracing::warn!("Symbols collection not configured; serving built-in catalog");
        return Arc::new(StaticSymbolCatalog);
    }
    Arc::new(AppwriteSymbolCatalog::new(config))
}

pub fn filter_by_category(entries: &[SymbolCatalogEntry], category: CareCategory) -> Vec<SymbolCatalogEntry> {
    entries.iter().filter(|e| e.category == category).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_catalog_contents() {
        let all = StaticSymbolCatalog.list_symbols().await.unwrap();
        assert_eq!(all.len(), 16);
        let count = |c| filter_by_category(&all, c).len();
        assert_eq!(count(CareCategory::Washing), 5);
        assert_eq!(count(CareCategory::Drying), 4);
        assert_eq!(count(CareCategory::Ironing), 4);
        assert_eq!(count(CareCategory::DryCleaning), 3);
        assert_eq!(count(CareCategory::Bleach), 0);
    }

    #[tokio::test]
    async fn unconfigured_collection_falls_back_to_static() {
        let mut cfg = Config::for_endpoint("http://localhost:9");
        cfg.symbols_collection_id = String::new();
        let catalog = catalog_for(Arc::new(cfg));
        let all = catalog.list_symbols().await.unwrap();
        assert_eq!(all.len(), 16);
    }

    #[tokio::test]
    async fn unconfigured_without_fallback_reports_config_error() {
        let mut cfg = Config::for_endpoint("http://localhost:9");
        cfg.database_id = String::new();
        cfg.catalog_static_fallback = false;
        let err = catalog_for(Arc::new(cfg)).list_symbols().await.unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
        assert_eq!(err.user_message(), "Failed to load symbols. Please try again later.");
    }
}
