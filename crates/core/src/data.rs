//! Static documents loaded once at startup and shared read-only afterwards.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::catalog::AliasIndex;
use crate::config::DataConfig;
use crate::errors::ApplicationError;
use crate::pricing::packing::PackingCatalog;
use crate::pricing::rules::MovingRules;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataDigests {
    pub catalog: String,
    pub rules: String,
    pub packing_table: Option<String>,
}

#[derive(Clone, Debug)]
pub struct DataBundle {
    pub index: Arc<AliasIndex>,
    pub rules: Arc<MovingRules>,
    pub packing: Arc<PackingCatalog>,
    pub digests: DataDigests,
}

impl DataBundle {
    pub fn load(config: &DataConfig) -> Result<Self, ApplicationError> {
        let catalog = read_document(&config.catalog_path, "catalog")?;
        let rules = read_document(&config.rules_path, "rules")?;
        let packing_table = config
            .packing_table_path
            .as_deref()
            .map(|path| read_document(path, "packing table"))
            .transpose()?;

        let bundle = Self::from_sources(&catalog, &rules, packing_table.as_deref())?;
        info!(
            event_name = "data.loaded",
            catalog_path = %config.catalog_path.display(),
            rules_path = %config.rules_path.display(),
            items = bundle.index.items().len(),
            packing_skus = bundle.packing.len(),
            catalog_digest = %bundle.digests.catalog,
            rules_digest = %bundle.digests.rules,
            "static data loaded"
        );
        Ok(bundle)
    }

    pub fn from_sources(
        catalog: &str,
        rules: &str,
        packing_table: Option<&str>,
    ) -> Result<Self, ApplicationError> {
        let index = AliasIndex::from_json(catalog)
            .map_err(|error| ApplicationError::DataSource(format!("catalog: {error}")))?;
        let moving_rules = MovingRules::from_json(rules)
            .map_err(|error| ApplicationError::DataSource(format!("rules: {error}")))?;
        let packing = PackingCatalog::from_sources(packing_table, rules)
            .map_err(|error| ApplicationError::DataSource(format!("packing: {error}")))?;

        Ok(Self {
            index: Arc::new(index),
            rules: Arc::new(moving_rules),
            packing: Arc::new(packing),
            digests: DataDigests {
                catalog: content_digest(catalog),
                rules: content_digest(rules),
                packing_table: packing_table.map(content_digest),
            },
        })
    }
}

fn read_document(path: &Path, label: &str) -> Result<String, ApplicationError> {
    fs::read_to_string(path).map_err(|error| {
        ApplicationError::DataSource(format!("{label} `{}`: {error}", path.display()))
    })
}

pub fn content_digest(contents: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}
