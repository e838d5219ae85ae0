// src/catalog/mod.rs
//
// In-memory collection of dataset properties, loaded once at startup from
// `<dataset>/properties/*.json` and consulted when the store misses.

pub mod convert;
pub mod import;

use crate::domain::address::{normalize, similarity};
use crate::domain::property::{Money, PropertyRecord, PropertyType};
use crate::domain::standardize::standardize;
use crate::domain::stats::PropertyStats;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use convert::convert_dataset;
pub use import::{import_catalog, sync_catalog};

pub const PROPERTIES_DIR: &str = "properties";
pub const INDEX_FILE: &str = "property_index.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// One line of `property_index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(default)]
    pub id: Value,
    pub address: String,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub market_value: Money,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyIndex {
    #[serde(default)]
    pub properties: Vec<IndexEntry>,
    #[serde(default)]
    pub total_properties: usize,
    #[serde(default)]
    pub last_updated: String,
}

impl PropertyIndex {
    pub fn from_records(records: &[PropertyRecord]) -> Self {
        let properties = records
            .iter()
            .map(|r| IndexEntry {
                id: r.id.clone().map(Value::String).unwrap_or(Value::Null),
                address: r.address.clone(),
                property_type: r.property_type.as_str().to_string(),
                market_value: r.market_value.unwrap_or(0),
                bedrooms: r.bedrooms,
                bathrooms: r.bathrooms,
                image_url: r.image_url.clone().unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        Self {
            total_properties: properties.len(),
            properties,
            last_updated: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), CatalogError> {
        write_json(path, self)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<PropertyRecord>,
}

impl Catalog {
    pub fn new(records: Vec<PropertyRecord>) -> Self {
        Self { records }
    }

    /// Load every property file under `dataset_dir/properties`. A missing
    /// directory gives an empty catalog; unreadable files are skipped.
    pub fn load(dataset_dir: &Path) -> Self {
        let dir = dataset_dir.join(PROPERTIES_DIR);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "dataset directory not readable, catalog is empty");
                return Self::default();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| is_property_file(p))
            .collect();
        files.sort();

        let mut records = Vec::with_capacity(files.len());
        for path in &files {
            match load_record(path) {
                Ok(rec) => records.push(rec),
                Err(e) => tracing::warn!(error = %e, "skipping property file"),
            }
        }

        tracing::info!(count = records.len(), dir = %dir.display(), "loaded dataset properties");

        let catalog = Self { records };
        if let Err(e) = catalog.refresh_index(&dataset_dir.join(INDEX_FILE)) {
            tracing::warn!(error = %e, "could not refresh property index");
        }
        catalog
    }

    /// Rewrite the index when it is missing entries for loaded records.
    /// Returns whether the file was written.
    fn refresh_index(&self, path: &Path) -> Result<bool, CatalogError> {
        if self.records.is_empty() {
            return Ok(false);
        }

        let listed: HashSet<String> = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str::<PropertyIndex>(&text)
                .map_err(|source| CatalogError::Json {
                    path: path.to_path_buf(),
                    source,
                })?
                .properties
                .iter()
                .map(|e| normalize(&e.address))
                .collect(),
            Err(_) => HashSet::new(),
        };

        let stale = self
            .records
            .iter()
            .any(|r| !listed.contains(&r.normalized_address()));
        if !stale {
            return Ok(false);
        }

        PropertyIndex::from_records(&self.records).write(path)?;
        tracing::info!(path = %path.display(), "property index rewritten");
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    pub fn all(&self, limit: usize) -> Vec<PropertyRecord> {
        self.records.iter().take(limit).cloned().collect()
    }

    pub fn get_by_address(&self, address: &str) -> Option<&PropertyRecord> {
        let key = normalize(address);
        self.records.iter().find(|r| r.normalized_address() == key)
    }

    /// Exact match first, then the most similar address scoring at least
    /// `threshold`.
    pub fn find_closest(&self, address: &str, threshold: f32) -> Option<(&PropertyRecord, f32)> {
        if let Some(exact) = self.get_by_address(address) {
            return Some((exact, 1.0));
        }

        self.records
            .iter()
            .map(|r| (r, similarity(address, &r.address)))
            .filter(|(_, score)| *score >= threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Case-insensitive substring search over address, neighborhood, city,
    /// amenities and neighborhood features. Empty query returns everything.
    pub fn search(&self, query: &str) -> Vec<PropertyRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.records.clone();
        }

        self.records
            .iter()
            .filter(|r| searchable_text(r).contains(&needle))
            .cloned()
            .collect()
    }

    pub fn by_type(&self, property_type: PropertyType) -> Vec<PropertyRecord> {
        self.records
            .iter()
            .filter(|r| r.property_type == property_type)
            .cloned()
            .collect()
    }

    pub fn by_price_range(&self, min_price: Money, max_price: Money) -> Vec<PropertyRecord> {
        self.records
            .iter()
            .filter(|r| (min_price..=max_price).contains(&r.market_value.unwrap_or(0)))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> PropertyStats {
        PropertyStats::from_records(&self.records)
    }
}

fn searchable_text(r: &PropertyRecord) -> String {
    let mut parts: Vec<&str> = vec![
        r.address.as_str(),
        r.neighborhood.as_deref().unwrap_or(""),
        r.city.as_deref().unwrap_or(""),
    ];
    parts.extend(r.amenities.iter().map(String::as_str));
    parts.extend(r.neighborhood_features.iter().map(String::as_str));
    parts.join(" ").to_lowercase()
}

fn is_property_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    path.is_file() && (name.ends_with(".json") || name.ends_with(".json.txt"))
}

fn load_record(path: &Path) -> Result<PropertyRecord, CatalogError> {
    let raw = read_json(path)?;
    standardize(&raw).map_err(|e| CatalogError::Invalid(format!("{}: {e}", path.display())))
}

pub(crate) fn read_json(path: &Path) -> Result<Value, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CatalogError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| CatalogError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|source| CatalogError::Write {
        path: path.to_path_buf(),
        source,
    })
}
