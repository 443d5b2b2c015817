//! Initial data: per-collection bulk load from a record source, with optional synthetic backfill.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mockdb_core::Record;
use mockdb_schema::CollectionSchema;
use mockdb_store::EntityStore;
use mockdb_synth::Generator;
use serde::Serialize;
use tracing::{info, warn};

use crate::json::{feed_entries, record_from_json};

/// Supplier of initial records for a collection. `Ok(None)` means the source has nothing
/// for this collection, which is not an error.
pub trait RecordSource {
    fn load(&self, collection: &CollectionSchema) -> Result<Option<Vec<Record>>>;
}

/// Reads `<dir>/<collection>.json` feed documents.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn path_for(&self, collection: &str) -> PathBuf { self.dir.join(format!("{}.json", collection)) }
}

impl RecordSource for DirectorySource {
    fn load(&self, collection: &CollectionSchema) -> Result<Option<Vec<Record>>> {
        let path = self.path_for(collection.name());
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let doc: serde_json::Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        let records = feed_entries(&doc)?
            .into_iter()
            .map(|e| record_from_json(collection, e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(records))
    }
}

/// Source with nothing in it; every collection is reported absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySource;

impl RecordSource for EmptySource {
    fn load(&self, _collection: &CollectionSchema) -> Result<Option<Vec<Record>>> { Ok(None) }
}

#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    pub data_dir: Option<PathBuf>,
    /// Fill collections without source data with generated records.
    pub generate_missing: bool,
}

impl LoaderConfig {
    pub fn source(&self) -> Box<dyn RecordSource> {
        match &self.data_dir {
            Some(dir) => Box::new(DirectorySource::new(dir.clone())),
            None => Box::new(EmptySource),
        }
    }
}

/// What happened to each collection during a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: Vec<(String, usize)>,
    pub generated: Vec<(String, usize)>,
    /// Absent from the source and left empty.
    pub skipped: Vec<String>,
}

pub struct Loader<'a> {
    store: &'a EntityStore,
    generator: &'a Generator,
}

impl<'a> Loader<'a> {
    pub fn new(store: &'a EntityStore, generator: &'a Generator) -> Self { Self { store, generator } }

    /// Bulk-load every declared collection in schema order. Stops at the first failing
    /// collection; collections loaded before it keep their records.
    pub fn load(&self, source: &dyn RecordSource, generate_missing: bool) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for collection in self.store.schema().collections() {
            let name = collection.name();
            match source.load(collection).with_context(|| format!("loading data for {}", name))? {
                Some(records) => {
                    let n = self.store.put_all(name, records)?;
                    report.loaded.push((name.to_string(), n));
                }
                None => {
                    warn!(collection = %name, "no source data");
                    if generate_missing {
                        let records =
                            self.generator.generate(collection).with_context(|| format!("generating data for {}", name))?;
                        let n = self.store.put_all(name, records)?;
                        report.generated.push((name.to_string(), n));
                    } else {
                        report.skipped.push(name.to_string());
                    }
                }
            }
        }
        info!(
            loaded = report.loaded.len(),
            generated = report.generated.len(),
            skipped = report.skipped.len(),
            "initial data loaded"
        );
        Ok(report)
    }
}
