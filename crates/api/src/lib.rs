//! mockdb request-layer facade (in-process).
//!
//! `MockService` is what a protocol front end calls into: collection reads and writes,
//! navigation between collections, operation handlers and media stubs. Every call resolves
//! to entity store operations; nothing here holds record state of its own.

#![forbid(unsafe_code)]

use std::sync::Arc;

use metrics::counter;
use mockdb_core::{MockError, MockResult, Record, RecordKey, Value};
use mockdb_schema::{CollectionSchema, Navigation, SchemaIndex};
use mockdb_store::EntityStore;
use tracing::{debug, info};

pub mod handler;
pub mod json;
pub mod loader;

pub use handler::{HandlerOutput, HandlerRegistry, OperationHandler};
pub use loader::{DirectorySource, EmptySource, LoadReport, Loader, LoaderConfig, RecordSource};

/// Result of a navigation read: a single target lookup or the linked feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadResult {
    Entry(Option<Record>),
    Feed(Vec<Record>),
}

pub struct MockService {
    store: Arc<EntityStore>,
    handlers: HandlerRegistry,
}

impl MockService {
    pub fn new(store: Arc<EntityStore>) -> Self { Self { store, handlers: HandlerRegistry::new() } }

    pub fn store(&self) -> &Arc<EntityStore> { &self.store }
    pub fn schema(&self) -> &Arc<SchemaIndex> { self.store.schema() }
    pub fn handlers(&self) -> &HandlerRegistry { &self.handlers }
    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry { &mut self.handlers }

    pub fn register_handler(&mut self, name: impl Into<String>, handler: Arc<dyn OperationHandler>) {
        self.handlers.register(name, handler);
    }

    pub fn read_all(&self, collection: &str) -> MockResult<Vec<Record>> { self.store.list_all(collection) }

    /// Lookup by key-shaped record.
    pub fn read_by_key(&self, collection: &str, keys: &Record) -> MockResult<Option<Record>> {
        self.store.get(collection, keys)
    }

    /// Empty record to be filled by the caller and passed to [`create`](Self::create).
    pub fn new_record(&self, collection: &str) -> MockResult<Record> {
        let schema = self.schema().collection(collection)?;
        Ok(Record::with_capacity(schema.fields().len()))
    }

    pub fn create(&self, collection: &str, record: Record) -> MockResult<()> {
        self.store.insert(collection, record)?;
        counter!("mockdb_api_requests_total", 1, "op" => "create");
        Ok(())
    }

    /// Create from a JSON entry; anything but a JSON object is `InvalidInputShape`.
    pub fn create_json(&self, collection: &str, entry: &serde_json::Value) -> MockResult<Record> {
        let schema = self.schema().collection(collection)?;
        let obj = entry.as_object().ok_or_else(|| {
            MockError::InvalidInputShape(format!("{}: entry must be a JSON object", collection))
        })?;
        let record = json::record_from_json(schema, obj)?;
        self.create(collection, record.clone())?;
        Ok(record)
    }

    /// Delete by key-shaped record. Unlike [`EntityStore::remove`], absence is an error here.
    pub fn delete(&self, collection: &str, keys: &Record) -> MockResult<Record> {
        let removed = self.store.remove(collection, keys)?;
        let record = removed.ok_or_else(|| {
            let key = self.store.key_of(collection, keys).map(|k| k.to_string()).unwrap_or_default();
            MockError::NotFound(format!("{}{}", collection, key))
        })?;
        counter!("mockdb_api_requests_total", 1, "op" => "delete");
        Ok(record)
    }

    pub fn invoke(&self, operation: &str, params: &Record, keys: &Record) -> MockResult<HandlerOutput> {
        debug!(operation, "invoking operation handler");
        self.handlers.invoke(operation, params, keys)
    }

    /// With non-empty `target_keys`, a key lookup on the target collection. Otherwise the
    /// records linked from `source` through its navigation to `target_collection`; dangling
    /// links are skipped and no links at all is an empty feed.
    pub fn read_related(
        &self,
        source_collection: &str,
        source: &Record,
        target_collection: &str,
        target_keys: &Record,
    ) -> MockResult<ReadResult> {
        if !target_keys.is_empty() {
            return self.store.get(target_collection, target_keys).map(ReadResult::Entry);
        }
        let nav = self.navigation(source_collection, target_collection)?;
        let linked = match source.get(&nav.name).and_then(Value::as_links) {
            Some(keys) => self.store.resolve_links(target_collection, keys)?,
            None => Vec::new(),
        };
        Ok(ReadResult::Feed(linked))
    }

    /// Append the target key to the source's link list for the navigation and upsert the
    /// source. Returns the stored source record.
    pub fn write_relation(
        &self,
        source_collection: &str,
        mut source: Record,
        target_collection: &str,
        target_keys: &Record,
    ) -> MockResult<Record> {
        let nav = self.navigation(source_collection, target_collection)?;
        let key = self.schema().collection(target_collection)?.key_of(target_keys);
        match source.get_mut(&nav.name) {
            Some(Value::Links(keys)) => keys.push(key),
            _ => {
                source.set(nav.name.clone(), Value::Links(vec![key]));
            }
        }
        self.store.put(source_collection, source.clone())?;
        info!(source = %source_collection, target = %target_collection, navigation = %nav.name, "relation written");
        Ok(source)
    }

    pub fn delete_relation(&self, source_collection: &str, _source: &Record, target_collection: &str, _target_keys: &Record) -> MockResult<()> {
        Err(MockError::NotImplemented(format!("delete relation {} -> {}", source_collection, target_collection)))
    }

    pub fn read_binary(&self, collection: &str, _record: &Record) -> MockResult<Vec<u8>> {
        Err(MockError::NotImplemented(format!("media resource of {}", collection)))
    }

    pub fn write_binary(&self, collection: &str, _record: &Record, _data: &[u8]) -> MockResult<()> {
        Err(MockError::NotImplemented(format!("media resource of {}", collection)))
    }

    /// Key of `record` under the target collection's key descriptor.
    pub fn key_of(&self, collection: &str, record: &Record) -> MockResult<RecordKey> { self.store.key_of(collection, record) }

    fn navigation(&self, source_collection: &str, target_collection: &str) -> MockResult<Navigation> {
        let source: &CollectionSchema = self.schema().collection(source_collection)?;
        self.schema().collection(target_collection)?;
        source.navigation_to(target_collection).cloned().ok_or_else(|| MockError::NavigationNotFound {
            from: source_collection.to_string(),
            to: target_collection.to_string(),
        })
    }
}
