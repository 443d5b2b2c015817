//! mockdb store: per-collection, key-indexed, insertion-ordered record sets held in RAM.
//!
//! Every collection declared in the schema gets its own record set at construction; no
//! collection is ever created later. Each set sits behind its own `RwLock`: mutations take
//! the write side, reads share the read side, so a reader never sees a half-applied batch.

#![forbid(unsafe_code)]

use std::hash::BuildHasherDefault;
use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use metrics::counter;
use mockdb_core::{MockError, MockResult, Record, RecordKey};
use mockdb_schema::{CollectionSchema, SchemaIndex};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use tracing::{debug, info};

type RecordSet = IndexMap<RecordKey, Record, BuildHasherDefault<FxHasher>>;

pub struct EntityStore {
    schema: Arc<SchemaIndex>,
    sets: FxHashMap<String, RwLock<RecordSet>>,
}

fn count_write(op: &'static str, collection: &str, n: u64) {
    counter!("mockdb_store_writes_total", n, "op" => op, "collection" => collection.to_string());
}

impl EntityStore {
    /// Create an empty record set for every collection in `schema`.
    pub fn new(schema: Arc<SchemaIndex>) -> Self {
        let sets = schema
            .names()
            .map(|n| (n.to_string(), RwLock::new(RecordSet::default())))
            .collect();
        debug!(collections = schema.len(), "entity store initialized");
        Self { schema, sets }
    }

    pub fn schema(&self) -> &Arc<SchemaIndex> { &self.schema }

    fn resolve(&self, name: &str) -> MockResult<(&CollectionSchema, &RwLock<RecordSet>)> {
        let schema = self.schema.collection(name)?;
        let set = self.sets.get(name).ok_or_else(|| MockError::UnknownCollection(name.to_string()))?;
        Ok((schema.as_ref(), set))
    }

    /// Key of `record` under the collection's key descriptor.
    pub fn key_of(&self, name: &str, record: &Record) -> MockResult<RecordKey> {
        Ok(self.schema.collection(name)?.key_of(record))
    }

    /// Snapshot of all records in insertion order.
    pub fn list_all(&self, name: &str) -> MockResult<Vec<Record>> {
        let (_, set) = self.resolve(name)?;
        let set = set.read();
        Ok(set.values().cloned().collect())
    }

    pub fn len(&self, name: &str) -> MockResult<usize> {
        let (_, set) = self.resolve(name)?;
        let n = set.read().len();
        Ok(n)
    }

    /// Record counts per collection, in schema order.
    pub fn counts(&self) -> Vec<(String, usize)> {
        self.schema
            .names()
            .filter_map(|n| self.sets.get(n).map(|s| (n.to_string(), s.read().len())))
            .collect()
    }

    /// Append a record; fails with `DuplicateKey` when its key is already stored.
    pub fn insert(&self, name: &str, record: Record) -> MockResult<()> {
        let (schema, set) = self.resolve(name)?;
        let key = schema.key_of(&record);
        let mut set = set.write();
        match set.entry(key) {
            Entry::Occupied(o) => Err(MockError::DuplicateKey { collection: name.to_string(), key: o.key().to_string() }),
            Entry::Vacant(v) => {
                v.insert(record);
                count_write("insert", name, 1);
                Ok(())
            }
        }
    }

    /// Upsert. A replaced record keeps its original position; the previous value is returned.
    pub fn put(&self, name: &str, record: Record) -> MockResult<Option<Record>> {
        let (schema, set) = self.resolve(name)?;
        let key = schema.key_of(&record);
        let prev = set.write().insert(key, record);
        count_write("put", name, 1);
        Ok(prev)
    }

    /// Upsert a batch in order under a single write lock. The collection is resolved once up
    /// front, so an unknown name fails before any record is touched.
    pub fn put_all<I>(&self, name: &str, records: I) -> MockResult<usize>
    where
        I: IntoIterator<Item = Record>,
    {
        let (schema, set) = self.resolve(name)?;
        let mut set = set.write();
        let mut n = 0usize;
        for record in records {
            let key = schema.key_of(&record);
            set.insert(key, record);
            n += 1;
        }
        drop(set);
        count_write("put_all", name, n as u64);
        info!(collection = %name, records = n, "put_all applied");
        Ok(n)
    }

    /// Remove by full record or key-shaped record; `None` when nothing was stored under the key.
    pub fn remove(&self, name: &str, key_or_record: &Record) -> MockResult<Option<Record>> {
        let (schema, _) = self.resolve(name)?;
        self.remove_key(name, &schema.key_of(key_or_record))
    }

    pub fn remove_key(&self, name: &str, key: &RecordKey) -> MockResult<Option<Record>> {
        let (_, set) = self.resolve(name)?;
        let removed = set.write().shift_remove(key);
        if removed.is_some() {
            count_write("remove", name, 1);
        }
        Ok(removed)
    }

    pub fn get_by_key(&self, name: &str, key: &RecordKey) -> MockResult<Option<Record>> {
        let (_, set) = self.resolve(name)?;
        let found = set.read().get(key).cloned();
        Ok(found)
    }

    /// Lookup by full record or key-shaped record.
    pub fn get(&self, name: &str, key_or_record: &Record) -> MockResult<Option<Record>> {
        let (schema, _) = self.resolve(name)?;
        self.get_by_key(name, &schema.key_of(key_or_record))
    }

    /// Current records for `keys`, in key order. Keys with no stored record are skipped.
    pub fn resolve_links(&self, name: &str, keys: &[RecordKey]) -> MockResult<Vec<Record>> {
        let (_, set) = self.resolve(name)?;
        let set = set.read();
        Ok(keys.iter().filter_map(|k| set.get(k).cloned()).collect())
    }

    pub fn truncate(&self, name: &str) -> MockResult<()> {
        let (_, set) = self.resolve(name)?;
        set.write().clear();
        count_write("truncate", name, 1);
        Ok(())
    }

    /// Empty every collection. Collections themselves stay declared.
    pub fn clear(&self) {
        for name in self.schema.names() {
            if let Some(set) = self.sets.get(name) {
                set.write().clear();
                count_write("clear", name, 1);
            }
        }
        debug!("entity store cleared");
    }
}
