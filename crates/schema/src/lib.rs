//! mockdb schema: the external service model description and the immutable schema index
//! built from it once, then shared by the entity store and the synthetic generator.

#![forbid(unsafe_code)]

use std::sync::Arc;

use mockdb_core::{Facets, FieldType, MockError, MockResult, Record, RecordKey};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

// ---------------- Model description (deserialized from JSON/YAML by callers) ----------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceModel {
    #[serde(default)]
    pub collections: Vec<CollectionModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionModel {
    pub name: String,
    /// Entity type name; defaults to the collection name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    pub key: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldModel>,
    #[serde(default)]
    pub navigations: Vec<NavigationModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldModel {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(flatten)]
    pub facets: Facets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationModel {
    pub name: String,
    /// Target collection name.
    pub target: String,
}

impl ServiceModel {
    pub fn new() -> Self { Self::default() }

    pub fn with_collection(mut self, c: CollectionModel) -> Self {
        self.collections.push(c);
        self
    }
}

impl CollectionModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), entity_type: None, key: Vec::new(), fields: Vec::new(), navigations: Vec::new() }
    }

    pub fn with_key(mut self, fields: &[&str]) -> Self {
        self.key = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_field(self, name: &str, field_type: FieldType) -> Self {
        self.with_field_facets(name, field_type, Facets::default())
    }

    pub fn with_field_facets(mut self, name: &str, field_type: FieldType, facets: Facets) -> Self {
        self.fields.push(FieldModel { name: name.to_string(), field_type, facets });
        self
    }

    pub fn with_navigation(mut self, name: &str, target: &str) -> Self {
        self.navigations.push(NavigationModel { name: name.to_string(), target: target.to_string() });
        self
    }
}

// ---------------- Resolved index ----------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    pub facets: Facets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub name: String,
    pub target: String,
}

/// Resolved schema of one collection: ordered fields, key descriptor and navigations.
#[derive(Debug, Clone)]
pub struct CollectionSchema {
    name: String,
    entity_type: String,
    fields: Vec<FieldSchema>,
    field_pos: FxHashMap<String, usize>,
    key: SmallVec<[String; 2]>,
    navigations: Vec<Navigation>,
}

impl CollectionSchema {
    pub fn name(&self) -> &str { &self.name }
    pub fn entity_type(&self) -> &str { &self.entity_type }
    pub fn fields(&self) -> &[FieldSchema] { &self.fields }
    pub fn navigations(&self) -> &[Navigation] { &self.navigations }

    /// Key descriptor: key field names in declared order.
    pub fn key_fields(&self) -> &[String] { &self.key }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.field_pos.get(name).map(|&i| &self.fields[i])
    }

    pub fn scalar_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.field_type.is_scalar())
    }

    pub fn navigation(&self, name: &str) -> Option<&Navigation> {
        self.navigations.iter().find(|n| n.name == name)
    }

    /// First navigation property pointing at `target`.
    pub fn navigation_to(&self, target: &str) -> Option<&Navigation> {
        self.navigations.iter().find(|n| n.target == target)
    }

    /// Derive the record key through the key descriptor. Works for full records and for
    /// key-shaped mappings alike; absent key fields read as null.
    pub fn key_of(&self, record: &Record) -> RecordKey { RecordKey::extract(&self.key, record) }
}

/// Immutable collection lookup, built once and passed explicitly to its consumers.
#[derive(Debug, Clone, Default)]
pub struct SchemaIndex {
    collections: Vec<Arc<CollectionSchema>>,
    by_name: FxHashMap<String, usize>,
}

impl SchemaIndex {
    /// Validate a model and resolve it into an index.
    pub fn build(model: ServiceModel) -> MockResult<Self> {
        let mut index = SchemaIndex::default();
        for c in model.collections {
            if index.by_name.contains_key(&c.name) {
                return Err(MockError::Schema(format!("collection {} declared twice", c.name)));
            }
            let schema = resolve_collection(c)?;
            index.by_name.insert(schema.name.clone(), index.collections.len());
            index.collections.push(Arc::new(schema));
        }
        for c in index.collections.iter() {
            for nav in c.navigations.iter() {
                if !index.by_name.contains_key(&nav.target) {
                    return Err(MockError::Schema(format!(
                        "navigation {}.{} targets undeclared collection {}",
                        c.name, nav.name, nav.target
                    )));
                }
            }
        }
        debug!(collections = index.collections.len(), "schema index built");
        Ok(index)
    }

    pub fn len(&self) -> usize { self.collections.len() }
    pub fn is_empty(&self) -> bool { self.collections.is_empty() }

    pub fn get(&self, name: &str) -> Option<&Arc<CollectionSchema>> {
        self.by_name.get(name).map(|&i| &self.collections[i])
    }

    /// Like [`get`](Self::get) but reports an undeclared name as `UnknownCollection`.
    pub fn collection(&self, name: &str) -> MockResult<&Arc<CollectionSchema>> {
        self.get(name).ok_or_else(|| MockError::UnknownCollection(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool { self.by_name.contains_key(name) }

    /// Collections in declaration order.
    pub fn collections(&self) -> impl Iterator<Item = &Arc<CollectionSchema>> { self.collections.iter() }

    pub fn names(&self) -> impl Iterator<Item = &str> { self.collections.iter().map(|c| c.name.as_str()) }
}

fn resolve_collection(c: CollectionModel) -> MockResult<CollectionSchema> {
    if c.key.is_empty() {
        return Err(MockError::Schema(format!("collection {} has no key fields", c.name)));
    }
    let mut field_pos: FxHashMap<String, usize> = FxHashMap::default();
    let mut fields = Vec::with_capacity(c.fields.len());
    for (i, f) in c.fields.into_iter().enumerate() {
        if field_pos.insert(f.name.clone(), i).is_some() {
            return Err(MockError::Schema(format!("field {}.{} declared twice", c.name, f.name)));
        }
        fields.push(FieldSchema { name: f.name, field_type: f.field_type, facets: f.facets });
    }
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for k in c.key.iter() {
        let Some(&pos) = field_pos.get(k) else {
            return Err(MockError::Schema(format!("key field {}.{} is not declared", c.name, k)));
        };
        if !fields[pos].field_type.is_scalar() {
            return Err(MockError::Schema(format!("key field {}.{} is not scalar", c.name, k)));
        }
        if !seen.insert(k.as_str()) {
            return Err(MockError::Schema(format!("key field {}.{} listed twice", c.name, k)));
        }
    }
    let navigations = c
        .navigations
        .into_iter()
        .map(|n| Navigation { name: n.name, target: n.target })
        .collect();
    Ok(CollectionSchema {
        entity_type: c.entity_type.unwrap_or_else(|| c.name.clone()),
        name: c.name,
        fields,
        field_pos,
        key: c.key.into_iter().collect(),
        navigations,
    })
}
