//! mockdb synth: type-driven synthetic records.
//!
//! Every scalar field value is a function of the field name, its declared type and facets,
//! and a 1-based record index. Booleans are the one randomized type; with a configured seed
//! they too become a function of `(seed, field, index)`. Values are first rendered as
//! literals and then parsed through the field type's literal rule, so a generated record is
//! exactly what a client would have posted.

#![forbid(unsafe_code)]

use std::hash::{Hash, Hasher};
use std::time::Instant;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use metrics::histogram;
use mockdb_core::{Facets, FieldType, MockError, MockResult, Record, Value};
use mockdb_schema::CollectionSchema;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rustc_hash::FxHasher;
use tracing::{debug, info};

/// Records generated per collection unless configured otherwise.
pub const RECORD_COUNT: usize = 50;

const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    pub record_count: usize,
    /// Makes boolean generation reproducible. `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self { Self { record_count: RECORD_COUNT, seed: None } }
}

impl GeneratorConfig {
    /// Defaults overridden by `MOCKDB_RECORD_COUNT` and `MOCKDB_SEED`; unparsable values are ignored.
    pub fn from_env() -> Self {
        let record_count = std::env::var("MOCKDB_RECORD_COUNT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(RECORD_COUNT);
        let seed = std::env::var("MOCKDB_SEED").ok().and_then(|s| s.parse().ok());
        Self { record_count, seed }
    }

    pub fn with_record_count(mut self, n: usize) -> Self {
        self.record_count = n;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Stateless apart from its config and the "now" anchor captured at construction.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    anchor: DateTime<Utc>,
}

impl Default for Generator {
    fn default() -> Self { Self::new(GeneratorConfig::default()) }
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self { Self { config, anchor: Utc::now() } }

    /// Pin the date anchor; date fields of index `record_count / 2` equal it.
    pub fn with_anchor(mut self, anchor: DateTime<Utc>) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn config(&self) -> &GeneratorConfig { &self.config }
    pub fn anchor(&self) -> DateTime<Utc> { self.anchor }

    /// `record_count` records for indices `1..=record_count`. Any failing field fails the batch.
    pub fn generate(&self, collection: &CollectionSchema) -> MockResult<Vec<Record>> {
        let t0 = Instant::now();
        let records = (1..=self.config.record_count as u64)
            .map(|i| self.generate_record(collection, i))
            .collect::<MockResult<Vec<_>>>()?;
        let took = t0.elapsed().as_secs_f64() * 1000.0;
        histogram!("mockdb_generate_ms", took);
        info!(collection = %collection.name(), records = records.len(), took_ms = %format!("{:.1}", took), "generated records");
        Ok(records)
    }

    /// One record for `index`. Non-scalar fields are left out.
    pub fn generate_record(&self, collection: &CollectionSchema, index: u64) -> MockResult<Record> {
        let mut record = Record::with_capacity(collection.fields().len());
        for f in collection.scalar_fields() {
            let v = self.generate_value(&f.name, &f.field_type, &f.facets, index)?;
            record.set(f.name.clone(), v);
        }
        Ok(record)
    }

    /// Generated value for a single field, parsed from [`generate_literal`](Self::generate_literal).
    pub fn generate_value(&self, field: &str, ty: &FieldType, facets: &Facets, index: u64) -> MockResult<Value> {
        let literal = self.generate_literal(field, ty, facets, index)?;
        ty.parse_literal(&literal, facets)
    }

    /// Literal form of the generated value.
    pub fn generate_literal(&self, field: &str, ty: &FieldType, facets: &Facets, index: u64) -> MockResult<String> {
        let literal = match ty {
            FieldType::Binary => BASE64.encode(format!("{} {}", field, index)),
            FieldType::Boolean => self.boolean(field, index).to_string(),
            FieldType::Byte => (index % 255).to_string(),
            FieldType::SByte => (index % 128).to_string(),
            FieldType::DateTime => format!("/Date({})/", self.shifted_millis(index)?),
            FieldType::DateTimeOffset => {
                let at = DateTime::from_timestamp_millis(self.shifted_millis(index)?)
                    .ok_or_else(|| MockError::InvalidLiteral { ty: ty.edm_name(), literal: index.to_string() })?;
                at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
            }
            FieldType::Time => format!("PT{}H00M", index),
            FieldType::Decimal | FieldType::Double | FieldType::Single => {
                let mut d = Decimal::from(index);
                if let Some(scale) = facets.scale {
                    d.rescale(scale);
                }
                d.to_string()
            }
            FieldType::Guid => format!("{:08}-{:04}-{:04}-{:04}-{:012}", index, index, index, index, index),
            FieldType::Int16 | FieldType::Int32 | FieldType::Int64 => index.to_string(),
            FieldType::String => bounded_string(field, index, facets.max_length),
            FieldType::Null | FieldType::Complex(_) | FieldType::Other(_) => {
                return Err(MockError::UnsupportedFieldType(ty.edm_name()))
            }
        };
        Ok(literal)
    }

    /// Anchor shifted by `index - record_count / 2` days, as epoch milliseconds.
    fn shifted_millis(&self, index: u64) -> MockResult<i64> {
        let days = index as i64 - (self.config.record_count / 2) as i64;
        let shift = days
            .checked_mul(MS_PER_DAY)
            .ok_or_else(|| MockError::InvalidLiteral { ty: "Edm.DateTime".into(), literal: days.to_string() })?;
        Ok(self.anchor.timestamp_millis().saturating_add(shift))
    }

    fn boolean(&self, field: &str, index: u64) -> bool {
        match self.config.seed {
            Some(seed) => {
                let mut h = FxHasher::default();
                field.hash(&mut h);
                let s = seed.wrapping_add(index.wrapping_mul(0x9E3779B97F4A7C15)) ^ h.finish();
                StdRng::seed_from_u64(s).gen()
            }
            None => rand::thread_rng().gen(),
        }
    }
}

/// `"<field> <index>"`; under a max length the field name is cut so the index suffix survives.
fn bounded_string(field: &str, index: u64, max_length: Option<u32>) -> String {
    let suffix = format!(" {}", index);
    let Some(max) = max_length else { return format!("{}{}", field, suffix) };
    let room = (max as usize).saturating_sub(suffix.chars().count());
    let name: String = field.chars().take(room).collect();
    if name.len() < field.len() {
        debug!(field, max, "truncated generated string");
    }
    format!("{}{}", name, suffix)
}
