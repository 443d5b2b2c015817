//! Declared field types, facets, and the literal grammar used to turn textual values
//! (JSON payloads, generated strings) into native [`Value`]s and back.

use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{MockError, MockResult, Value};

/// Primitive type tag of a declared field, named after the EDM simple types.
///
/// Names without the `Edm.` prefix are treated as complex (non-scalar) types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Binary,
    Boolean,
    Byte,
    DateTime,
    DateTimeOffset,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    String,
    Time,
    Null,
    /// Structured type declared elsewhere in the model.
    Complex(String),
    /// `Edm.*` name this crate has no rule for.
    Other(String),
}

impl FieldType {
    pub fn from_edm(name: &str) -> Self {
        match name {
            "Edm.Binary" => FieldType::Binary,
            "Edm.Boolean" => FieldType::Boolean,
            "Edm.Byte" => FieldType::Byte,
            "Edm.DateTime" => FieldType::DateTime,
            "Edm.DateTimeOffset" => FieldType::DateTimeOffset,
            "Edm.Decimal" => FieldType::Decimal,
            "Edm.Double" => FieldType::Double,
            "Edm.Guid" => FieldType::Guid,
            "Edm.Int16" => FieldType::Int16,
            "Edm.Int32" => FieldType::Int32,
            "Edm.Int64" => FieldType::Int64,
            "Edm.SByte" => FieldType::SByte,
            "Edm.Single" => FieldType::Single,
            "Edm.String" => FieldType::String,
            "Edm.Time" => FieldType::Time,
            "Edm.Null" => FieldType::Null,
            other if other.starts_with("Edm.") => FieldType::Other(other.to_string()),
            other => FieldType::Complex(other.to_string()),
        }
    }

    pub fn edm_name(&self) -> String {
        match self {
            FieldType::Complex(name) | FieldType::Other(name) => name.clone(),
            simple => format!("Edm.{:?}", simple),
        }
    }

    /// Scalar types are generated and stored as plain field values.
    pub fn is_scalar(&self) -> bool { !matches!(self, FieldType::Complex(_)) }

    /// Parse a literal of this type into its native value, enforcing facets.
    pub fn parse_literal(&self, literal: &str, facets: &Facets) -> MockResult<Value> {
        let invalid = || MockError::InvalidLiteral { ty: self.edm_name(), literal: literal.to_string() };
        match self {
            FieldType::Binary => BASE64.decode(literal).map(Value::Binary).map_err(|_| invalid()),
            FieldType::Boolean => match literal {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(invalid()),
            },
            FieldType::Byte => literal.parse::<u8>().map(Value::Byte).map_err(|_| invalid()),
            FieldType::SByte => literal.parse::<i8>().map(Value::SByte).map_err(|_| invalid()),
            FieldType::Int16 => literal.parse::<i16>().map(Value::Int16).map_err(|_| invalid()),
            FieldType::Int32 => literal.parse::<i32>().map(Value::Int32).map_err(|_| invalid()),
            FieldType::Int64 => literal.parse::<i64>().map(Value::Int64).map_err(|_| invalid()),
            FieldType::Single => literal.parse::<f32>().map(Value::Single).map_err(|_| invalid()),
            FieldType::Double => literal.parse::<f64>().map(Value::Double).map_err(|_| invalid()),
            FieldType::Decimal => {
                let d = Decimal::from_str(literal)
                    .or_else(|_| Decimal::from_scientific(literal))
                    .map_err(|_| invalid())?;
                if let Some(scale) = facets.scale {
                    if d.scale() > scale { return Err(invalid()); }
                }
                if let Some(precision) = facets.precision {
                    let digits = d.mantissa().unsigned_abs().to_string().len() as u32;
                    if digits > precision { return Err(invalid()); }
                }
                Ok(Value::Decimal(d))
            }
            FieldType::String => {
                if let Some(max) = facets.max_length {
                    if literal.chars().count() > max as usize { return Err(invalid()); }
                }
                Ok(Value::String(literal.to_string()))
            }
            FieldType::DateTime => parse_datetime(literal).map(Value::DateTime).ok_or_else(invalid),
            FieldType::DateTimeOffset => parse_datetime_offset(literal).map(Value::DateTimeOffset).ok_or_else(invalid),
            FieldType::Time => parse_duration(literal).map(Value::Time).ok_or_else(invalid),
            FieldType::Guid => Uuid::parse_str(literal).map(Value::Guid).map_err(|_| invalid()),
            FieldType::Null => match literal {
                "null" | "" => Ok(Value::Null),
                _ => Err(invalid()),
            },
            FieldType::Complex(_) | FieldType::Other(_) => Err(MockError::UnsupportedFieldType(self.edm_name())),
        }
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self { FieldType::from_edm(&s) }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self { t.edm_name() }
}

/// Optional per-field constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

impl Facets {
    pub fn max_length(n: u32) -> Self { Self { max_length: Some(n), ..Self::default() } }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self { precision: Some(precision), scale: Some(scale), ..Self::default() }
    }
}

impl Value {
    /// Render the value in the literal grammar accepted by [`FieldType::parse_literal`].
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Boolean(v) => v.to_string(),
            Value::Byte(v) => v.to_string(),
            Value::SByte(v) => v.to_string(),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => v.to_string(),
            Value::Single(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Decimal(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Binary(v) => BASE64.encode(v),
            Value::DateTime(v) => v.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            Value::DateTimeOffset(v) => v.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            Value::Time(d) => {
                let ms = d.num_milliseconds();
                let sec_ms = ms % 60_000;
                let secs = if sec_ms % 1000 == 0 {
                    format!("{:02}", sec_ms / 1000)
                } else {
                    let sign = if sec_ms < 0 { "-" } else { "" };
                    format!("{}{:02}.{:03}", sign, sec_ms.abs() / 1000, sec_ms.abs() % 1000)
                };
                format!("PT{}H{:02}M{}S", ms / 3_600_000, (ms % 3_600_000) / 60_000, secs)
            }
            Value::Guid(v) => v.hyphenated().to_string(),
            Value::Links(keys) => {
                let parts: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
                format!("[{}]", parts.join(","))
            }
        }
    }
}

/// `/Date(<ms>)/` or ISO-8601 without offset.
fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Some(ms) = json_date_millis(s) {
        return DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// RFC 3339 (`2020-01-01T00:00:00.000Z`) or `/Date(<ms>[+-offset])/`.
fn parse_datetime_offset(s: &str) -> Option<DateTime<Utc>> {
    if let Some(ms) = json_date_millis(s) {
        return DateTime::from_timestamp_millis(ms);
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Milliseconds of a `/Date(...)/` literal; a trailing `+hhmm`/`-hhmm` offset is ignored
/// since the millisecond part is already UTC.
fn json_date_millis(s: &str) -> Option<i64> {
    let inner = s.strip_prefix("/Date(")?.strip_suffix(")/")?;
    let digits_end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i)
        .unwrap_or(inner.len());
    inner[..digits_end].parse().ok()
}

/// `PT<h>H<m>M<s>S` with every component optional (at least one required).
fn parse_duration(s: &str) -> Option<chrono::Duration> {
    let mut rest = s.strip_prefix("PT")?;
    if rest.is_empty() { return None; }
    let mut total_ms: i64 = 0;
    while !rest.is_empty() {
        let unit_at = rest.find(|c: char| c.is_ascii_alphabetic())?;
        let (num, tail) = rest.split_at(unit_at);
        let unit = tail.chars().next()?;
        let ms = match unit {
            'H' => num.parse::<i64>().ok()?.checked_mul(3_600_000)?,
            'M' => num.parse::<i64>().ok()?.checked_mul(60_000)?,
            'S' => {
                let secs = num.parse::<f64>().ok()?;
                if !secs.is_finite() || secs.abs() > (i64::MAX / 1000) as f64 {
                    return None;
                }
                (secs * 1000.0).round() as i64
            }
            _ => return None,
        };
        total_ms = total_ms.checked_add(ms)?;
        rest = &tail[1..];
    }
    chrono::Duration::try_milliseconds(total_ms)
}
