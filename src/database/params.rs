//! Statement parameters
//!
//! Statements are prepared without declared parameter types, so PostgreSQL
//! infers each one from context. The JSON values from the request are then
//! converted to those inferred types and sent in binary form.

use crate::error::{PluginError, Result};
use serde_json::Value as JsonValue;
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgTypeKind, Postgres};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::types::mac_address::MacAddress;
use sqlx::types::{Decimal, Uuid};
use sqlx::{Type, TypeInfo};
use std::str::FromStr;

/// Types whose binary form is their text
const TEXT_TYPES: &[&str] = &["TEXT", "VARCHAR", "CHAR", "NAME", "XML", "UNKNOWN", "citext"];

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A JSON value converted to a PostgreSQL type
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Numeric(Decimal),
    Text(String),
    Json(JsonValue),
    Jsonb(JsonValue),
    Uuid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    Timestamptz(DateTime<Utc>),
    Bytea(Vec<u8>),
    Inet(IpNetwork),
    MacAddr(MacAddress),
    /// One-dimensional array; `element` is the element type's OID
    Array { element: Oid, items: Vec<ParamValue> },
}

/// A parameter ready to bind, tagged with the type PostgreSQL inferred
#[derive(Debug, Clone)]
pub struct BoundParam {
    type_info: PgTypeInfo,
    value: ParamValue,
}

/// Convert every request parameter to its inferred type
///
/// `types` comes from the prepared statement; positions are 1-based in
/// error messages, as in `$1`.
pub fn bind_params(types: &[PgTypeInfo], params: &[JsonValue]) -> Result<Vec<BoundParam>> {
    if types.len() != params.len() {
        return Err(PluginError::ParameterCount {
            expected: types.len(),
            given: params.len(),
        });
    }

    types
        .iter()
        .zip(params)
        .enumerate()
        .map(|(idx, (type_info, value))| {
            let value = convert(type_info, value).map_err(|message| {
                PluginError::InvalidParameter {
                    position: idx + 1,
                    message,
                }
            })?;
            Ok(BoundParam {
                type_info: type_info.clone(),
                value,
            })
        })
        .collect()
}

/// Convert one JSON value to `type_info`; JSON null is NULL of any type
pub fn convert(type_info: &PgTypeInfo, value: &JsonValue) -> std::result::Result<ParamValue, String> {
    if value.is_null() {
        return Ok(ParamValue::Null);
    }

    match type_info.kind() {
        PgTypeKind::Domain(base) => return convert(base, value),
        PgTypeKind::Enum(_) => return Ok(ParamValue::Text(text_of(value))),
        PgTypeKind::Array(element) => return convert_array(element, value),
        _ => {}
    }

    let name = type_info.name();
    let converted = match name {
        "BOOL" => ParamValue::Bool(as_bool(value)?),
        "INT2" => ParamValue::Int2(narrow(as_int(value)?, name)?),
        "INT4" => ParamValue::Int4(narrow(as_int(value)?, name)?),
        "INT8" => ParamValue::Int8(as_int(value)?),
        "FLOAT4" => ParamValue::Float4(as_float(value)? as f32),
        "FLOAT8" => ParamValue::Float8(as_float(value)?),
        "NUMERIC" => ParamValue::Numeric(as_decimal(value)?),
        "JSON" => ParamValue::Json(as_json(value)?),
        "JSONB" => ParamValue::Jsonb(as_json(value)?),
        "UUID" => ParamValue::Uuid(Uuid::parse_str(as_str(value)?).map_err(|e| e.to_string())?),
        "DATE" => ParamValue::Date(parse_date(as_str(value)?).ok_or_else(|| expected("a date", value))?),
        "TIME" => ParamValue::Time(parse_time(as_str(value)?).ok_or_else(|| expected("a time", value))?),
        "TIMESTAMP" => ParamValue::Timestamp(
            parse_naive_datetime(as_str(value)?).ok_or_else(|| expected("a timestamp", value))?,
        ),
        "TIMESTAMPTZ" => ParamValue::Timestamptz(
            parse_datetime(as_str(value)?).ok_or_else(|| expected("a timestamp", value))?,
        ),
        "BYTEA" => ParamValue::Bytea(as_bytes(value)?),
        "INET" | "CIDR" => {
            ParamValue::Inet(IpNetwork::from_str(as_str(value)?).map_err(|e| e.to_string())?)
        }
        "MACADDR" => {
            ParamValue::MacAddr(MacAddress::from_str(as_str(value)?).map_err(|e| e.to_string())?)
        }
        _ if TEXT_TYPES.contains(&name) => ParamValue::Text(text_of(value)),
        _ => {
            return Err(format!(
                "type {} is not supported for parameters",
                name.to_lowercase()
            ))
        }
    };
    Ok(converted)
}

fn convert_array(element: &PgTypeInfo, value: &JsonValue) -> std::result::Result<ParamValue, String> {
    let JsonValue::Array(items) = value else {
        return Err(expected("a JSON array", value));
    };
    let oid = element
        .oid()
        .ok_or_else(|| format!("unresolved array element type {}", element.name()))?;

    let items = items
        .iter()
        .map(|item| convert(element, item))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ParamValue::Array {
        element: oid,
        items,
    })
}

fn expected(what: &str, value: &JsonValue) -> String {
    format!("expected {}, got {}", what, value)
}

/// Text form of a scalar; arrays and objects are sent as JSON text
fn text_of(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_str(value: &JsonValue) -> std::result::Result<&str, String> {
    value.as_str().ok_or_else(|| expected("a string", value))
}

fn as_bool(value: &JsonValue) -> std::result::Result<bool, String> {
    match value {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::Number(n) if n.as_i64() == Some(1) => Ok(true),
        JsonValue::Number(n) if n.as_i64() == Some(0) => Ok(false),
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "t" | "true" | "y" | "yes" | "on" | "1" => Ok(true),
            "f" | "false" | "n" | "no" | "off" | "0" => Ok(false),
            _ => Err(expected("a boolean", value)),
        },
        _ => Err(expected("a boolean", value)),
    }
}

fn as_int(value: &JsonValue) -> std::result::Result<i64, String> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| expected("an integer", value)),
        JsonValue::String(s) => s.trim().parse().map_err(|_| expected("an integer", value)),
        _ => Err(expected("an integer", value)),
    }
}

fn narrow<T: TryFrom<i64>>(value: i64, type_name: &str) -> std::result::Result<T, String> {
    T::try_from(value).map_err(|_| format!("{} is out of range for {}", value, type_name.to_lowercase()))
}

fn as_float(value: &JsonValue) -> std::result::Result<f64, String> {
    match value {
        JsonValue::Number(n) => n.as_f64().ok_or_else(|| expected("a number", value)),
        JsonValue::String(s) => s.trim().parse().map_err(|_| expected("a number", value)),
        _ => Err(expected("a number", value)),
    }
}

fn as_decimal(value: &JsonValue) -> std::result::Result<Decimal, String> {
    let text = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.trim().to_string(),
        _ => return Err(expected("a number", value)),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| expected("a number", value))
}

/// Strings are parsed as JSON text; any other value is used as is
fn as_json(value: &JsonValue) -> std::result::Result<JsonValue, String> {
    match value {
        JsonValue::String(s) => serde_json::from_str(s).map_err(|e| format!("invalid JSON text: {}", e)),
        other => Ok(other.clone()),
    }
}

fn as_bytes(value: &JsonValue) -> std::result::Result<Vec<u8>, String> {
    match value {
        JsonValue::String(s) => match s.strip_prefix("\\x") {
            Some(digits) => decode_hex(digits).ok_or_else(|| expected("hex digits", value)),
            None => Ok(s.as_bytes().to_vec()),
        },
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| expected("a byte", item))
            })
            .collect(),
        _ => Err(expected("a bytea string", value)),
    }
}

fn decode_hex(digits: &str) -> Option<Vec<u8>> {
    if digits.len() % 2 != 0 {
        return None;
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok())
        .collect()
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Values without an offset are taken as UTC
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .or_else(|| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z").ok())
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| parse_naive_datetime(s).map(|naive| naive.and_utc()))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_naive_datetime(s).map(|dt| dt.date()))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

fn put<'q, T: Encode<'q, Postgres>>(
    value: &T,
    buf: &mut PgArgumentBuffer,
) -> std::result::Result<IsNull, BoxDynError> {
    value.encode_by_ref(buf)
}

impl ParamValue {
    /// Write the binary form of this value
    fn encode_into(&self, buf: &mut PgArgumentBuffer) -> std::result::Result<IsNull, BoxDynError> {
        match self {
            ParamValue::Null => Ok(IsNull::Yes),
            ParamValue::Bool(v) => put(v, buf),
            ParamValue::Int2(v) => put(v, buf),
            ParamValue::Int4(v) => put(v, buf),
            ParamValue::Int8(v) => put(v, buf),
            ParamValue::Float4(v) => put(v, buf),
            ParamValue::Float8(v) => put(v, buf),
            ParamValue::Numeric(v) => put(v, buf),
            ParamValue::Text(v) => {
                buf.extend_from_slice(v.as_bytes());
                Ok(IsNull::No)
            }
            ParamValue::Json(v) => {
                serde_json::to_writer(&mut **buf, v)?;
                Ok(IsNull::No)
            }
            ParamValue::Jsonb(v) => {
                // jsonb binary format version
                buf.push(1);
                serde_json::to_writer(&mut **buf, v)?;
                Ok(IsNull::No)
            }
            ParamValue::Uuid(v) => put(v, buf),
            ParamValue::Date(v) => put(v, buf),
            ParamValue::Time(v) => put(v, buf),
            ParamValue::Timestamp(v) => put(v, buf),
            ParamValue::Timestamptz(v) => put(v, buf),
            ParamValue::Bytea(v) => {
                buf.extend_from_slice(v);
                Ok(IsNull::No)
            }
            ParamValue::Inet(v) => put(v, buf),
            ParamValue::MacAddr(v) => put(v, buf),
            ParamValue::Array { element, items } => {
                let dimensions: i32 = if items.is_empty() { 0 } else { 1 };
                buf.extend_from_slice(&dimensions.to_be_bytes());
                // has-null flag, ignored by the server
                buf.extend_from_slice(&0_i32.to_be_bytes());
                buf.extend_from_slice(&element.0.to_be_bytes());
                if !items.is_empty() {
                    buf.extend_from_slice(&i32::try_from(items.len())?.to_be_bytes());
                    // lower bound
                    buf.extend_from_slice(&1_i32.to_be_bytes());
                }

                for item in items {
                    let offset = buf.len();
                    buf.extend_from_slice(&0_i32.to_be_bytes());
                    let len = match item.encode_into(buf)? {
                        IsNull::Yes => -1,
                        IsNull::No => i32::try_from(buf.len() - offset - 4)?,
                    };
                    buf[offset..offset + 4].copy_from_slice(&len.to_be_bytes());
                }
                Ok(IsNull::No)
            }
        }
    }
}

impl Type<Postgres> for BoundParam {
    // Overridden per value by `produces`
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}

impl<'q> Encode<'q, Postgres> for BoundParam {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> std::result::Result<IsNull, BoxDynError> {
        self.value.encode_into(buf)
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(self.type_info.clone())
    }
}
