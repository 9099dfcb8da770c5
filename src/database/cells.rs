//! Row decoding
//!
//! Cells are decoded by their PostgreSQL type. Rows from the simple query
//! protocol arrive as text, so any type without a dedicated decoder is
//! returned in that text form; binary cells of such types become a
//! placeholder string.

use crate::database::types::JsonRow;
use serde_json::Value as JsonValue;
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgRow, PgTypeInfo, PgTypeKind, PgValueFormat, Postgres};
use sqlx::types::chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::types::mac_address::MacAddress;
use sqlx::types::{Decimal, Uuid};
use sqlx::{Column, Decode, Row, TypeInfo, ValueRef};
use std::fmt::Write;

/// Fractional digits assumed for `money`
const MONEY_SCALE: u32 = 2;

/// Convert a row to a column-ordered JSON object
pub fn row_to_json(row: &PgRow) -> JsonRow {
    let mut object = JsonRow::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = cell_to_json(row, idx, column.type_info());
        object.insert(column.name().to_string(), value);
    }
    object
}

fn cell_to_json(row: &PgRow, idx: usize, type_info: &PgTypeInfo) -> JsonValue {
    let Ok(raw) = row.try_get_raw(idx) else {
        return JsonValue::Null;
    };
    if raw.is_null() {
        return JsonValue::Null;
    }
    if let Some(value) = decode_typed(row, idx, type_info) {
        return value;
    }

    match raw.format() {
        PgValueFormat::Text => raw
            .as_str()
            .map(|s| JsonValue::String(s.to_string()))
            .unwrap_or(JsonValue::Null),
        PgValueFormat::Binary => JsonValue::String(unsupported(type_info)),
    }
}

fn unsupported(type_info: &PgTypeInfo) -> String {
    format!("<unsupported type {}>", type_info.name().to_lowercase())
}

fn get<'r, T: Decode<'r, Postgres>>(row: &'r PgRow, idx: usize) -> Option<T> {
    // The caller has already matched the column type by name
    row.try_get_unchecked::<T, _>(idx).ok()
}

fn scalar<'r, T, F>(row: &'r PgRow, idx: usize, render: F) -> Option<JsonValue>
where
    T: Decode<'r, Postgres>,
    F: Fn(T) -> JsonValue,
{
    get::<T>(row, idx).map(render)
}

fn array<'r, T, F>(row: &'r PgRow, idx: usize, render: F) -> Option<JsonValue>
where
    Vec<Option<T>>: Decode<'r, Postgres>,
    F: Fn(T) -> JsonValue,
{
    let items = get::<Vec<Option<T>>>(row, idx)?;
    Some(JsonValue::Array(
        items
            .into_iter()
            .map(|item| item.map(&render).unwrap_or(JsonValue::Null))
            .collect(),
    ))
}

/// Decode a non-null cell with a type-specific decoder
///
/// Returns `None` when the type has no decoder or decoding failed.
fn decode_typed(row: &PgRow, idx: usize, type_info: &PgTypeInfo) -> Option<JsonValue> {
    match type_info.kind() {
        PgTypeKind::Domain(base) => return decode_typed(row, idx, base),
        PgTypeKind::Enum(_) => return scalar::<String, _>(row, idx, JsonValue::String),
        _ => {}
    }

    match type_info.name() {
        "BOOL" => scalar::<bool, _>(row, idx, JsonValue::Bool),
        "INT2" => scalar::<i16, _>(row, idx, JsonValue::from),
        "INT4" => scalar::<i32, _>(row, idx, JsonValue::from),
        "INT8" => scalar::<i64, _>(row, idx, JsonValue::from),
        "OID" => scalar::<Oid, _>(row, idx, |oid| JsonValue::from(oid.0)),
        "FLOAT4" => scalar::<f32, _>(row, idx, JsonValue::from),
        "FLOAT8" => scalar::<f64, _>(row, idx, JsonValue::from),
        // Kept as text so no precision is lost
        "NUMERIC" => scalar::<Decimal, _>(row, idx, |d| JsonValue::String(d.to_string())),
        "MONEY" => scalar::<PgMoney, _>(row, idx, |m| {
            JsonValue::String(m.to_decimal(MONEY_SCALE).to_string())
        }),
        "JSON" | "JSONB" => get::<JsonValue>(row, idx),
        "UUID" => scalar::<Uuid, _>(row, idx, |u| JsonValue::String(u.to_string())),
        "DATE" => scalar::<NaiveDate, _>(row, idx, render_date),
        "TIME" => scalar::<NaiveTime, _>(row, idx, |t| JsonValue::String(t.to_string())),
        "TIMETZ" => scalar::<PgTimeTz<NaiveTime, FixedOffset>, _>(row, idx, |t| {
            JsonValue::String(format_timetz(&t))
        }),
        "TIMESTAMP" => scalar::<NaiveDateTime, _>(row, idx, render_timestamp),
        "TIMESTAMPTZ" => scalar::<DateTime<Utc>, _>(row, idx, render_timestamptz),
        "INTERVAL" => scalar::<PgInterval, _>(row, idx, |i| JsonValue::String(format_interval(&i))),
        "INET" => scalar::<IpNetwork, _>(row, idx, |n| JsonValue::String(format_network(n, false))),
        "CIDR" => scalar::<IpNetwork, _>(row, idx, |n| JsonValue::String(format_network(n, true))),
        "MACADDR" => scalar::<MacAddress, _>(row, idx, |m| {
            JsonValue::String(m.to_string().to_lowercase())
        }),
        "BYTEA" => scalar::<Vec<u8>, _>(row, idx, |b| JsonValue::String(hex_literal(&b))),
        "TEXT" | "VARCHAR" | "CHAR" | "\"CHAR\"" | "NAME" | "XML" | "UNKNOWN" | "citext" => {
            scalar::<String, _>(row, idx, JsonValue::String)
        }
        "BOOL[]" => array::<bool, _>(row, idx, JsonValue::Bool),
        "INT2[]" => array::<i16, _>(row, idx, JsonValue::from),
        "INT4[]" => array::<i32, _>(row, idx, JsonValue::from),
        "INT8[]" => array::<i64, _>(row, idx, JsonValue::from),
        "FLOAT4[]" => array::<f32, _>(row, idx, JsonValue::from),
        "FLOAT8[]" => array::<f64, _>(row, idx, JsonValue::from),
        "NUMERIC[]" => array::<Decimal, _>(row, idx, |d| JsonValue::String(d.to_string())),
        "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "NAME[]" => {
            array::<String, _>(row, idx, JsonValue::String)
        }
        "UUID[]" => array::<Uuid, _>(row, idx, |u| JsonValue::String(u.to_string())),
        "DATE[]" => array::<NaiveDate, _>(row, idx, render_date),
        "TIMESTAMP[]" => array::<NaiveDateTime, _>(row, idx, render_timestamp),
        "TIMESTAMPTZ[]" => array::<DateTime<Utc>, _>(row, idx, render_timestamptz),
        "JSON[]" | "JSONB[]" => array::<JsonValue, _>(row, idx, |v| v),
        _ => None,
    }
}

fn render_date(date: NaiveDate) -> JsonValue {
    JsonValue::String(date.format("%Y-%m-%d").to_string())
}

fn render_timestamp(ts: NaiveDateTime) -> JsonValue {
    JsonValue::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn render_timestamptz(ts: DateTime<Utc>) -> JsonValue {
    JsonValue::String(ts.to_rfc3339())
}

/// Interval in PostgreSQL's default output style, e.g. `1 day 02:00:00`
fn format_interval(interval: &PgInterval) -> String {
    let fields = [
        (i64::from(interval.months / 12), "year"),
        (i64::from(interval.months % 12), "mon"),
        (i64::from(interval.days), "day"),
    ];

    let mut out = String::new();
    let mut after_negative = false;
    for (value, unit) in fields {
        if value == 0 {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        if after_negative && value > 0 {
            out.push('+');
        }
        let _ = write!(out, "{} {}{}", value, unit, if value == 1 { "" } else { "s" });
        after_negative = value < 0;
    }

    let micros = interval.microseconds;
    if out.is_empty() || micros != 0 {
        if !out.is_empty() {
            out.push(' ');
        }
        if micros < 0 {
            out.push('-');
        } else if after_negative {
            out.push('+');
        }
        let abs = micros.unsigned_abs();
        let secs = abs / 1_000_000;
        let _ = write!(out, "{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60);
        let fraction = abs % 1_000_000;
        if fraction != 0 {
            let digits = format!("{:06}", fraction);
            out.push('.');
            out.push_str(digits.trim_end_matches('0'));
        }
    }
    out
}

/// `time with time zone` as `HH:MM:SS+HH[:MM]`
fn format_timetz(value: &PgTimeTz<NaiveTime, FixedOffset>) -> String {
    let offset = value.offset.local_minus_utc();
    let abs = offset.unsigned_abs();
    let mut out = format!(
        "{}{}{:02}",
        value.time,
        if offset < 0 { '-' } else { '+' },
        abs / 3600
    );
    if abs % 3600 != 0 {
        let _ = write!(out, ":{:02}", abs / 60 % 60);
    }
    out
}

/// Host addresses print without a prefix for `inet`; `cidr` always has one
fn format_network(network: IpNetwork, always_prefix: bool) -> String {
    let host_prefix = if network.is_ipv4() { 32 } else { 128 };
    if !always_prefix && network.prefix() == host_prefix {
        network.ip().to_string()
    } else {
        network.to_string()
    }
}

/// `\x`-prefixed hex, the PostgreSQL text form of bytea
fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}
