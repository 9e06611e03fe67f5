use crate::data_store::{DataStoreError, Field, Row};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use log::warn;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use std::error::Error;
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::Column;
use uuid::Uuid;

pub fn fields_from_columns(columns: &[Column]) -> Vec<Field> {
    columns
        .iter()
        .map(|col| Field {
            name: col.name().to_owned(),
            type_oid: col.type_().oid(),
        })
        .collect()
}

pub fn encode_rows(
    rows: Vec<tokio_postgres::Row>,
    columns: &[Column],
) -> Result<Vec<Row>, DataStoreError> {
    rows.iter()
        .map(|row| -> Result<Row, DataStoreError> {
            let mut values = Vec::with_capacity(columns.len());
            for (idx, col) in columns.iter().enumerate() {
                let JsonValue(value) = row.try_get::<_, JsonValue>(idx)?;
                values.push((col.name().to_owned(), value));
            }
            Ok(assemble_row(values))
        })
        .collect()
}

/// Keys keep the statement's column order.
pub fn assemble_row<I>(values: I) -> Row
where
    I: IntoIterator<Item = (String, Value)>,
{
    values.into_iter().collect()
}

/// A column value decoded straight from the binary wire format into JSON.
///
/// Accepts every type. Arrays become JSON arrays, domains decode as their base
/// type and enum labels become strings. Types with no JSON rendering are
/// logged and become null.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonValue(pub Value);

impl<'a> FromSql<'a> for JsonValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::from(i16::from_sql(ty, raw)?),
            Type::INT4 => Value::from(i32::from_sql(ty, raw)?),
            Type::INT8 => Value::from(i64::from_sql(ty, raw)?),
            Type::OID => Value::from(u32::from_sql(ty, raw)?),
            Type::FLOAT4 => float_value(f64::from(f32::from_sql(ty, raw)?)),
            Type::FLOAT8 => float_value(f64::from_sql(ty, raw)?),
            Type::NUMERIC => decimal_value(Decimal::from_sql(ty, raw)?),
            Type::MONEY => money_value(i64::from_sql(&Type::INT8, raw)?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN | Type::XML => {
                Value::String(String::from_sql(ty, raw)?)
            }
            Type::DATE => Value::String(date_text(NaiveDate::from_sql(ty, raw)?)),
            Type::TIME => Value::String(time_text(NaiveTime::from_sql(ty, raw)?)),
            Type::TIMESTAMP => Value::String(timestamp_text(NaiveDateTime::from_sql(ty, raw)?)),
            Type::TIMESTAMPTZ => {
                Value::String(timestamptz_text(DateTime::<Utc>::from_sql(ty, raw)?))
            }
            Type::INTERVAL => Value::String(interval_from_sql(raw)?),
            Type::UUID => Value::String(Uuid::from_sql(ty, raw)?.to_string()),
            Type::JSON | Type::JSONB => Value::from_sql(ty, raw)?,
            _ => match ty.kind() {
                Kind::Array(_) => Value::Array(
                    Vec::<JsonValue>::from_sql(ty, raw)?
                        .into_iter()
                        .map(|JsonValue(v)| v)
                        .collect(),
                ),
                Kind::Domain(base) => JsonValue::from_sql(base, raw)?.0,
                Kind::Enum(_) => Value::String(std::str::from_utf8(raw)?.to_owned()),
                _ => {
                    warn!("Unsupported column type {} (oid {})", ty, ty.oid());
                    Value::Null
                }
            },
        };
        Ok(JsonValue(value))
    }

    fn from_sql_null(_: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(JsonValue(Value::Null))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

/// Numerics become JSON numbers when they fit an f64, otherwise their exact text.
pub fn decimal_value(v: Decimal) -> Value {
    v.to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(v.to_string()))
}

/// Money is sent as an integer count of cents.
fn money_value(cents: i64) -> Value {
    decimal_value(Decimal::new(cents, 2))
}

pub fn date_text(v: NaiveDate) -> String {
    v.format("%Y-%m-%d").to_string()
}

pub fn time_text(v: NaiveTime) -> String {
    v.format("%H:%M:%S%.f").to_string()
}

pub fn timestamp_text(v: NaiveDateTime) -> String {
    v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

pub fn timestamptz_text(v: DateTime<Utc>) -> String {
    v.to_rfc3339()
}

fn interval_from_sql(raw: &[u8]) -> Result<String, Box<dyn Error + Sync + Send>> {
    let bytes: &[u8; 16] = raw
        .try_into()
        .map_err(|_| format!("invalid interval length {}", raw.len()))?;
    let (micros, rest) = bytes.split_at(8);
    let (days, months) = rest.split_at(4);
    Ok(interval_text(
        i32::from_be_bytes(months.try_into()?),
        i32::from_be_bytes(days.try_into()?),
        i64::from_be_bytes(micros.try_into()?),
    ))
}

/// Renders an interval the way Postgres prints it with `IntervalStyle = postgres`.
pub fn interval_text(months: i32, days: i32, micros: i64) -> String {
    fn unit(n: i64, singular: &str, plural: &str) -> String {
        format!("{} {}", n, if n.abs() == 1 { singular } else { plural })
    }

    let mut parts = Vec::new();
    let years = i64::from(months / 12);
    let months = i64::from(months % 12);
    if years != 0 {
        parts.push(unit(years, "year", "years"));
    }
    if months != 0 {
        parts.push(unit(months, "mon", "mons"));
    }
    if days != 0 {
        parts.push(unit(i64::from(days), "day", "days"));
    }

    if micros != 0 || parts.is_empty() {
        let sign = if micros < 0 { "-" } else { "" };
        let total = micros.unsigned_abs();
        let secs = total / 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );
        let fraction = total % 1_000_000;
        if fraction != 0 {
            let digits = format!("{:06}", fraction);
            clock.push('.');
            clock.push_str(digits.trim_end_matches('0'));
        }
        parts.push(clock);
    }

    parts.join(" ")
}
