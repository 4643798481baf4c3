//! Conversion between database values and the JSON scalars of a table dump.
//!
//! Dates are written as `YYYY-MM-DD`, date-times as ISO-8601 without offset,
//! uuids in hyphenated form. Everything else maps onto a JSON scalar.

use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{DbErr, QueryResult, Value};
use serde_json::Value as Json;
use uuid::Uuid;

use super::schema::{ColumnDescriptor, ColumnKind};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Read one column of a selected row as a dump value.
pub fn read_column(row: &QueryResult, column: &ColumnDescriptor) -> Result<Json, DbErr> {
    let name = column.name;
    let value = match column.kind {
        ColumnKind::Integer => row.try_get::<Option<i32>>("", name)?.map(Json::from),
        ColumnKind::BigInteger => row.try_get::<Option<i64>>("", name)?.map(Json::from),
        ColumnKind::Double => row.try_get::<Option<f64>>("", name)?.map(Json::from),
        ColumnKind::Boolean => row.try_get::<Option<bool>>("", name)?.map(Json::from),
        ColumnKind::Text => row.try_get::<Option<String>>("", name)?.map(Json::from),
        ColumnKind::Date => row
            .try_get::<Option<NaiveDate>>("", name)?
            .map(|d| Json::from(d.format(DATE_FORMAT).to_string())),
        ColumnKind::DateTime => row
            .try_get::<Option<NaiveDateTime>>("", name)?
            .map(|d| Json::from(d.format(DATETIME_FORMAT).to_string())),
        ColumnKind::Uuid => row
            .try_get::<Option<Uuid>>("", name)?
            .map(|u| Json::from(u.hyphenated().to_string())),
    };
    Ok(value.unwrap_or(Json::Null))
}

/// Parse a dump value back into a typed database value for `kind`.
/// The error is a human-readable reason.
pub fn to_db_value(value: &Json, kind: ColumnKind) -> Result<Value, String> {
    if value.is_null() {
        return Ok(null_of(kind));
    }
    let mismatch = || format!("expected {kind:?}, got {value}");
    let v = match kind {
        ColumnKind::Integer => {
            let n = value.as_i64().ok_or_else(mismatch)?;
            Value::from(i32::try_from(n).map_err(|_| format!("{n} does not fit a 32-bit integer"))?)
        }
        ColumnKind::BigInteger => Value::from(value.as_i64().ok_or_else(mismatch)?),
        ColumnKind::Double => Value::from(value.as_f64().ok_or_else(mismatch)?),
        ColumnKind::Boolean => match value {
            Json::Bool(b) => Value::from(*b),
            // SQLite dumps may carry booleans as 0/1
            Json::Number(n) if n.as_i64() == Some(0) => Value::from(false),
            Json::Number(n) if n.as_i64() == Some(1) => Value::from(true),
            _ => return Err(mismatch()),
        },
        ColumnKind::Text => Value::from(value.as_str().ok_or_else(mismatch)?.to_string()),
        ColumnKind::Date => {
            let s = value.as_str().ok_or_else(mismatch)?;
            Value::from(NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| format!("`{s}`: {e}"))?)
        }
        ColumnKind::DateTime => Value::from(parse_datetime(value.as_str().ok_or_else(mismatch)?)?),
        ColumnKind::Uuid => {
            let s = value.as_str().ok_or_else(mismatch)?;
            Value::from(Uuid::parse_str(s).map_err(|e| format!("`{s}`: {e}"))?)
        }
    };
    Ok(v)
}

fn parse_datetime(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| format!("`{s}`: {e}"))
}

fn null_of(kind: ColumnKind) -> Value {
    match kind {
        ColumnKind::Integer => Value::from(None::<i32>),
        ColumnKind::BigInteger => Value::from(None::<i64>),
        ColumnKind::Double => Value::from(None::<f64>),
        ColumnKind::Boolean => Value::from(None::<bool>),
        ColumnKind::Text => Value::from(None::<String>),
        ColumnKind::Date => Value::from(None::<NaiveDate>),
        ColumnKind::DateTime => Value::from(None::<NaiveDateTime>),
        ColumnKind::Uuid => Value::from(None::<Uuid>),
    }
}
