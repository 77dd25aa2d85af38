//! Semantic column types.
//!
//! A `SqlType` is attached to every bound parameter. Binding converts the
//! in-memory `Value` into the representation the column expects, so a join
//! column referencing a UUID primary key is bound as a UUID and not as
//! whatever happened to be stored on the owning side.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConversionError, Error, Result};
use crate::value::Value;

/// Declared SQL type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Double,
    Decimal { precision: u8, scale: u8 },
    Text,
    VarChar(u32),
    Blob,
    Timestamp,
    Uuid,
    Json,
}

impl SqlType {
    /// The SQL spelling of this type.
    #[must_use]
    pub fn sql_name(&self) -> String {
        match self {
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Decimal { precision, scale } => format!("DECIMAL({precision}, {scale})"),
            SqlType::Text => "TEXT".to_string(),
            SqlType::VarChar(len) => format!("VARCHAR({len})"),
            SqlType::Blob => "BLOB".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Json => "JSON".to_string(),
        }
    }

    /// Whether the type holds integers.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, SqlType::SmallInt | SqlType::Integer | SqlType::BigInt)
    }

    /// Convert an in-memory value to the representation bound for this type.
    ///
    /// NULL passes through for every type; nullability is the database's job.
    pub fn to_database_value(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        let converted = match (self, value) {
            (SqlType::Boolean, Value::Bool(b)) => Some(Value::Bool(*b)),
            (SqlType::Boolean, v) => match v.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            (SqlType::SmallInt, v) => v
                .as_i64()
                .and_then(|i| i16::try_from(i).ok())
                .map(Value::SmallInt),
            (SqlType::Integer, v) => v
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(Value::Int),
            (SqlType::BigInt, v) => v.as_i64().map(Value::BigInt),
            (SqlType::Double, Value::Double(f)) => Some(Value::Double(*f)),
            #[allow(clippy::cast_precision_loss)]
            (SqlType::Double, v) => v.as_i64().map(|i| Value::Double(i as f64)),
            (SqlType::Decimal { .. }, Value::Decimal(s) | Value::Text(s)) => {
                Some(Value::Decimal(s.clone()))
            }
            (SqlType::Decimal { .. }, Value::Double(f)) => Some(Value::Decimal(f.to_string())),
            (SqlType::Decimal { .. }, v) => v.as_i64().map(|i| Value::Decimal(i.to_string())),
            (SqlType::Text, Value::Text(s)) => Some(Value::Text(s.clone())),
            (SqlType::VarChar(len), Value::Text(s)) => {
                if s.chars().count() > *len as usize {
                    return Err(conversion_error(self, value, "value exceeds column length"));
                }
                Some(Value::Text(s.clone()))
            }
            (SqlType::Blob, Value::Bytes(b)) => Some(Value::Bytes(b.clone())),
            (SqlType::Timestamp, Value::Timestamp(ts) | Value::BigInt(ts)) => {
                Some(Value::Timestamp(*ts))
            }
            (SqlType::Uuid, Value::Uuid(u)) => Some(Value::Uuid(*u)),
            (SqlType::Uuid, Value::Text(s)) => {
                let parsed = Uuid::parse_str(s)
                    .map_err(|e| conversion_error(self, value, &e.to_string()))?;
                Some(Value::Uuid(*parsed.as_bytes()))
            }
            (SqlType::Uuid, Value::Bytes(b)) => {
                let parsed = Uuid::from_slice(b)
                    .map_err(|e| conversion_error(self, value, &e.to_string()))?;
                Some(Value::Uuid(*parsed.as_bytes()))
            }
            (SqlType::Json, Value::Json(j)) => Some(Value::Json(j.clone())),
            (SqlType::Json, Value::Text(s)) => {
                let parsed = serde_json::from_str(s)
                    .map_err(|e| conversion_error(self, value, &e.to_string()))?;
                Some(Value::Json(parsed))
            }
            _ => None,
        };

        converted.ok_or_else(|| conversion_error(self, value, "incompatible value"))
    }
}

fn conversion_error(sql_type: &SqlType, value: &Value, message: &str) -> Error {
    Error::Conversion(ConversionError {
        expected: sql_type.sql_name(),
        found: value.kind_name(),
        message: message.to_string(),
    })
}
