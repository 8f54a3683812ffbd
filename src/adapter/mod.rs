//! Scalar adapter: SQL literals for field values, and the mapping between
//! typed Rust scalars and [`Value`].

mod literal;

pub use literal::{
    BuiltinAdapter, LiteralAdapter, adapt_composite, adapt_scalar, parse_record,
    sql_escape_string,
};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::core::{CompositeError, DataType, Result, Value};

/// A Rust type that can be stored in a composite field.
///
/// Implemented for the scalar types a derived composite may use as fields.
pub trait CompositeScalar: Sized {
    /// Whether a NULL is acceptable for the field.
    const NULLABLE: bool = false;

    fn data_type() -> DataType;

    /// Value used when a constructor supplies nothing for the field.
    /// `None` makes the field required.
    fn default_value() -> Option<Value> {
        None
    }

    fn into_value(self) -> Value;

    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch(expected: &DataType, got: &Value) -> CompositeError {
    CompositeError::TypeMismatch(format!("expected {}, got {}", expected, got.type_name()))
}

impl CompositeScalar for i64 {
    fn data_type() -> DataType {
        DataType::Integer
    }

    fn default_value() -> Option<Value> {
        Some(Value::Integer(0))
    }

    fn into_value(self) -> Value {
        Value::Integer(self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch(&DataType::Integer, value))
    }
}

impl CompositeScalar for i32 {
    fn data_type() -> DataType {
        DataType::Integer
    }

    fn default_value() -> Option<Value> {
        Some(Value::Integer(0))
    }

    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }

    fn from_value(value: &Value) -> Result<Self> {
        let wide = value.as_i64().ok_or_else(|| mismatch(&DataType::Integer, value))?;
        i32::try_from(wide).map_err(|_| {
            CompositeError::TypeMismatch(format!("integer {} does not fit in i32", wide))
        })
    }
}

impl CompositeScalar for f64 {
    fn data_type() -> DataType {
        DataType::Float
    }

    fn default_value() -> Option<Value> {
        Some(Value::Float(0.0))
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch(&DataType::Float, value))
    }
}

impl CompositeScalar for bool {
    fn data_type() -> DataType {
        DataType::Boolean
    }

    fn default_value() -> Option<Value> {
        Some(Value::Boolean(false))
    }

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch(&DataType::Boolean, value))
    }
}

impl CompositeScalar for String {
    fn data_type() -> DataType {
        DataType::Text
    }

    fn default_value() -> Option<Value> {
        Some(Value::Text(String::new()))
    }

    fn into_value(self) -> Value {
        Value::Text(self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(&DataType::Text, value))
    }
}

impl CompositeScalar for NaiveDate {
    fn data_type() -> DataType {
        DataType::Date
    }

    fn into_value(self) -> Value {
        Value::Date(self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            other => Err(mismatch(&DataType::Date, other)),
        }
    }
}

impl CompositeScalar for NaiveTime {
    fn data_type() -> DataType {
        DataType::Time
    }

    fn into_value(self) -> Value {
        Value::Time(self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Time(t) => Ok(*t),
            other => Err(mismatch(&DataType::Time, other)),
        }
    }
}

impl CompositeScalar for DateTime<Utc> {
    fn data_type() -> DataType {
        DataType::Timestamp
    }

    fn into_value(self) -> Value {
        Value::Timestamp(self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            other => Err(mismatch(&DataType::Timestamp, other)),
        }
    }
}

impl CompositeScalar for Uuid {
    fn data_type() -> DataType {
        DataType::Uuid
    }

    fn into_value(self) -> Value {
        Value::Uuid(self)
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            other => Err(mismatch(&DataType::Uuid, other)),
        }
    }
}

impl<T: CompositeScalar> CompositeScalar for Option<T> {
    const NULLABLE: bool = true;

    fn data_type() -> DataType {
        T::data_type()
    }

    fn default_value() -> Option<Value> {
        Some(Value::Null)
    }

    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }
}
