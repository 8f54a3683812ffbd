use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use uuid::Uuid;

use crate::composite::CompositeValue;
use crate::core::{CompositeError, Result};

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Composite(CompositeValue),
}

impl Value {
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::Date(_) => "DATE",
            Self::Time(_) => "TIME",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::Uuid(_) => "UUID",
            Self::Composite(value) => value.type_name(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeValue> {
        match self {
            Self::Composite(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                a == b || (a - b).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::Timestamp(a), Self::Timestamp(b)) => a == b,
            (Self::Uuid(a), Self::Uuid(b)) => a == b,
            (Self::Composite(a), Self::Composite(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                (*i as f64 - f).abs() < f64::EPSILON
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => {
                if fl.is_nan() {
                    write!(f, "NaN")
                } else if fl.is_infinite() {
                    if *fl > 0.0 {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else {
                    write!(f, "{}", fl)
                }
            }
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Uuid(u) => write!(f, "{}", u),
            Self::Composite(value) => {
                let rendered = value
                    .values()
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "{}({})", value.type_name(), rendered)
            }
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Self::Time(t)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<CompositeValue> for Value {
    fn from(value: CompositeValue) -> Self {
        Self::Composite(value)
    }
}

/// Column type of a composite field, as the database sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Date,
    Time,
    Timestamp,
    Uuid,
    /// A nested composite, by database type name.
    Composite(String),
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Self::Integer, Value::Integer(_)) => true,
            (Self::Float, Value::Float(_)) => true,
            (Self::Float, Value::Integer(_)) => true,
            (Self::Text, Value::Text(_)) => true,
            (Self::Boolean, Value::Boolean(_)) => true,
            (Self::Date, Value::Date(_)) => true,
            (Self::Time, Value::Time(_)) => true,
            (Self::Timestamp, Value::Timestamp(_)) => true,
            (Self::Uuid, Value::Uuid(_)) => true,
            (Self::Composite(name), Value::Composite(value)) => name == value.type_name(),
            _ => false,
        }
    }

    /// Maps a SQL type name (as written in `CREATE TYPE`) to a data type.
    ///
    /// Unknown names are treated as references to other composite types; the
    /// caller decides whether such a type exists.
    pub fn from_sql_name(name: &str) -> Self {
        let normalized = name.trim().to_ascii_lowercase();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
        let base = normalized.split('(').next().unwrap_or("").trim();
        match base {
            "integer" | "int" | "int2" | "int4" | "int8" | "bigint" | "smallint" | "serial"
            | "bigserial" => Self::Integer,
            "real" | "float" | "float4" | "float8" | "double precision" | "numeric"
            | "decimal" => Self::Float,
            "text" | "varchar" | "character varying" | "char" | "character" | "name" => Self::Text,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "time" | "time without time zone" => Self::Time,
            "timestamp" | "timestamptz" | "timestamp with time zone"
            | "timestamp without time zone" => Self::Timestamp,
            "uuid" => Self::Uuid,
            other => Self::Composite(other.to_string()),
        }
    }

    /// Parses one field of a database record in text form.
    pub fn decode_text(&self, text: &str) -> Result<Value> {
        let mismatch = || {
            CompositeError::Decode(format!("cannot decode '{}' as {}", text, self))
        };

        match self {
            Self::Integer => text.trim().parse::<i64>().map(Value::Integer).map_err(|_| mismatch()),
            Self::Float => match text.trim() {
                "NaN" => Ok(Value::Float(f64::NAN)),
                "Infinity" => Ok(Value::Float(f64::INFINITY)),
                "-Infinity" => Ok(Value::Float(f64::NEG_INFINITY)),
                other => other.parse::<f64>().map(Value::Float).map_err(|_| mismatch()),
            },
            Self::Text => Ok(Value::Text(text.to_string())),
            Self::Boolean => match text.trim() {
                "t" | "true" | "TRUE" => Ok(Value::Boolean(true)),
                "f" | "false" | "FALSE" => Ok(Value::Boolean(false)),
                _ => Err(mismatch()),
            },
            Self::Date => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|_| mismatch()),
            Self::Time => NaiveTime::parse_from_str(text.trim(), "%H:%M:%S%.f")
                .map(Value::Time)
                .map_err(|_| mismatch()),
            Self::Timestamp => {
                let trimmed = text.trim();
                if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
                    return Ok(Value::Timestamp(ts.with_timezone(&Utc)));
                }
                if let Ok(ts) = DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%#z") {
                    return Ok(Value::Timestamp(ts.with_timezone(&Utc)));
                }
                NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
                    .map(|naive| Value::Timestamp(naive.and_utc()))
                    .map_err(|_| mismatch())
            }
            Self::Uuid => Uuid::parse_str(text.trim()).map(Value::Uuid).map_err(|_| mismatch()),
            Self::Composite(name) => Err(CompositeError::Decode(format!(
                "nested composite '{}' must be decoded through its registered caster",
                name
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "BIGINT"),
            Self::Float => write!(f, "DOUBLE PRECISION"),
            Self::Text => write!(f, "TEXT"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Date => write!(f, "DATE"),
            Self::Time => write!(f, "TIME"),
            Self::Timestamp => write!(f, "TIMESTAMPTZ"),
            Self::Uuid => write!(f, "UUID"),
            Self::Composite(name) => write!(f, "{}", name),
        }
    }
}
