use crate::composite::CompositeValue;
use crate::core::{CompositeError, Result, Value};

/// Anything that can turn a value into a SQL literal.
///
/// Drivers implement this so that composite values are routed through the
/// encoder hooks they have installed.
pub trait LiteralAdapter {
    fn adapt(&self, value: &Value) -> Result<String>;
}

/// Adapter that needs no driver: composites are rendered directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinAdapter;

impl LiteralAdapter for BuiltinAdapter {
    fn adapt(&self, value: &Value) -> Result<String> {
        match value {
            Value::Composite(composite) => adapt_composite(self, composite),
            other => adapt_scalar(other),
        }
    }
}

pub fn sql_escape_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Generic scalar literal encoder.
pub fn adapt_scalar(value: &Value) -> Result<String> {
    let literal = match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => {
            if f.is_nan() {
                "'NaN'::float".to_string()
            } else if f.is_infinite() {
                if *f > 0.0 {
                    "'Infinity'::float".to_string()
                } else {
                    "'-Infinity'::float".to_string()
                }
            } else {
                format!("{:?}", f)
            }
        }
        Value::Text(s) => format!("'{}'", sql_escape_string(s)),
        Value::Boolean(b) => {
            if *b {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        Value::Date(d) => format!("'{}'::date", d.format("%Y-%m-%d")),
        Value::Time(t) => format!("'{}'::time", t.format("%H:%M:%S%.f")),
        Value::Timestamp(ts) => format!("'{}'::timestamptz", ts.to_rfc3339()),
        Value::Uuid(u) => format!("'{}'::uuid", u),
        Value::Composite(composite) => {
            return Err(CompositeError::NotAdaptable(composite.type_name().to_string()));
        }
    };
    Ok(literal)
}

/// Renders a composite value as `(<f1>,<f2>,...)::<type_name>`.
///
/// Fields are emitted in declaration order; the decode side relies on the
/// same positional order. A parenthesized single value is just that value,
/// not a row, so types with fewer than two fields are written with an
/// explicit `ROW(...)` constructor.
pub fn adapt_composite(adapter: &dyn LiteralAdapter, value: &CompositeValue) -> Result<String> {
    let literals = value
        .values()
        .iter()
        .map(|field_value| adapter.adapt(field_value))
        .collect::<Result<Vec<_>>>()?;

    let constructor = if literals.len() < 2 { "ROW" } else { "" };
    Ok(format!(
        "{}({})::{}",
        constructor,
        literals.join(","),
        value.type_name()
    ))
}

/// Splits a record in the database text format into its raw fields.
///
/// `None` marks a NULL field (empty and unquoted). `arity` disambiguates `()`,
/// which is both the zero-field record and a one-field record holding NULL.
pub fn parse_record(text: &str, arity: usize) -> Result<Vec<Option<String>>> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| CompositeError::Decode(format!("malformed record literal: {}", text)))?;

    if inner.is_empty() && arity == 0 {
        return Ok(Vec::new());
    }

    let mut fields = Vec::new();
    let mut chars = inner.chars().peekable();

    loop {
        let mut buf = String::new();
        let mut quoted = false;

        while let Some(&c) = chars.peek() {
            match c {
                ',' => break,
                '"' => {
                    chars.next();
                    quoted = true;
                    loop {
                        match chars.next() {
                            Some('"') => {
                                if chars.peek() == Some(&'"') {
                                    chars.next();
                                    buf.push('"');
                                } else {
                                    break;
                                }
                            }
                            Some('\\') => match chars.next() {
                                Some(escaped) => buf.push(escaped),
                                None => {
                                    return Err(CompositeError::Decode(format!(
                                        "dangling escape in record literal: {}",
                                        text
                                    )));
                                }
                            },
                            Some(other) => buf.push(other),
                            None => {
                                return Err(CompositeError::Decode(format!(
                                    "unterminated quote in record literal: {}",
                                    text
                                )));
                            }
                        }
                    }
                }
                '\\' => {
                    chars.next();
                    match chars.next() {
                        Some(escaped) => buf.push(escaped),
                        None => {
                            return Err(CompositeError::Decode(format!(
                                "dangling escape in record literal: {}",
                                text
                            )));
                        }
                    }
                }
                other => {
                    chars.next();
                    buf.push(other);
                }
            }
        }

        if buf.is_empty() && !quoted {
            fields.push(None);
        } else {
            fields.push(Some(buf));
        }

        if chars.next().is_none() {
            break;
        }
    }

    Ok(fields)
}
