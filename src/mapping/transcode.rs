//! Conversion between model values and storage scalars.
//!
//! Writes go through [`to_storage_value`], which reduces a runtime value to
//! one of the scalars a storage engine binds. Reads go through
//! [`from_storage_value`], which accepts whatever the engine hands back
//! (booleans as `0/1`, numbers as text, dates as text or unix seconds) and
//! produces the canonical runtime value for the declared type.

use crate::core::{DATE_TIME_FORMAT, DbError, Result, TypeTag, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn mismatch(expected: &str, value: &Value) -> DbError {
    DbError::CoercionError(format!(
        "cannot read {} value '{}' as {}",
        value.type_name(),
        value,
        expected
    ))
}

pub fn coerce_integer(value: &Value) -> Result<i64> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Boolean(b) => Ok(i64::from(*b)),
        Value::Real(_) => value.as_i64().ok_or_else(|| mismatch("integer", value)),
        Value::Text(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(i);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(|f| Value::Real(f).as_i64())
                .ok_or_else(|| mismatch("integer", value))
        }
        _ => Err(mismatch("integer", value)),
    }
}

pub fn coerce_real(value: &Value) -> Result<f64> {
    match value {
        Value::Real(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Text(s) => s.trim().parse::<f64>().map_err(|_| mismatch("real", value)),
        _ => Err(mismatch("real", value)),
    }
}

pub fn coerce_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Integer(i) => Ok(*i != 0),
        Value::Real(f) => Ok(*f != 0.0 && !f.is_nan()),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            _ => Err(mismatch("boolean", value)),
        },
        _ => Err(mismatch("boolean", value)),
    }
}

pub fn coerce_text(value: &Value) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s.clone()),
        Value::Integer(_) | Value::Real(_) | Value::Boolean(_) | Value::Date(_) => {
            Ok(value.to_string())
        }
        _ => Err(mismatch("text", value)),
    }
}

pub fn coerce_date(value: &Value) -> Result<NaiveDateTime> {
    match value {
        Value::Date(d) => Ok(*d),
        Value::Integer(secs) => DateTime::from_timestamp(*secs, 0)
            .map(|d| d.naive_utc())
            .ok_or_else(|| mismatch("date", value)),
        Value::Real(secs) => {
            let whole = secs.trunc() as i64;
            let nanos = (secs.fract().abs() * 1e9) as u32;
            DateTime::from_timestamp(whole, nanos)
                .map(|d| d.naive_utc())
                .ok_or_else(|| mismatch("date", value))
        }
        Value::Text(s) => parse_date_text(s.trim()).ok_or_else(|| mismatch("date", value)),
        _ => Err(mismatch("date", value)),
    }
}

/// Reads a `u64` stored as the bits of an `i64`. Decimal text above
/// `i64::MAX` is accepted so callers can name such values in conditions.
pub fn coerce_unsigned_bits(value: &Value) -> Result<u64> {
    if let Value::Text(text) = value {
        if let Ok(parsed) = text.trim().parse::<u64>() {
            return Ok(parsed);
        }
    }
    coerce_integer(value).map(|i| i as u64)
}

fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    for format in [DATE_TIME_FORMAT, "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Reduces a runtime value to a storage scalar for a field of type `tag`.
pub fn to_storage_value(tag: &TypeTag, value: &Value) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match tag {
        TypeTag::Optional(inner) => to_storage_value(inner, value),
        TypeTag::Bool => coerce_bool(value).map(Value::Boolean),
        TypeTag::U64 | TypeTag::Usize => {
            coerce_unsigned_bits(value).map(|bits| Value::Integer(bits as i64))
        }
        t if t.is_integer() => coerce_integer(value).map(Value::Integer),
        TypeTag::F32 | TypeTag::F64 => coerce_real(value).map(Value::Real),
        TypeTag::Text | TypeTag::Uuid => coerce_text(value).map(Value::Text),
        TypeTag::Date => {
            coerce_date(value).map(|d| Value::Text(d.format(DATE_FORMAT).to_string()))
        }
        TypeTag::DateTime | TypeTag::DateTimeUtc => {
            coerce_date(value).map(|d| Value::Text(d.format(DATE_TIME_FORMAT).to_string()))
        }
        TypeTag::List(element) => {
            let Value::List(items) = value else {
                return Err(mismatch("list", value));
            };
            let encoded = items
                .iter()
                .map(|item| to_storage_value(element, item).map(|v| v.to_json()))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Text(serde_json::Value::Array(encoded).to_string()))
        }
        TypeTag::Composite(name) => Err(DbError::CoercionError(format!(
            "composite {} is flattened into columns and has no scalar form",
            name
        ))),
        TypeTag::Opaque(name) => {
            if value.is_scalar() {
                Ok(value.clone())
            } else {
                Err(DbError::CoercionError(format!(
                    "{} produced a non-scalar {} value",
                    name,
                    value.type_name()
                )))
            }
        }
        _ => Err(mismatch(&tag.to_string(), value)),
    }
}

/// Converts a stored scalar back to the canonical runtime value for `tag`.
pub fn from_storage_value(tag: &TypeTag, stored: &Value) -> Result<Value> {
    if stored.is_null() {
        return Ok(Value::Null);
    }
    match tag {
        TypeTag::Optional(inner) => from_storage_value(inner, stored),
        TypeTag::Bool => coerce_bool(stored).map(Value::Boolean),
        TypeTag::U64 | TypeTag::Usize => {
            coerce_unsigned_bits(stored).map(|bits| Value::Integer(bits as i64))
        }
        t if t.is_integer() => coerce_integer(stored).map(Value::Integer),
        TypeTag::F32 | TypeTag::F64 => coerce_real(stored).map(Value::Real),
        TypeTag::Text | TypeTag::Uuid => coerce_text(stored).map(Value::Text),
        TypeTag::Date | TypeTag::DateTime | TypeTag::DateTimeUtc => {
            coerce_date(stored).map(Value::Date)
        }
        TypeTag::List(element) => {
            let items = match stored {
                Value::List(items) => items.clone(),
                Value::Text(text) => match serde_json::from_str::<serde_json::Value>(text)? {
                    serde_json::Value::Array(items) => items.iter().map(Value::from_json).collect(),
                    _ => return Err(mismatch("list", stored)),
                },
                _ => return Err(mismatch("list", stored)),
            };
            items
                .iter()
                .map(|item| from_storage_value(element, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List)
        }
        TypeTag::Composite(name) => Err(DbError::CoercionError(format!(
            "composite {} cannot be read from a single column",
            name
        ))),
        TypeTag::Opaque(_) => Ok(stored.clone()),
        _ => Err(mismatch(&tag.to_string(), stored)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_coercion_both_ways() {
        assert_eq!(coerce_bool(&Value::Text("TRUE".into())).unwrap(), true);
        assert_eq!(coerce_bool(&Value::Text("0".into())).unwrap(), false);
        assert_eq!(coerce_bool(&Value::Integer(1)).unwrap(), true);
        assert!(coerce_bool(&Value::Text("maybe".into())).is_err());

        let stored = from_storage_value(&TypeTag::Bool, &Value::Integer(0)).unwrap();
        assert_eq!(stored, Value::Boolean(false));
    }

    #[test]
    fn test_numeric_text_coercion() {
        assert_eq!(coerce_integer(&Value::Text(" 42 ".into())).unwrap(), 42);
        assert_eq!(coerce_integer(&Value::Text("7.0".into())).unwrap(), 7);
        assert!(coerce_integer(&Value::Text("7.5".into())).is_err());
        assert_eq!(coerce_real(&Value::Text("2.5".into())).unwrap(), 2.5);
        assert_eq!(
            to_storage_value(&TypeTag::Text, &Value::Integer(9)).unwrap(),
            Value::Text("9".into())
        );
    }

    #[test]
    fn test_integers_past_i64_fail_instead_of_saturating() {
        assert!(coerce_integer(&Value::Real(9_223_372_036_854_775_808.0)).is_err());
        assert!(coerce_integer(&Value::Text("9223372036854775808".into())).is_err());
        assert!(from_storage_value(&TypeTag::I64, &Value::Real(1.8e19)).is_err());
        assert_eq!(
            coerce_integer(&Value::Real(-9_223_372_036_854_775_808.0)).unwrap(),
            i64::MIN
        );
    }

    #[test]
    fn test_wide_unsigned_columns_store_bits() {
        let stored =
            to_storage_value(&TypeTag::U64, &Value::Text("18446744073709551615".into())).unwrap();
        assert_eq!(stored, Value::Integer(-1));
        assert_eq!(
            from_storage_value(&TypeTag::U64, &Value::Integer(i64::MIN)).unwrap(),
            Value::Integer(i64::MIN)
        );
        assert_eq!(
            to_storage_value(&TypeTag::I64, &Value::Integer(-1)).unwrap(),
            Value::Integer(-1)
        );
    }

    #[test]
    fn test_dates_round_trip_through_text() {
        let date = NaiveDate::from_ymd_opt(2019, 4, 8)
            .unwrap()
            .and_hms_milli_opt(10, 30, 0, 250)
            .unwrap();
        let stored = to_storage_value(&TypeTag::DateTime, &Value::Date(date)).unwrap();
        assert_eq!(stored, Value::Text("2019-04-08 10:30:00.250".into()));
        assert_eq!(
            from_storage_value(&TypeTag::DateTime, &stored).unwrap(),
            Value::Date(date)
        );

        let midnight =
            from_storage_value(&TypeTag::Date, &Value::Text("2019-04-08".into())).unwrap();
        assert_eq!(midnight, Value::Date(date.date().and_hms_opt(0, 0, 0).unwrap()));
    }

    #[test]
    fn test_lists_are_json_text() {
        let tag = TypeTag::list(TypeTag::Bool);
        let flags = Value::List(vec![Value::Boolean(true), Value::Boolean(false)]);
        let stored = to_storage_value(&tag, &flags).unwrap();
        assert_eq!(stored, Value::Text("[true,false]".into()));

        let read = from_storage_value(&tag, &Value::Text("[1, \"false\"]".into())).unwrap();
        assert_eq!(read, Value::List(vec![Value::Boolean(true), Value::Boolean(false)]));
    }

    #[test]
    fn test_failures_are_reported_not_panicked() {
        let err = from_storage_value(&TypeTag::I64, &Value::Text("abc".into())).unwrap_err();
        assert!(matches!(err, DbError::CoercionError(_)));
        assert!(to_storage_value(&TypeTag::Composite("Address"), &Value::Integer(1)).is_err());
        assert_eq!(
            from_storage_value(&TypeTag::optional(TypeTag::I64), &Value::Null).unwrap(),
            Value::Null
        );
    }
}
