use super::transcode::{
    coerce_bool, coerce_date, coerce_integer, coerce_real, coerce_text, coerce_unsigned_bits,
};
use super::{FieldKind, FieldValue, TypeDescriptor};
use crate::core::{DbError, Result, TypeTag, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

macro_rules! integer_field_kind {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl FieldKind for $ty {
                fn type_tag() -> TypeTag {
                    TypeTag::$tag
                }

                fn to_value(&self) -> FieldValue {
                    FieldValue::Present(Value::Integer(i64::from(*self)))
                }

                fn from_value(value: &Value) -> Result<Self> {
                    let wide = coerce_integer(value)?;
                    <$ty>::try_from(wide).map_err(|_| {
                        DbError::CoercionError(format!(
                            "{} is out of range for {}",
                            wide,
                            stringify!($ty)
                        ))
                    })
                }
            }
        )*
    };
}

integer_field_kind!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
);

/// `u64` and `usize` are stored as the two's complement bits of an `i64`,
/// so every value keeps its exact bits in an INTEGER column.
macro_rules! wide_unsigned_field_kind {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl FieldKind for $ty {
                fn type_tag() -> TypeTag {
                    TypeTag::$tag
                }

                fn to_value(&self) -> FieldValue {
                    FieldValue::Present(Value::Integer(*self as u64 as i64))
                }

                fn from_value(value: &Value) -> Result<Self> {
                    let bits = coerce_unsigned_bits(value)?;
                    <$ty>::try_from(bits).map_err(|_| {
                        DbError::CoercionError(format!(
                            "{} is out of range for {}",
                            bits,
                            stringify!($ty)
                        ))
                    })
                }
            }
        )*
    };
}

wide_unsigned_field_kind!(
    u64 => U64,
    usize => Usize,
);

impl FieldKind for isize {
    fn type_tag() -> TypeTag {
        TypeTag::Isize
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Present(Value::Integer(*self as i64))
    }

    fn from_value(value: &Value) -> Result<Self> {
        let wide = coerce_integer(value)?;
        isize::try_from(wide)
            .map_err(|_| DbError::CoercionError(format!("{} is out of range for isize", wide)))
    }
}

impl FieldKind for f64 {
    fn type_tag() -> TypeTag {
        TypeTag::F64
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Present(Value::Real(*self))
    }

    fn from_value(value: &Value) -> Result<Self> {
        coerce_real(value)
    }
}

impl FieldKind for f32 {
    fn type_tag() -> TypeTag {
        TypeTag::F32
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Present(Value::Real(*self as f64))
    }

    fn from_value(value: &Value) -> Result<Self> {
        coerce_real(value).map(|v| v as f32)
    }
}

impl FieldKind for bool {
    fn type_tag() -> TypeTag {
        TypeTag::Bool
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Present(Value::Boolean(*self))
    }

    fn from_value(value: &Value) -> Result<Self> {
        coerce_bool(value)
    }
}

impl FieldKind for String {
    fn type_tag() -> TypeTag {
        TypeTag::Text
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Present(Value::Text(self.clone()))
    }

    fn from_value(value: &Value) -> Result<Self> {
        coerce_text(value)
    }
}

impl FieldKind for Uuid {
    fn type_tag() -> TypeTag {
        TypeTag::Uuid
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Present(Value::Text(self.to_string()))
    }

    fn from_value(value: &Value) -> Result<Self> {
        let text = coerce_text(value)?;
        Uuid::parse_str(&text).map_err(|err| DbError::CoercionError(err.to_string()))
    }
}

impl FieldKind for NaiveDateTime {
    fn type_tag() -> TypeTag {
        TypeTag::DateTime
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Present(Value::Date(*self))
    }

    fn from_value(value: &Value) -> Result<Self> {
        coerce_date(value)
    }
}

impl FieldKind for NaiveDate {
    fn type_tag() -> TypeTag {
        TypeTag::Date
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Present(Value::Date(self.and_time(chrono::NaiveTime::MIN)))
    }

    fn from_value(value: &Value) -> Result<Self> {
        coerce_date(value).map(|d| d.date())
    }
}

impl FieldKind for DateTime<Utc> {
    fn type_tag() -> TypeTag {
        TypeTag::DateTimeUtc
    }

    fn to_value(&self) -> FieldValue {
        FieldValue::Present(Value::Date(self.naive_utc()))
    }

    fn from_value(value: &Value) -> Result<Self> {
        coerce_date(value).map(|d| d.and_utc())
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Map(map) => map.values().all(is_blank),
        _ => false,
    }
}

/// `None` is stored as NULL columns. An optional composite whose own
/// fields are all empty is stored the same way, so `Some(inner)` with every
/// column NULL reads back as `None`.
impl<T: FieldKind> FieldKind for Option<T> {
    fn type_tag() -> TypeTag {
        TypeTag::optional(T::type_tag())
    }

    fn to_value(&self) -> FieldValue {
        match self {
            Some(value) => value.to_value(),
            None => FieldValue::Null,
        }
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            // an optional composite whose columns were all empty
            Value::Map(map) if map.values().all(is_blank) => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn describe_nested(&self) -> Option<Vec<TypeDescriptor>> {
        match self {
            Some(value) => value.describe_nested(),
            None => T::blank_nested(),
        }
    }

    fn blank_nested() -> Option<Vec<TypeDescriptor>> {
        T::blank_nested()
    }
}

impl<T: FieldKind> FieldKind for Vec<T> {
    fn type_tag() -> TypeTag {
        TypeTag::list(T::type_tag())
    }

    fn to_value(&self) -> FieldValue {
        let items = self
            .iter()
            .map(|item| match item.to_value() {
                FieldValue::Present(value) => value,
                FieldValue::Null | FieldValue::Absent => Value::Null,
            })
            .collect();
        FieldValue::Present(Value::List(items))
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => Err(DbError::CoercionError(format!(
                "expected a list, got {}",
                other.type_name()
            ))),
        }
    }
}
