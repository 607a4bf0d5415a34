use serde::Serialize;
use std::fmt;

/// Declared type of a model field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeTag {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Text,
    Date,
    DateTime,
    DateTimeUtc,
    Uuid,
    Optional(Box<TypeTag>),
    List(Box<TypeTag>),
    /// A nested mappable struct, flattened into namespaced columns.
    Composite(&'static str),
    /// A caller type with no built-in column mapping.
    Opaque(&'static str),
}

impl TypeTag {
    pub fn optional(inner: TypeTag) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn list(element: TypeTag) -> Self {
        Self::List(Box::new(element))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Strips exactly one `Optional` layer.
    pub fn unwrap_optional(&self) -> &TypeTag {
        match self {
            Self::Optional(inner) => inner,
            other => other,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.unwrap_optional(), Self::Composite(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::Isize
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::Usize
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::I8 => write!(f, "i8"),
            Self::I16 => write!(f, "i16"),
            Self::I32 => write!(f, "i32"),
            Self::I64 => write!(f, "i64"),
            Self::Isize => write!(f, "isize"),
            Self::U8 => write!(f, "u8"),
            Self::U16 => write!(f, "u16"),
            Self::U32 => write!(f, "u32"),
            Self::U64 => write!(f, "u64"),
            Self::Usize => write!(f, "usize"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
            Self::Text => write!(f, "String"),
            Self::Date => write!(f, "NaiveDate"),
            Self::DateTime => write!(f, "NaiveDateTime"),
            Self::DateTimeUtc => write!(f, "DateTime<Utc>"),
            Self::Uuid => write!(f, "Uuid"),
            Self::Optional(inner) => write!(f, "Option<{}>", inner),
            Self::List(inner) => write!(f, "Vec<{}>", inner),
            Self::Composite(name) | Self::Opaque(name) => write!(f, "{}", name),
        }
    }
}

/// Column affinity as it appears in `CREATE TABLE` text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Affinity {
    Text,
    Integer,
    Double,
    Float,
    Boolean,
    Date,
}

impl Affinity {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Double => "DOUBLE",
            Self::Float => "FLOAT",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
        }
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}
