use crate::core::{Affinity, TypeTag};
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref STANDARD_COLUMN_TYPES: ColumnTypeRegistry = ColumnTypeRegistry::standard();
}

/// Maps scalar field types to column affinities. Types with no entry are
/// not persisted.
#[derive(Debug, Clone)]
pub struct ColumnTypeRegistry {
    affinities: HashMap<TypeTag, Affinity>,
}

impl ColumnTypeRegistry {
    pub fn empty() -> Self {
        Self {
            affinities: HashMap::new(),
        }
    }

    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(TypeTag::Text, Affinity::Text);
        registry.register(TypeTag::Uuid, Affinity::Text);
        for tag in [
            TypeTag::I8,
            TypeTag::I16,
            TypeTag::I32,
            TypeTag::I64,
            TypeTag::Isize,
            TypeTag::U8,
            TypeTag::U16,
            TypeTag::U32,
            TypeTag::U64,
            TypeTag::Usize,
        ] {
            registry.register(tag, Affinity::Integer);
        }
        registry.register(TypeTag::F64, Affinity::Double);
        registry.register(TypeTag::F32, Affinity::Float);
        registry.register(TypeTag::Bool, Affinity::Boolean);
        registry.register(TypeTag::Date, Affinity::Date);
        registry.register(TypeTag::DateTime, Affinity::Date);
        registry.register(TypeTag::DateTimeUtc, Affinity::Date);
        registry
    }

    /// Shared copy of the standard table.
    pub fn global() -> &'static ColumnTypeRegistry {
        &STANDARD_COLUMN_TYPES
    }

    /// Adds or replaces the affinity of a scalar or opaque type.
    pub fn register(&mut self, tag: TypeTag, affinity: Affinity) -> &mut Self {
        self.affinities.insert(tag, affinity);
        self
    }

    /// Column affinity for a declared field type.
    ///
    /// One `Option` layer is unwrapped first. Lists are stored as JSON text
    /// when their element type has a column affinity.
    pub fn affinity_for(&self, tag: &TypeTag) -> Option<Affinity> {
        match tag.unwrap_optional() {
            TypeTag::Composite(_) | TypeTag::Optional(_) => None,
            TypeTag::List(element) => self.affinity_for(element).map(|_| Affinity::Text),
            scalar => self.affinities.get(scalar).copied(),
        }
    }

    pub fn is_persistable(&self, tag: &TypeTag) -> bool {
        self.affinity_for(tag).is_some()
    }
}

impl Default for ColumnTypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
