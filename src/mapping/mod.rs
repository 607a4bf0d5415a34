//! Attribute resolution: from a mappable value to a flat, typed column list
//! and back.

use crate::core::{DbError, Result, TypeTag, Value};
use log::warn;
use std::collections::BTreeMap;

pub mod affinity;
pub mod attribute;
pub mod descriptor;
pub mod field_kind;
pub mod introspect;
pub mod keys;
pub mod resolver;
pub mod transcode;

pub use affinity::ColumnTypeRegistry;
pub use attribute::{Attribute, AttributeList, BoundValue};
pub use descriptor::{FieldId, FieldValue, TypeDescriptor};
pub use introspect::{IntrospectedField, introspect, root_fields};
pub use keys::KeyRegistry;
pub use resolver::{AttributeResolver, flatten, unflatten};

/// Joins a composite field name to its children's names in flat keys.
pub const CONNECTOR: &str = "$_";

/// Version tag used when a type does not declare one.
pub const DEFAULT_VERSION: &str = "A0";

/// A field type that can live in a model: a scalar, an optional, a list,
/// or a nested mappable struct.
pub trait FieldKind: Sized {
    fn type_tag() -> TypeTag;

    fn to_value(&self) -> FieldValue;

    fn from_value(value: &Value) -> Result<Self>;

    /// Field descriptors of a composite value, `None` for terminal fields.
    fn describe_nested(&self) -> Option<Vec<TypeDescriptor>> {
        None
    }

    /// Structure of a composite type when no instance is at hand.
    fn blank_nested() -> Option<Vec<TypeDescriptor>> {
        None
    }
}

/// A struct that maps onto one logical table.
///
/// Usually implemented with `#[derive(Mappable)]`. `Default` is the
/// zero-argument constructor used to inspect structure.
pub trait Mappable: Default + 'static {
    fn type_name() -> &'static str;

    /// Short tag baked into the table name; bump it when the structure changes.
    fn database_version() -> &'static str {
        DEFAULT_VERSION
    }

    fn is_public_database() -> bool {
        false
    }

    fn table_name() -> String {
        logical_table_name(Self::type_name(), Self::database_version())
    }

    /// Own fields in declaration order, embedded ancestors included.
    fn describe(&self) -> Vec<TypeDescriptor>;

    /// Marks primary, unique and excluded fields.
    fn declare_keys(&self, _keys: &mut KeyRegistry) {}

    fn to_value_map(&self) -> BTreeMap<String, Value>;

    /// Rebuilds an instance from a nested value map. Missing or unreadable
    /// fields keep their default.
    fn from_value_map(map: &BTreeMap<String, Value>) -> Self;
}

pub fn logical_table_name(type_name: &str, version: &str) -> String {
    format!("{}_{}", type_name.to_lowercase(), version)
}

/// Stores a field into a value map, skipping absent values.
pub fn write_field<F: FieldKind>(map: &mut BTreeMap<String, Value>, name: &str, value: &F) {
    match value.to_value() {
        FieldValue::Present(value) => {
            map.insert(name.to_string(), value);
        }
        FieldValue::Null => {
            map.insert(name.to_string(), Value::Null);
        }
        FieldValue::Absent => {}
    }
}

/// Reads a field from a value map. A value that cannot be converted leaves
/// the slot untouched so one bad column does not fail the whole row.
pub fn read_field<F: FieldKind>(
    slot: &mut F,
    map: &BTreeMap<String, Value>,
    owner: &str,
    name: &str,
) {
    let Some(value) = map.get(name) else {
        return;
    };
    match F::from_value(value) {
        Ok(converted) => *slot = converted,
        Err(err) => warn!("{}.{} keeps its default: {}", owner, name, err),
    }
}

pub fn composite_from_value<M: Mappable>(value: &Value) -> Result<M> {
    match value {
        Value::Map(map) => Ok(M::from_value_map(map)),
        other => Err(DbError::CoercionError(format!(
            "expected a nested map for {}, got {}",
            M::type_name(),
            other.type_name()
        ))),
    }
}

pub fn blank_descriptors<M: Mappable>() -> Vec<TypeDescriptor> {
    M::default()
        .describe()
        .into_iter()
        .map(TypeDescriptor::into_absent)
        .collect()
}
