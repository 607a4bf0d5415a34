use super::transcode::{from_storage_value, to_storage_value};
use super::{
    Attribute, AttributeList, BoundValue, CONNECTOR, ColumnTypeRegistry, FieldValue,
    IntrospectedField, KeyRegistry, Mappable, introspect, root_fields,
};
use crate::core::{DbError, Result, Value};
use crate::schema_cache::SchemaCache;
use crate::storage::Row;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Turns mappable types into attribute lists, and rows back into values.
pub struct AttributeResolver<'a> {
    registry: &'a ColumnTypeRegistry,
    cache: &'a SchemaCache,
}

impl<'a> AttributeResolver<'a> {
    pub fn new(registry: &'a ColumnTypeRegistry, cache: &'a SchemaCache) -> Self {
        Self { registry, cache }
    }

    /// Attribute list of `T`, resolved on first use and cached under the
    /// logical table name afterwards.
    pub fn resolve<T: Mappable>(&self) -> Result<Arc<AttributeList>> {
        let table = T::table_name();
        if let Some(list) = self.cache.get(&table)? {
            return Ok(list);
        }
        let list = self.resolve_uncached::<T>()?;
        debug!(
            "resolved {} into {} ({} columns)",
            T::type_name(),
            table,
            list.len()
        );
        self.cache.put(&table, list)
    }

    /// Runs resolution without touching the cache.
    pub fn resolve_uncached<T: Mappable>(&self) -> Result<AttributeList> {
        let blank = T::default();
        let fields = introspect(&blank, self.registry)?;

        let mut keys = KeyRegistry::for_fields(&root_fields(&blank));
        blank.declare_keys(&mut keys);
        keys.check()?;

        let attributes = fields
            .into_iter()
            .map(|field| self.attribute(field, &keys))
            .collect();
        Ok(AttributeList::new(T::table_name(), attributes))
    }

    fn attribute(&self, field: IntrospectedField, keys: &KeyRegistry) -> Attribute {
        let at_root = field.depth == 0;
        let default_value = match &field.value {
            FieldValue::Present(value) => match to_storage_value(&field.type_tag, value) {
                Ok(Value::Null) => None,
                Ok(stored) => Some(stored),
                Err(err) => {
                    warn!("no default for column '{}': {}", field.key, err);
                    None
                }
            },
            FieldValue::Null | FieldValue::Absent => None,
        };

        Attribute {
            affinity: self.registry.affinity_for(&field.type_tag),
            is_primary: at_root && keys.is_primary(field.identity),
            is_unique: at_root && keys.is_unique(field.identity),
            is_excluded: keys.is_excluded(field.root),
            is_not_null: !field.type_tag.is_optional() && !field.nullable_path,
            default_value,
            identity: field.identity,
            root: field.root,
            source_type: field.type_tag,
            key: field.key,
        }
    }

    /// Columns of `value` that carry a value, in attribute order.
    pub fn bind<T: Mappable>(&self, list: &AttributeList, value: &T) -> Result<Vec<BoundValue>> {
        let mut live: HashMap<String, FieldValue> = introspect(value, self.registry)?
            .into_iter()
            .map(|field| (field.key, field.value))
            .collect();

        let mut bound = Vec::new();
        for attribute in list.persistable() {
            let Some(FieldValue::Present(current)) = live.remove(&attribute.key) else {
                continue;
            };
            let stored = to_storage_value(&attribute.source_type, &current)?;
            if stored.is_null() {
                continue;
            }
            bound.push(BoundValue {
                key: attribute.key.clone(),
                value: stored,
                is_primary: attribute.is_primary,
                is_unique: attribute.is_unique,
            });
        }
        Ok(bound)
    }

    /// Rebuilds a `T` from one stored row. Columns that cannot be read back
    /// are logged and leave their field at its default.
    pub fn reassemble<T: Mappable>(&self, list: &AttributeList, row: &Row) -> Result<T> {
        let mut flat = BTreeMap::new();
        for attribute in list.persistable() {
            let Some(stored) = row.get(&attribute.key) else {
                continue;
            };
            match from_storage_value(&attribute.source_type, stored) {
                Ok(value) => {
                    flat.insert(attribute.key.clone(), value);
                }
                Err(err) => warn!(
                    "{}.{} read as default: {}",
                    list.table, attribute.key, err
                ),
            }
        }
        Ok(T::from_value_map(&unflatten(&flat)?))
    }
}

/// Joins nested maps into one level of `parent$_child` keys.
pub fn flatten(map: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    let mut flat = BTreeMap::new();
    flatten_into(map, "", &mut flat);
    flat
}

fn flatten_into(map: &BTreeMap<String, Value>, prefix: &str, flat: &mut BTreeMap<String, Value>) {
    for (name, value) in map {
        let key = format!("{}{}", prefix, name);
        match value {
            Value::Map(nested) => {
                flatten_into(nested, &format!("{}{}", key, CONNECTOR), flat);
            }
            other => {
                flat.insert(key, other.clone());
            }
        }
    }
}

/// Splits flat keys on the connector and rebuilds the nested maps.
///
/// A key that is both a leaf and the parent of another key is an error.
pub fn unflatten(flat: &BTreeMap<String, Value>) -> Result<BTreeMap<String, Value>> {
    let mut root = BTreeMap::new();
    for (key, value) in flat {
        let segments: Vec<&str> = key.split(CONNECTOR).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(DbError::ResolutionError(format!(
                "malformed flattened key '{}'",
                key
            )));
        }
        insert_path(&mut root, &segments, value.clone(), key)?;
    }
    Ok(root)
}

fn insert_path(
    map: &mut BTreeMap<String, Value>,
    segments: &[&str],
    value: Value,
    key: &str,
) -> Result<()> {
    let collision = || {
        DbError::ResolutionError(format!(
            "flattened key '{}' collides with another column",
            key
        ))
    };
    let Some((head, rest)) = segments.split_first() else {
        return Err(collision());
    };
    if rest.is_empty() {
        if map.contains_key(*head) {
            return Err(collision());
        }
        map.insert(head.to_string(), value);
        return Ok(());
    }
    match map
        .entry(head.to_string())
        .or_insert_with(|| Value::Map(BTreeMap::new()))
    {
        Value::Map(child) => insert_path(child, rest, value, key),
        _ => Err(collision()),
    }
}
