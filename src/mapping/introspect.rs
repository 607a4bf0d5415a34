use super::{CONNECTOR, ColumnTypeRegistry, FieldId, FieldValue, Mappable, TypeDescriptor};
use crate::core::{DbError, Result, TypeTag};
use log::debug;
use std::collections::HashSet;

/// A terminal field reached by flattening a value.
#[derive(Debug, Clone)]
pub struct IntrospectedField {
    /// Flat column key, e.g. `address$_city`.
    pub key: String,
    pub type_tag: TypeTag,
    pub value: FieldValue,
    pub identity: FieldId,
    /// Identity of the root field this one was flattened out of.
    pub root: FieldId,
    pub depth: usize,
    /// Some composite on the path to this field is optional.
    pub nullable_path: bool,
}

/// Root-level fields of a value, with fields of embedded ancestor structures
/// spliced in ahead of the value's own fields.
pub fn root_fields<T: Mappable>(value: &T) -> Vec<TypeDescriptor> {
    splice_embedded(value.describe())
}

fn splice_embedded(descriptors: Vec<TypeDescriptor>) -> Vec<TypeDescriptor> {
    let mut ancestors = Vec::new();
    let mut own = Vec::new();
    for descriptor in descriptors {
        if descriptor.embedded {
            ancestors.extend(splice_embedded(descriptor.children.unwrap_or_default()));
        } else {
            own.push(descriptor);
        }
    }
    ancestors.extend(own);
    ancestors
}

/// Flattens a value into its persistable terminal fields, in order.
///
/// Composite fields contribute their children under `<name>$_`; fields with
/// no column affinity are dropped.
pub fn introspect<T: Mappable>(
    value: &T,
    registry: &ColumnTypeRegistry,
) -> Result<Vec<IntrospectedField>> {
    let mut fields = Vec::new();
    let mut seen = HashSet::new();
    for descriptor in root_fields(value) {
        let root = descriptor.identity;
        flatten_descriptor(
            descriptor,
            "",
            root,
            0,
            false,
            registry,
            &mut fields,
            &mut seen,
        )?;
    }
    Ok(fields)
}

#[allow(clippy::too_many_arguments)]
fn flatten_descriptor(
    descriptor: TypeDescriptor,
    prefix: &str,
    root: FieldId,
    depth: usize,
    nullable_path: bool,
    registry: &ColumnTypeRegistry,
    fields: &mut Vec<IntrospectedField>,
    seen: &mut HashSet<String>,
) -> Result<()> {
    if descriptor.name.contains(CONNECTOR) {
        return Err(DbError::ResolutionError(format!(
            "field name '{}' contains the reserved connector '{}'",
            descriptor.name, CONNECTOR
        )));
    }
    let key = format!("{}{}", prefix, descriptor.name);

    if let Some(children) = descriptor.children {
        let nested_prefix = format!("{}{}", key, CONNECTOR);
        let nullable = nullable_path || descriptor.type_tag.is_optional();
        for child in splice_embedded(children) {
            flatten_descriptor(
                child,
                &nested_prefix,
                root,
                depth + 1,
                nullable,
                registry,
                fields,
                seen,
            )?;
        }
        return Ok(());
    }

    if !registry.is_persistable(&descriptor.type_tag) {
        debug!("skipping '{}': {} has no column type", key, descriptor.type_tag);
        return Ok(());
    }

    if !seen.insert(key.clone()) {
        return Err(DbError::ResolutionError(format!(
            "flattened key '{}' is produced by more than one field",
            key
        )));
    }

    fields.push(IntrospectedField {
        key,
        type_tag: descriptor.type_tag,
        value: descriptor.value,
        identity: descriptor.identity,
        root,
        depth,
        nullable_path,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mappable;

    #[derive(Debug, Clone, Default, Mappable)]
    struct Stamp {
        id: i64,
        created: String,
    }

    #[derive(Debug, Clone, Default, Mappable)]
    struct Coords {
        lat: f64,
        lng: f64,
    }

    #[derive(Debug, Clone, Default, Mappable)]
    struct Venue {
        #[mirror(base)]
        stamp: Stamp,
        name: String,
        at: Coords,
        backup: Option<Coords>,
    }

    #[derive(Debug, Clone, Default, Mappable)]
    struct Clash {
        #[mirror(base)]
        stamp: Stamp,
        id: i64,
    }

    #[test]
    fn test_base_fields_are_spliced_first() {
        let names: Vec<&str> = root_fields(&Venue::default())
            .iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["id", "created", "name", "at", "backup"]);
    }

    #[test]
    fn test_composites_flatten_with_prefix() {
        let fields = introspect(&Venue::default(), ColumnTypeRegistry::global()).unwrap();
        let keys: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "id",
                "created",
                "name",
                "at$_lat",
                "at$_lng",
                "backup$_lat",
                "backup$_lng"
            ]
        );

        let lat = &fields[3];
        assert_eq!(lat.depth, 1);
        assert!(!lat.nullable_path);
        assert_eq!(lat.root, fields[4].root);

        let backup = &fields[5];
        assert!(backup.nullable_path);
        assert_eq!(backup.value, FieldValue::Absent);
    }

    #[test]
    fn test_colliding_keys_are_rejected() {
        let err = introspect(&Clash::default(), ColumnTypeRegistry::global()).unwrap_err();
        assert!(matches!(err, DbError::ResolutionError(_)));
    }
}
