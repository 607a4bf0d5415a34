use super::{FieldKind, Mappable};
use crate::core::{TypeTag, Value};

/// Stable handle for one declared field: the declaring type plus the
/// field's position in it. Computed by the derive, so the introspection
/// pass and the key declaration pass over the same instance agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId {
    owner: &'static str,
    index: u16,
}

impl FieldId {
    pub const fn new(owner: &'static str, index: u16) -> Self {
        Self { owner, index }
    }

    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn index(&self) -> u16 {
        self.index
    }
}

/// Presence of a field value on a live instance.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// The field holds a value.
    Present(Value),
    /// The field exists and is explicitly empty (`None`).
    Null,
    /// No value is available, e.g. children of an empty optional composite.
    Absent,
}

impl FieldValue {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// One field of a value, as produced by `Mappable::describe`.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub type_tag: TypeTag,
    pub value: FieldValue,
    pub identity: FieldId,
    /// Descriptors of a composite field's own fields.
    pub children: Option<Vec<TypeDescriptor>>,
    /// Set for ancestor structures whose fields are spliced in unprefixed.
    pub embedded: bool,
}

impl TypeDescriptor {
    pub fn of<F: FieldKind>(name: &'static str, identity: FieldId, value: &F) -> Self {
        Self {
            name,
            type_tag: F::type_tag(),
            value: value.to_value(),
            identity,
            children: value.describe_nested(),
            embedded: false,
        }
    }

    pub fn embedded<M: Mappable>(name: &'static str, identity: FieldId, value: &M) -> Self {
        Self {
            name,
            type_tag: TypeTag::Composite(M::type_name()),
            value: FieldValue::Absent,
            identity,
            children: Some(value.describe()),
            embedded: true,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.children.is_some()
    }

    /// Drops every value in this descriptor tree, keeping the structure.
    pub fn into_absent(mut self) -> Self {
        self.value = FieldValue::Absent;
        self.children = self
            .children
            .map(|children| children.into_iter().map(TypeDescriptor::into_absent).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mappable;

    #[derive(Debug, Clone, Default, PartialEq, Mappable)]
    struct Point {
        x: i64,
        y: i64,
    }

    #[test]
    fn test_optional_scalar_presence() {
        let id = FieldId::new("Sample", 0);

        let some = TypeDescriptor::of("nick", id, &Some("kb".to_string()));
        assert_eq!(some.type_tag, TypeTag::Optional(Box::new(TypeTag::Text)));
        assert_eq!(some.value.as_value(), Some(&Value::Text("kb".into())));
        assert!(!some.is_composite());

        let none = TypeDescriptor::of::<Option<String>>("nick", id, &None);
        assert_eq!(none.value, FieldValue::Null);
        assert!(!none.value.is_present());
    }

    #[test]
    fn test_into_absent_keeps_structure() {
        let point = Point { x: 3, y: 4 };
        let descriptor = TypeDescriptor::of("origin", FieldId::new("Sample", 1), &point);
        assert!(descriptor.is_composite());

        let blank = descriptor.into_absent();
        assert_eq!(blank.value, FieldValue::Absent);
        let children = blank.children.unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.value == FieldValue::Absent));
        assert_eq!(children[1].identity, FieldId::new("Point", 1));
    }
}
