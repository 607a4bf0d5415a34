use crate::core::{Affinity, Result, TypeTag, Value};
use serde::Serialize;

use super::FieldId;

/// Resolved description of one persistable column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    /// Flat column key, unique within its list.
    pub key: String,
    pub source_type: TypeTag,
    pub affinity: Option<Affinity>,
    pub is_primary: bool,
    pub is_unique: bool,
    pub is_excluded: bool,
    pub is_not_null: bool,
    /// Storage form of the field's value on a default instance.
    pub default_value: Option<Value>,
    #[serde(skip)]
    pub(crate) identity: FieldId,
    #[serde(skip)]
    pub(crate) root: FieldId,
}

impl Attribute {
    pub fn is_key(&self) -> bool {
        self.is_primary || self.is_unique
    }

    /// Identity of the declared field this column comes from.
    pub fn identity(&self) -> FieldId {
        self.identity
    }

    /// Identity of the root field this column was flattened out of.
    pub fn root(&self) -> FieldId {
        self.root
    }
}

/// Ordered columns of one logical table. Built once, then shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeList {
    pub table: String,
    pub attributes: Vec<Attribute>,
}

impl AttributeList {
    pub fn new(table: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            table: table.into(),
            attributes,
        }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Attributes that get a column.
    pub fn persistable(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .filter(|a| !a.is_excluded && a.affinity.is_some())
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.key == key)
    }

    pub fn primary(&self) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.is_primary)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.persistable().map(|a| a.key.as_str()).collect()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A column value taken from a live instance, ready to bind.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundValue {
    pub key: String,
    pub value: Value,
    pub is_primary: bool,
    pub is_unique: bool,
}

impl BoundValue {
    pub fn is_key(&self) -> bool {
        self.is_primary || self.is_unique
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(key: &str, index: u16) -> Attribute {
        let id = FieldId::new("Player", index);
        Attribute {
            key: key.to_string(),
            source_type: TypeTag::I64,
            affinity: Some(Affinity::Integer),
            is_primary: false,
            is_unique: false,
            is_excluded: false,
            is_not_null: true,
            default_value: Some(Value::Integer(0)),
            identity: id,
            root: id,
        }
    }

    #[test]
    fn test_persistable_skips_excluded() {
        let mut hidden = column("cache", 1);
        hidden.is_excluded = true;
        let list = AttributeList::new("player_A0", vec![column("id", 0), hidden]);

        assert_eq!(list.len(), 2);
        assert_eq!(list.keys(), vec!["id"]);
        assert!(list.get("cache").is_some());
    }

    #[test]
    fn test_json_dump_hides_identities() {
        let mut id = column("id", 0);
        id.is_primary = true;
        let list = AttributeList::new("player_A0", vec![id]);
        let json = list.to_json_pretty().unwrap();

        assert!(json.contains("\"is_primary\": true"));
        assert!(json.contains("\"affinity\": \"Integer\""));
        assert!(!json.contains("identity"));
    }
}
