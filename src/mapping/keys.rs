use super::{FieldId, TypeDescriptor};
use crate::core::{DbError, Result};
use log::warn;
use std::collections::BTreeSet;

/// Records which root fields of a model are primary, unique or excluded.
///
/// A registry is built from the root field list of one instance and handed
/// to `Mappable::declare_keys` for that same instance. Names are resolved to
/// field identities immediately, so the resolver only ever compares
/// identities.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    fields: Vec<(&'static str, FieldId, bool)>,
    primary: Option<FieldId>,
    unique: BTreeSet<FieldId>,
    excluded: BTreeSet<FieldId>,
    problems: Vec<String>,
}

impl KeyRegistry {
    pub fn for_fields(root: &[TypeDescriptor]) -> Self {
        Self {
            fields: root
                .iter()
                .map(|d| (d.name, d.identity, d.is_composite()))
                .collect(),
            ..Self::default()
        }
    }

    fn lookup(&mut self, name: &str) -> Option<(FieldId, bool)> {
        let found = self
            .fields
            .iter()
            .find(|(field, _, _)| *field == name)
            .map(|(_, id, composite)| (*id, *composite));
        if found.is_none() {
            self.problems.push(format!("unknown field '{}'", name));
        }
        found
    }

    /// Marks the primary key. A second call replaces the first.
    pub fn primary(&mut self, name: &str) -> &mut Self {
        let Some((id, composite)) = self.lookup(name) else {
            return self;
        };
        if composite {
            self.problems
                .push(format!("composite field '{}' cannot be a primary key", name));
            return self;
        }
        self.mark_primary(id)
    }

    pub fn unique(&mut self, name: &str) -> &mut Self {
        if let Some((id, _)) = self.lookup(name) {
            self.unique.insert(id);
        }
        self
    }

    /// Keeps a field out of the table. Excluding a composite field excludes
    /// every column it flattens into.
    pub fn exclude(&mut self, name: &str) -> &mut Self {
        if let Some((id, _)) = self.lookup(name) {
            self.excluded.insert(id);
        }
        self
    }

    pub fn mark_primary(&mut self, id: FieldId) -> &mut Self {
        if let Some(previous) = self.primary.replace(id) {
            if previous != id {
                warn!(
                    "primary key declared twice on {}: field #{} replaces #{}",
                    id.owner(),
                    id.index(),
                    previous.index()
                );
            }
        }
        self
    }

    pub fn is_primary(&self, id: FieldId) -> bool {
        self.primary == Some(id)
    }

    pub fn is_unique(&self, id: FieldId) -> bool {
        self.unique.contains(&id)
    }

    pub fn is_excluded(&self, id: FieldId) -> bool {
        self.excluded.contains(&id)
    }

    pub fn primary_key(&self) -> Option<FieldId> {
        self.primary
    }

    /// Fails when a declaration could not be matched to a field.
    pub fn check(&self) -> Result<()> {
        if self.problems.is_empty() {
            return Ok(());
        }
        Err(DbError::ResolutionError(format!(
            "invalid key declarations: {}",
            self.problems.join("; ")
        )))
    }
}
