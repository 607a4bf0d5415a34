use crate::core::Result;
use crate::mapping::AttributeList;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Attribute lists keyed by logical table name.
///
/// Entries live as long as the cache. A type whose structure changes gets a
/// new version tag, hence a new table name and a new entry.
#[derive(Debug, Default)]
pub struct SchemaCache {
    lists: RwLock<HashMap<String, Arc<AttributeList>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str) -> Result<Option<Arc<AttributeList>>> {
        let lists = self.lists.read()?;
        Ok(lists.get(table).cloned())
    }

    /// Stores `list` unless another caller got there first, and returns
    /// whichever list ends up cached.
    pub fn put(&self, table: &str, list: AttributeList) -> Result<Arc<AttributeList>> {
        let mut lists = self.lists.write()?;
        let stored = lists
            .entry(table.to_string())
            .or_insert_with(|| Arc::new(list));
        Ok(Arc::clone(stored))
    }

    pub fn get_or_try_insert_with<F>(&self, table: &str, build: F) -> Result<Arc<AttributeList>>
    where
        F: FnOnce() -> Result<AttributeList>,
    {
        if let Some(list) = self.get(table)? {
            return Ok(list);
        }
        let list = build()?;
        self.put(table, list)
    }

    pub fn contains(&self, table: &str) -> Result<bool> {
        Ok(self.lists.read()?.contains_key(table))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lists.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn tables(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.lists.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_first_writer_wins() {
        let cache = SchemaCache::new();
        let first = cache.put("player_A0", AttributeList::new("player_A0", vec![])).unwrap();
        let second = cache.put("player_A0", AttributeList::new("other", vec![])).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.table, "player_A0");
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_first_access_agrees() {
        let cache = Arc::new(SchemaCache::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_try_insert_with("team_A0", || {
                            Ok(AttributeList::new("team_A0", vec![]))
                        })
                        .unwrap()
                })
            })
            .collect();

        let lists: Vec<Arc<AttributeList>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let cached = cache.get("team_A0").unwrap().unwrap();
        assert!(lists.iter().all(|list| Arc::ptr_eq(list, &cached)));
    }

    #[test]
    fn test_failed_build_caches_nothing() {
        let cache = SchemaCache::new();
        let result = cache.get_or_try_insert_with("broken_A0", || {
            Err(crate::core::DbError::ResolutionError("bad".into()))
        });
        assert!(result.is_err());
        assert!(!cache.contains("broken_A0").unwrap());
        assert_eq!(cache.tables().unwrap(), Vec::<String>::new());
    }
}
