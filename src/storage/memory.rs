use super::{Row, StorageEngine};
use crate::core::{Result, Value};
use crate::sql::ColumnSpec;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Mutex;

/// A statement as the engine received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Default)]
struct Recording {
    statements: Vec<RecordedStatement>,
    tables: BTreeSet<String>,
    results: VecDeque<Vec<Row>>,
}

/// Engine that records every statement instead of running it.
///
/// Queries are answered from results queued with [`RecordingEngine::push_result`],
/// or with no rows when the queue is empty. `create_table` marks the table as
/// existing.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    inner: Mutex<Recording>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_result(&self, rows: Vec<Row>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.results.push_back(rows);
        }
    }

    pub fn add_table(&self, name: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.tables.insert(name.to_string());
        }
    }

    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.inner
            .lock()
            .map(|inner| inner.statements.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<RecordedStatement> {
        self.statements().pop()
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.statements.clear();
        }
    }

    fn record(&self, sql: &str, args: &[Value]) -> Result<()> {
        let mut inner = self.inner.lock()?;
        inner.statements.push(RecordedStatement {
            sql: sql.to_string(),
            args: args.to_vec(),
        });
        Ok(())
    }
}

impl StorageEngine for RecordingEngine {
    fn execute(&self, sql: &str, args: &[Value]) -> Result<usize> {
        self.record(sql, args)?;
        Ok(1)
    }

    fn query(&self, sql: &str, args: &[Value], single: bool) -> Result<Vec<Row>> {
        self.record(sql, args)?;
        let mut rows = self.inner.lock()?.results.pop_front().unwrap_or_default();
        if single {
            rows.truncate(1);
        }
        Ok(rows)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        Ok(self.inner.lock()?.tables.contains(name))
    }

    fn create_table(&self, name: &str, columns: &[ColumnSpec]) -> Result<()> {
        let stmt = crate::sql::statement::create_table(name, columns)?;
        self.record(&stmt.sql, &stmt.args)?;
        self.inner.lock()?.tables.insert(name.to_string());
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.inner.lock()?.tables.iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_serves_rows() {
        let engine = RecordingEngine::new();
        let mut row = Row::new();
        row.insert("id".into(), Value::Integer(1));
        engine.push_result(vec![row.clone(), row]);

        engine.execute("DELETE FROM t", &[]).unwrap();
        let rows = engine.query("SELECT * FROM t", &[], true).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(engine.statements().len(), 2);
        assert_eq!(engine.last().unwrap().sql, "SELECT * FROM t");
        assert!(engine.query("SELECT * FROM t", &[], false).unwrap().is_empty());
    }
}
