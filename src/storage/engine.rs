use crate::core::{Result, Value};
use crate::sql::ColumnSpec;
use crate::sql::statement;
use std::collections::BTreeMap;

/// One result row, column name to stored scalar.
pub type Row = BTreeMap<String, Value>;

/// The store the mapping layer sends statements to.
///
/// Implementations own connection handling and write serialization; the
/// mapping layer only shapes SQL text and argument lists.
pub trait StorageEngine: Send + Sync {
    /// Runs a statement, returning the number of affected rows.
    fn execute(&self, sql: &str, args: &[Value]) -> Result<usize>;

    /// Runs a query. With `single` set at most one row comes back.
    fn query(&self, sql: &str, args: &[Value], single: bool) -> Result<Vec<Row>>;

    fn table_exists(&self, name: &str) -> Result<bool>;

    /// Creates a table from column clauses. Existing tables are left alone.
    fn create_table(&self, name: &str, columns: &[ColumnSpec]) -> Result<()> {
        let stmt = statement::create_table(name, columns)?;
        self.execute(&stmt.sql, &stmt.args)?;
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>>;
}
