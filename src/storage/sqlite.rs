//! SQLite storage engine

use super::{Row, StorageEngine};
use crate::core::{DATE_TIME_FORMAT, Result, Value};
use log::debug;
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, OptionalExtension, ToSql, params_from_iter};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed engine. One connection, one writer at a time.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
    label: String,
}

impl SqliteEngine {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!("opened sqlite database {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            label: path.display().to_string(),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            label: ":memory:".to_string(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

struct Bind<'a>(&'a Value);

impl ToSql for Bind<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self.0 {
            Value::Null => SqlValue::Null,
            Value::Integer(i) => SqlValue::Integer(*i),
            Value::Real(f) => SqlValue::Real(*f),
            Value::Text(s) => return Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
            Value::Date(d) => SqlValue::Text(d.format(DATE_TIME_FORMAT).to_string()),
            Value::List(_) | Value::Map(_) => SqlValue::Text(self.0.to_json().to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

fn read_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

impl StorageEngine for SqliteEngine {
    fn execute(&self, sql: &str, args: &[Value]) -> Result<usize> {
        let conn = self.conn.lock()?;
        let changed = conn.execute(sql, params_from_iter(args.iter().map(Bind)))?;
        Ok(changed)
    }

    fn query(&self, sql: &str, args: &[Value], single: bool) -> Result<Vec<Row>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(args.iter().map(Bind)))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (index, column) in columns.iter().enumerate() {
                record.insert(column.clone(), read_value(row.get_ref(index)?));
            }
            result.push(record);
            if single {
                break;
            }
        }
        Ok(result)
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }
}
