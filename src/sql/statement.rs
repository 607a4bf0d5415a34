//! SQL text and positional arguments built from attribute lists and
//! condition maps.
//!
//! Every builder here is pure. Column lists keep attribute order; condition
//! and assignment maps are iterated sorted by column name so the same input
//! always produces the same SQL.

use crate::core::{Affinity, DbError, Result, Value};
use crate::mapping::{AttributeList, BoundValue};
use std::collections::BTreeMap;
use std::fmt;

/// SQL text plus its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(Value::to_sql_literal).collect();
            write!(f, " [{}]", args.join(", "))?;
        }
        Ok(())
    }
}

/// Row order for selects, by insertion sequence. Newest rows come first
/// unless asked otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    Ascending,
    #[default]
    Descending,
}

impl Order {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Column to value equalities, joined with `AND`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionMap {
    entries: BTreeMap<String, Value>,
}

impl ConditionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(column.into(), value.into())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries sorted by column name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    fn render(&self, separator: &str) -> (String, Vec<Value>) {
        let clauses: Vec<String> = self
            .entries
            .keys()
            .map(|column| format!("{} = ?", column))
            .collect();
        (clauses.join(separator), self.entries.values().cloned().collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ConditionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (column, value) in iter {
            map.insert(column, value);
        }
        map
    }
}

impl From<BTreeMap<String, Value>> for ConditionMap {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }
}

/// One column clause of a `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub affinity: Affinity,
    pub primary: bool,
    pub unique: bool,
    pub not_null: bool,
    pub default: Option<Value>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, affinity: Affinity) -> Self {
        Self {
            name: name.into(),
            affinity,
            primary: false,
            unique: false,
            not_null: false,
            default: None,
        }
    }

    pub fn to_sql(&self) -> String {
        let mut clause = format!("{} {}", self.name, self.affinity.as_sql());
        if self.primary {
            clause.push_str(" PRIMARY KEY");
        }
        if self.unique {
            clause.push_str(" UNIQUE");
        }
        if self.not_null {
            clause.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            clause.push_str(" DEFAULT ");
            clause.push_str(&default.to_sql_literal());
        }
        clause
    }
}

/// Column clauses for every persisted attribute, in attribute order.
pub fn column_specs(list: &AttributeList) -> Vec<ColumnSpec> {
    list.persistable()
        .filter_map(|attribute| {
            let affinity = attribute.affinity?;
            Some(ColumnSpec {
                name: attribute.key.clone(),
                affinity,
                primary: attribute.is_primary,
                unique: attribute.is_unique,
                not_null: attribute.is_not_null,
                default: attribute.default_value.clone(),
            })
        })
        .collect()
}

pub fn create_table(table: &str, columns: &[ColumnSpec]) -> Result<Statement> {
    if columns.is_empty() {
        return Err(DbError::StatementError(format!(
            "table {} has no persistable columns",
            table
        )));
    }
    let clauses: Vec<String> = columns.iter().map(ColumnSpec::to_sql).collect();
    Ok(Statement::new(
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            table,
            clauses.join(", ")
        ),
        Vec::new(),
    ))
}

/// `INSERT OR REPLACE` when `update` is set, `INSERT OR IGNORE` otherwise.
pub fn insert(table: &str, values: &[BoundValue], update: bool) -> Result<Statement> {
    if values.is_empty() {
        return Err(DbError::StatementError(format!(
            "insert into {} has no values",
            table
        )));
    }
    let verb = if update { "REPLACE" } else { "IGNORE" };
    let columns: Vec<&str> = values.iter().map(|v| v.key.as_str()).collect();
    let placeholders = vec!["?"; values.len()].join(",");
    Ok(Statement::new(
        format!(
            "INSERT OR {} INTO {} ({}) VALUES ({})",
            verb,
            table,
            columns.join(","),
            placeholders
        ),
        values.iter().map(|v| v.value.clone()).collect(),
    ))
}

pub fn update(
    table: &str,
    condition: &ConditionMap,
    assignments: &ConditionMap,
) -> Result<Statement> {
    if condition.is_empty() {
        return Err(DbError::StatementError(format!(
            "update of {} has no condition columns",
            table
        )));
    }
    if assignments.is_empty() {
        return Err(DbError::StatementError(format!(
            "update of {} has no columns to assign",
            table
        )));
    }
    let (set, mut args) = assignments.render(", ");
    let (filter, filter_args) = condition.render(" AND ");
    args.extend(filter_args);
    Ok(Statement::new(
        format!("UPDATE {} SET {} WHERE {}", table, set, filter),
        args,
    ))
}

/// Splits bound values into key columns (condition) and the rest
/// (assignments), then builds the update.
pub fn update_bound(table: &str, values: &[BoundValue]) -> Result<Statement> {
    let (keys, others): (Vec<&BoundValue>, Vec<&BoundValue>) =
        values.iter().partition(|v| v.is_key());
    let condition: ConditionMap = keys.iter().map(|v| (v.key.clone(), v.value.clone())).collect();
    let assignments: ConditionMap = others
        .iter()
        .map(|v| (v.key.clone(), v.value.clone()))
        .collect();
    update(table, &condition, &assignments)
}

pub fn delete(table: &str, condition: &ConditionMap) -> Result<Statement> {
    if condition.is_empty() {
        return Err(DbError::StatementError(format!(
            "refusing to delete from {} without a condition",
            table
        )));
    }
    let (filter, args) = condition.render(" AND ");
    Ok(Statement::new(
        format!("DELETE FROM {} WHERE {}", table, filter),
        args,
    ))
}

pub fn delete_all(table: &str) -> Statement {
    Statement::new(format!("DELETE FROM {}", table), Vec::new())
}

pub fn select(
    table: &str,
    condition: Option<&ConditionMap>,
    order: Order,
    single: bool,
) -> Statement {
    let mut sql = format!("SELECT * FROM {}", table);
    let mut args = Vec::new();
    if let Some(condition) = condition.filter(|c| !c.is_empty()) {
        let (filter, filter_args) = condition.render(" AND ");
        sql.push_str(" WHERE ");
        sql.push_str(&filter);
        args = filter_args;
    }
    sql.push_str(" ORDER BY ROWID ");
    sql.push_str(order.as_sql());
    if single {
        sql.push_str(" LIMIT 1");
    }
    Statement::new(sql, args)
}
