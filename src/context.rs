//! Model-level operations over one pair of databases.
//!
//! A [`MappingContext`] owns everything the mapping layer shares between
//! calls: configuration, the column type registry, the schema cache and the
//! storage engines. Types marked `public` go to the public engine, all others
//! to the private one.

use crate::config::MapperConfig;
use crate::core::{DbError, Result};
use crate::mapping::transcode::to_storage_value;
use crate::mapping::{AttributeList, AttributeResolver, BoundValue, ColumnTypeRegistry, Mappable};
use crate::schema_cache::SchemaCache;
use crate::sql::statement;
use crate::sql::{ConditionMap, Order, Statement};
use crate::storage::{Row, SqliteEngine, StorageEngine};
use log::{debug, error, warn};
use std::sync::Arc;

/// Creates the table of one type; see [`MappingContext::prepare`].
pub type TablePreparer = fn(&MappingContext) -> Result<bool>;

pub struct MappingContext {
    config: MapperConfig,
    registry: ColumnTypeRegistry,
    cache: SchemaCache,
    public: Arc<dyn StorageEngine>,
    private: Arc<dyn StorageEngine>,
}

impl MappingContext {
    /// Opens (creating if needed) the public and private SQLite files
    /// described by `config`.
    pub fn open(config: MapperConfig) -> Result<Self> {
        config.validate()?;
        let public = SqliteEngine::open(&config.database_path(true))?;
        let private = SqliteEngine::open(&config.database_path(false))?;
        Ok(Self::with_engines(config, Arc::new(public), Arc::new(private)))
    }

    /// Sends every type, public or private, to one engine.
    pub fn with_engine(engine: Arc<dyn StorageEngine>) -> Self {
        Self::with_engines(MapperConfig::default(), Arc::clone(&engine), engine)
    }

    pub fn with_engines(
        config: MapperConfig,
        public: Arc<dyn StorageEngine>,
        private: Arc<dyn StorageEngine>,
    ) -> Self {
        Self {
            config,
            registry: ColumnTypeRegistry::standard(),
            cache: SchemaCache::new(),
            public,
            private,
        }
    }

    /// Replaces the column type registry. Cached attribute lists are kept,
    /// so call this before the first operation.
    pub fn with_registry(mut self, registry: ColumnTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn registry(&self) -> &ColumnTypeRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn resolver(&self) -> AttributeResolver<'_> {
        AttributeResolver::new(&self.registry, &self.cache)
    }

    fn engine_for<T: Mappable>(&self) -> &dyn StorageEngine {
        if T::is_public_database() {
            self.public.as_ref()
        } else {
            self.private.as_ref()
        }
    }

    /// Logs a failed operation. Errors raised before any SQL was sent mean
    /// nothing happened; storage errors come from the engine.
    fn reported<R>(&self, operation: &str, table: &str, result: Result<R>) -> Result<R> {
        if let Err(err) = &result {
            if err.is_pre_storage() {
                warn!("{} on {} skipped: {}", operation, table, err);
            } else {
                error!("{} on {} failed: {}", operation, table, err);
            }
        }
        result
    }

    fn run(&self, engine: &dyn StorageEngine, stmt: &Statement) -> Result<usize> {
        if self.config.debug {
            debug!("{}", stmt);
        }
        engine.execute(&stmt.sql, &stmt.args)
    }

    fn fetch(
        &self,
        engine: &dyn StorageEngine,
        stmt: &Statement,
        single: bool,
    ) -> Result<Vec<Row>> {
        if self.config.debug {
            debug!("{}", stmt);
        }
        engine.query(&stmt.sql, &stmt.args, single)
    }

    /// Resolved columns of `T`.
    pub fn attributes<T: Mappable>(&self) -> Result<Arc<AttributeList>> {
        self.reported("resolve", &T::table_name(), self.resolver().resolve::<T>())
    }

    /// Resolved columns of `T` as pretty JSON.
    pub fn describe_table<T: Mappable>(&self) -> Result<String> {
        self.attributes::<T>()?.to_json_pretty()
    }

    /// Creates the table of `T` unless it already exists. Returns whether a
    /// table was created.
    pub fn create_table<T: Mappable>(&self) -> Result<bool> {
        let table = T::table_name();
        let result = self.create_table_inner::<T>(&table);
        self.reported("create table", &table, result)
    }

    fn create_table_inner<T: Mappable>(&self, table: &str) -> Result<bool> {
        let list = self.resolver().resolve::<T>()?;
        let engine = self.engine_for::<T>();
        if engine.table_exists(table)? {
            return Ok(false);
        }
        let columns = statement::column_specs(&list);
        if self.config.debug {
            debug!("{}", statement::create_table(table, &columns)?);
        }
        engine.create_table(table, &columns)?;
        Ok(true)
    }

    /// Creates the tables of several types, e.g.
    /// `ctx.prepare(&[MappingContext::create_table::<Player>])`. Returns the
    /// number of tables created.
    pub fn prepare(&self, tables: &[TablePreparer]) -> Result<usize> {
        let mut created = 0;
        for prepare in tables {
            if prepare(self)? {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Inserts `values`, creating the table first if needed. With `update`
    /// set an existing row with the same key is replaced, otherwise kept.
    pub fn insert<T: Mappable>(&self, values: &[T], update: bool) -> Result<usize> {
        let table = T::table_name();
        let result = self.insert_inner(&table, values, update);
        self.reported("insert", &table, result)
    }

    fn insert_inner<T: Mappable>(&self, table: &str, values: &[T], update: bool) -> Result<usize> {
        let list = self.resolver().resolve::<T>()?;
        let mut statements = Vec::with_capacity(values.len());
        for value in values {
            let bound = self.resolver().bind(&list, value)?;
            if bound.is_empty() {
                warn!("insert into {}: value carries no columns, skipped", table);
                continue;
            }
            statements.push(statement::insert(table, &bound, update)?);
        }

        self.create_table_inner::<T>(table)?;
        let engine = self.engine_for::<T>();
        let mut changed = 0;
        for stmt in &statements {
            changed += self.run(engine, stmt)?;
        }
        Ok(changed)
    }

    /// Updates the row of `value`, matched on its primary and unique columns.
    pub fn update<T: Mappable>(&self, value: &T) -> Result<usize> {
        let table = T::table_name();
        let result = self.update_inner(&table, value);
        self.reported("update", &table, result)
    }

    fn update_inner<T: Mappable>(&self, table: &str, value: &T) -> Result<usize> {
        let list = self.resolver().resolve::<T>()?;
        let bound = self.resolver().bind(&list, value)?;
        let stmt = statement::update_bound(table, &bound)?;
        self.run(self.engine_for::<T>(), &stmt)
    }

    /// Assigns `assignments` on every row matching `condition`.
    pub fn update_where<T: Mappable>(
        &self,
        condition: &ConditionMap,
        assignments: &ConditionMap,
    ) -> Result<usize> {
        let table = T::table_name();
        let result = self.update_where_inner::<T>(&table, condition, assignments);
        self.reported("update", &table, result)
    }

    fn update_where_inner<T: Mappable>(
        &self,
        table: &str,
        condition: &ConditionMap,
        assignments: &ConditionMap,
    ) -> Result<usize> {
        let list = self.resolver().resolve::<T>()?;
        let condition = storage_conditions(&list, condition)?;
        let assignments = storage_conditions(&list, assignments)?;
        let stmt = statement::update(table, &condition, &assignments)?;
        self.run(self.engine_for::<T>(), &stmt)
    }

    /// Deletes the row of `value`, matched on its primary key, or on its
    /// first unique column when it has no primary key value.
    pub fn delete<T: Mappable>(&self, value: &T) -> Result<usize> {
        self.delete_many(std::slice::from_ref(value))
    }

    pub fn delete_many<T: Mappable>(&self, values: &[T]) -> Result<usize> {
        let table = T::table_name();
        let result = self.delete_many_inner(&table, values);
        self.reported("delete", &table, result)
    }

    fn delete_many_inner<T: Mappable>(&self, table: &str, values: &[T]) -> Result<usize> {
        let list = self.resolver().resolve::<T>()?;
        let statements = values
            .iter()
            .map(|value| {
                let bound = self.resolver().bind(&list, value)?;
                statement::delete(table, &delete_condition(&bound))
            })
            .collect::<Result<Vec<_>>>()?;

        let engine = self.engine_for::<T>();
        let mut changed = 0;
        for stmt in &statements {
            changed += self.run(engine, stmt)?;
        }
        Ok(changed)
    }

    /// Deletes every row matching `condition`. An empty condition is refused;
    /// use [`MappingContext::delete_all`] to clear a table.
    pub fn delete_where<T: Mappable>(&self, condition: &ConditionMap) -> Result<usize> {
        let table = T::table_name();
        let result = self
            .resolver()
            .resolve::<T>()
            .and_then(|list| storage_conditions(&list, condition))
            .and_then(|condition| statement::delete(&table, &condition))
            .and_then(|stmt| self.run(self.engine_for::<T>(), &stmt));
        self.reported("delete", &table, result)
    }

    pub fn delete_all<T: Mappable>(&self) -> Result<usize> {
        let table = T::table_name();
        let stmt = statement::delete_all(&table);
        let result = self.run(self.engine_for::<T>(), &stmt);
        self.reported("delete all", &table, result)
    }

    pub fn select_one<T: Mappable>(
        &self,
        order: Order,
        condition: Option<&ConditionMap>,
    ) -> Result<Option<T>> {
        Ok(self.select::<T>(order, condition, true)?.into_iter().next())
    }

    pub fn select_all<T: Mappable>(
        &self,
        order: Order,
        condition: Option<&ConditionMap>,
    ) -> Result<Vec<T>> {
        self.select::<T>(order, condition, false)
    }

    fn select<T: Mappable>(
        &self,
        order: Order,
        condition: Option<&ConditionMap>,
        single: bool,
    ) -> Result<Vec<T>> {
        let table = T::table_name();
        let result = self.select_inner(&table, order, condition, single);
        self.reported("select", &table, result)
    }

    fn select_inner<T: Mappable>(
        &self,
        table: &str,
        order: Order,
        condition: Option<&ConditionMap>,
        single: bool,
    ) -> Result<Vec<T>> {
        let list = self.resolver().resolve::<T>()?;
        let condition = condition
            .map(|c| storage_conditions(&list, c))
            .transpose()?;
        let stmt = statement::select(table, condition.as_ref(), order, single);
        let rows = self.fetch(self.engine_for::<T>(), &stmt, single)?;
        rows.iter()
            .map(|row| self.resolver().reassemble::<T>(&list, row))
            .collect()
    }
}

/// Primary key column if it has a value, else the first unique one.
fn delete_condition(bound: &[BoundValue]) -> ConditionMap {
    let key = bound
        .iter()
        .find(|v| v.is_primary)
        .or_else(|| bound.iter().find(|v| v.is_unique));
    key.map(|v| ConditionMap::new().with(v.key.clone(), v.value.clone()))
        .unwrap_or_default()
}

/// Checks caller-supplied columns against the attribute list and converts
/// their values to storage form.
fn storage_conditions(list: &AttributeList, conditions: &ConditionMap) -> Result<ConditionMap> {
    let mut converted = ConditionMap::new();
    for (column, value) in conditions.iter() {
        let attribute = list
            .get(column)
            .filter(|a| !a.is_excluded && a.affinity.is_some())
            .ok_or_else(|| {
                DbError::StatementError(format!("{} has no column '{}'", list.table, column))
            })?;
        let stored = to_storage_value(&attribute.source_type, value)
            .map_err(|err| DbError::StatementError(format!("column '{}': {}", column, err)))?;
        converted.insert(column.clone(), stored);
    }
    Ok(converted)
}
