// ============================================================================
// rowmirror Library
// ============================================================================

//! Reflective object-relational mapping.
//!
//! `#[derive(Mappable)]` gives a struct a compile-time field table. From it
//! rowmirror resolves a flat, typed column list (nested structs become
//! `parent$_child` columns), builds parameterized SQL and reads rows back
//! into values.
//!
//! ```ignore
//! use rowmirror::{MappingContext, Mappable, MapperConfig, Order};
//!
//! #[derive(Debug, Default, Mappable)]
//! struct Player {
//!     #[mirror(primary)]
//!     id: i64,
//!     name: String,
//! }
//!
//! let ctx = MappingContext::open(MapperConfig::from_env()?)?;
//! ctx.insert(&[Player { id: 24, name: "Kobe".into() }], true)?;
//! let all: Vec<Player> = ctx.select_all(Order::Ascending, None)?;
//! ```

extern crate self as rowmirror;

pub mod config;
pub mod context;
pub mod core;
pub mod mapping;
pub mod schema_cache;
pub mod sql;
pub mod storage;

pub use config::MapperConfig;
pub use context::{MappingContext, TablePreparer};
pub use crate::core::{Affinity, DbError, Result, TypeTag, Value};
pub use mapping::{
    Attribute, AttributeList, AttributeResolver, CONNECTOR, ColumnTypeRegistry, DEFAULT_VERSION,
    FieldId, FieldKind, FieldValue, KeyRegistry, Mappable, TypeDescriptor, flatten, unflatten,
};
pub use schema_cache::SchemaCache;
pub use sql::{ColumnSpec, ConditionMap, Order, Statement};
pub use storage::{RecordingEngine, Row, SqliteEngine, StorageEngine};

pub use rowmirror_derive::Mappable;
