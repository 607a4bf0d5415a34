pub mod engine;
pub mod memory;
pub mod sqlite;

pub use engine::{Row, StorageEngine};
pub use memory::{RecordedStatement, RecordingEngine};
pub use sqlite::SqliteEngine;
