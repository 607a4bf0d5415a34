pub mod statement;

pub use statement::{ColumnSpec, ConditionMap, Order, Statement};
