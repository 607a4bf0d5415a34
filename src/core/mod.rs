pub mod error;
pub mod types;
pub mod value;

pub use error::{DbError, Result};
pub use types::{Affinity, TypeTag};
pub use value::{DATE_TIME_FORMAT, Value, sql_escape_string};
