pub mod reader;
pub mod schema_gen;
pub mod sqlite;
pub mod value;

pub use sqlite::{ModeWriter, Store};
pub use value::{Entity, SqlValue};
