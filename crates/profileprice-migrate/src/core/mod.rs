//! Core types shared by the engine and the drivers.
//!
//! - [`schema`]: the fixed column table and the migration window
//! - [`value`]: cell and row representation
//! - [`record`]: the typed analytical row
//! - [`traits`]: store traits implemented by the drivers

pub mod record;
pub mod schema;
pub mod traits;
pub mod value;

pub use record::PriceRecord;
pub use schema::{ColumnSpec, MigrationWindow, TypeClass, COLUMNS, KEY_COLUMN};
pub use traits::{AnalyticalWriter, RelationalWriter, SourceReader};
pub use value::{Batch, Row, SqlValue};
