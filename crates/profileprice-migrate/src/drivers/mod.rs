//! Database driver implementations.
//!
//! Each driver implements one of the store traits in [`crate::core::traits`]:
//!
//! - [`mysql`]: source reader and relational writer for MySQL/MariaDB
//! - [`clickhouse`]: analytical writer for ClickHouse

pub mod clickhouse;
pub mod mysql;

pub use self::clickhouse::ClickhouseWriter;
pub use self::mysql::{MysqlReader, MysqlWriter};
