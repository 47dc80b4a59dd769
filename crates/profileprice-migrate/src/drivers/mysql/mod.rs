//! MySQL/MariaDB database driver.
//!
//! - [`MysqlReader`]: source reader (SQLx)
//! - [`MysqlWriter`]: relational target writer (mysql_async)
//!
//! # Supported Versions
//!
//! - MySQL 5.7+, 8.0+
//! - MariaDB 10.2+

mod reader;
mod writer;

pub use reader::MysqlReader;
pub use writer::MysqlWriter;

/// Quote a MySQL identifier.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
