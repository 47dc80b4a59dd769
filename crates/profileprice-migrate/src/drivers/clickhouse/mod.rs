//! ClickHouse analytical driver.
//!
//! Talks to the HTTP interface through the `clickhouse` crate. Rows are sent
//! as typed [`crate::core::PriceRecord`]s in RowBinary format.

mod writer;

pub use writer::ClickhouseWriter;
