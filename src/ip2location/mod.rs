//! IP2Location BIN Reader
//!
//! BIN files are a fixed header followed by sorted range tables (one per
//! address family), optional prefix index tables, and a string pool.
//!
//! - **columns**: static per-type column tables
//! - **header**: fixed header parsing and validation
//! - **record**: native row contents
//! - **reader**: range search and row decoding

pub mod columns;
pub mod header;
pub mod reader;
pub mod record;

pub use columns::{Column, FieldLayout};
pub use header::{BinHeader, RangeTable};
pub use reader::Ip2LocationReader;
pub use record::Ip2LocationRecord;
