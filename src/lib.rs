//! geodb - Read-only Geolocation Database Engine
//!
//! geodb answers "where is this IP address?" from a local database file.
//! Two incompatible on-disk formats are supported behind one API:
//!
//! - **MaxMind DB** (`.mmdb`): binary trie over address bits, leaves
//!   pointing into a self-describing data section
//! - **IP2Location BIN** (`.bin`): sorted fixed-width range tables with
//!   per-type column layouts
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use geodb::{FieldSet, GeoDatabase, GeoField};
//!
//! let db = GeoDatabase::open("GeoLite2-City.mmdb")?;
//!
//! let record = db.lookup("8.8.8.8")?;
//! println!("{:?} {:?}", record.country_code, record.city);
//!
//! // Header-ready values for selected fields
//! let wanted = FieldSet::empty()
//!     .with(GeoField::CountryCode)
//!     .with(GeoField::Latitude);
//! for (field, value) in record.emit(&wanted) {
//!     println!("{}: {}", field.header_key(), value);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! address literal
//!       ↓ classify (IPv4 / IPv6 / mapped, 6to4, Teredo)
//! AddressKey
//!       ↓                        ↓
//! mmdb: trie walk +        ip2location: binary search
//!       data decoding            over range rows
//!       ↓                        ↓
//!           GeoRecord (canonical)
//! ```
//!
//! Database files are memory-mapped by default and treated as immutable;
//! a [`GeoDatabase`] can be shared across threads.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// IP address classification into search keys
pub mod classify;
/// Self-describing data section encoding/decoding
pub mod data_section;
/// Unified database API
pub mod database;
/// Error types for geodb operations
pub mod error;
/// Record fields and field selection
pub mod fields;
/// IP2Location BIN format implementation
pub mod ip2location;
/// MaxMind DB format implementation
pub mod mmdb;
/// Canonical geolocation record
pub mod record;
/// Owned or memory-mapped database bytes
pub mod storage;

// Re-exports for Rust consumers

/// Unified database handle and its configuration
pub use crate::database::{DatabaseFormat, DatabaseInfo, DatabaseOpener, DatabaseOptions, GeoDatabase};

/// Data value type of the MaxMind data section
pub use crate::data_section::DataValue;

pub use crate::classify::{classify, AddressFamily, AddressKey};
pub use crate::error::{GeoError, Result};
pub use crate::fields::{FieldSet, GeoField};
pub use crate::record::GeoRecord;

// Version information
/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
