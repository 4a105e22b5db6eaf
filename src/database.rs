//! Unified Database API
//!
//! Provides a single interface for querying geolocation databases in
//! either supported on-disk format:
//! - MaxMind DB (`.mmdb`): binary search tree plus self-describing data
//! - IP2Location BIN (`.bin`): sorted fixed-width range tables
//!
//! The format is detected when the file is opened and every lookup
//! returns the same canonical [`GeoRecord`].

use crate::classify::{classify, classify_ip, AddressKey};
use crate::error::{GeoError, Result};
use crate::fields::{FieldSet, GeoField};
use crate::ip2location::Ip2LocationReader;
use crate::mmdb::{find_metadata_marker, MmdbReader};
use crate::record::GeoRecord;
use crate::storage::DatabaseStorage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// On-disk database format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseFormat {
    /// MaxMind DB
    Mmdb,
    /// IP2Location BIN
    Ip2Location,
}

impl DatabaseFormat {
    /// Guess the format of an image
    ///
    /// The file extension decides when it is `.mmdb` or `.bin`; otherwise
    /// an image with a MaxMind metadata marker is MMDB and anything else
    /// is treated as BIN.
    pub fn detect(path: Option<&Path>, data: &[u8]) -> Self {
        let extension = path
            .and_then(Path::extension)
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("mmdb") => DatabaseFormat::Mmdb,
            Some("bin") => DatabaseFormat::Ip2Location,
            _ if find_metadata_marker(data).is_ok() => DatabaseFormat::Mmdb,
            _ => DatabaseFormat::Ip2Location,
        }
    }
}

impl fmt::Display for DatabaseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseFormat::Mmdb => write!(f, "MaxMind DB"),
            DatabaseFormat::Ip2Location => write!(f, "IP2Location BIN"),
        }
    }
}

/// Options for opening a database
///
/// Deserializable so an embedding service can keep them in its own
/// configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Path to the database file
    pub path: PathBuf,

    /// Force a format instead of detecting it
    pub format: Option<DatabaseFormat>,

    /// Read the whole file into memory instead of memory-mapping it
    pub in_memory: bool,

    /// Preferred language for MaxMind `names` maps (falls back to "en")
    pub language: String,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            format: None,
            in_memory: false,
            language: "en".to_string(),
        }
    }
}

/// Builder for opening databases with custom configuration
///
/// Created via `GeoDatabase::from(path)`. Use the fluent API to configure
/// options, then call `.open()` to load the database.
///
/// # Examples
///
/// ```no_run
/// use geodb::{DatabaseFormat, GeoDatabase};
///
/// // Simple case with defaults
/// let db = GeoDatabase::from("GeoLite2-City.mmdb").open()?;
///
/// // Custom configuration
/// let db = GeoDatabase::from("/var/lib/geo/IP2LOCATION-LITE-DB11")
///     .format(DatabaseFormat::Ip2Location)
///     .in_memory()
///     .open()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DatabaseOpener {
    options: DatabaseOptions,
}

impl DatabaseOpener {
    fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            options: DatabaseOptions {
                path: path.into(),
                ..Default::default()
            },
        }
    }

    /// Skip detection and read the file as `format`
    pub fn format(mut self, format: DatabaseFormat) -> Self {
        self.options.format = Some(format);
        self
    }

    /// Load the file into an owned buffer instead of memory-mapping it
    pub fn in_memory(mut self) -> Self {
        self.options.in_memory = true;
        self
    }

    /// Preferred language tag for MaxMind names
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.options.language = language.into();
        self
    }

    /// Open the database with configured options
    pub fn open(self) -> Result<GeoDatabase> {
        GeoDatabase::open_with_options(self.options)
    }
}

enum Backend {
    Mmdb(MmdbReader),
    Ip2Location(Ip2LocationReader),
}

struct OpenState {
    storage: DatabaseStorage,
    backend: Backend,
}

/// Summary of an open database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseInfo {
    /// On-disk format
    pub format: DatabaseFormat,
    /// Semantic type, e.g. "GeoLite2-City" or "IP2Location DB11"
    pub database_type: String,
    /// MMDB build time (seconds since the Unix epoch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_epoch: Option<u64>,
    /// BIN build date (year, month, day)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_date: Option<(u16, u8, u8)>,
    /// Languages available in MMDB names
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// MMDB tree IP version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<u8>,
    /// MMDB search tree node count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<u32>,
    /// MMDB record size in bits
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_size: Option<u16>,
    /// BIN IPv4 range count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_rows: Option<u32>,
    /// BIN IPv6 range count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6_rows: Option<u32>,
    /// Fields this database can populate
    pub fields: FieldSet,
    /// Size of the database image in bytes
    pub size: usize,
}

/// Fields a MaxMind record can carry
fn mmdb_fields() -> FieldSet {
    GeoField::ALL
        .iter()
        .copied()
        .take_while(|f| *f != GeoField::NetSpeed)
        .collect()
}

/// Open geolocation database
///
/// The handle is immutable once opened: lookups take `&self` and only
/// perform bounds-checked positioned reads, so one handle can be shared
/// across threads.
///
/// # Examples
///
/// ```no_run
/// use geodb::GeoDatabase;
///
/// let db = GeoDatabase::open("GeoLite2-City.mmdb")?;
///
/// match db.lookup("8.8.8.8") {
///     Ok(record) => println!("country: {:?}", record.country_code),
///     Err(e) if e.is_not_found() => println!("not in database"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct GeoDatabase {
    state: Option<OpenState>,
    format: DatabaseFormat,
    language: String,
    source: String,
}

impl GeoDatabase {
    /// Open a database file with default options
    ///
    /// Memory-maps the file and detects its format.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from(path.as_ref()).open()
    }

    /// Start configuring how a database file is opened
    pub fn from(path: impl Into<PathBuf>) -> DatabaseOpener {
        DatabaseOpener::new(path)
    }

    /// Open a database from explicit options
    pub fn open_with_options(options: DatabaseOptions) -> Result<Self> {
        let storage = if options.in_memory {
            DatabaseStorage::read(&options.path)?
        } else {
            DatabaseStorage::map(&options.path)?
        };

        let format = options
            .format
            .unwrap_or_else(|| DatabaseFormat::detect(Some(&options.path), storage.as_slice()));

        Self::from_storage(
            storage,
            format,
            options.language,
            options.path.display().to_string(),
        )
    }

    /// Create a database from an in-memory image
    pub fn from_bytes(data: Vec<u8>, format: DatabaseFormat) -> Result<Self> {
        Self::from_storage(
            DatabaseStorage::Owned(data),
            format,
            "en".to_string(),
            "<memory>".to_string(),
        )
    }

    fn from_storage(
        storage: DatabaseStorage,
        format: DatabaseFormat,
        language: String,
        source: String,
    ) -> Result<Self> {
        let data = storage.as_slice();
        let backend = match format {
            DatabaseFormat::Mmdb => Backend::Mmdb(MmdbReader::open(data)?),
            DatabaseFormat::Ip2Location => Backend::Ip2Location(Ip2LocationReader::open(data)?),
        };

        debug!(source = %source, format = %format, size = data.len(), storage = ?storage, "database opened");

        Ok(Self {
            state: Some(OpenState { storage, backend }),
            format,
            language,
            source,
        })
    }

    /// Look up an address literal
    pub fn lookup(&self, ip: &str) -> Result<GeoRecord> {
        let state = self.state()?;
        let key = classify(ip)?;
        self.lookup_key(state, &key, &FieldSet::all())
    }

    /// Look up an already-parsed address
    pub fn lookup_ip(&self, ip: IpAddr) -> Result<GeoRecord> {
        let state = self.state()?;
        self.lookup_key(state, &classify_ip(ip), &FieldSet::all())
    }

    /// Look up an address literal, returning only `fields`
    ///
    /// For BIN databases only the requested columns are decoded.
    pub fn lookup_fields(&self, ip: &str, fields: &FieldSet) -> Result<GeoRecord> {
        let state = self.state()?;
        let key = classify(ip)?;
        self.lookup_key(state, &key, fields)
    }

    fn lookup_key(&self, state: &OpenState, key: &AddressKey, fields: &FieldSet) -> Result<GeoRecord> {
        trace!(key = %key.to_ip(), family = ?key.family, "lookup");

        let data = state.storage.as_slice();
        let record = match &state.backend {
            Backend::Mmdb(reader) => {
                GeoRecord::from(reader.lookup(data, key, &self.language)?).select(fields)
            }
            Backend::Ip2Location(reader) => {
                GeoRecord::from(reader.lookup_fields(data, key, fields)?)
            }
        };
        Ok(record)
    }

    /// Release the file mapping
    ///
    /// Closing twice is a no-op. Lookups on a closed handle fail with
    /// [`GeoError::Closed`].
    pub fn close(&mut self) {
        if self.state.take().is_some() {
            debug!(source = %self.source, "database closed");
        }
    }

    /// True after [`Self::close`]
    pub fn is_closed(&self) -> bool {
        self.state.is_none()
    }

    /// On-disk format of this database
    pub fn format(&self) -> DatabaseFormat {
        self.format
    }

    /// Summary of the open database
    pub fn info(&self) -> Result<DatabaseInfo> {
        let state = self.state()?;
        let size = state.storage.len();

        let info = match &state.backend {
            Backend::Mmdb(reader) => {
                let meta = reader.metadata();
                DatabaseInfo {
                    format: self.format,
                    database_type: meta.database_type.clone(),
                    build_epoch: Some(meta.build_epoch),
                    build_date: None,
                    languages: meta.languages.clone(),
                    ip_version: Some(meta.ip_version.number()),
                    node_count: Some(meta.node_count),
                    record_size: Some(meta.record_size.bits()),
                    ipv4_rows: None,
                    ipv6_rows: None,
                    fields: mmdb_fields(),
                    size,
                }
            }
            Backend::Ip2Location(reader) => {
                let header = reader.header();
                DatabaseInfo {
                    format: self.format,
                    database_type: format!("IP2Location DB{}", header.database_type),
                    build_epoch: None,
                    build_date: Some(header.build_date),
                    languages: Vec::new(),
                    ip_version: None,
                    node_count: None,
                    record_size: None,
                    ipv4_rows: Some(header.ipv4.row_count),
                    ipv6_rows: Some(header.ipv6.row_count),
                    fields: reader.layout().available_fields(),
                    size,
                }
            }
        };
        Ok(info)
    }

    fn state(&self) -> Result<&OpenState> {
        self.state.as_ref().ok_or(GeoError::Closed)
    }
}

impl fmt::Debug for GeoDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeoDatabase")
            .field("source", &self.source)
            .field("format", &self.format)
            .field("closed", &self.is_closed())
            .finish()
    }
}
