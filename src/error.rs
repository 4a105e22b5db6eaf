/// Error types for the geodb library
use std::fmt;
use std::io;

/// Result type alias for geodb operations
pub type Result<T> = std::result::Result<T, GeoError>;

/// Main error type for opening and querying geolocation databases
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoError {
    /// The database file does not exist
    FileNotFound(String),

    /// The database file exists but cannot be opened or mapped
    NotReadable(String),

    /// The fixed header or metadata block violates the expected layout
    InvalidHeader(String),

    /// No MaxMind DB metadata marker in the trailing search window
    MetadataNotFound,

    /// The lookup input is not an IPv4 or IPv6 literal
    InvalidAddress(String),

    /// The address is well-formed but not covered by this database
    NotFound(String),

    /// A structural violation found while searching or decoding
    CorruptData(String),

    /// Other I/O errors
    Io(String),

    /// The handle was closed before the lookup
    Closed,
}

impl GeoError {
    /// True for the "address absent" outcome, which callers usually
    /// treat as a normal miss rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GeoError::NotFound(_))
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        GeoError::CorruptData(msg.into())
    }

    pub(crate) fn header(msg: impl Into<String>) -> Self {
        GeoError::InvalidHeader(msg.into())
    }

    /// Map an open-time I/O error onto the open failure taxonomy.
    pub(crate) fn from_open(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => GeoError::FileNotFound(path.to_string()),
            _ => GeoError::NotReadable(format!("{}: {}", path, err)),
        }
    }
}

impl fmt::Display for GeoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoError::FileNotFound(path) => write!(f, "Database file not found: {}", path),
            GeoError::NotReadable(msg) => write!(f, "Database file not readable: {}", msg),
            GeoError::InvalidHeader(msg) => write!(f, "Invalid database header: {}", msg),
            GeoError::MetadataNotFound => write!(f, "MMDB metadata marker not found"),
            GeoError::InvalidAddress(addr) => write!(f, "Invalid IP address: {}", addr),
            GeoError::NotFound(addr) => write!(f, "IP address not found: {}", addr),
            GeoError::CorruptData(msg) => write!(f, "Corrupt database: {}", msg),
            GeoError::Io(msg) => write!(f, "I/O error: {}", msg),
            GeoError::Closed => write!(f, "Database handle is closed"),
        }
    }
}

impl std::error::Error for GeoError {}

impl From<io::Error> for GeoError {
    fn from(err: io::Error) -> Self {
        GeoError::Io(err.to_string())
    }
}
