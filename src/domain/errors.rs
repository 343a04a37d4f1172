use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading an instrument table
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Malformed instrument source: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid instrument source: {0}")]
    Schema(#[from] SchemaError),
}

impl RegistryError {
    pub fn is_parse(&self) -> bool {
        matches!(self, RegistryError::Parse(_))
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, RegistryError::Schema(_))
    }

    pub fn as_schema(&self) -> Option<&SchemaError> {
        match self {
            RegistryError::Schema(err) => Some(err),
            RegistryError::Parse(_) => None,
        }
    }
}

/// The source could not be read or is not well-formed structured data
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read instrument stream: {0}")]
    Stream(#[source] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// TOML forbids repeated keys and tables, so a symbol defined twice in a
    /// TOML source is reported here rather than as `SchemaError::DuplicateSymbol`.
    #[error("Invalid TOML: {0}")]
    Toml(#[source] toml::de::Error),
}

/// The source parsed but does not describe a valid instrument table
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Expected a sequence holding exactly one instrument table, found {count}")]
    TableCount { count: usize },

    #[error("Expected a table of instruments keyed by symbol: {reason}")]
    Shape { reason: String },

    #[error("Instrument symbol must not be empty")]
    EmptySymbol,

    #[error("{symbol}: entry must be an object, found {found}")]
    EntryNotObject { symbol: String, found: &'static str },

    #[error("{symbol}: missing required field '{field}'")]
    MissingField { symbol: String, field: &'static str },

    #[error("{symbol}: field '{field}' must be {expected}, found {found}")]
    WrongType {
        symbol: String,
        field: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("{symbol}: field '{field}' must be positive, got {value}")]
    NonPositive {
        symbol: String,
        field: &'static str,
        value: String,
    },

    #[error("{symbol}: field 'AssetType' must not be empty")]
    EmptyAssetType { symbol: String },

    #[error("Duplicate symbol: {symbol}")]
    DuplicateSymbol { symbol: String },

    #[error("Duplicate Uic {uic}: used by {first} and {second}")]
    DuplicateUic {
        uic: u64,
        first: String,
        second: String,
    },
}

impl SchemaError {
    /// Symbol of the offending entry, when the violation belongs to one
    pub fn symbol(&self) -> Option<&str> {
        match self {
            SchemaError::EntryNotObject { symbol, .. }
            | SchemaError::MissingField { symbol, .. }
            | SchemaError::WrongType { symbol, .. }
            | SchemaError::NonPositive { symbol, .. }
            | SchemaError::EmptyAssetType { symbol }
            | SchemaError::DuplicateSymbol { symbol } => Some(symbol.as_str()),
            SchemaError::DuplicateUic { second, .. } => Some(second.as_str()),
            SchemaError::TableCount { .. } | SchemaError::Shape { .. } | SchemaError::EmptySymbol => {
                None
            }
        }
    }

    /// Source field name of the offending value, when there is one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SchemaError::MissingField { field, .. }
            | SchemaError::WrongType { field, .. }
            | SchemaError::NonPositive { field, .. } => Some(*field),
            SchemaError::EmptyAssetType { .. } => Some("AssetType"),
            SchemaError::DuplicateUic { .. } => Some("Uic"),
            _ => None,
        }
    }
}

/// Errors related to registry lookups
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Instrument not found: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("No instrument with Uic {uic}")]
    UnknownUic { uic: u64 },
}
