// Instrument records and their invariants
pub mod instrument;

// Immutable symbol/Uic registry
pub mod registry;

// Domain-specific error types
pub mod errors;

pub use errors::{LookupError, ParseError, RegistryError, SchemaError};
pub use instrument::{AssetType, InstrumentRecord, TradeSide};
pub use registry::InstrumentRegistry;
