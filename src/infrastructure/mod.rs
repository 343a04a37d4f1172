pub mod registry_loader;

pub use registry_loader::{
    RegistryLoader, SourceFormat, parse_registry, read_registry, render_json,
};
