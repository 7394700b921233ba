pub mod formats;
pub mod object_store;
pub mod source_reader;
pub mod station_registry;

pub use formats::SourceFormat;
pub use object_store::{LocalObjectStore, ObjectStore, S3ObjectStore};
pub use source_reader::{SourceLocation, SourceReader};
pub use station_registry::StationRegistry;
