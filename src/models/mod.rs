pub mod station;
pub mod table;

pub use station::StationMetadata;
pub use table::{canonical_key, Document, RawTable};
