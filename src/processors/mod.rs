pub mod legacy_converter;
pub mod load_gate;
pub mod loader;
pub mod normalizer;
pub mod pipeline;
pub mod quality_reporter;

pub use legacy_converter::LegacyConverter;
pub use load_gate::LoadGate;
pub use loader::{IdempotentLoader, LoadReport};
pub use normalizer::{NormalizeStats, Normalizer};
pub use pipeline::{LoadPipeline, StationOutcome, TransformPipeline, TransformReport};
pub use quality_reporter::{profile_table, QualityReport, QualityReporter, TableProfile};
