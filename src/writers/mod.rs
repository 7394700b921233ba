pub mod json_writer;

pub use json_writer::{read_documents, BatchWriter, WriteSummary};
