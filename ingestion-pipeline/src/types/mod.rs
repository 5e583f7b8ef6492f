pub mod manifest;
pub mod source;

pub use manifest::IngestManifest;
pub use source::{derive_source_id, IngestInput, ManualChunk, SourceRef};
