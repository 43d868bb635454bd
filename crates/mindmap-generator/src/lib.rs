//! # mindmap-generator
//!
//! Everything between raw input and a finished mind map file:
//!
//! - [`GenerationService`]: prompt → LLM → outline tree, with chunking, retries and caching
//! - [`ChapterExtractor`] / [`DocumentPipeline`]: PDF upload → chapters → one branch each
//! - [`export`]: Markdown, HTML and canvas renderers

pub mod cache;
pub mod chunk;
pub mod error;
pub mod export;
pub mod extractor;
pub mod language;
pub mod pipeline;
pub mod prompt;
pub mod service;

#[cfg(test)]
mod testing;

pub use error::{GenerationError, Result};
pub use export::ExportFormat;
pub use extractor::{Chapter, ChapterExtractor, ExtractorConfig};
pub use language::Language;
pub use pipeline::DocumentPipeline;
pub use prompt::GenerationInput;
pub use service::{GenerationConfig, GenerationRequest, GenerationService};
