// legalbrief: plain-language summaries and jargon glosses for legal documents
pub mod chunker;
pub mod config;
pub mod evaluation;
pub mod extraction;
pub mod jargon;
pub mod logging;
pub mod pipeline;
pub mod summarizer;
pub mod types;
pub mod upload;

pub use config::AppConfig;
pub use extraction::TextExtractor;
pub use pipeline::Pipeline;
pub use summarizer::{Device, SummarizationEngine};
pub use types::{Document, FileKind, PipelineError, SummaryResponse};
