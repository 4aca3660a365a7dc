// Core types and errors shared across the summarization pipeline
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::summarizer::Device;

/// Term → plain-language gloss, only for terms found in the text.
pub type JargonMap = BTreeMap<String, String>;

/// The closed set of inputs the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    PlainText,
    Pdf,
    StructuredDocument,
    Image,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(FileKind::PlainText),
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::StructuredDocument),
            "png" | "jpg" | "jpeg" | "bmp" | "tif" | "tiff" => Some(FileKind::Image),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// An uploaded document. Lives for one request only.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    /// `None` when the upload's type is not one we extract from.
    pub kind: Option<FileKind>,
}

impl Document {
    pub fn new(bytes: Vec<u8>, kind: Option<FileKind>) -> Self {
        Self { bytes, kind }
    }

    pub fn plain_text(text: impl Into<String>) -> Self {
        Self::new(text.into().into_bytes(), Some(FileKind::PlainText))
    }
}

/// What the pipeline hands back to the outer surface.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub summary: Vec<String>,
    pub jargon: JargonMap,
    pub device: Device,
    /// First characters of the extracted text, for preview.
    #[serde(rename = "text")]
    pub preview: String,
}

// Error types

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to stage image for recognition: {0}")]
    Staging(#[source] std::io::Error),

    #[error("OCR engine could not be started ({engine}): {source}")]
    EngineUnavailable {
        engine: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OCR engine failed (exit code {code:?}): {stderr}")]
    EngineFailed { code: Option<i32>, stderr: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("text is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("document error: {0}")]
    Docx(String),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SummarizationError {
    #[error("model could not be loaded: {0}")]
    ModelLoad(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("accelerator ran out of memory: {0}")]
    OutOfMemory(String),

    #[error("model returned {got} summaries for {expected} chunks")]
    Misaligned { expected: usize, got: usize },
}

impl SummarizationError {
    /// Classify a runtime failure message, separating memory exhaustion.
    pub fn from_runtime(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("out of memory") || lower.contains("failed to allocate") {
            SummarizationError::OutOfMemory(message)
        } else {
            SummarizationError::Inference(message)
        }
    }
}

/// The single error surfaced at the request boundary.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("summarization failed: {0}")]
    Summarization(#[from] SummarizationError),

    #[error("could not stage upload: {0}")]
    Upload(#[source] std::io::Error),

    #[error("processing timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("processing task aborted: {0}")]
    Aborted(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
