// Document → summary + jargon pipeline, the boundary the outer surface calls
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::chunker::{chunk_size_for, chunk_text};
use crate::config::AppConfig;
use crate::extraction::TextExtractor;
use crate::jargon::find_jargon;
use crate::summarizer::{Device, SummarizationEngine};
use crate::types::{Document, FileKind, PipelineError, Result, SummaryResponse};
use crate::upload::StagedUpload;

/// First `limit` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub struct Pipeline {
    extractor: TextExtractor,
    engine: Arc<SummarizationEngine>,
    config: AppConfig,
}

impl Pipeline {
    pub fn new(extractor: TextExtractor, engine: Arc<SummarizationEngine>, config: AppConfig) -> Self {
        Self { extractor, engine, config }
    }

    pub fn device(&self) -> Device {
        self.engine.device()
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.extractor
    }

    /// Summarize already-extracted text and gloss its jargon.
    pub fn process_text(&self, text: &str) -> Result<SummaryResponse> {
        let device = self.engine.device();
        let size = chunk_size_for(&device, &self.config.chunking);
        let chunks = chunk_text(text, size);
        info!("Split {} chars into {} chunks of ≤{}", text.chars().count(), chunks.len(), size);

        let summary = self.engine.summarize(&chunks)?;
        let jargon = find_jargon(text);

        Ok(SummaryResponse {
            summary,
            jargon,
            device,
            preview: preview(text, self.config.pipeline.preview_chars),
        })
    }

    /// Extract, chunk, summarize. Either everything succeeds or one error
    /// comes back.
    pub fn process(&self, document: &Document) -> Result<SummaryResponse> {
        let text = self.extractor.extract(document)?;
        self.process_text(&text)
    }

    /// Stage the upload under the configured upload dir and run it through
    /// the pipeline. The staged file is gone when this returns.
    pub fn process_upload(&self, filename: &str, bytes: &[u8]) -> Result<SummaryResponse> {
        self.process_upload_with_text(filename, bytes)
            .map(|(_, response)| response)
    }

    /// `process_upload`, also handing back the full extracted text.
    pub fn process_upload_with_text(&self, filename: &str, bytes: &[u8]) -> Result<(String, SummaryResponse)> {
        let start = Instant::now();
        let kind = FileKind::from_path(Path::new(filename));
        let staged = StagedUpload::stage(&self.config.pipeline.upload_dir, filename, bytes)
            .map_err(PipelineError::Upload)?;
        info!("Processing: {} as {:?}", filename, kind);

        let result = self
            .extractor
            .extract_path(staged.path(), kind)
            .map_err(PipelineError::from)
            .and_then(|text| {
                let response = self.process_text(&text)?;
                Ok((text, response))
            });

        match &result {
            Ok((_, response)) => info!(
                "Processed {} into {} summaries in {:.2}s",
                filename,
                response.summary.len(),
                start.elapsed().as_secs_f64()
            ),
            Err(e) => error!("Processing failed: {}", e),
        }
        result
    }

    /// `process_upload` on the blocking pool, bounded by the configured
    /// request timeout. On timeout the caller gets an error straight away;
    /// the work itself is not cancelled and finishes in the background.
    pub async fn process_upload_with_timeout(
        self: Arc<Self>,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<SummaryResponse> {
        let timeout = self.config.pipeline.timeout();
        let task = tokio::task::spawn_blocking(move || self.process_upload(&filename, &bytes));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(PipelineError::Aborted(join_error.to_string())),
            Err(_) => {
                error!("Request exceeded {:?}", timeout);
                Err(PipelineError::Timeout(timeout))
            }
        }
    }
}
