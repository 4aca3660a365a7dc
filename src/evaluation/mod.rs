// Admin evaluation harness: ROUGE-L, readability and latency per corpus file
pub mod export;
pub mod readability;
pub mod rouge;
pub mod store;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::pipeline::Pipeline;
use crate::types::{FileKind, PipelineError};

pub use export::write_csv;
pub use readability::flesch_kincaid_grade;
pub use rouge::{rouge_l, RougeScore};
pub use store::{EvaluationStore, StoreError};

/// Quality and speed of one summarized reference document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub file_id: String,
    /// ROUGE-L F-measure of the summary against the document text.
    pub rouge_l: f64,
    pub readability_grade: f64,
    pub latency_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationFailure {
    pub file_id: String,
    pub error: String,
}

#[derive(Debug, Default, Serialize)]
pub struct EvaluationReport {
    pub records: Vec<EvaluationRecord>,
    pub failures: Vec<EvaluationFailure>,
}

impl EvaluationReport {
    pub fn mean_rouge_l(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        Some(self.records.iter().map(|r| r.rouge_l).sum::<f64>() / self.records.len() as f64)
    }
}

pub struct Evaluator<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> Evaluator<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Evaluate every document in `corpus_dir`, in name order. Files of no
    /// known kind (`README`, `.DS_Store`) are skipped. A file that fails is
    /// logged and listed in `failures`; the rest still run. Only an
    /// unreadable directory fails the whole batch.
    pub fn run(&self, corpus_dir: &Path) -> io::Result<EvaluationReport> {
        let (mut paths, skipped): (Vec<_>, Vec<_>) = fs::read_dir(corpus_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .partition(|p| FileKind::from_path(p).is_some());
        paths.sort();
        if !skipped.is_empty() {
            debug!("Skipping {} files of unknown type", skipped.len());
        }
        info!("Evaluating {} documents from {}", paths.len(), corpus_dir.display());

        let mut report = EvaluationReport::default();
        for path in paths {
            let file_id = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            match self.evaluate_file(&path, &file_id) {
                Ok(record) => {
                    info!(
                        "  ✅ {}: rouge_l={:.4} grade={:.2} latency={:.2}s",
                        record.file_id, record.rouge_l, record.readability_grade, record.latency_seconds
                    );
                    report.records.push(record);
                }
                Err(e) => {
                    warn!("  ⚠️ Skipping {}: {}", file_id, e);
                    report.failures.push(EvaluationFailure {
                        file_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    pub fn evaluate_file(&self, path: &Path, file_id: &str) -> Result<EvaluationRecord, PipelineError> {
        let bytes = fs::read(path).map_err(PipelineError::Upload)?;

        let start = Instant::now();
        let (reference, response) = self.pipeline.process_upload_with_text(file_id, &bytes)?;
        let latency_seconds = start.elapsed().as_secs_f64();

        let summary = response.summary.join(" ");

        Ok(EvaluationRecord {
            file_id: file_id.to_string(),
            rouge_l: rouge_l(&reference, &summary).fmeasure,
            readability_grade: flesch_kincaid_grade(&summary),
            latency_seconds,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::extraction::ocr::tests::scanned_page_png;
    use crate::extraction::ocr::TextRecognizer;
    use crate::extraction::TextExtractor;
    use crate::summarizer::tests::EchoBackend;
    use crate::summarizer::{Device, GenerationPolicy, SummarizationEngine};
    use crate::types::OcrError;
    use chrono::TimeZone;
    use image::GrayImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingRecognizer(Arc<AtomicUsize>);

    impl TextRecognizer for CountingRecognizer {
        fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("The lessee shall pay rent forthwith.".to_string())
        }
    }

    fn pipeline_with(extractor: TextExtractor, upload_dir: &Path) -> Pipeline {
        let backend = EchoBackend {
            calls: Arc::new(AtomicUsize::new(0)),
            largest_batch: Arc::new(AtomicUsize::new(0)),
        };
        let engine = SummarizationEngine::new(Box::new(backend), Device::Cpu, GenerationPolicy::default());
        let mut config = AppConfig::default();
        config.pipeline.upload_dir = upload_dir.to_path_buf();
        Pipeline::new(extractor, Arc::new(engine), config)
    }

    fn echo_pipeline(upload_dir: &Path) -> Pipeline {
        pipeline_with(TextExtractor::new(&AppConfig::default().ocr), upload_dir)
    }

    #[test]
    fn test_bad_file_does_not_stop_the_batch() {
        let corpus = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        fs::write(corpus.path().join("a_lease.txt"), "The tenant pays rent. The landlord fixes the roof.").unwrap();
        fs::write(corpus.path().join("b_broken.txt"), [0x66u8, 0xff, 0xfe]).unwrap();
        fs::write(corpus.path().join("c_deed.txt"), "Hereby the land passes to the buyer.").unwrap();

        let pipeline = echo_pipeline(uploads.path());
        let report = Evaluator::new(&pipeline).run(corpus.path()).unwrap();

        let ids: Vec<&str> = report.records.iter().map(|r| r.file_id.as_str()).collect();
        assert_eq!(ids, vec!["a_lease.txt", "c_deed.txt"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file_id, "b_broken.txt");

        for record in &report.records {
            assert!((0.0..=1.0).contains(&record.rouge_l));
            assert!(record.latency_seconds >= 0.0);
        }
        assert!(report.mean_rouge_l().is_some());
        assert_eq!(fs::read_dir(uploads.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_corpus_dir_is_an_error() {
        let uploads = tempfile::tempdir().unwrap();
        let pipeline = echo_pipeline(uploads.path());
        assert!(Evaluator::new(&pipeline).run(Path::new("/nonexistent/eval_docs")).is_err());
    }

    #[test]
    fn test_empty_report_has_no_mean() {
        assert_eq!(EvaluationReport::default().mean_rouge_l(), None);
    }

    #[test]
    fn test_files_of_unknown_kind_skipped() {
        let corpus = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        fs::write(corpus.path().join("README"), "How to use this corpus.").unwrap();
        fs::write(corpus.path().join(".DS_Store"), [0u8, 0, 0, 1]).unwrap();
        fs::write(corpus.path().join("notes.md"), "# notes").unwrap();
        fs::write(corpus.path().join("lease.txt"), "The tenant pays rent.").unwrap();

        let pipeline = echo_pipeline(uploads.path());
        let report = Evaluator::new(&pipeline).run(corpus.path()).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].file_id, "lease.txt");
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_image_recognized_once_per_document() {
        let corpus = tempfile::tempdir().unwrap();
        let uploads = tempfile::tempdir().unwrap();
        fs::write(corpus.path().join("scan.png"), scanned_page_png()).unwrap();

        let recognized = Arc::new(AtomicUsize::new(0));
        let extractor = TextExtractor::with_recognizer(Box::new(CountingRecognizer(recognized.clone())));
        let pipeline = pipeline_with(extractor, uploads.path());
        let report = Evaluator::new(&pipeline).run(corpus.path()).unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(recognized.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_record_serializes_with_timestamp() {
        let record = EvaluationRecord {
            file_id: "lease.txt".to_string(),
            rouge_l: 0.5,
            readability_grade: 8.0,
            latency_seconds: 1.0,
            timestamp: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["file_id"], "lease.txt");
        assert_eq!(json["timestamp"], "2026-01-02T03:04:05Z");
    }
}
