// Text extraction, dispatched on the document's file kind
pub mod docx;
pub mod ocr;
pub mod pdf;

use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::types::{Document, ExtractionError, FileKind};
use ocr::{TesseractCli, TextRecognizer};

pub use docx::extract_docx_text;
pub use ocr::{ocr_image, preprocess};
pub use pdf::extract_pdf_text;

pub struct TextExtractor {
    recognizer: Box<dyn TextRecognizer>,
}

impl TextExtractor {
    pub fn new(config: &OcrConfig) -> Self {
        Self::with_recognizer(Box::new(TesseractCli::new(config)))
    }

    pub fn with_recognizer(recognizer: Box<dyn TextRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Raw text of the document in source order.
    ///
    /// Documents of an unrecognized kind have no text; that is an empty
    /// string, not an error.
    pub fn extract(&self, document: &Document) -> Result<String, ExtractionError> {
        let Some(kind) = document.kind else {
            debug!("No extractor for this upload, treating as empty");
            return Ok(String::new());
        };
        self.extract_bytes(&document.bytes, kind)
    }

    pub fn extract_path(&self, path: &Path, kind: Option<FileKind>) -> Result<String, ExtractionError> {
        let bytes = std::fs::read(path)?;
        self.extract(&Document::new(bytes, kind))
    }

    fn extract_bytes(&self, bytes: &[u8], kind: FileKind) -> Result<String, ExtractionError> {
        let start = Instant::now();
        let text = match kind {
            FileKind::PlainText => String::from_utf8(bytes.to_vec())?,
            FileKind::Pdf => extract_pdf_text(bytes)?,
            FileKind::StructuredDocument => extract_docx_text(bytes)?,
            FileKind::Image => ocr_image(bytes, self.recognizer.as_ref())?,
        };
        info!(
            "Text extracted ({} chars) from {:?} in {}ms",
            text.chars().count(),
            kind,
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ocr::tests::{scanned_page_png, FixedRecognizer};

    fn extractor() -> TextExtractor {
        TextExtractor::with_recognizer(Box::new(FixedRecognizer(" hereby granted ")))
    }

    #[test]
    fn test_plain_text_is_identity() {
        let text = "Whereas the parties agree:\n\t§ 1 — ünïcode stays.";
        let out = extractor().extract(&Document::plain_text(text)).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn test_invalid_utf8() {
        let doc = Document::new(vec![0x66, 0x6f, 0xff, 0xfe], Some(FileKind::PlainText));
        let err = extractor().extract(&doc).unwrap_err();
        assert!(matches!(err, ExtractionError::Encoding(_)));
    }

    #[test]
    fn test_unknown_kind_is_empty() {
        let doc = Document::new(b"MZ\x90\x00".to_vec(), None);
        assert_eq!(extractor().extract(&doc).unwrap(), "");
    }

    #[test]
    fn test_image_goes_through_ocr() {
        let doc = Document::new(scanned_page_png(), Some(FileKind::Image));
        assert_eq!(extractor().extract(&doc).unwrap(), "hereby granted");
    }

    #[test]
    fn test_image_decode_failure_is_ocr_error() {
        let doc = Document::new(b"garbage".to_vec(), Some(FileKind::Image));
        let err = extractor().extract(&doc).unwrap_err();
        assert!(matches!(err, ExtractionError::Ocr(_)));
    }

    #[test]
    fn test_docx_and_pdf_dispatch() {
        let docx = super::docx::tests::make_docx(&[&["One"], &["Two"]]);
        let doc = Document::new(docx, Some(FileKind::StructuredDocument));
        assert_eq!(extractor().extract(&doc).unwrap(), "One\nTwo");

        let pdf = super::pdf::tests::make_pdf(&["Forthwith"]);
        let doc = Document::new(pdf, Some(FileKind::Pdf));
        assert!(extractor().extract(&doc).unwrap().contains("Forthwith"));
    }
}
