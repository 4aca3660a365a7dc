// PDF text extraction - pure Rust via lopdf
use lopdf::Document;
use tracing::debug;

use crate::types::ExtractionError;

/// Load a PDF document from memory.
pub fn load_pdf(bytes: &[u8]) -> Result<Document, ExtractionError> {
    Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))
}

/// Text of every page in page order, concatenated with no separator.
///
/// Line breaks are whatever lopdf emits for each page; nothing is inserted
/// between pages.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let document = load_pdf(bytes)?;
    let pages = document.get_pages();
    debug!("PDF has {} pages", pages.len());

    let mut text = String::new();
    for page_num in pages.keys() {
        let page_text = document
            .extract_text(&[*page_num])
            .map_err(|e| ExtractionError::Pdf(format!("page {}: {}", page_num, e)))?;
        text.push_str(&page_text);
    }
    Ok(text)
}

pub fn get_page_count(bytes: &[u8]) -> Result<usize, ExtractionError> {
    Ok(load_pdf(bytes)?.get_pages().len())
}
