// OCR for image uploads: grayscale + Otsu binarization, then Tesseract
use image::{GrayImage, ImageFormat};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use std::io;
use std::process::Command;
use tracing::{debug, warn};

use crate::config::OcrConfig;
use crate::types::OcrError;

/// Anything that turns a binarized page image into text.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;
}

/// Decode, convert to single-channel grayscale and binarize with a global
/// threshold chosen by Otsu's method.
pub fn preprocess(bytes: &[u8]) -> Result<GrayImage, OcrError> {
    let gray = image::load_from_memory(bytes)?.to_luma8();
    let level = otsu_level(&gray);
    debug!("Otsu threshold {} for {}x{} image", level, gray.width(), gray.height());
    Ok(threshold(&gray, level, ThresholdType::Binary))
}

/// Full OCR path for one image. Surrounding whitespace is trimmed; an image
/// with no recognizable text yields an empty string, not an error.
pub fn ocr_image(bytes: &[u8], recognizer: &dyn TextRecognizer) -> Result<String, OcrError> {
    let binarized = preprocess(bytes)?;
    let text = recognizer.recognize(&binarized)?;
    let text = text.trim().to_string();
    if text.is_empty() {
        warn!("OCR found no text in image");
    }
    Ok(text)
}

/// Tesseract via its command line: `tesseract <image> stdout -l <lang>`.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    pub binary: String,
    pub language: String,
}

impl TesseractCli {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.tesseract_path.clone(),
            language: config.language.clone(),
        }
    }

    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError> {
        // Removed when dropped, whatever tesseract does with it.
        let mut staged = tempfile::Builder::new()
            .prefix("legalbrief-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(OcrError::Staging)?;
        image
            .write_to(&mut staged, ImageFormat::Png)
            .map_err(|e| OcrError::Staging(io::Error::other(e)))?;

        let output = Command::new(&self.binary)
            .arg(staged.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|source| OcrError::EngineUnavailable {
                engine: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(OcrError::EngineFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
