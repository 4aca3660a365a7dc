// Uploaded files staged on disk for the lifetime of one request
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// Reduce a client-supplied filename to something safe to put on disk:
/// path separators and whitespace become `_`, anything outside
/// `[A-Za-z0-9_.-]` is dropped, leading/trailing dots and underscores go.
pub fn secure_filename(filename: &str) -> String {
    let spaced = filename.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A document written into the upload directory. The file is removed when
/// this value drops, on success and error paths alike. A removal failure
/// (a lock held by another process, say) is logged, never raised.
pub struct StagedUpload {
    file: Option<NamedTempFile>,
    path: PathBuf,
}

impl StagedUpload {
    pub fn stage(dir: &Path, filename: &str, bytes: &[u8]) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let safe = secure_filename(filename);
        let (stem, suffix) = match safe.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
            _ => (safe.clone(), String::new()),
        };

        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-", stem))
            .suffix(&suffix)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        let path = file.path().to_path_buf();
        debug!("Staged upload {} ({} bytes)", path.display(), bytes.len());
        Ok(Self { file: Some(file), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            match file.close() {
                Ok(()) => debug!("Removed staged upload {}", self.path.display()),
                Err(e) => warn!("Could not remove staged upload {}: {}", self.path.display(), e),
            }
        }
    }
}
