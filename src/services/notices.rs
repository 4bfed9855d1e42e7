//! PDF notice storage on the local filesystem.
//!
//! DESIGN
//! ======
//! Uploaded notices are written flat into one directory under a generated
//! name `{ms}-{random}-{sanitised original}` and served statically at
//! `PUBLIC_PREFIX`. Deletion accepts the public URL but only ever uses its
//! final path segment, so a crafted URL cannot reach outside the directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use super::random_suffix;

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads/pdfs";

const PDF_CONTENT_TYPE: &str = "application/pdf";
const FALLBACK_NAME: &str = "notice.pdf";

#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("Only PDF files are allowed")]
    NotPdf,
    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("invalid file reference: {0}")]
    InvalidName(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug)]
pub struct PdfStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl PdfStore {
    #[must_use]
    pub fn new(dir: PathBuf, max_bytes: usize) -> Self {
        Self { dir, max_bytes }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Create the upload directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub async fn ensure_dir(&self) -> Result<(), NoticeError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Validate and store an uploaded PDF, returning its public URL.
    ///
    /// # Errors
    ///
    /// Returns `NotPdf` for any other content type, `TooLarge` past the
    /// configured limit, or an I/O error.
    pub async fn save(
        &self,
        original_name: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
        now_ms: i64,
    ) -> Result<String, NoticeError> {
        if content_type.map(str::trim) != Some(PDF_CONTENT_TYPE) {
            return Err(NoticeError::NotPdf);
        }
        if bytes.len() > self.max_bytes {
            return Err(NoticeError::TooLarge { size: bytes.len(), max: self.max_bytes });
        }

        self.ensure_dir().await?;
        let file_name = format!(
            "{now_ms}-{}-{}",
            random_suffix(7),
            sanitise_file_name(original_name.unwrap_or(FALLBACK_NAME))
        );
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;

        info!(file = %file_name, size = bytes.len(), "notice uploaded");
        Ok(format!("{PUBLIC_PREFIX}/{file_name}"))
    }

    /// Delete a stored notice by its public URL (or bare file name).
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` when the URL has no usable final segment,
    /// `NotFound` when no such file exists, or an I/O error.
    pub async fn delete(&self, url: &str) -> Result<(), NoticeError> {
        let file_name = url.rsplit(['/', '\\']).next().unwrap_or_default();
        if file_name.is_empty() || file_name == "." || file_name == ".." {
            return Err(NoticeError::InvalidName(url.to_owned()));
        }

        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => {
                info!(file = %file_name, "notice deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(NoticeError::NotFound(file_name.to_owned())),
            Err(e) => Err(e.into()),
        }
    }
}

/// Reduce a client-supplied file name to a safe single path segment.
pub(crate) fn sanitise_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() { FALLBACK_NAME.to_owned() } else { cleaned.to_owned() }
}

#[cfg(test)]
#[path = "notices_test.rs"]
mod tests;
