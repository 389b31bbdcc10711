//! Document-to-PDF conversion with bounded retries.
//!
//! Every attempt acquires a fresh backend session, opens the source, exports
//! and releases both handles before the next attempt. A destination left by
//! a failed attempt is removed, so after a failure the destination never
//! exists.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ConverterConfig;
use crate::error::{ExportError, Result};
use crate::model::kind::DocumentKind;
use crate::render::{RenderBackend, RenderSession};

/// Converts files to PDF through a [`RenderBackend`].
pub struct DocumentConverter<'b> {
    backend: &'b dyn RenderBackend,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<'b> DocumentConverter<'b> {
    pub fn new(backend: &'b dyn RenderBackend, config: &ConverterConfig) -> Self {
        Self {
            backend,
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
        }
    }

    /// Convert `source` to a PDF at `dest`, picking the family from the
    /// extension.
    ///
    /// Returns `false` for unsupported types without touching the backend,
    /// and after all attempts failed. Never panics or errors out.
    pub fn convert(&self, source: &Path, dest: &Path) -> bool {
        self.convert_as(DocumentKind::from_path(source), source, dest)
    }

    /// [`convert`](Self::convert) with the family already decided.
    pub fn convert_as(&self, kind: DocumentKind, source: &Path, dest: &Path) -> bool {
        if !kind.is_renderable() {
            debug!(source = %source.display(), "No renderer for this file type");
            return false;
        }

        match self.render(kind, source, dest) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    source = %source.display(),
                    attempts = self.max_attempts,
                    error = %e,
                    "Conversion failed"
                );
                false
            }
        }
    }

    /// Render `source` as `kind` to `dest`, retrying transient failures.
    ///
    /// Returns the error of the last attempt.
    pub fn render(&self, kind: DocumentKind, source: &Path, dest: &Path) -> Result<()> {
        let mut attempt = 1;
        loop {
            match self.attempt(kind, source, dest) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    discard_partial(dest);
                    if attempt >= self.max_attempts {
                        return Err(e);
                    }
                    debug!(
                        source = %source.display(),
                        attempt,
                        error = %e,
                        "Render attempt failed, retrying"
                    );
                    std::thread::sleep(self.retry_delay);
                    attempt += 1;
                }
            }
        }
    }

    /// One scoped attempt. Handles are released when the guards drop.
    fn attempt(&self, kind: DocumentKind, source: &Path, dest: &Path) -> Result<()> {
        let mut session = RenderSession::start(self.backend, kind)?;
        let mut document = session.open(source)?;
        document.export_pdf(dest)?;

        let written = std::fs::metadata(dest).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(ExportError::backend(format!(
                "backend reported success but '{}' is missing or empty",
                dest.display()
            )));
        }
        Ok(())
    }
}

/// Remove whatever a failed attempt left at `dest`.
fn discard_partial(dest: &Path) {
    if dest.exists() {
        if let Err(e) = std::fs::remove_file(dest) {
            warn!(path = %dest.display(), error = %e, "Could not remove partial PDF");
        }
    }
}
