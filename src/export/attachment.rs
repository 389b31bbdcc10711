//! Save a message's attachments and replace convertible ones by their PDF.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{ExportError, Result};
use crate::model::kind::{is_pdf, DocumentKind};
use crate::store::{MailAttachment, MailMessage};

use super::counters::RunCounters;
use super::naming::{sanitize_file_name, unique_file_path};
use super::ExportContext;

/// Export every attachment of `message` into `folder`, in store order.
///
/// A failing attachment is logged and skipped. Returns how many attachments
/// were saved.
pub fn export_attachments(
    message: &dyn MailMessage,
    folder: &Path,
    ctx: &ExportContext<'_>,
    counters: &mut RunCounters,
) -> usize {
    let attachments = match message.attachments() {
        Ok(list) => list,
        Err(e) => {
            warn!(folder = %folder.display(), error = %e, "Failed to list attachments");
            return 0;
        }
    };

    let mut saved = 0;
    for attachment in &attachments {
        match export_attachment(attachment.as_ref(), folder, ctx, counters) {
            Ok(path) => {
                debug!(path = %path.display(), "Attachment exported");
                saved += 1;
            }
            Err(e) => {
                warn!(
                    filename = %attachment.file_name(),
                    error = %e,
                    "Failed to export attachment"
                );
            }
        }
    }
    saved
}

/// Save one attachment and convert it when it is not a PDF yet.
///
/// Returns the path of the file that remains: the PDF rendition on
/// successful conversion, the original otherwise.
pub fn export_attachment(
    attachment: &dyn MailAttachment,
    folder: &Path,
    ctx: &ExportContext<'_>,
    counters: &mut RunCounters,
) -> Result<PathBuf> {
    let max_len = ctx.naming.max_name_length;
    let original = Path::new(attachment.file_name());
    let name = sanitize_file_name(attachment.file_name(), max_len, &ctx.naming.untitled);
    let path = unique_file_path(folder, &name, max_len);

    let bytes = match attachment.save_to(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            // never leave a truncated copy behind
            remove_partial(&path);
            return Err(e);
        }
    };
    counters.attachments_saved += 1;
    counters.attachment_bytes += bytes;

    if is_pdf(&path) || is_pdf(original) {
        return Ok(path);
    }
    // the saved name may have lost its extension to the length limit
    let kind = match DocumentKind::from_path(&path) {
        DocumentKind::Unsupported => DocumentKind::from_path(original),
        kind => kind,
    };

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| ExportError::InvalidPath(path.display().to_string()))?;
    let pdf_path = unique_file_path(folder, &format!("{stem}.pdf"), max_len);

    if !ctx.converter.convert_as(kind, &path, &pdf_path) {
        return Ok(path);
    }
    counters.attachments_converted += 1;

    if let Err(e) = std::fs::remove_file(&path) {
        warn!(
            path = %path.display(),
            error = %e,
            "Converted, but the original could not be removed"
        );
    }
    Ok(pdf_path)
}

fn remove_partial(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Could not remove partial attachment");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::export::converter::DocumentConverter;
    use crate::render::{BackendSession, RenderBackend};

    struct NoBackend;

    impl RenderBackend for NoBackend {
        fn start(&self, _kind: DocumentKind) -> Result<Box<dyn BackendSession>> {
            Err(ExportError::backend("offline"))
        }
    }

    /// Writes part of its content, then fails.
    struct Truncated;

    impl MailAttachment for Truncated {
        fn file_name(&self) -> &str {
            "ledger.xlsx"
        }

        fn save_to(&self, path: &Path) -> Result<u64> {
            std::fs::write(path, b"PK\x03").map_err(|e| ExportError::io(path, e))?;
            Err(ExportError::store("stream ended early"))
        }
    }

    #[test]
    fn test_failed_save_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.converter.retry_delay_ms = 0;
        let ctx = ExportContext {
            converter: DocumentConverter::new(&NoBackend, &config.converter),
            naming: &config.naming,
        };
        let mut counters = RunCounters::default();

        let err = export_attachment(&Truncated, dir.path(), &ctx, &mut counters).unwrap_err();

        assert!(matches!(err, ExportError::Store(_)));
        assert!(!dir.path().join("ledger.xlsx").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(counters, RunCounters::default());
    }

    #[test]
    fn test_remove_partial_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        remove_partial(&dir.path().join("never-written.bin"));
    }

    #[test]
    fn test_unconverted_attachment_stays_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.converter.max_attempts = 1;
        config.converter.retry_delay_ms = 0;
        let ctx = ExportContext {
            converter: DocumentConverter::new(&NoBackend, &config.converter),
            naming: &config.naming,
        };
        let mut counters = RunCounters::default();
        let attachment = crate::store::directory::MemoryAttachment {
            file_name: "notes.txt".into(),
            data: b"hi".to_vec(),
        };

        let kept = export_attachment(&attachment, dir.path(), &ctx, &mut counters).unwrap();

        assert_eq!(kept, dir.path().join("notes.txt"));
        assert_eq!(counters.attachments_saved, 1);
        assert_eq!(counters.attachments_converted, 0);
    }
}
