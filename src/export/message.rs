//! Export one message: its own folder, the rendered body, then attachments.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::NamingConfig;
use crate::error::{ExportError, Result};
use crate::model::kind::DocumentKind;
use crate::store::MailMessage;

use super::attachment::export_attachments;
use super::counters::RunCounters;
use super::naming::{sanitize_with_fallback, unique_dir_path};
use super::ExportContext;

/// Result of exporting a single message.
#[derive(Debug)]
pub enum MessageOutcome {
    /// Folder created and body rendered.
    Exported { folder: PathBuf, attachments: usize },
    /// The folder could not be set up or the body did not render.
    Failed {
        folder: Option<PathBuf>,
        reason: String,
    },
}

impl MessageOutcome {
    pub fn is_exported(&self) -> bool {
        matches!(self, Self::Exported { .. })
    }
}

/// Export `message` into a fresh folder under `output_root`.
///
/// Counts exactly one success or failure. Attachments are still saved when
/// the body fails to render, but do not change the outcome.
pub fn export_message(
    message: &dyn MailMessage,
    output_root: &Path,
    ctx: &ExportContext<'_>,
    counters: &mut RunCounters,
) -> MessageOutcome {
    let name = folder_name(message, ctx.naming);
    let folder = unique_dir_path(output_root, &name, ctx.naming.max_name_length);

    // create_dir (not _all): the folder must be new
    if let Err(e) = std::fs::create_dir(&folder) {
        let e = ExportError::io(&folder, e);
        warn!(subject = %message.subject(), error = %e, "Failed to create message folder");
        counters.failed += 1;
        return MessageOutcome::Failed {
            folder: None,
            reason: e.to_string(),
        };
    }

    let body = render_body(message, &folder, ctx);
    let attachments = export_attachments(message, &folder, ctx, counters);

    match body {
        Ok(()) => {
            info!(folder = %folder.display(), attachments, "Message exported");
            counters.exported += 1;
            MessageOutcome::Exported {
                folder,
                attachments,
            }
        }
        Err(e) => {
            warn!(
                subject = %message.subject(),
                folder = %folder.display(),
                error = %e,
                "Failed to render message"
            );
            counters.failed += 1;
            MessageOutcome::Failed {
                folder: Some(folder),
                reason: e.to_string(),
            }
        }
    }
}

/// Folder name: `{received}_{subject}`, e.g. `2024-03-01_091500_Q1 Report`.
pub fn folder_name(message: &dyn MailMessage, naming: &NamingConfig) -> String {
    let mut stamp = String::new();
    if write!(stamp, "{}", message.received().format(&naming.folder_date_format)).is_err() {
        warn!(format = %naming.folder_date_format, "Invalid folder date format, using default");
        stamp.clear();
        stamp.push_str(&message.received().format("%Y-%m-%d_%H%M%S").to_string());
    }
    let subject = sanitize_with_fallback(
        message.subject(),
        naming.max_name_length,
        &naming.empty_subject,
    );
    format!("{stamp}_{subject}")
}

/// Stage the message as HTML in a scratch directory and render it to the
/// body PDF inside `folder`.
fn render_body(message: &dyn MailMessage, folder: &Path, ctx: &ExportContext<'_>) -> Result<()> {
    let content = message.content()?;

    let staging = tempfile::Builder::new()
        .prefix("mailpdf-")
        .tempdir()
        .map_err(|e| ExportError::io(std::env::temp_dir(), e))?;
    let source = staging.path().join("message.html");
    std::fs::write(&source, content.to_html()).map_err(|e| ExportError::io(&source, e))?;

    let dest = folder.join(&ctx.naming.body_file_name);
    ctx.converter.render(DocumentKind::MessageBody, &source, &dest)
}
