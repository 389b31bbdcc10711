//! Run-wide counters and the end-of-run summary.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use humansize::{format_size, BINARY};
use serde::Serialize;

/// Accumulators for one run. Created zeroed at run start and threaded by
/// `&mut` through the walker and the exporters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// Store items that classified as messages.
    pub messages_seen: u64,
    /// Messages whose folder was created and body rendered.
    pub exported: u64,
    /// Messages that could not be read, placed or rendered.
    pub failed: u64,
    /// Attachments written to disk.
    pub attachments_saved: u64,
    /// Attachments replaced by their PDF rendition.
    pub attachments_converted: u64,
    /// Bytes written for saved attachments, before conversion.
    pub attachment_bytes: u64,
    /// Folders entered by the walker.
    pub folders_visited: u64,
    /// Folders whose contents could not be enumerated.
    pub folders_failed: u64,
}

/// Frozen counters plus run metadata, reported once at the end.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub archive: PathBuf,
    pub output_root: PathBuf,
    #[serde(flatten)]
    pub counters: RunCounters,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn new(
        archive: PathBuf,
        output_root: PathBuf,
        counters: RunCounters,
        elapsed: Duration,
    ) -> Self {
        Self {
            archive,
            output_root,
            counters,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counters;
        writeln!(f)?;
        writeln!(f, "  Export complete:")?;
        writeln!(f, "  {:<25} {}", "Messages seen", c.messages_seen)?;
        writeln!(f, "  {:<25} {}", "Exported", c.exported)?;
        writeln!(f, "  {:<25} {}", "Failed", c.failed)?;
        writeln!(f, "  {:<25} {}", "Attachments saved", c.attachments_saved)?;
        writeln!(f, "  {:<25} {}", "Attachments converted", c.attachments_converted)?;
        writeln!(
            f,
            "  {:<25} {}",
            "Attachment data",
            format_size(c.attachment_bytes, BINARY)
        )?;
        if c.folders_failed > 0 {
            writeln!(
                f,
                "  {:<25} {} ({} skipped)",
                "Folders", c.folders_visited, c.folders_failed
            )?;
        } else {
            writeln!(f, "  {:<25} {}", "Folders", c.folders_visited)?;
        }
        writeln!(
            f,
            "  {:<25} {:.2?}",
            "Elapsed",
            Duration::from_millis(self.elapsed_ms)
        )?;
        writeln!(f, "  {:<25} {}", "Output", self.output_root.display())
    }
}
